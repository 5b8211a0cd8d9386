//! A fold that may emit any number of outputs per input.
//!
//! The consumption cadence of a scan is decoupled from its production cadence: a bit level
//! decoder consumes many inputs per output, an expansion consumes one input per many outputs.
//! See [`LazySeq::scan`] for the entry point.
//!
//! [`LazySeq::scan`]: crate::LazySeq::scan
use std::collections::VecDeque;

use crate::error::{Error, Result};
use crate::seq::Items;

/// Collects the outputs of a single scan step.
#[derive(Debug)]
pub struct Emitter<U> {
    ready: VecDeque<U>,
}

/// The iterator behind [`LazySeq::scan`](crate::LazySeq::scan).
pub(crate) struct Scan<'a, T, S, U, F> {
    input: Items<'a, T>,
    /// The input after the one being stepped, to tell whether it is the last.
    lookahead: Option<Result<T>>,
    /// `None` once a step failed.
    state: Option<S>,
    step: F,
    out: Emitter<U>,
    /// Reported after all outputs emitted before it.
    failure: Option<Error>,
    finished: bool,
}

impl<U> Emitter<U> {
    fn new() -> Self {
        Emitter {
            ready: VecDeque::new(),
        }
    }

    /// Queue an output. Outputs leave the scan in emission order.
    pub fn emit(&mut self, value: U) {
        self.ready.push_back(value);
    }

    /// The number of outputs queued and not yet pulled.
    pub fn pending(&self) -> usize {
        self.ready.len()
    }
}

impl<'a, T, S, U, F> Scan<'a, T, S, U, F>
where
    F: FnMut(S, T, bool, &mut Emitter<U>) -> Result<S>,
{
    pub(crate) fn new(input: Items<'a, T>, init: S, step: F) -> Self {
        Scan {
            input,
            lookahead: None,
            state: Some(init),
            step,
            out: Emitter::new(),
            failure: None,
            finished: false,
        }
    }

    fn fail(&mut self, err: Error) {
        self.failure = Some(err);
        self.finished = true;
    }

    /// Feed the next input to the step function.
    fn feed(&mut self) {
        let current = match self.lookahead.take().or_else(|| self.input.next()) {
            Some(Ok(current)) => current,
            Some(Err(err)) => return self.fail(err),
            None => {
                self.finished = true;
                return;
            }
        };

        self.lookahead = self.input.next();
        let is_last = self.lookahead.is_none();

        let state = match self.state.take() {
            Some(state) => state,
            None => {
                self.finished = true;
                return;
            }
        };

        match (self.step)(state, current, is_last, &mut self.out) {
            Ok(state) => self.state = Some(state),
            Err(err) => self.fail(err),
        }
    }
}

impl<'a, T, S, U, F> Iterator for Scan<'a, T, S, U, F>
where
    F: FnMut(S, T, bool, &mut Emitter<U>) -> Result<S>,
{
    type Item = Result<U>;

    fn next(&mut self) -> Option<Result<U>> {
        loop {
            if let Some(value) = self.out.ready.pop_front() {
                return Some(Ok(value));
            }

            if let Some(err) = self.failure.take() {
                return Some(Err(err));
            }

            if self.finished {
                return None;
            }

            self.feed();
        }
    }
}
