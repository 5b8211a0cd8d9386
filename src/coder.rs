//! The common shape of all coders and their composition.
use std::marker::PhantomData;

use crate::seq::LazySeq;

/// Turns a sequence of symbols into a sequence of units and back.
///
/// Implementations must round-trip: decoding the encoding of any sequence over the supported
/// alphabet yields that sequence again. Both directions are lazy, the work happens as the
/// returned sequence is pulled.
pub trait Coder<S, U> {
    fn encode<'a>(&self, symbols: LazySeq<'a, S>) -> LazySeq<'a, U>
    where
        S: 'a,
        U: 'a;

    fn decode<'a>(&self, units: LazySeq<'a, U>) -> LazySeq<'a, S>
    where
        S: 'a,
        U: 'a;

    /// Feed the units of this coder into `next`.
    fn then<C>(self, next: C) -> Pipeline<Self, C, U>
    where
        Self: Sized,
    {
        Pipeline {
            first: self,
            second: next,
            middle: PhantomData,
        }
    }
}

/// Two coders run back to back, see [`Coder::then`].
#[derive(Clone, Debug)]
pub struct Pipeline<A, B, M> {
    first: A,
    second: B,
    middle: PhantomData<fn() -> M>,
}

impl<A, B, M> Pipeline<A, B, M> {
    pub fn first(&self) -> &A {
        &self.first
    }

    pub fn second(&self) -> &B {
        &self.second
    }

    pub fn second_mut(&mut self) -> &mut B {
        &mut self.second
    }
}

impl<S, M, U, A, B> Coder<S, U> for Pipeline<A, B, M>
where
    M: 'static,
    A: Coder<S, M>,
    B: Coder<M, U>,
{
    fn encode<'a>(&self, symbols: LazySeq<'a, S>) -> LazySeq<'a, U>
    where
        S: 'a,
        U: 'a,
    {
        self.second.encode(self.first.encode(symbols))
    }

    fn decode<'a>(&self, units: LazySeq<'a, U>) -> LazySeq<'a, S>
    where
        S: 'a,
        U: 'a,
    {
        self.first.decode(self.second.decode(units))
    }
}
