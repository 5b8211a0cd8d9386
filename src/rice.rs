//! Golomb-Rice coding of non-negative integers into bits.
//!
//! A value `x` is written as `x >> k` one bits, a zero bit, and then the low `k` bits of `x`
//! with the most significant bit first. Encoding is stateless per value. Decoding is a
//! [scan](crate::LazySeq::scan) over the bits that emits a value whenever a code completes.
use std::convert::TryFrom;

use tracing::debug;

use crate::coder::Coder;
use crate::error::{Error, Result};
use crate::scan::Emitter;
use crate::seq::LazySeq;

/// The largest Rice parameter, so that `2^k` fits a `u64`.
pub const MAX_PARAMETER: u32 = 63;

/// A Golomb-Rice coder with parameter `k` and divisor `m = 2^k`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GolombRice {
    k: u32,
    m: u64,
}

/// The bits of a single value, see [`GolombRice::encode_digit`].
#[derive(Clone, Debug)]
pub struct Bits {
    ones: u64,
    terminated: bool,
    value: u64,
    remaining: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Unary,
    Binary,
}

/// The state threaded through one decode.
#[derive(Clone, Copy, Debug)]
struct DecodeState {
    coder: GolombRice,
    phase: Phase,
    quotient: u64,
    remainder: u64,
    /// The weight of the previous remainder bit.
    weight: u64,
    /// Remainder bits still to come.
    remaining: u32,
}

impl GolombRice {
    pub fn new(k: u32) -> Result<Self> {
        let mut coder = GolombRice { k: 0, m: 1 };
        coder.retune(k)?;
        Ok(coder)
    }

    /// Change the parameter for subsequent calls.
    ///
    /// Sequences already returned by `encode` or `decode` keep the parameter they were
    /// created with.
    pub fn retune(&mut self, k: u32) -> Result<()> {
        if k > MAX_PARAMETER {
            return Err(Error::InvalidParameter(k));
        }
        self.k = k;
        self.m = 1 << k;
        debug!(k, m = self.m, "rice parameter set");
        Ok(())
    }

    pub fn k(&self) -> u32 {
        self.k
    }

    pub fn m(&self) -> u64 {
        self.m
    }

    /// The number of bits `encode_digit(x)` produces, `None` if that count exceeds `u64`.
    pub fn bit_len(&self, x: u64) -> Option<u64> {
        (x >> self.k).checked_add(1 + u64::from(self.k))
    }

    pub fn encode_digit(&self, x: u64) -> Bits {
        Bits {
            ones: x >> self.k,
            terminated: false,
            value: x & (self.m - 1),
            remaining: self.k,
        }
    }
}

impl Default for GolombRice {
    fn default() -> Self {
        GolombRice { k: 2, m: 4 }
    }
}

impl Coder<u64, bool> for GolombRice {
    fn encode<'a>(&self, values: LazySeq<'a, u64>) -> LazySeq<'a, bool>
    where
        u64: 'a,
        bool: 'a,
    {
        let coder = *self;
        values.flat_map(move |x| coder.encode_digit(x))
    }

    fn decode<'a>(&self, bits: LazySeq<'a, bool>) -> LazySeq<'a, u64>
    where
        u64: 'a,
        bool: 'a,
    {
        bits.scan(DecodeState::primed(*self), |state, bit, is_last, out| {
            state.step(bit, is_last, out)
        })
    }
}

impl Iterator for Bits {
    type Item = bool;

    fn next(&mut self) -> Option<bool> {
        if self.ones > 0 {
            self.ones -= 1;
            Some(true)
        } else if !self.terminated {
            self.terminated = true;
            Some(false)
        } else if self.remaining > 0 {
            self.remaining -= 1;
            Some((self.value >> self.remaining) & 1 == 1)
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let terminator = u64::from(!self.terminated);
        let len = self
            .ones
            .checked_add(terminator + u64::from(self.remaining))
            .and_then(|len| usize::try_from(len).ok());
        match len {
            Some(len) => (len, Some(len)),
            None => (usize::MAX, None),
        }
    }
}

impl DecodeState {
    fn primed(coder: GolombRice) -> Self {
        DecodeState {
            coder,
            phase: Phase::Unary,
            quotient: 0,
            remainder: 0,
            weight: coder.m,
            remaining: coder.k,
        }
    }

    fn step(mut self, bit: bool, is_last: bool, out: &mut Emitter<u64>) -> Result<Self> {
        match self.phase {
            Phase::Unary if bit => {
                self.quotient = self.quotient.checked_add(1).ok_or(Error::Overflow)?;
            }
            Phase::Unary if self.coder.k == 0 => self = self.finish(out)?,
            Phase::Unary => self.phase = Phase::Binary,
            Phase::Binary => {
                self.weight >>= 1;
                if bit {
                    self.remainder |= self.weight;
                }
                self.remaining -= 1;
                if self.remaining == 0 {
                    self = self.finish(out)?;
                }
            }
        }

        if is_last && !self.is_idle() {
            return Err(Error::Truncated);
        }
        Ok(self)
    }

    /// Emit the completed value and start over.
    fn finish(self, out: &mut Emitter<u64>) -> Result<Self> {
        let value = self
            .quotient
            .checked_mul(self.coder.m)
            .and_then(|high| high.checked_add(self.remainder))
            .ok_or(Error::Overflow)?;
        out.emit(value);
        Ok(Self::primed(self.coder))
    }

    /// Whether no code is in progress.
    fn is_idle(&self) -> bool {
        self.phase == Phase::Unary && self.quotient == 0
    }
}
