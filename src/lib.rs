//! # Lazy LZW and Golomb-Rice coding
//!
//! This crate provides an LZW coder over arbitrary symbols and a Golomb-Rice coder for
//! non-negative integers. Both read and produce [`LazySeq`]s, pull based sequences that
//! compute each element on demand and own the resources they read from. Coders can thus be
//! chained into pipelines, say symbols to LZW codes to Rice bits, without intermediate
//! buffers. Dropping or closing the end of such a pipeline releases the resource at its
//! beginning.
//!
//! The LZW dictionary is seeded by the caller with the alphabet. A symbol is coded with its
//! position in the alphabet, every longer word with the code of its prefix and the extending
//! symbol, where the prefix of a single symbol is [`BOT`].
//!
//! Exemplary use of a pipeline:
//!
//! ```
//! use squash::{Coder, GolombRice, LazySeq, Lzw};
//!
//! let lzw = Lzw::new(vec!['a', 'b']).unwrap();
//! let codes = lzw.encode(LazySeq::new("aababab".chars())).to_vec().unwrap();
//! assert_eq!(codes, [0, 0, 1, 3, 3]);
//!
//! let pipeline = lzw.then(GolombRice::new(1).unwrap());
//! let bits = pipeline.encode(LazySeq::new("aababab".chars())).to_vec().unwrap();
//! let text: String = pipeline
//!     .decode(LazySeq::new(bits))
//!     .to_vec()
//!     .unwrap()
//!     .into_iter()
//!     .collect();
//! assert_eq!(text, "aababab");
//! ```
#![forbid(unsafe_code)]
#![warn(clippy::all)]

/// Alias for a dictionary code.
pub type Code = u64;

/// The prefix code of single symbol words. Never assigned to an entry.
pub const BOT: Code = Code::MAX;

pub mod coder;
pub mod dict;
pub mod error;
pub mod lzw;
pub mod rice;
pub mod scan;
pub mod seq;
pub mod source;

use std::hash::Hash;

pub use coder::{Coder, Pipeline};
pub use dict::BidiDict;
pub use error::{Error, Result};
pub use lzw::Lzw;
pub use rice::GolombRice;
pub use scan::Emitter;
pub use seq::{LazySeq, OnRelease, Release};

/// LZW over `alphabet` followed by Golomb-Rice with parameter `k`.
pub fn standard<A, I>(alphabet: I, k: u32) -> Result<Pipeline<Lzw<A>, GolombRice, Code>>
where
    A: Clone + Eq + Hash,
    I: IntoIterator<Item = A>,
{
    Ok(Lzw::new(alphabet)?.then(GolombRice::new(k)?))
}
