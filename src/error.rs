//! Error types shared by the sequences, the dictionary and both coders.

use std::io;

use thiserror::Error;

use crate::Code;

/// Error variants for sequence and coding operations.
#[derive(Debug, Error)]
pub enum Error {
    /// An element was requested from a sequence that has no more elements.
    #[error("sequence exhausted")]
    Exhausted,

    /// Pulling from a resource backed sequence failed.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// Releasing the resource behind a sequence failed.
    #[error("failed to release sequence resource: {0}")]
    Release(#[source] io::Error),

    /// A lookup that the algorithm has proven to succeed did not.
    #[error("dictionary has no entry for {0}")]
    MissingEntry(String),

    /// The key of an insertion is already present.
    #[error("duplicate dictionary key")]
    DuplicateKey,

    /// The value of an insertion is already present.
    #[error("duplicate dictionary value")]
    DuplicateValue,

    /// A code that was neither assigned nor the next to be assigned.
    #[error("invalid code {0}")]
    InvalidCode(Code),

    /// A symbol outside of the seeded alphabet.
    #[error("symbol is not part of the alphabet")]
    UnknownSymbol,

    /// No more codes can be assigned.
    #[error("dictionary is full")]
    DictionaryFull,

    /// The Rice parameter does not fit a 64-bit code.
    #[error("invalid rice parameter: {0}")]
    InvalidParameter(u32),

    /// The input ended in the middle of a code.
    #[error("input ended inside a code")]
    Truncated,

    /// A decoded value does not fit in 64 bits.
    #[error("decoded value overflows")]
    Overflow,
}

/// A specialized Result type for sequence and coding operations.
pub type Result<T> = std::result::Result<T, Error>;
