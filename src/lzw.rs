//! Dictionary coding over arbitrary symbols.
//!
//! Both directions work on the same [`Dictionary`] shape. Every entry maps a pair of an
//! extending symbol and the code of its prefix to a new code, where the prefix of a single
//! symbol is [`BOT`]. The encoder searches the forward direction, the decoder chases prefixes
//! in the backward direction. Codes are handed out densely in insertion order, so two
//! dictionaries seeded with the same alphabet stay in lockstep.
//!
//! ```
//! use squash::{lzw, LazySeq};
//!
//! let mut dict = lzw::dictionary(vec!['a', 'b']).unwrap();
//! let codes = lzw::encode(&mut dict, LazySeq::new("aababab".chars()));
//! assert_eq!(codes.to_vec().unwrap(), [0, 0, 1, 3, 3]);
//! assert_eq!(dict.size(), 6);
//! ```
use std::borrow::BorrowMut;
use std::convert::TryFrom;
use std::hash::Hash;

use tracing::{debug, trace};

use crate::coder::Coder;
use crate::dict::BidiDict;
use crate::error::{Error, Result};
use crate::seq::{Items, LazySeq};
use crate::{Code, BOT};

/// The dictionary used by both directions: `(symbol, prefix code) <-> code`.
pub type Dictionary<A> = BidiDict<(A, Code), Code>;

/// A dictionary with one entry per symbol, coded in the order given.
pub fn dictionary<A, I>(alphabet: I) -> Result<Dictionary<A>>
where
    A: Clone + Eq + Hash,
    I: IntoIterator<Item = A>,
{
    let alphabet = alphabet.into_iter();
    let mut dict = BidiDict::with_capacity(alphabet.size_hint().0);
    for symbol in alphabet {
        let code = next_code(&dict)?;
        dict.insert((symbol, BOT), code)?;
    }
    Ok(dict)
}

/// Encode `symbols`, adding one entry to `dict` for every code but the last.
pub fn encode<'a, A, D>(dict: D, symbols: LazySeq<'a, A>) -> LazySeq<'a, Code>
where
    A: Clone + Eq + Hash + 'a,
    D: BorrowMut<Dictionary<A>> + 'a,
{
    symbols.pipe(move |symbols| Encode {
        dict,
        symbols,
        seed: None,
        emitted: 0,
        done: false,
    })
}

/// Decode `codes`, adding one entry to `dict` for every code but the first.
pub fn decode<'a, A, D>(dict: D, codes: LazySeq<'a, Code>) -> LazySeq<'a, A>
where
    A: Clone + Eq + Hash + 'a,
    D: BorrowMut<Dictionary<A>> + 'a,
{
    codes.pipe(move |codes| Decode {
        dict,
        codes,
        prev: None,
        word: Vec::new(),
        done: false,
    })
}

/// An LZW coder over a fixed alphabet.
///
/// Every call starts from a fresh copy of the seeded dictionary.
#[derive(Clone, Debug)]
pub struct Lzw<A> {
    seed: Dictionary<A>,
}

struct Encode<'a, A, D> {
    dict: D,
    symbols: Items<'a, A>,
    /// The symbol that broke the last match and starts the next one.
    seed: Option<A>,
    emitted: u64,
    done: bool,
}

struct Decode<'a, A, D> {
    dict: D,
    codes: Items<'a, Code>,
    /// The first symbol of the previous word and its code.
    prev: Option<(A, Code)>,
    /// The current word, reversed.
    word: Vec<A>,
    done: bool,
}

/// The code the next entry of `dict` receives, which is its size as a [`Code`].
///
/// Fails with [`Error::DictionaryFull`] once only [`BOT`] would be left.
pub fn next_code<A>(dict: &Dictionary<A>) -> Result<Code>
where
    A: Clone + Eq + Hash,
{
    match Code::try_from(dict.size()) {
        Ok(code) if code != BOT => Ok(code),
        _ => Err(Error::DictionaryFull),
    }
}

impl<A: Clone + Eq + Hash> Lzw<A> {
    /// Fails if a symbol occurs twice.
    pub fn new<I>(alphabet: I) -> Result<Self>
    where
        I: IntoIterator<Item = A>,
    {
        Ok(Lzw {
            seed: dictionary(alphabet)?,
        })
    }

    /// The number of symbols in the alphabet.
    pub fn alphabet_size(&self) -> usize {
        self.seed.size()
    }

    /// A copy of the seeded dictionary.
    pub fn dictionary(&self) -> Dictionary<A> {
        self.seed.clone()
    }
}

impl<A: Clone + Eq + Hash> Coder<A, Code> for Lzw<A> {
    fn encode<'a>(&self, symbols: LazySeq<'a, A>) -> LazySeq<'a, Code>
    where
        A: 'a,
    {
        encode(self.dictionary(), symbols)
    }

    fn decode<'a>(&self, codes: LazySeq<'a, Code>) -> LazySeq<'a, A>
    where
        A: 'a,
    {
        decode(self.dictionary(), codes)
    }
}

impl<A, D> Encode<'_, A, D>
where
    A: Clone + Eq + Hash,
    D: BorrowMut<Dictionary<A>>,
{
    /// Match the longest known word and return its code, `None` at the end of input.
    fn round(&mut self) -> Result<Option<Code>> {
        let seed = match self.seed.take() {
            Some(symbol) => symbol,
            None => match self.symbols.next() {
                Some(symbol) => symbol?,
                None => return Ok(None),
            },
        };

        let dict = self.dict.borrow_mut();
        let mut code = dict
            .lookup_forward(&(seed, BOT))
            .copied()
            .ok_or(Error::UnknownSymbol)?;

        loop {
            let symbol = match self.symbols.next() {
                Some(symbol) => symbol?,
                None => {
                    self.done = true;
                    return Ok(Some(code));
                }
            };

            let key = (symbol, code);
            match dict.lookup_forward(&key).copied() {
                Some(longer) => code = longer,
                None => {
                    if !dict.contains_key(&(key.0.clone(), BOT)) {
                        return Err(Error::UnknownSymbol);
                    }
                    let new = next_code(dict)?;
                    trace!(code = new, prefix = code, "lzw encoder entry");
                    self.seed = Some(key.0.clone());
                    dict.insert(key, new)?;
                    return Ok(Some(code));
                }
            }
        }
    }
}

impl<A, D> Iterator for Encode<'_, A, D>
where
    A: Clone + Eq + Hash,
    D: BorrowMut<Dictionary<A>>,
{
    type Item = Result<Code>;

    fn next(&mut self) -> Option<Result<Code>> {
        if self.done {
            return None;
        }

        match self.round() {
            Ok(Some(code)) => {
                self.emitted += 1;
                if self.done {
                    debug!(
                        codes = self.emitted,
                        entries = self.dict.borrow_mut().size(),
                        "lzw encoding finished"
                    );
                }
                Some(Ok(code))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

impl<A, D> Decode<'_, A, D>
where
    A: Clone + Eq + Hash,
    D: BorrowMut<Dictionary<A>>,
{
    /// Resolve `code` into `self.word` and record the entry the encoder made alongside it.
    fn step(&mut self, code: Code) -> Result<()> {
        let dict = self.dict.borrow_mut();
        let prev = self.prev.take();
        let next = next_code(dict)?;

        let (mut symbol, mut prefix) = match dict.lookup_backward(&code) {
            Some(entry) => entry.clone(),
            // The encoder created this code right before emitting it, so it extends the
            // previous word by that word's first symbol.
            None => match &prev {
                Some((first, prev_code)) if code == next => (first.clone(), *prev_code),
                _ => return Err(Error::InvalidCode(code)),
            },
        };

        while prefix != BOT {
            self.word.push(symbol);
            let (earlier, link) = dict.lookup_backward_required(&prefix)?.clone();
            symbol = earlier;
            prefix = link;
        }
        self.word.push(symbol.clone());

        if let Some((_, prev_code)) = prev {
            trace!(code = next, prefix = prev_code, "lzw decoder entry");
            dict.insert((symbol.clone(), prev_code), next)?;
        }

        self.prev = Some((symbol, code));
        Ok(())
    }
}

impl<A, D> Iterator for Decode<'_, A, D>
where
    A: Clone + Eq + Hash,
    D: BorrowMut<Dictionary<A>>,
{
    type Item = Result<A>;

    fn next(&mut self) -> Option<Result<A>> {
        loop {
            if let Some(symbol) = self.word.pop() {
                return Some(Ok(symbol));
            }

            if self.done {
                return None;
            }

            let code = match self.codes.next() {
                Some(Ok(code)) => code,
                Some(Err(err)) => {
                    self.done = true;
                    return Some(Err(err));
                }
                None => {
                    self.done = true;
                    debug!(
                        entries = self.dict.borrow_mut().size(),
                        "lzw decoding finished"
                    );
                    return None;
                }
            };

            if let Err(err) = self.step(code) {
                self.done = true;
                self.word.clear();
                return Some(Err(err));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{decode, dictionary, encode, next_code, Lzw};
    use crate::error::Error;
    use crate::{Code, Coder, LazySeq, BOT};

    fn ab() -> super::Dictionary<char> {
        dictionary(vec!['a', 'b']).unwrap()
    }

    #[test]
    fn classic_growth() {
        let mut dict = ab();
        let codes = encode(&mut dict, LazySeq::new("aababab".chars()))
            .to_vec()
            .unwrap();
        assert_eq!(codes, [0, 0, 1, 3, 3]);

        assert_eq!(dict.size(), 2 + codes.len() - 1);
        assert_eq!(dict.lookup_forward(&('a', 0)), Some(&2));
        assert_eq!(dict.lookup_forward(&('b', 0)), Some(&3));
        assert_eq!(dict.lookup_forward(&('a', 1)), Some(&4));
        assert_eq!(dict.lookup_forward(&('a', 3)), Some(&5));
    }

    #[test]
    fn decode_mirrors_encoder_entries() {
        let mut encoded = ab();
        let codes = encode(&mut encoded, LazySeq::new("aababab".chars()))
            .to_vec()
            .unwrap();

        let mut decoded = ab();
        let text: String = decode(&mut decoded, LazySeq::new(codes))
            .to_vec()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(text, "aababab");

        for code in 0..next_code(&encoded).unwrap() {
            assert_eq!(encoded.lookup_backward(&code), decoded.lookup_backward(&code));
        }
    }

    #[test]
    fn code_used_right_after_creation() {
        // "aaa" emits 0 and then 2, which the decoder has not seen yet.
        let codes = encode(ab(), LazySeq::new("aaaaaa".chars())).to_vec().unwrap();
        assert_eq!(codes, [0, 2, 3]);

        let text: String = decode(ab(), LazySeq::new(codes))
            .to_vec()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(text, "aaaaaa");
    }

    #[test]
    fn empty_both_ways() {
        let mut dict = ab();
        assert!(encode(&mut dict, LazySeq::new("".chars())).to_vec().unwrap().is_empty());
        assert_eq!(dict.size(), 2);
        assert!(decode(&mut dict, LazySeq::<Code>::empty()).to_vec().unwrap().is_empty());
        assert_eq!(dict.size(), 2);
    }

    #[test]
    fn single_symbol() {
        let lzw = Lzw::new(vec!['a', 'b']).unwrap();
        let codes = lzw.encode(LazySeq::new(Some('b'))).to_vec().unwrap();
        assert_eq!(codes, [1]);
        assert_eq!(lzw.decode(LazySeq::new(codes)).to_vec().unwrap(), ['b']);
    }

    #[test]
    fn next_code_counts_entries() {
        let mut dict = ab();
        assert_eq!(next_code(&dict).unwrap(), 2);
        let codes = encode(&mut dict, LazySeq::new("abab".chars())).count_items().unwrap();
        assert_eq!(next_code(&dict).unwrap(), 2 + codes as Code - 1);
    }

    #[test]
    fn unknown_symbol() {
        let result = encode(ab(), LazySeq::new("abc".chars())).to_vec();
        assert!(matches!(result, Err(Error::UnknownSymbol)));

        let mut dict = ab();
        let mut codes = encode(&mut dict, LazySeq::new("abc".chars()));
        assert_eq!(codes.next().unwrap().unwrap(), 0);
        assert!(matches!(codes.next(), Some(Err(Error::UnknownSymbol))));
        assert!(codes.next().is_none());
        drop(codes);
        assert_eq!(dict.size(), 3);
        assert!(!dict.contains_key(&('c', 1)));
    }

    #[test]
    fn codes_from_the_future() {
        let result = decode(ab(), LazySeq::new(vec![0, 7])).to_vec();
        assert!(matches!(result, Err(Error::InvalidCode(7))));

        let result = decode(ab(), LazySeq::new(vec![2])).to_vec();
        assert!(matches!(result, Err(Error::InvalidCode(2))));

        let result = decode(ab(), LazySeq::new(vec![BOT])).to_vec();
        assert!(matches!(result, Err(Error::InvalidCode(BOT))));
    }

    #[test]
    fn duplicate_alphabet() {
        assert!(matches!(Lzw::new(vec![1, 2, 1]), Err(Error::DuplicateKey)));
    }

    #[test]
    fn lazy_on_infinite_input() {
        let codes = encode(ab(), LazySeq::new("ab".chars().cycle()))
            .take(8)
            .to_vec()
            .unwrap();
        assert_eq!(codes, [0, 1, 2, 4, 3, 6, 5, 8]);
    }
}
