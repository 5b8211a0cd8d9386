//! Lazy sequences read from files and other readers.
//!
//! The reader is owned by the returned sequence and released with it, whether the sequence
//! is read to the end, fails, or is dropped early.
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use std::str;

use tracing::debug;

use crate::error::Result;
use crate::seq::{LazySeq, Release};

/// The buffer size used when none is configured.
pub const DEFAULT_BUFFER_SIZE: usize = 8 * 1024;

/// A buffered reader owned by a sequence.
struct Handle<R> {
    reader: BufReader<R>,
    name: String,
}

impl<R> Release for Handle<R> {
    fn release(&mut self) -> io::Result<()> {
        debug!(source = %self.name, "releasing reader");
        Ok(())
    }
}

/// The bytes of `reader`.
pub fn bytes<'a, R: Read + 'a>(reader: R, buffer_size: usize) -> LazySeq<'a, u8> {
    named_bytes(reader, buffer_size, "reader".to_string())
}

/// The characters of `reader`, which must contain UTF-8.
pub fn chars<'a, R: Read + 'a>(reader: R, buffer_size: usize) -> LazySeq<'a, char> {
    named_chars(reader, buffer_size, "reader".to_string())
}

/// The bytes of the file at `path`.
pub fn read_file_bytes(path: impl AsRef<Path>, buffer_size: usize) -> Result<LazySeq<'static, u8>> {
    let (file, name) = open(path.as_ref())?;
    Ok(named_bytes(file, buffer_size, name))
}

/// The characters of the UTF-8 file at `path`.
pub fn read_file_chars(
    path: impl AsRef<Path>,
    buffer_size: usize,
) -> Result<LazySeq<'static, char>> {
    let (file, name) = open(path.as_ref())?;
    Ok(named_chars(file, buffer_size, name))
}

fn open(path: &Path) -> Result<(File, String)> {
    let file = File::open(path)?;
    let name = path.display().to_string();
    debug!(source = %name, "opened file");
    Ok((file, name))
}

fn named_bytes<'a, R: Read + 'a>(reader: R, buffer_size: usize, name: String) -> LazySeq<'a, u8> {
    let handle = Handle {
        reader: BufReader::with_capacity(buffer_size.max(1), reader),
        name,
    };
    LazySeq::from_resource(handle, |handle| next_byte(&mut handle.reader))
}

fn named_chars<'a, R: Read + 'a>(
    reader: R,
    buffer_size: usize,
    name: String,
) -> LazySeq<'a, char> {
    let handle = Handle {
        reader: BufReader::with_capacity(buffer_size.max(4), reader),
        name,
    };
    LazySeq::from_resource(handle, |handle| next_char(&mut handle.reader))
}

fn next_byte(reader: &mut impl BufRead) -> Option<io::Result<u8>> {
    loop {
        match reader.fill_buf() {
            Ok([]) => return None,
            Ok(buf) => {
                let byte = buf[0];
                reader.consume(1);
                return Some(Ok(byte));
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Some(Err(err)),
        }
    }
}

fn next_char(reader: &mut impl BufRead) -> Option<io::Result<char>> {
    let lead = match next_byte(reader)? {
        Ok(lead) => lead,
        Err(err) => return Some(Err(err)),
    };

    let width = match lead {
        0x00..=0x7f => 1,
        0xc2..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf4 => 4,
        _ => return Some(Err(invalid_utf8())),
    };

    let mut encoded = [lead, 0, 0, 0];
    for slot in encoded[1..width].iter_mut() {
        *slot = match next_byte(reader) {
            Some(Ok(byte)) => byte,
            Some(Err(err)) => return Some(Err(err)),
            None => return Some(Err(invalid_utf8())),
        };
    }

    let decoded = str::from_utf8(&encoded[..width])
        .ok()
        .and_then(|text| text.chars().next())
        .ok_or_else(invalid_utf8);
    Some(decoded)
}

fn invalid_utf8() -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, "stream did not contain valid UTF-8")
}

#[cfg(test)]
mod tests {
    use super::{bytes, chars};
    use crate::error::Error;
    use std::io::{self, Read};

    /// Hands out one byte per read to cross every buffer boundary.
    struct Trickle<'a>(&'a [u8]);

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.split_first() {
                Some((&first, rest)) if !buf.is_empty() => {
                    buf[0] = first;
                    self.0 = rest;
                    Ok(1)
                }
                _ => Ok(0),
            }
        }
    }

    #[test]
    fn multibyte_chars() {
        let text = "zürich → 東京 🚲";
        let read: String = chars(Trickle(text.as_bytes()), 1)
            .to_vec()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(read, text);
    }

    #[test]
    fn invalid_utf8_fails() {
        let result = chars(&b"ok\xff"[..], 16).to_vec();
        match result {
            Err(Error::Io(err)) => assert_eq!(err.kind(), io::ErrorKind::InvalidData),
            other => panic!("unexpected {:?}", other),
        }

        let result = chars(&b"\xe6\x9d"[..], 16).to_vec();
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn all_bytes() {
        let data: Vec<u8> = (0..=255).collect();
        assert_eq!(bytes(&data[..], 7).to_vec().unwrap(), data);
    }
}
