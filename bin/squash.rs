#![forbid(unsafe_code)]
use std::cell::Cell;
use std::convert::TryFrom;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::{env, ffi, process};

use squash::source::{self, DEFAULT_BUFFER_SIZE};
use squash::{Coder, Error, LazySeq};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> CodingResult {
    init_logging();
    CodingResult::catch_panic(|| {
        let flags = Flags::from_args(env::args_os()).unwrap_or_else(|ParamError| explain());
        run_coding(flags)
    })
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run_coding(flags: Flags) -> Result<(), Error> {
    let operation = flags.operation.unwrap_or_else(explain);
    let pipeline = squash::standard(0..=u8::MAX, flags.rice_param)?;

    let out = io::stdout();
    let mut out = BufWriter::new(out.lock());

    let input = match flags.input {
        Input::File(path) => source::read_file_bytes(path, flags.buffer_size)?,
        Input::Stdin => source::bytes(io::stdin(), flags.buffer_size),
    };

    let consumed = Cell::new(0u64);
    let produced = Cell::new(0u64);

    match operation {
        Operation::Encode => {
            let bytes = input.inspect(|_| consumed.set(consumed.get() + 1));
            for bit in pipeline.encode(bytes) {
                out.write_all(if bit? { b"1" } else { b"0" })?;
                produced.set(produced.get() + 1);
            }
            out.write_all(b"\n")?;
        }
        Operation::Decode => {
            let bits = parse_bits(input).inspect(|_| consumed.set(consumed.get() + 1));
            for byte in pipeline.decode(bits) {
                out.write_all(&[byte?])?;
                produced.set(produced.get() + 1);
            }
        }
    }
    out.flush()?;

    if flags.stats {
        info!(
            operation = ?operation,
            k = pipeline.second().k(),
            consumed = consumed.get(),
            produced = produced.get(),
            "done"
        );
    }
    Ok(())
}

/// Bits written as ASCII `0` and `1`, ignoring whitespace.
fn parse_bits(text: LazySeq<'_, u8>) -> LazySeq<'_, bool> {
    text.filter(|byte| !byte.is_ascii_whitespace())
        .try_map(|byte| match byte {
            b'0' => Ok(false),
            b'1' => Ok(true),
            other => Err(Error::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("not a bit: {:?}", char::from(other)),
            ))),
        })
}

struct Flags {
    input: Input,
    operation: Option<Operation>,
    rice_param: u32,
    buffer_size: usize,
    stats: bool,
}

struct ParamError;

#[derive(Debug)]
enum Input {
    File(PathBuf),
    Stdin,
}

#[derive(Debug)]
enum Operation {
    Encode,
    Decode,
}

const USAGE: &str = "Usage: squash [-e|-d] [-k <param>] [-B <size>] [--stats] <file>\n\
    Arguments:\n\
    -e, --encode\t operation encode\n\
    -d, --decode\t operation decode\n\
    -k, --rice-param\t rice parameter 0..=63 (default 2)\n\
    -B, --buffer\t read buffer size in bytes (default 8192)\n\
    --stats\t log a summary of the run\n\
    <file>\tfilepath or '-' for stdin";

fn explain<T>() -> T {
    println!("{}", USAGE);
    process::exit(1);
}

impl Default for Flags {
    fn default() -> Flags {
        Flags {
            input: Input::Stdin,
            operation: None,
            rice_param: 2,
            buffer_size: DEFAULT_BUFFER_SIZE,
            stats: false,
        }
    }
}

fn command() -> clap::Command<'static> {
    clap::Command::new("squash")
        .version(env!("CARGO_PKG_VERSION"))
        .about("LZW and Golomb-Rice code bytes into a textual bit stream and back")
        .arg(
            clap::Arg::new("decode")
                .short('d')
                .long("decode")
                .takes_value(false),
        )
        .arg(
            clap::Arg::new("encode")
                .short('e')
                .long("encode")
                .takes_value(false),
        )
        .group(
            clap::ArgGroup::new("operation")
                .args(&["decode", "encode"])
                .multiple(false)
                .required(true),
        )
        .arg(
            clap::Arg::new("rice_param")
                .short('k')
                .long("rice-param")
                .takes_value(true)
                .value_parser(
                    clap::value_parser!(u32).range(0..=i64::from(squash::rice::MAX_PARAMETER)),
                ),
        )
        .arg(
            clap::Arg::new("buffer_size")
                .short('B')
                .long("buffer")
                .takes_value(true)
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(clap::Arg::new("stats").long("stats").takes_value(false))
        .arg(
            clap::Arg::new("file")
                .default_value("-")
                .value_parser(clap::builder::ValueParser::path_buf()),
        )
}

impl Flags {
    fn from_args(mut args: impl Iterator<Item = ffi::OsString>) -> Result<Self, ParamError> {
        let mut flags = Flags::default();
        let matches = command().get_matches_from(args.by_ref());

        if matches.contains_id("decode") {
            flags.operation = Some(Operation::Decode);
        } else if matches.contains_id("encode") {
            flags.operation = Some(Operation::Encode);
        }

        if let Some(&k) = matches.get_one::<u32>("rice_param") {
            flags.rice_param = k;
        }

        if let Some(&size) = matches.get_one::<u64>("buffer_size") {
            flags.buffer_size = usize::try_from(size).map_err(|_| ParamError)?;
        }

        flags.stats = matches.contains_id("stats");

        match matches.get_one::<PathBuf>("file") {
            None => flags.input = Input::Stdin,
            Some(p) if *p == PathBuf::from("-") => flags.input = Input::Stdin,
            Some(p) => flags.input = Input::File(p.clone()),
        }

        Ok(flags)
    }
}

enum CodingResult {
    Ok,
    Err(Error),
    Panic,
}

impl CodingResult {
    fn catch_panic(op: fn() -> Result<(), Error>) -> Self {
        std::panic::catch_unwind(|| match op() {
            Ok(()) => CodingResult::Ok,
            Err(err) => CodingResult::Err(err),
        })
        .unwrap_or(CodingResult::Panic)
    }
}

impl std::process::Termination for CodingResult {
    fn report(self) -> std::process::ExitCode {
        match self {
            CodingResult::Ok => std::process::ExitCode::SUCCESS,
            CodingResult::Err(err) => {
                eprintln!("{}", err);
                std::process::ExitCode::FAILURE
            }
            CodingResult::Panic => {
                eprintln!(
                    "The process failed irrecoverably! This should never happen and is a bug."
                );
                std::process::ExitCode::from(128)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{command, USAGE};

    #[test]
    fn usage_lists_every_option() {
        for arg in command().get_arguments() {
            if matches!(arg.get_id(), "help" | "version") {
                continue;
            }
            if let Some(long) = arg.get_long() {
                assert!(USAGE.contains(&format!("--{}", long)), "--{} missing", long);
            }
            if let Some(short) = arg.get_short() {
                assert!(USAGE.contains(&format!("-{}", short)), "-{} missing", short);
            }
        }
    }
}
