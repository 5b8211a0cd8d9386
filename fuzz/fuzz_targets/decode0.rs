#![no_main]
use libfuzzer_sys::fuzz_target;
use squash::{Coder, LazySeq};

// Arbitrary bits must decode or fail, never panic or loop.
fuzz_target!(|raw_data: &[u8]| {
    let pipeline = squash::standard(0..4u8, 1).unwrap();
    let bits = raw_data.iter().map(|&byte| byte & 1 == 1);
    let _ = pipeline.decode(LazySeq::new(bits)).take(1 << 16).count_items();
});
