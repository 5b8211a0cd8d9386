#![no_main]
use libfuzzer_sys::fuzz_target;
use squash::{Coder, LazySeq};

fuzz_target!(|input: (u8, &[u8])| {
    let (k, data) = input;
    let pipeline = squash::standard(0..=u8::MAX, u32::from(k % 16)).unwrap();

    let bits = pipeline.encode(LazySeq::new(data.iter().copied()));
    let decoded = pipeline.decode(bits).to_vec().unwrap();
    assert_eq!(decoded, data);
});
