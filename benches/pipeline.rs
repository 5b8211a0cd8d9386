extern crate criterion;
extern crate squash;

use std::fs;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use squash::{Coder, GolombRice, LazySeq, Lzw};

pub fn bench_lzw(c: &mut Criterion, file: &str) {
    let data = fs::read(file).expect("Benchmark input not found");
    let lzw = Lzw::new(0..=u8::MAX).unwrap();
    let codes = lzw
        .encode(LazySeq::new(data.iter().copied()))
        .to_vec()
        .unwrap();

    let mut group = c.benchmark_group("lzw");
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.bench_with_input(BenchmarkId::new("encode", file), &data, |b, data| {
        b.iter(|| {
            let codes = lzw.encode(LazySeq::new(data.iter().copied()));
            black_box(codes.count_items().unwrap())
        })
    });
    group.bench_with_input(BenchmarkId::new("decode", file), &codes, |b, codes| {
        b.iter(|| {
            let symbols = lzw.decode(LazySeq::new(codes.iter().copied()));
            black_box(symbols.count_items().unwrap())
        })
    });
    group.finish();
}

pub fn bench_rice(c: &mut Criterion) {
    // Small values dominate, as they do behind an LZW stage.
    let values: Vec<u64> = (0..1u64 << 14).map(|x| (x * 2_654_435_761) % 97).collect();

    let mut group = c.benchmark_group("rice");
    group.throughput(Throughput::Elements(values.len() as u64));
    for k in [0u32, 2, 5] {
        let rice = GolombRice::new(k).unwrap();
        let bits = rice
            .encode(LazySeq::new(values.iter().copied()))
            .to_vec()
            .unwrap();
        group.bench_with_input(BenchmarkId::new("encode", k), &values, |b, values| {
            b.iter(|| {
                let bits = rice.encode(LazySeq::new(values.iter().copied()));
                black_box(bits.count_items().unwrap())
            })
        });
        group.bench_with_input(BenchmarkId::new("decode", k), &bits, |b, bits| {
            b.iter(|| {
                let values = rice.decode(LazySeq::new(bits.iter().copied()));
                black_box(values.count_items().unwrap())
            })
        });
    }
    group.finish();
}

pub fn bench_toml(c: &mut Criterion) {
    bench_lzw(c, "Cargo.toml");
}

pub fn bench_lib(c: &mut Criterion) {
    bench_lzw(c, "src/lzw.rs");
}

criterion_group!(benches, bench_toml, bench_lib, bench_rice);
criterion_main!(benches);
