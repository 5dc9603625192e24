//! Benchmarks for the item and bundle codecs.
//!
//! Run with: cargo bench -p databundle-testkit

use std::io::Cursor;

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use databundle_core::{
    decode_bundle, decode_item, deep_hash, encode_item, signing_message, Bundle, Chunk, DataSource,
    Tag,
};
use databundle_testkit::fixtures::{ed25519_signer, TestFixture};

const SIZES: [usize; 3] = [1024, 64 * 1024, 1024 * 1024];

fn bench_deep_hash(c: &mut Criterion) {
    let mut group = c.benchmark_group("deep_hash");

    for size in SIZES {
        let data = vec![0xabu8; size];
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("blob", size), &data, |b, data| {
            b.iter(|| black_box(deep_hash(Chunk::Blob(data)).unwrap()))
        });

        group.bench_with_input(BenchmarkId::new("stream", size), &data, |b, data| {
            let mut source = DataSource::from_reader(Cursor::new(data.clone()));
            b.iter(|| black_box(deep_hash(Chunk::Stream(&mut source)).unwrap()))
        });
    }

    group.finish();
}

fn bench_item_codec(c: &mut Criterion) {
    let fixture = TestFixture::new();
    let signer = ed25519_signer();
    let tags = vec![
        Tag::new("Content-Type", "application/octet-stream"),
        Tag::new("App-Name", "bench"),
    ];
    let mut group = c.benchmark_group("item");

    for size in SIZES {
        let mut item = fixture.make_item(&signer, &vec![0x11u8; size], tags.clone());
        let binary = item.binary.clone().unwrap_or_default();
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_function(BenchmarkId::new("signing_message", size), |b| {
            b.iter(|| black_box(signing_message(&mut item).unwrap()))
        });

        group.bench_function(BenchmarkId::new("encode", size), |b| {
            b.iter(|| black_box(encode_item(&mut item).unwrap()))
        });

        group.bench_with_input(BenchmarkId::new("decode", size), &binary, |b, binary| {
            b.iter(|| black_box(decode_item(binary.clone()).unwrap()))
        });
    }

    group.finish();
}

fn bench_bundle_decode(c: &mut Criterion) {
    let fixture = TestFixture::new();
    let signer = ed25519_signer();
    let mut group = c.benchmark_group("bundle_decode");

    for count in [1usize, 16, 128] {
        let items = (0..count)
            .map(|i| fixture.make_item(&signer, &i.to_le_bytes(), vec![]))
            .collect();
        let binary: Bytes = Bundle::new(items)
            .ok()
            .and_then(|b| b.binary_bytes().cloned())
            .unwrap_or_default();

        group.bench_with_input(BenchmarkId::from_parameter(count), &binary, |b, binary| {
            b.iter(|| black_box(decode_bundle(binary.clone()).unwrap()))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_deep_hash, bench_item_codec, bench_bundle_decode);
criterion_main!(benches);
