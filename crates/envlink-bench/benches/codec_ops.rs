//! Criterion micro-benchmarks for tensor decoding, encoding, and bounds
//! validation.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use envlink_bench::{board_spec, random_board, uniform_board};
use envlink_codec::{decode, encode, encode_compressed, validate};

const ROWS: usize = 100;
const COLS: usize = 100;

/// Benchmark: Decode a dense 100x100 float board.
fn bench_decode_dense(c: &mut Criterion) {
    let spec = board_spec(ROWS, COLS);
    let tensor = random_board(ROWS, COLS, 42);

    c.bench_function("decode_dense_10k", |b| {
        b.iter(|| {
            let array = decode(black_box(&tensor), &spec).unwrap();
            black_box(array);
        });
    });
}

/// Benchmark: Decode a single-element payload broadcast over 10K cells.
fn bench_decode_broadcast(c: &mut Criterion) {
    let spec = board_spec(ROWS, COLS);
    let tensor = uniform_board(ROWS, COLS, 0.5);

    c.bench_function("decode_broadcast_10k", |b| {
        b.iter(|| {
            let array = decode(black_box(&tensor), &spec).unwrap();
            black_box(array);
        });
    });
}

/// Benchmark: Encode a decoded board back to the wire.
fn bench_encode_dense(c: &mut Criterion) {
    let spec = board_spec(ROWS, COLS);
    let array = decode(&random_board(ROWS, COLS, 42), &spec).unwrap();

    c.bench_function("encode_dense_10k", |b| {
        b.iter(|| {
            let tensor = encode(black_box(&array), &spec).unwrap();
            black_box(tensor);
        });
    });
}

/// Benchmark: Compressed encoding of a uniform board (collapses to one element).
fn bench_encode_compressed_uniform(c: &mut Criterion) {
    let spec = board_spec(ROWS, COLS);
    let array = decode(&uniform_board(ROWS, COLS, 0.0), &spec).unwrap();

    c.bench_function("encode_compressed_uniform_10k", |b| {
        b.iter(|| {
            let tensor = encode_compressed(black_box(&array), &spec).unwrap();
            black_box(tensor);
        });
    });
}

/// Benchmark: Bounds-check every cell of a dense board.
fn bench_validate_dense(c: &mut Criterion) {
    let spec = board_spec(ROWS, COLS);
    let array = decode(&random_board(ROWS, COLS, 42), &spec).unwrap();

    c.bench_function("validate_dense_10k", |b| {
        b.iter(|| {
            let violations = validate(black_box(&array), &spec).unwrap();
            black_box(violations);
        });
    });
}

criterion_group!(
    benches,
    bench_decode_dense,
    bench_decode_broadcast,
    bench_encode_dense,
    bench_encode_compressed_uniform,
    bench_validate_dense
);
criterion_main!(benches);
