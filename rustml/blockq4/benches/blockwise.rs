use criterion::{Criterion, criterion_group, criterion_main, black_box};
use rustml_blockq4::{BlockAxis, QuantMode, QuantParams, QuantizedMatrix};

fn make_weights(rows: usize, columns: usize) -> Vec<f32> {
    (0..rows * columns).map(|i| (i as f32 * 0.013).sin()).collect()
}

fn bench_quantize(c: &mut Criterion) {
    let mut group = c.benchmark_group("quantize_blockwise");
    let weights = make_weights(1024, 1024);
    for axis in [BlockAxis::Columnwise, BlockAxis::Rowwise] {
        for mode in [QuantMode::Asymmetric, QuantMode::Symmetric] {
            let params = QuantParams::new(1024, 1024, 32, axis);
            group.bench_function(format!("{}_{:?}_1024x1024_b32", axis, mode), |b| {
                b.iter(|| QuantizedMatrix::quantize(black_box(&weights), 1024, params, mode))
            });
        }
    }
    group.finish();
}

fn bench_dequantize(c: &mut Criterion) {
    let mut group = c.benchmark_group("dequantize");
    let weights = make_weights(1024, 1024);
    let params = QuantParams::columnwise(1024, 1024, 32);
    let block_major = QuantizedMatrix::quantize(&weights, 1024, params, QuantMode::Asymmetric).unwrap();
    let element_major = QuantizedMatrix::quantize_qdq(&weights, 1024, params, QuantMode::Asymmetric).unwrap();
    let mut out = vec![0.0f32; 1024 * 1024];

    group.bench_function("block_major_1024x1024_b32", |b| {
        b.iter(|| block_major.dequantize_into(black_box(&mut out), 1024))
    });
    group.bench_function("element_major_1024x1024_b32", |b| {
        b.iter(|| element_major.dequantize_into(black_box(&mut out), 1024))
    });
    group.finish();
}

fn bench_qdq_and_transpose(c: &mut Criterion) {
    let weights = make_weights(1024, 1024);
    let params = QuantParams::columnwise(1024, 1024, 32);
    c.bench_function("quantize_qdq_1024x1024_b32", |b| {
        b.iter(|| QuantizedMatrix::quantize_qdq(black_box(&weights), 1024, params, QuantMode::Symmetric))
    });

    let qdq = QuantizedMatrix::quantize_qdq(&weights, 1024, params, QuantMode::Symmetric).unwrap();
    c.bench_function("transpose_qdq_1024x1024_b32", |b| {
        b.iter(|| black_box(&qdq).to_block_major())
    });
}

criterion_group!(benches, bench_quantize, bench_dequantize, bench_qdq_and_transpose);
criterion_main!(benches);
