#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustml_blockq4::*;

/// Deterministic 4-bit code source.
///
/// Steps by 5 modulo 16 and skips 3, 7 and 11, giving a 13-value cycle in
/// which neighbouring codes never repeat. Any 13 consecutive codes contain
/// both 0 and 15, so every block of at least 13 codes spans the full range.
#[derive(Debug, Clone)]
pub struct CodeCycle {
    next: u8,
}

impl CodeCycle {
    pub fn new(start: u8) -> Self {
        Self { next: start & 0x0F }
    }
}

impl Iterator for CodeCycle {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        let code = self.next;
        let mut n = (code + 5) % 16;
        if n == 11 || n == 7 || n == 3 {
            n = (n + 5) % 16;
        }
        self.next = n;
        Some(code)
    }
}

/// Shortest block the fixtures below can be reproduced exactly from.
pub const MIN_FIXTURE_BLOCK: usize = 13;

/// `(vectors, bytes per vector, blocks per vector, zero-point bytes per vector)`.
pub fn vector_layout(params: &QuantParams) -> (usize, usize, usize, usize) {
    let shape = params.shape();
    let (n_vec, bytes, blocks) = match params.axis {
        BlockAxis::Columnwise => (shape.packed_cols, shape.packed_rows, shape.meta_rows),
        BlockAxis::Rowwise => (shape.packed_rows, shape.packed_cols, shape.meta_cols),
    };
    (n_vec, bytes, blocks, blocks.div_ceil(2))
}

/// Block-major codes and metadata that survive dequantize then quantize
/// bit for bit: every block holds the full code range and scales are small
/// dyadic numbers so all products are exact.
pub fn block_major_fixture(params: QuantParams, mode: QuantMode, seed: u64) -> QuantizedMatrix<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut codes = CodeCycle::new(7);
    let sizes = params.buffer_sizes();
    let (n_vec, bytes_per_vec, blocks_per_vec, zp_bytes_per_vec) = vector_layout(&params);
    let vec_len = match params.axis {
        BlockAxis::Columnwise => params.rows,
        BlockAxis::Rowwise => params.columns,
    };

    let mut data = vec![0u8; sizes.data_bytes];
    for v in 0..n_vec {
        let run = &mut data[v * bytes_per_vec..(v + 1) * bytes_per_vec];
        for i in 0..vec_len {
            set_nibble(run, i, codes.next().unwrap());
        }
    }

    let scales: Vec<f32> = (0..sizes.scale_count)
        .map(|_| {
            let magnitude = rng.gen_range(1..=23) as f32 / (1 << rng.gen_range(0..4)) as f32;
            if mode.is_symmetric() && rng.gen_bool(0.5) { -magnitude } else { magnitude }
        })
        .collect();

    let zero_points = (!mode.is_symmetric()).then(|| {
        let mut zps = vec![0u8; sizes.zero_point_bytes];
        for v in 0..n_vec {
            let run = &mut zps[v * zp_bytes_per_vec..(v + 1) * zp_bytes_per_vec];
            for b in 0..blocks_per_vec {
                set_nibble(run, b, codes.next().unwrap());
            }
        }
        zps
    });

    QuantizedMatrix {
        data,
        scales,
        zero_points,
        params,
        order: PackedOrder::BlockMajor,
        encoding: CodeEncoding::block_major(mode),
    }
}

pub fn random_matrix(rows: usize, columns: usize, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..rows * columns).map(|_| rng.gen_range(-1.0f32..1.0)).collect()
}

/// Row-major transpose of a dense `rows x columns` matrix.
pub fn transpose_dense(src: &[f32], rows: usize, columns: usize) -> Vec<f32> {
    let mut out = vec![0.0f32; rows * columns];
    for r in 0..rows {
        for c in 0..columns {
            out[c * rows + r] = src[r * columns + c];
        }
    }
    out
}
