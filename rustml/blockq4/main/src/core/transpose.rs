//! Layout transpose between the QDQ element-major form and the block-major
//! form, working only on packed codes and metadata.
//!
//! For columnwise blocks the QDQ form packs neighbouring columns of a row
//! into one byte, while the block-major form packs neighbouring rows of a
//! column. Converting between them reorders nibbles and metadata; with
//! `signed` codes the nibble is also moved between two's-complement and
//! +8 biased form. The result is bit-identical to dequantizing and
//! quantizing again in the target form.

use crate::api::error::QuantResult;
use crate::api::traits::QuantElement;
use crate::api::types::*;
use crate::core::nibble::{flip_sign_bias, nibble_at, pack, pack_flat_par, set_nibble};
use crate::core::runtime::min_items_per_task;
use crate::core::shape::VectorGeometry;
use crate::core::validate::{check_block_size, check_len, check_zero_points, require_columnwise};
use rayon::prelude::*;
use std::time::Instant;

#[inline(always)]
fn convert(nibble: u8, signed: bool) -> u8 {
    if signed { flip_sign_bias(nibble) } else { nibble }
}

/// Checks shared by both directions; returns whether zero points are carried.
fn check_pair(
    op: &'static str,
    qdq: (usize, usize, Option<usize>),
    block_major: (usize, usize, Option<usize>),
    signed: bool,
    params: &QuantParams,
) -> QuantResult<bool> {
    require_columnwise(op, params.axis)?;
    check_block_size(params.block_size)?;

    let qdq_sizes = params.qdq_buffer_sizes();
    let bm_sizes = params.buffer_sizes();
    check_len("qdq data", qdq_sizes.data_bytes, qdq.0)?;
    check_len("qdq scales", qdq_sizes.scale_count, qdq.1)?;
    check_len("block-major data", bm_sizes.data_bytes, block_major.0)?;
    check_len("block-major scales", bm_sizes.scale_count, block_major.1)?;

    // Signed codes are symmetric; unsigned codes carry zero points on both
    // sides or on neither.
    let with_zp = !signed && qdq.2.is_some();
    check_zero_points(op, qdq.2, with_zp, qdq_sizes.zero_point_bytes)?;
    check_zero_points(op, block_major.2, with_zp, bm_sizes.zero_point_bytes)?;
    Ok(with_zp)
}

/// Convert QDQ element-major codes and metadata into the block-major form.
///
/// `signed` selects the source code interpretation: `true` for the
/// two's-complement codes of symmetric QDQ output (written out biased by 8,
/// no zero points), `false` for unsigned codes whose zero points, when
/// present, are reordered alongside. Only columnwise blocks are supported.
pub fn transpose_qdq_to_block_major<T: QuantElement>(
    src: PackedRef<'_, T>,
    dst: PackedMut<'_, T>,
    signed: bool,
    params: &QuantParams,
) -> QuantResult<()> {
    let _t = if log::log_enabled!(log::Level::Trace) { Some(Instant::now()) } else { None };
    check_pair(
        "transpose_qdq_to_block_major",
        (src.data.len(), src.scales.len(), src.zero_points.map(|z| z.len())),
        (dst.data.len(), dst.scales.len(), dst.zero_points.as_ref().map(|z| z.len())),
        signed,
        params,
    )?;
    if params.numel() == 0 {
        return Ok(());
    }

    let (rows, columns) = (params.rows, params.columns);
    let geom = VectorGeometry::new(params);
    let min_len = min_items_per_task(rows);

    dst.data
        .par_chunks_mut(geom.bytes_per_vec)
        .zip(dst.scales.par_chunks_mut(geom.blocks_per_vec))
        .with_min_len(min_len)
        .enumerate()
        .for_each(|(c, (codes, scales))| {
            for (k, byte) in codes.iter_mut().enumerate() {
                let r = 2 * k;
                let lo = convert(nibble_at(src.data, r * columns + c), signed);
                let hi = if r + 1 < rows {
                    convert(nibble_at(src.data, (r + 1) * columns + c), signed)
                } else {
                    0
                };
                *byte = pack(lo, hi);
            }
            for (b, scale) in scales.iter_mut().enumerate() {
                *scale = src.scales[b * columns + c];
            }
        });

    if let (Some(src_zps), Some(dst_zps)) = (src.zero_points, dst.zero_points) {
        dst_zps
            .par_chunks_mut(geom.zp_bytes_per_vec)
            .enumerate()
            .for_each(|(c, zps)| {
                zps.fill(0);
                for b in 0..geom.blocks_per_vec {
                    set_nibble(zps, b, nibble_at(src_zps, b * columns + c));
                }
            });
    }

    if let Some(t) = _t {
        log::trace!("[perf] blockq4::transpose_qdq_to_block_major [{}x{}] block={} signed={} {:.3}ms",
            rows, columns, params.block_size, signed, t.elapsed().as_secs_f64() * 1000.0);
    }
    Ok(())
}

/// Convert columnwise block-major codes and metadata into the QDQ form.
///
/// Inverse of [`transpose_qdq_to_block_major`]: with `signed` the +8 biased
/// symmetric codes are rewritten as two's-complement nibbles.
pub fn transpose_block_major_to_qdq<T: QuantElement>(
    src: PackedRef<'_, T>,
    dst: PackedMut<'_, T>,
    signed: bool,
    params: &QuantParams,
) -> QuantResult<()> {
    let _t = if log::log_enabled!(log::Level::Trace) { Some(Instant::now()) } else { None };
    check_pair(
        "transpose_block_major_to_qdq",
        (dst.data.len(), dst.scales.len(), dst.zero_points.as_ref().map(|z| z.len())),
        (src.data.len(), src.scales.len(), src.zero_points.map(|z| z.len())),
        signed,
        params,
    )?;
    if params.numel() == 0 {
        return Ok(());
    }

    let (rows, columns) = (params.rows, params.columns);
    let geom = VectorGeometry::new(params);
    let numel = params.numel();
    let code_at = |flat: usize| {
        let (r, c) = (flat / columns, flat % columns);
        convert(nibble_at(&src.data[c * geom.bytes_per_vec..], r), signed)
    };

    pack_flat_par(dst.data, numel, code_at);

    dst.scales
        .par_chunks_mut(columns)
        .enumerate()
        .for_each(|(b, scales)| {
            for (c, scale) in scales.iter_mut().enumerate() {
                *scale = src.scales[c * geom.blocks_per_vec + b];
            }
        });

    if let (Some(src_zps), Some(dst_zps)) = (src.zero_points, dst.zero_points) {
        let meta_count = geom.blocks_per_vec * columns;
        let zp_at = |flat: usize| {
            let (b, c) = (flat / columns, flat % columns);
            nibble_at(&src_zps[c * geom.zp_bytes_per_vec..], b)
        };
        pack_flat_par(dst_zps, meta_count, zp_at);
    }

    if let Some(t) = _t {
        log::trace!("[perf] blockq4::transpose_block_major_to_qdq [{}x{}] block={} signed={} {:.3}ms",
            rows, columns, params.block_size, signed, t.elapsed().as_secs_f64() * 1000.0);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::nibble::{nibble_from_signed, unpack};

    #[test]
    fn test_signed_qdq_to_block_major() {
        // 3 rows x 2 columns, row-major signed codes:
        //   [-8,  1]
        //   [ 7, -1]
        //   [ 0, -3]
        let codes = [-8i8, 1, 7, -1, 0, -3];
        let mut qdq = vec![0u8; 3];
        for (i, &q) in codes.iter().enumerate() {
            set_nibble(&mut qdq, i, nibble_from_signed(q));
        }
        let scales = [2.0f32, 3.0];
        let params = QuantParams::columnwise(3, 2, 4);
        let src = PackedRef { data: &qdq, scales: &scales, zero_points: None };

        let mut data = vec![0u8; 4];
        let mut out_scales = vec![0.0f32; 2];
        let dst = PackedMut { data: &mut data, scales: &mut out_scales, zero_points: None };
        transpose_qdq_to_block_major(src, dst, true, &params).unwrap();

        // Column 0: 0, 15, 8; column 1: 9, 7, 5 (biased by 8).
        assert_eq!(unpack(data[0]), (0, 15));
        assert_eq!(unpack(data[1]), (8, 0));
        assert_eq!(unpack(data[2]), (9, 7));
        assert_eq!(unpack(data[3]), (5, 0));
        assert_eq!(out_scales, vec![2.0, 3.0]);
    }

    #[test]
    fn test_unsigned_round_trip_through_both_directions() {
        // 5 rows x 3 columns, block 2: 3 metadata rows.
        let params = QuantParams::columnwise(5, 3, 2);
        let qdq_sizes = params.qdq_buffer_sizes();
        let qdq: Vec<u8> = (0..qdq_sizes.data_bytes as u8).map(|i| i.wrapping_mul(37)).collect();
        let scales: Vec<f32> = (0..qdq_sizes.scale_count).map(|i| i as f32 + 0.5).collect();
        let mut zps: Vec<u8> = (0..qdq_sizes.zero_point_bytes as u8).map(|i| i.wrapping_mul(91)).collect();
        // 9 zero points: the last byte's high nibble is padding.
        *zps.last_mut().unwrap() &= 0x0F;
        let mut qdq = qdq;
        *qdq.last_mut().unwrap() &= 0x0F;

        let bm_sizes = params.buffer_sizes();
        let mut bm_data = vec![0u8; bm_sizes.data_bytes];
        let mut bm_scales = vec![0.0f32; bm_sizes.scale_count];
        let mut bm_zps = vec![0u8; bm_sizes.zero_point_bytes];
        transpose_qdq_to_block_major(
            PackedRef { data: &qdq, scales: &scales, zero_points: Some(&zps) },
            PackedMut { data: &mut bm_data, scales: &mut bm_scales, zero_points: Some(&mut bm_zps) },
            false,
            &params,
        )
        .unwrap();

        // Block-major column 1, row 3 is QDQ flat index 3 * 3 + 1.
        assert_eq!(nibble_at(&bm_data[3..], 3), nibble_at(&qdq, 10));
        assert_eq!(bm_scales[2 * 3 + 1], scales[3 + 2]);

        let mut back_data = vec![0u8; qdq_sizes.data_bytes];
        let mut back_scales = vec![0.0f32; qdq_sizes.scale_count];
        let mut back_zps = vec![0u8; qdq_sizes.zero_point_bytes];
        transpose_block_major_to_qdq(
            PackedRef { data: &bm_data, scales: &bm_scales, zero_points: Some(&bm_zps) },
            PackedMut { data: &mut back_data, scales: &mut back_scales, zero_points: Some(&mut back_zps) },
            false,
            &params,
        )
        .unwrap();

        assert_eq!(back_data, qdq);
        assert_eq!(back_scales, scales);
        assert_eq!(back_zps, zps);
    }

    #[test]
    fn test_signed_requires_no_zero_points() {
        let params = QuantParams::columnwise(2, 2, 2);
        let zps = [0u8];
        let src = PackedRef { data: &[0u8; 2], scales: &[1.0f32; 2], zero_points: Some(&zps[..]) };
        let mut data = [0u8; 2];
        let mut scales = [0.0f32; 2];
        let dst = PackedMut { data: &mut data, scales: &mut scales, zero_points: None };
        assert!(transpose_qdq_to_block_major(src, dst, true, &params).is_err());
    }

    #[test]
    fn test_rowwise_rejected() {
        let params = QuantParams::rowwise(2, 2, 2);
        let src = PackedRef { data: &[0u8; 2], scales: &[1.0f32; 2], zero_points: None };
        let mut data = [0u8; 2];
        let mut scales = [0.0f32; 2];
        let dst = PackedMut { data: &mut data, scales: &mut scales, zero_points: None };
        assert!(transpose_qdq_to_block_major(src, dst, true, &params).is_err());
    }
}
