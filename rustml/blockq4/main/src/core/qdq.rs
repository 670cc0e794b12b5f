//! QDQ quantize kernel.
//!
//! Produces the element-major form consumed by QuantizeLinear /
//! DequantizeLinear style graphs: codes follow the row-major order of the
//! dense matrix, scales are a dense `[meta_rows, columns]` array and
//! asymmetric zero points are packed two per byte over that same array.
//! Symmetric codes are stored as two's-complement nibbles.

use crate::api::error::QuantResult;
use crate::api::traits::QuantElement;
use crate::api::types::*;
use crate::core::nibble::{nibble_from_signed, pack_flat_par};
use crate::core::quantize::{quantize_signed, quantize_unsigned, range_to_scale, range_to_scale_zp, reciprocal};
use crate::core::runtime::min_items_per_task;
use crate::core::validate::{check_block_size, check_dense, check_len, check_zero_points, require_columnwise};
use rayon::prelude::*;
use std::time::Instant;

/// Quantize a row-major dense matrix into the QDQ element-major form.
///
/// Only columnwise blocks are supported. `dst.zero_points` must be `Some`
/// exactly for asymmetric mode, sized per
/// [`qdq_buffer_sizes`](crate::qdq_buffer_sizes).
///
/// Returns `true` when the codes are signed, which happens exactly for
/// symmetric mode; downstream dequantize and transpose calls select their
/// interpretation from it.
pub fn quantize_qdq<T: QuantElement>(
    src: &[T],
    ld: usize,
    dst: PackedMut<'_, T>,
    mode: QuantMode,
    params: &QuantParams,
) -> QuantResult<bool> {
    let _t = if log::log_enabled!(log::Level::Trace) { Some(Instant::now()) } else { None };
    require_columnwise("quantize_qdq", params.axis)?;
    check_block_size(params.block_size)?;
    check_dense("dense source", src.len(), params, ld)?;

    let sizes = params.qdq_buffer_sizes();
    check_len("packed data", sizes.data_bytes, dst.data.len())?;
    check_len("scales", sizes.scale_count, dst.scales.len())?;
    check_zero_points(
        "quantize_qdq",
        dst.zero_points.as_ref().map(|z| z.len()),
        !mode.is_symmetric(),
        sizes.zero_point_bytes,
    )?;

    let signed = mode.is_symmetric();
    if params.numel() == 0 {
        return Ok(signed);
    }

    let (rows, columns, block_size) = (params.rows, params.columns, params.block_size);
    let value = |r: usize, c: usize| src[r * ld + c].to_f32();

    // Block parameters, one metadata row per block of rows.
    let mut zp_codes = vec![0u8; sizes.scale_count];
    let block_rows = min_items_per_task(block_size * columns);
    dst.scales
        .par_chunks_mut(columns)
        .zip(zp_codes.par_chunks_mut(columns))
        .with_min_len(block_rows)
        .enumerate()
        .for_each(|(b, (scales, zps))| {
            let start = b * block_size;
            let end = (start + block_size).min(rows);
            let mut mins = vec![f32::MAX; columns];
            let mut maxs = vec![f32::MIN; columns];
            for r in start..end {
                for c in 0..columns {
                    let v = value(r, c);
                    mins[c] = mins[c].min(v);
                    maxs[c] = maxs[c].max(v);
                }
            }
            for c in 0..columns {
                if signed {
                    scales[c] = T::from_f32(range_to_scale(mins[c], maxs[c]));
                } else {
                    let (scale, zp) = range_to_scale_zp(mins[c], maxs[c]);
                    scales[c] = T::from_f32(scale);
                    zps[c] = zp;
                }
            }
        });

    // Codes are derived from the stored, element-rounded scales.
    let scales: &[T] = dst.scales;
    let numel = params.numel();
    let code_at = |flat: usize| -> u8 {
        let (r, c) = (flat / columns, flat % columns);
        let meta = (r / block_size) * columns + c;
        let rs = reciprocal(scales[meta].to_f32());
        if signed {
            nibble_from_signed(quantize_signed(value(r, c), rs))
        } else {
            quantize_unsigned(value(r, c), rs, zp_codes[meta])
        }
    };

    pack_flat_par(dst.data, numel, code_at);
    if let Some(zero_points) = dst.zero_points {
        pack_flat_par(zero_points, zp_codes.len(), |k| zp_codes[k]);
    }

    if let Some(t) = _t {
        log::trace!("[perf] blockq4::quantize_qdq [{}x{}] block={} {:?} {:.3}ms",
            rows, columns, block_size, mode, t.elapsed().as_secs_f64() * 1000.0);
    }
    Ok(signed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::nibble::{nibble_at, signed_from_nibble, unpack};

    #[test]
    fn test_signed_flag_follows_mode() {
        let src: Vec<f32> = (0..12).map(|i| i as f32 - 6.0).collect();
        let params = QuantParams::columnwise(4, 3, 2);
        let sizes = params.qdq_buffer_sizes();

        let mut data = vec![0u8; sizes.data_bytes];
        let mut scales = vec![0.0f32; sizes.scale_count];
        let dst = PackedMut { data: &mut data, scales: &mut scales, zero_points: None };
        assert!(quantize_qdq(&src, 3, dst, QuantMode::Symmetric, &params).unwrap());

        let mut zps = vec![0u8; sizes.zero_point_bytes];
        let dst = PackedMut { data: &mut data, scales: &mut scales, zero_points: Some(&mut zps) };
        assert!(!quantize_qdq(&src, 3, dst, QuantMode::Asymmetric, &params).unwrap());
    }

    #[test]
    fn test_signed_codes_row_major() {
        // 2 rows x 2 columns, one block: column 0 spans [-8, 4], column 1 [2, 6].
        let src = [-8.0f32, 2.0, 4.0, 6.0];
        let params = QuantParams::columnwise(2, 2, 2);
        let mut data = vec![0u8; 2];
        let mut scales = vec![0.0f32; 2];
        let dst = PackedMut { data: &mut data, scales: &mut scales, zero_points: None };
        quantize_qdq(&src, 2, dst, QuantMode::Symmetric, &params).unwrap();

        assert_eq!(scales, vec![1.0, -0.75]);
        let codes: Vec<i8> = (0..4).map(|i| signed_from_nibble(nibble_at(&data, i))).collect();
        assert_eq!(codes, vec![-8, -3, 4, -8]);
    }

    #[test]
    fn test_zero_points_row_major_packed() {
        // 1 row x 3 columns, block 4: three zero points packed into two bytes.
        let src = [-15.0f32, 0.0, 15.0];
        let params = QuantParams::columnwise(1, 3, 4);
        let sizes = params.qdq_buffer_sizes();
        let mut data = vec![0u8; sizes.data_bytes];
        let mut scales = vec![0.0f32; sizes.scale_count];
        let mut zps = vec![0xFFu8; sizes.zero_point_bytes];
        let dst = PackedMut { data: &mut data, scales: &mut scales, zero_points: Some(&mut zps) };
        quantize_qdq(&src, 3, dst, QuantMode::Asymmetric, &params).unwrap();

        assert_eq!(scales, vec![1.0, 0.0, 1.0]);
        assert_eq!(unpack(zps[0]), (15, 0));
        assert_eq!(unpack(zps[1]), (0, 0));
        assert_eq!(unpack(data[0]), (0, 0));
        assert_eq!(unpack(data[1]), (15, 0));
    }

    #[test]
    fn test_rowwise_unsupported() {
        let params = QuantParams::rowwise(2, 2, 2);
        let dst = PackedMut::<f32> { data: &mut [0u8; 2], scales: &mut [0.0; 2], zero_points: None };
        assert!(quantize_qdq(&[0.0f32; 4], 2, dst, QuantMode::Symmetric, &params).is_err());
    }
}
