//! Block-major quantize kernel.
//!
//! Each quantization vector (a column for columnwise blocks, a row for
//! rowwise blocks) is cut into blocks of `block_size` elements. Every block
//! gets one scale, plus a 4-bit zero point in asymmetric mode, and its codes
//! are packed two per byte along the vector.

use crate::api::error::QuantResult;
use crate::api::traits::QuantElement;
use crate::api::types::*;
use crate::core::element::round_trip;
use crate::core::nibble::set_nibble;
use crate::core::runtime::min_items_per_task;
use crate::core::shape::VectorGeometry;
use crate::core::validate::{check_block_size, check_dense, check_len, check_zero_points};
use rayon::prelude::*;
use std::time::Instant;

/// Low fraction bits cleared from asymmetric scales. With 20 significant
/// bits left, `(code - zp) * scale` is exact in `f32` for every pair of
/// 4-bit codes, so dequantized blocks quantize back to the same scale.
const SCALE_DROP_BITS: u32 = 4;

#[inline(always)]
pub(crate) fn truncate_scale(scale: f32) -> f32 {
    f32::from_bits(scale.to_bits() & !((1 << SCALE_DROP_BITS) - 1))
}

/// Asymmetric scale and zero point for a block spanning `[min, max]`.
///
/// The range is widened to include zero so that 0.0 is always exactly
/// representable. A block of zeros yields scale 0 and zero point 0; other
/// constant blocks go through [`constant_scale_zp`].
#[inline]
pub(crate) fn range_to_scale_zp(min: f32, max: f32) -> (f32, u8) {
    if min == max && min != 0.0 {
        return constant_scale_zp(min);
    }
    let min = min.min(0.0);
    let max = max.max(0.0);
    let scale = truncate_scale((max - min) / CODE_MAX as f32);
    let zp = if scale != 0.0 { -min / scale } else { 0.0 };
    (scale, zp.round().clamp(0.0, CODE_MAX as f32) as u8)
}

/// Scale and zero point that reconstruct a constant block `v` exactly.
///
/// Keeps the regular encoding (every code 15 with zp 0, or every code 0
/// with zp 15) when `15 * scale == |v|`, which covers every constant block a
/// dequantize can produce. Otherwise `|v| / 8` with code 8 and zp 0, or
/// code 0 and zp 8 for negative `v`.
#[inline]
fn constant_scale_zp(v: f32) -> (f32, u8) {
    let magnitude = v.abs();
    let scale = truncate_scale(magnitude / CODE_MAX as f32);
    if scale * CODE_MAX as f32 == magnitude {
        (scale, if v < 0.0 { CODE_MAX } else { 0 })
    } else {
        (magnitude / CODE_MID as f32, if v < 0.0 { CODE_MID } else { 0 })
    }
}

/// Symmetric scale for a block spanning `[min, max]`.
///
/// The element of greatest magnitude maps to the signed code -8, so the
/// scale carries that element's sign and may be negative.
#[inline]
pub(crate) fn range_to_scale(min: f32, max: f32) -> f32 {
    let extreme = if max.abs() > min.abs() { max } else { min };
    extreme / -(CODE_MID as f32)
}

#[inline(always)]
pub(crate) fn reciprocal(scale: f32) -> f32 {
    if scale == 0.0 { 0.0 } else { 1.0 / scale }
}

#[inline(always)]
pub(crate) fn quantize_unsigned(v: f32, reciprocal_scale: f32, zp: u8) -> u8 {
    (v * reciprocal_scale + zp as f32).round().clamp(0.0, CODE_MAX as f32) as u8
}

#[inline(always)]
pub(crate) fn quantize_signed(v: f32, reciprocal_scale: f32) -> i8 {
    (v * reciprocal_scale)
        .round()
        .clamp(SIGNED_CODE_MIN as f32, SIGNED_CODE_MAX as f32) as i8
}

/// Signed code shifted into the unsigned nibble range.
#[inline(always)]
pub(crate) fn bias_signed(code: i8) -> u8 {
    (code + CODE_MID as i8) as u8
}

#[inline]
pub(crate) fn block_min_max(value: impl Fn(usize) -> f32, start: usize, end: usize) -> (f32, f32) {
    (start..end).fold((f32::MAX, f32::MIN), |(lo, hi), i| {
        let v = value(i);
        (lo.min(v), hi.max(v))
    })
}

/// Quantize one vector; `value(i)` reads element `i` of the vector.
fn quantize_vector<T: QuantElement>(
    value: impl Fn(usize) -> f32,
    geom: &VectorGeometry,
    codes: &mut [u8],
    scales: &mut [T],
    mut zero_points: Option<&mut [u8]>,
) {
    codes.fill(0);
    if let Some(zps) = zero_points.as_deref_mut() {
        zps.fill(0);
    }

    for (b, scale_out) in scales.iter_mut().enumerate() {
        let start = b * geom.block_size;
        let end = (start + geom.block_size).min(geom.vec_len);
        let (min, max) = block_min_max(&value, start, end);

        match zero_points.as_deref_mut() {
            Some(zps) => {
                let (scale, zp) = range_to_scale_zp(min, max);
                let (stored, scale) = round_trip::<T>(scale);
                *scale_out = stored;
                set_nibble(zps, b, zp);

                let rs = reciprocal(scale);
                for i in start..end {
                    set_nibble(codes, i, quantize_unsigned(value(i), rs, zp));
                }
            }
            None => {
                let (stored, scale) = round_trip::<T>(range_to_scale(min, max));
                *scale_out = stored;

                let rs = reciprocal(scale);
                for i in start..end {
                    set_nibble(codes, i, bias_signed(quantize_signed(value(i), rs)));
                }
            }
        }
    }
}

/// Quantize a row-major dense matrix into block-major packed codes.
///
/// `src` is read as `params.rows x params.columns` with leading dimension
/// `ld`, so strided views (for instance one half of a wider buffer) can be
/// quantized in place. `dst.zero_points` must be `Some` exactly for
/// asymmetric mode and sized per [`buffer_sizes`](crate::buffer_sizes).
///
/// Returns the encoding of the written codes: `ZeroPoint` for asymmetric,
/// `Biased` (implied zero point 8) for symmetric.
pub fn quantize_blockwise<T: QuantElement>(
    src: &[T],
    ld: usize,
    dst: PackedMut<'_, T>,
    mode: QuantMode,
    params: &QuantParams,
) -> QuantResult<CodeEncoding> {
    let _t = if log::log_enabled!(log::Level::Trace) { Some(Instant::now()) } else { None };
    check_block_size(params.block_size)?;
    check_dense("dense source", src.len(), params, ld)?;

    let sizes = params.buffer_sizes();
    check_len("packed data", sizes.data_bytes, dst.data.len())?;
    check_len("scales", sizes.scale_count, dst.scales.len())?;
    check_zero_points(
        "quantize_blockwise",
        dst.zero_points.as_ref().map(|z| z.len()),
        !mode.is_symmetric(),
        sizes.zero_point_bytes,
    )?;

    let encoding = CodeEncoding::block_major(mode);
    if params.numel() == 0 {
        return Ok(encoding);
    }

    let geom = VectorGeometry::new(params);
    let (elem_stride, vec_stride) = match params.axis {
        BlockAxis::Columnwise => (ld, 1),
        BlockAxis::Rowwise => (1, ld),
    };
    let min_len = min_items_per_task(geom.vec_len);
    let element = |v: usize| {
        let base = v * vec_stride;
        move |i: usize| src[base + i * elem_stride].to_f32()
    };

    match dst.zero_points {
        Some(zero_points) => {
            dst.data
                .par_chunks_mut(geom.bytes_per_vec)
                .zip(dst.scales.par_chunks_mut(geom.blocks_per_vec))
                .zip(zero_points.par_chunks_mut(geom.zp_bytes_per_vec))
                .with_min_len(min_len)
                .enumerate()
                .for_each(|(v, ((codes, scales), zps))| {
                    quantize_vector(element(v), &geom, codes, scales, Some(zps));
                });
        }
        None => {
            dst.data
                .par_chunks_mut(geom.bytes_per_vec)
                .zip(dst.scales.par_chunks_mut(geom.blocks_per_vec))
                .with_min_len(min_len)
                .enumerate()
                .for_each(|(v, (codes, scales))| {
                    quantize_vector(element(v), &geom, codes, scales, None);
                });
        }
    }

    if let Some(t) = _t {
        log::trace!("[perf] blockq4::quantize_blockwise [{}x{}] block={} {} {:?} {:.3}ms",
            params.rows, params.columns, params.block_size, params.axis, mode,
            t.elapsed().as_secs_f64() * 1000.0);
    }
    Ok(encoding)
}
