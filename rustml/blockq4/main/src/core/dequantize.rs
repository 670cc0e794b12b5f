use crate::api::error::QuantResult;
use crate::api::traits::QuantElement;
use crate::api::types::*;
use crate::core::nibble::{nibble_at, signed_from_nibble};
use crate::core::runtime::min_items_per_task;
use crate::core::shape::VectorGeometry;
use crate::core::validate::{check_block_size, check_dense, check_len, check_zero_points, require_columnwise};
use rayon::prelude::*;
use std::time::Instant;

/// Code minus zero point, as interpreted by `encoding`.
#[inline(always)]
pub(crate) fn centered_code(encoding: CodeEncoding, code: u8, zp: u8) -> f32 {
    match encoding {
        CodeEncoding::ZeroPoint => code as f32 - zp as f32,
        CodeEncoding::Biased => code as f32 - CODE_MID as f32,
        CodeEncoding::Signed => signed_from_nibble(code) as f32,
    }
}

/// Reconstruct a row-major dense matrix from packed codes.
///
/// One kernel serves every packed form: `order` says where each code and
/// its metadata live, `encoding` how a code maps back to a value
/// (`(code - zp) * scale`, `(code - 8) * scale` or `signed_code * scale`).
/// `dst` is written as `params.rows x params.columns` with leading
/// dimension `ld`; elements between `columns` and `ld` are untouched.
pub fn dequantize<T: QuantElement>(
    src: PackedRef<'_, T>,
    encoding: CodeEncoding,
    order: PackedOrder,
    params: &QuantParams,
    dst: &mut [T],
    ld: usize,
) -> QuantResult<()> {
    let _t = if log::log_enabled!(log::Level::Trace) { Some(Instant::now()) } else { None };
    check_block_size(params.block_size)?;

    let sizes = match order {
        PackedOrder::BlockMajor => params.buffer_sizes(),
        PackedOrder::ElementMajor => {
            require_columnwise("dequantize element-major", params.axis)?;
            params.qdq_buffer_sizes()
        }
    };
    check_len("packed data", sizes.data_bytes, src.data.len())?;
    check_len("scales", sizes.scale_count, src.scales.len())?;
    check_zero_points(
        "dequantize",
        src.zero_points.map(|z| z.len()),
        encoding.has_zero_points(),
        sizes.zero_point_bytes,
    )?;
    let required = check_dense("dense destination", dst.len(), params, ld)?;
    if params.numel() == 0 {
        return Ok(());
    }

    let columns = params.columns;
    let rows_per_task = min_items_per_task(columns);
    let rows = dst[..required].par_chunks_mut(ld).with_min_len(rows_per_task).enumerate();

    match order {
        PackedOrder::BlockMajor => {
            let geom = VectorGeometry::new(params);
            rows.for_each(|(r, out_row)| {
                for (c, out) in out_row[..columns].iter_mut().enumerate() {
                    let (v, i) = geom.locate(params.axis, r, c);
                    let b = i / geom.block_size;
                    let code = nibble_at(&src.data[v * geom.bytes_per_vec..], i);
                    let scale = src.scales[v * geom.blocks_per_vec + b].to_f32();
                    let zp = src
                        .zero_points
                        .map_or(0, |zps| nibble_at(&zps[v * geom.zp_bytes_per_vec..], b));
                    *out = T::from_f32(centered_code(encoding, code, zp) * scale);
                }
            });
        }
        PackedOrder::ElementMajor => {
            let block_size = params.block_size;
            rows.for_each(|(r, out_row)| {
                let meta_base = (r / block_size) * columns;
                for (c, out) in out_row[..columns].iter_mut().enumerate() {
                    let code = nibble_at(src.data, r * columns + c);
                    let scale = src.scales[meta_base + c].to_f32();
                    let zp = src.zero_points.map_or(0, |zps| nibble_at(zps, meta_base + c));
                    *out = T::from_f32(centered_code(encoding, code, zp) * scale);
                }
            });
        }
    }

    if let Some(t) = _t {
        log::trace!("[perf] blockq4::dequantize [{}x{}] block={} {} {:?} {:?} {:.3}ms",
            params.rows, params.columns, params.block_size, params.axis, order, encoding,
            t.elapsed().as_secs_f64() * 1000.0);
    }
    Ok(())
}
