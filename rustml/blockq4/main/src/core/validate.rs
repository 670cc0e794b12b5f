//! Up-front buffer checks shared by every kernel.

use crate::api::error::{QuantError, QuantResult};
use crate::api::types::{BlockAxis, QuantParams};

pub(crate) fn check_block_size(block_size: usize) -> QuantResult<()> {
    if !block_size.is_power_of_two() {
        return Err(QuantError::BlockAlignment(format!(
            "block size must be a power of two, got {}",
            block_size
        )));
    }
    Ok(())
}

pub(crate) fn check_len(buffer: &'static str, expected: usize, actual: usize) -> QuantResult<()> {
    if expected != actual {
        return Err(QuantError::ShapeMismatch {
            buffer,
            expected: vec![expected],
            actual: vec![actual],
        });
    }
    Ok(())
}

/// Elements a row-major view of `rows x columns` with leading dimension `ld` spans.
pub(crate) fn dense_len(rows: usize, columns: usize, ld: usize) -> QuantResult<usize> {
    if rows == 0 || columns == 0 {
        return Ok(0);
    }
    if ld < columns {
        return Err(QuantError::InvalidData(format!(
            "leading dimension {} is smaller than column count {}",
            ld, columns
        )));
    }
    Ok((rows - 1) * ld + columns)
}

pub(crate) fn check_dense(buffer: &'static str, len: usize, params: &QuantParams, ld: usize) -> QuantResult<usize> {
    let required = dense_len(params.rows, params.columns, ld)?;
    if len < required {
        return Err(QuantError::ShapeMismatch {
            buffer,
            expected: vec![params.rows, params.columns, ld],
            actual: vec![len],
        });
    }
    Ok(required)
}

/// Zero points must be present exactly when the encoding carries them.
pub(crate) fn check_zero_points(
    op: &'static str,
    present: Option<usize>,
    expected: bool,
    expected_len: usize,
) -> QuantResult<()> {
    match (present, expected) {
        (Some(len), true) => check_len("zero points", expected_len, len),
        (None, false) => Ok(()),
        (Some(_), false) => Err(QuantError::ZeroPoint(format!(
            "{} got zero points for a symmetric encoding",
            op
        ))),
        (None, true) => Err(QuantError::ZeroPoint(format!(
            "{} requires zero points for an asymmetric encoding",
            op
        ))),
    }
}

pub(crate) fn require_columnwise(op: &'static str, axis: BlockAxis) -> QuantResult<()> {
    if !axis.is_columnwise() {
        return Err(QuantError::UnsupportedAxis { op, axis: axis.to_string() });
    }
    Ok(())
}
