//! Shape calculator: metadata and packed-data dimensions of a blockwise quantization.
//!
//! For columnwise blocks the metadata is `[ceil(rows / B), columns]` and the
//! packed codes are `[ceil(rows / 2), columns]`; rowwise blocks mirror this.
//! Zero-sized matrices give zero-sized shapes.

use crate::api::types::{BlockAxis, BufferSizes, QuantParams, QuantShape};

/// `(meta_rows, meta_cols)` of the scale metadata.
pub fn meta_shape(block_size: usize, axis: BlockAxis, rows: usize, columns: usize) -> (usize, usize) {
    debug_assert!(block_size >= 1, "block_size must be at least 1");
    match axis {
        BlockAxis::Columnwise => (rows.div_ceil(block_size), columns),
        BlockAxis::Rowwise => (rows, columns.div_ceil(block_size)),
    }
}

/// `(packed_rows, packed_cols)` of the packed codes.
pub fn packed_shape(axis: BlockAxis, rows: usize, columns: usize) -> (usize, usize) {
    match axis {
        BlockAxis::Columnwise => (rows.div_ceil(2), columns),
        BlockAxis::Rowwise => (rows, columns.div_ceil(2)),
    }
}

pub fn quant_shape(block_size: usize, axis: BlockAxis, rows: usize, columns: usize) -> QuantShape {
    let (meta_rows, meta_cols) = meta_shape(block_size, axis, rows, columns);
    let (packed_rows, packed_cols) = packed_shape(axis, rows, columns);
    QuantShape { meta_rows, meta_cols, packed_rows, packed_cols }
}

/// `(rows, cols)` of the packed zero points: metadata halved along the block axis.
pub fn zero_point_shape(block_size: usize, axis: BlockAxis, rows: usize, columns: usize) -> (usize, usize) {
    let (meta_rows, meta_cols) = meta_shape(block_size, axis, rows, columns);
    match axis {
        BlockAxis::Columnwise => (meta_rows.div_ceil(2), meta_cols),
        BlockAxis::Rowwise => (meta_rows, meta_cols.div_ceil(2)),
    }
}

/// Buffer sizes of the block-major layout.
pub fn buffer_sizes(block_size: usize, axis: BlockAxis, rows: usize, columns: usize) -> BufferSizes {
    let shape = quant_shape(block_size, axis, rows, columns);
    let (zp_rows, zp_cols) = zero_point_shape(block_size, axis, rows, columns);
    BufferSizes {
        data_bytes: shape.packed_rows * shape.packed_cols,
        scale_count: shape.meta_rows * shape.meta_cols,
        zero_point_bytes: zp_rows * zp_cols,
    }
}

/// Buffer sizes of the element-major (QDQ) layout for columnwise blocks.
pub fn qdq_buffer_sizes(block_size: usize, rows: usize, columns: usize) -> BufferSizes {
    let scale_count = rows.div_ceil(block_size) * columns;
    BufferSizes {
        data_bytes: (rows * columns).div_ceil(2),
        scale_count,
        zero_point_bytes: scale_count.div_ceil(2),
    }
}

impl QuantParams {
    pub fn shape(&self) -> QuantShape {
        quant_shape(self.block_size, self.axis, self.rows, self.columns)
    }

    pub fn buffer_sizes(&self) -> BufferSizes {
        buffer_sizes(self.block_size, self.axis, self.rows, self.columns)
    }

    pub fn qdq_buffer_sizes(&self) -> BufferSizes {
        qdq_buffer_sizes(self.block_size, self.rows, self.columns)
    }
}

/// Per-vector view of the block-major layout.
///
/// A vector is a column for columnwise blocks and a row for rowwise blocks;
/// every vector owns a contiguous run of packed bytes, scales and zero points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct VectorGeometry {
    pub vec_len: usize,
    pub block_size: usize,
    pub bytes_per_vec: usize,
    pub blocks_per_vec: usize,
    pub zp_bytes_per_vec: usize,
}

impl VectorGeometry {
    pub fn new(params: &QuantParams) -> Self {
        let vec_len = match params.axis {
            BlockAxis::Columnwise => params.rows,
            BlockAxis::Rowwise => params.columns,
        };
        let blocks_per_vec = vec_len.div_ceil(params.block_size);
        Self {
            vec_len,
            block_size: params.block_size,
            bytes_per_vec: vec_len.div_ceil(2),
            blocks_per_vec,
            zp_bytes_per_vec: blocks_per_vec.div_ceil(2),
        }
    }

    /// `(vector, index within vector)` of dense element `(row, col)`.
    #[inline(always)]
    pub fn locate(&self, axis: BlockAxis, row: usize, col: usize) -> (usize, usize) {
        match axis {
            BlockAxis::Columnwise => (col, row),
            BlockAxis::Rowwise => (row, col),
        }
    }
}
