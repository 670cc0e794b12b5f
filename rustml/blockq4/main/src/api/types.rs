//! Public types for blockwise 4-bit quantization

use std::fmt;

/// Bits per quantized code.
pub const QBITS: usize = 4;

/// Largest unsigned 4-bit code.
pub const CODE_MAX: u8 = (1 << QBITS) - 1;

/// Implied zero point of symmetric codes stored unsigned.
pub const CODE_MID: u8 = 1 << (QBITS - 1);

/// Signed code range used by symmetric quantization: -8..=7.
pub const SIGNED_CODE_MIN: i8 = -(CODE_MID as i8);
pub const SIGNED_CODE_MAX: i8 = CODE_MID as i8 - 1;

/// Orientation of quantization blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockAxis {
    /// Blocks run down each column: `block_size` consecutive rows share a scale.
    #[default]
    Columnwise,
    /// Blocks run along each row: `block_size` consecutive columns share a scale.
    Rowwise,
}

impl BlockAxis {
    pub fn is_columnwise(self) -> bool {
        self == BlockAxis::Columnwise
    }

    /// The orientation of the same blocks seen on the transposed matrix.
    pub fn transposed(self) -> Self {
        match self {
            BlockAxis::Columnwise => BlockAxis::Rowwise,
            BlockAxis::Rowwise => BlockAxis::Columnwise,
        }
    }
}

impl fmt::Display for BlockAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockAxis::Columnwise => write!(f, "columnwise"),
            BlockAxis::Rowwise => write!(f, "rowwise"),
        }
    }
}

/// Quantization mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuantMode {
    /// Per-block scale and 4-bit zero point.
    #[default]
    Asymmetric,
    /// Per-block scale only; the zero point is implied.
    Symmetric,
}

impl QuantMode {
    pub fn is_symmetric(self) -> bool {
        self == QuantMode::Symmetric
    }
}

/// How the 4-bit codes of a packed buffer are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeEncoding {
    /// Unsigned codes with an explicit per-block zero point.
    ZeroPoint,
    /// Unsigned codes with the implied zero point 8.
    Biased,
    /// Two's-complement codes in -8..=7.
    Signed,
}

impl CodeEncoding {
    /// Encoding written by the block-major quantize kernel.
    pub fn block_major(mode: QuantMode) -> Self {
        match mode {
            QuantMode::Asymmetric => CodeEncoding::ZeroPoint,
            QuantMode::Symmetric => CodeEncoding::Biased,
        }
    }

    /// Encoding written by the QDQ kernel.
    pub fn qdq(mode: QuantMode) -> Self {
        match mode {
            QuantMode::Asymmetric => CodeEncoding::ZeroPoint,
            QuantMode::Symmetric => CodeEncoding::Signed,
        }
    }

    pub fn mode(self) -> QuantMode {
        match self {
            CodeEncoding::ZeroPoint => QuantMode::Asymmetric,
            CodeEncoding::Biased | CodeEncoding::Signed => QuantMode::Symmetric,
        }
    }

    pub fn is_signed(self) -> bool {
        self == CodeEncoding::Signed
    }

    pub fn has_zero_points(self) -> bool {
        self == CodeEncoding::ZeroPoint
    }
}

/// Storage order of the packed codes and metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PackedOrder {
    /// Each quantization vector (a column for columnwise blocks, a row for
    /// rowwise blocks) is stored contiguously, packed along the block axis.
    #[default]
    BlockMajor,
    /// QDQ order: codes in row-major element order packed two per byte,
    /// scales and zero points row-major over `[meta_rows, columns]`.
    /// Only defined for columnwise blocks.
    ElementMajor,
}

/// Geometry of a blockwise quantization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantParams {
    pub rows: usize,
    pub columns: usize,
    pub block_size: usize,
    pub axis: BlockAxis,
}

impl QuantParams {
    pub fn new(rows: usize, columns: usize, block_size: usize, axis: BlockAxis) -> Self {
        Self { rows, columns, block_size, axis }
    }

    pub fn columnwise(rows: usize, columns: usize, block_size: usize) -> Self {
        Self::new(rows, columns, block_size, BlockAxis::Columnwise)
    }

    pub fn rowwise(rows: usize, columns: usize, block_size: usize) -> Self {
        Self::new(rows, columns, block_size, BlockAxis::Rowwise)
    }

    pub fn numel(&self) -> usize {
        self.rows * self.columns
    }

    /// Same blocks described on the transposed matrix.
    pub fn transposed(&self) -> Self {
        Self::new(self.columns, self.rows, self.block_size, self.axis.transposed())
    }
}

/// Metadata and packed-data shapes for one quantization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QuantShape {
    pub meta_rows: usize,
    pub meta_cols: usize,
    pub packed_rows: usize,
    pub packed_cols: usize,
}

/// Buffer sizes needed by a quantization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BufferSizes {
    pub data_bytes: usize,
    pub scale_count: usize,
    /// Bytes of packed zero points; only allocated for asymmetric mode.
    pub zero_point_bytes: usize,
}

/// Borrowed packed codes with their metadata.
#[derive(Debug, Clone, Copy)]
pub struct PackedRef<'a, T> {
    pub data: &'a [u8],
    pub scales: &'a [T],
    pub zero_points: Option<&'a [u8]>,
}

/// Mutable packed output buffers.
#[derive(Debug)]
pub struct PackedMut<'a, T> {
    pub data: &'a mut [u8],
    pub scales: &'a mut [T],
    pub zero_points: Option<&'a mut [u8]>,
}
