//! Facade re-exports for rustml-blockq4

pub use crate::api::error::*;
pub use crate::api::traits::*;
pub use crate::api::types::*;
pub use crate::core::dequantize::dequantize;
pub use crate::core::matrix::QuantizedMatrix;
pub use crate::core::nibble::{
    flip_sign_bias, nibble_at, nibble_from_signed, pack, set_nibble, signed_from_nibble, unpack,
};
pub use crate::core::qdq::quantize_qdq;
pub use crate::core::quantize::quantize_blockwise;
pub use crate::core::runtime::RuntimeConfig;
pub use crate::core::shape::{
    buffer_sizes, meta_shape, packed_shape, qdq_buffer_sizes, quant_shape, zero_point_shape,
};
pub use crate::core::transpose::{transpose_block_major_to_qdq, transpose_qdq_to_block_major};
