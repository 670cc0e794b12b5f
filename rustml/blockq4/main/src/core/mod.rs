pub(crate) mod element;
pub mod dequantize;
pub mod matrix;
pub mod nibble;
pub mod qdq;
pub mod quantize;
pub mod runtime;
pub mod shape;
pub mod transpose;
pub(crate) mod validate;
