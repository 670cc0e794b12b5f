//! # RustML BlockQ4
//!
//! Blockwise 4-bit quantization for dense weight matrices.
//!
//! This crate provides:
//! - A shape calculator for packed codes and scale / zero-point metadata
//! - Quantize and dequantize kernels for columnwise or rowwise blocks,
//!   symmetric or asymmetric
//! - A QDQ kernel emitting row-major codes with dense metadata, signed
//!   codes for symmetric mode
//! - A layout transpose between the QDQ and block-major forms that never
//!   reconstructs floating-point values
//!
//! Two codes share a byte: the low nibble holds the even index and the high
//! nibble the odd index along the packing axis.
//!
//! ## Example
//!
//! ```rust
//! use rustml_blockq4::{QuantizedMatrix, QuantMode, QuantParams};
//!
//! let weights: Vec<f32> = (0..64 * 8).map(|i| (i as f32 * 0.37).sin()).collect();
//! let params = QuantParams::columnwise(64, 8, 32);
//! let q = QuantizedMatrix::quantize(&weights, 8, params, QuantMode::Asymmetric).unwrap();
//! assert_eq!(q.data.len(), 32 * 8);
//! let restored = q.dequantize().unwrap();
//! assert_eq!(restored.len(), weights.len());
//! ```

pub mod api;
pub mod core;
mod saf;

pub use saf::*;
