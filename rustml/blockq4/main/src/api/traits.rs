//! Element trait for dense matrices and scale metadata

/// Floating-point element a dense matrix (and its scales) can be stored in.
///
/// Kernels do all arithmetic in `f32`; scales are rounded through the element
/// type before use, so half-precision callers quantize against exactly the
/// scale they will later read back.
pub trait QuantElement: bytemuck::Pod + Send + Sync + PartialEq + std::fmt::Debug {
    fn to_f32(self) -> f32;
    fn from_f32(v: f32) -> Self;
}
