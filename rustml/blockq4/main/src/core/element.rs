use crate::api::traits::QuantElement;
use half::f16;

impl QuantElement for f32 {
    #[inline(always)]
    fn to_f32(self) -> f32 {
        self
    }

    #[inline(always)]
    fn from_f32(v: f32) -> Self {
        v
    }
}

impl QuantElement for f16 {
    #[inline(always)]
    fn to_f32(self) -> f32 {
        f16::to_f32(self)
    }

    #[inline(always)]
    fn from_f32(v: f32) -> Self {
        f16::from_f32(v)
    }
}

/// Round an `f32` through the element type.
#[inline(always)]
pub(crate) fn round_trip<T: QuantElement>(v: f32) -> (T, f32) {
    let stored = T::from_f32(v);
    (stored, stored.to_f32())
}
