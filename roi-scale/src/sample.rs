// SPDX-License-Identifier: MIT
//! Element types the kernels operate on.
//!
//! Resampling arithmetic runs in `f32`; precision casts run in `f64` so that
//! 32-bit integers survive a trip through a wider type. Converting back rounds
//! half away from zero and saturates to the target range. Floating targets are
//! clamped to their finite range and never rounded.

use half::f16;

/// A tensor element the kernels can read, blend and write back.
pub trait Sample: bytemuck::Pod + PartialOrd + Send + Sync + 'static {
    /// Short precision name, used in error messages.
    const NAME: &'static str;
    /// Whether the type is a floating-point type.
    const IS_FLOAT: bool;

    fn to_f32(self) -> f32;
    /// Rounds and saturates `v` into this type.
    fn from_f32(v: f32) -> Self;
    fn to_f64(self) -> f64;
    /// Rounds and saturates `v` into this type.
    fn from_f64(v: f64) -> Self;
}

// `as` casts from floats saturate and map NaN to zero.
macro_rules! impl_int_sample {
    ($($t:ty => $name:literal),* $(,)?) => {
        $(
            impl Sample for $t {
                const NAME: &'static str = $name;
                const IS_FLOAT: bool = false;

                #[inline]
                fn to_f32(self) -> f32 {
                    self as f32
                }

                #[inline]
                fn from_f32(v: f32) -> Self {
                    v.round() as $t
                }

                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }

                #[inline]
                fn from_f64(v: f64) -> Self {
                    v.round() as $t
                }
            }
        )*
    };
}

impl_int_sample!(u8 => "U8", i8 => "I8", u16 => "U16", i16 => "I16", i32 => "I32");

impl Sample for f32 {
    const NAME: &'static str = "FP32";
    const IS_FLOAT: bool = true;

    #[inline]
    fn to_f32(self) -> f32 {
        self
    }

    #[inline]
    fn from_f32(v: f32) -> Self {
        v
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        v.clamp(f32::MIN as f64, f32::MAX as f64) as f32
    }
}

impl Sample for f16 {
    const NAME: &'static str = "FP16";
    const IS_FLOAT: bool = true;

    #[inline]
    fn to_f32(self) -> f32 {
        f16::to_f32(self)
    }

    #[inline]
    fn from_f32(v: f32) -> Self {
        f16::from_f32(v.clamp(f16::MIN.to_f32(), f16::MAX.to_f32()))
    }

    #[inline]
    fn to_f64(self) -> f64 {
        f16::to_f64(self)
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        f16::from_f64(v.clamp(f16::MIN.to_f64(), f16::MAX.to_f64()))
    }
}
