// SPDX-License-Identifier: MIT
// Layout and precision reorder between strided views of equal extent.

use crate::error::ScaleError;
use crate::sample::Sample;
use crate::view::{View, ViewMut};

/// Copies every element of `src` into `dst`, casting `S` to `D`.
///
/// The memory layout of either side is whatever its strides say, so the same
/// routine performs planar/interleaved swaps, precision casts, or both at once.
/// Casts go through `f64`: integers round half away from zero and saturate,
/// floats clamp to their finite range.
pub fn reorder<S: Sample, D: Sample>(
    src: &View<'_, S>,
    dst: &mut ViewMut<'_, D>,
) -> Result<(), ScaleError> {
    let e = src.extent();
    if e != dst.extent() {
        return Err(ScaleError::ExtentMismatch {
            operation: "reorder",
            src: e,
            dst: dst.extent(),
        });
    }
    for n in 0..e.n {
        for c in 0..e.c {
            for h in 0..e.h {
                for w in 0..e.w {
                    dst.set(n, c, h, w, D::from_f64(src.at(n, c, h, w).to_f64()));
                }
            }
        }
    }
    Ok(())
}
