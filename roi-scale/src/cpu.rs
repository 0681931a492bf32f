// SPDX-License-Identifier: MIT
// CPU resamplers over strided views.
// Any layout in, any layout out; source and destination share the element type.

use crate::error::ScaleError;
use crate::plan::{AxisPlan, ResizeAlgorithm};
use crate::sample::Sample;
use crate::view::{View, ViewMut};

/// Resamples `src` into the whole of `dst`.
///
/// `N` and `C` must match; only the spatial plane is resized. Equal extents are
/// copied exactly for every algorithm. `Lanczos3` has no generic kernel and is
/// rejected here; callers route it to [`crate::convolution`].
pub fn resize<T: Sample>(
    src: &View<'_, T>,
    dst: &mut ViewMut<'_, T>,
    algorithm: ResizeAlgorithm,
) -> Result<(), ScaleError> {
    let (se, de) = (src.extent(), dst.extent());
    if se.is_empty() {
        return Err(ScaleError::EmptyExtent { operation: "resize", extent: se });
    }
    if de.is_empty() {
        return Err(ScaleError::EmptyExtent { operation: "resize", extent: de });
    }
    if se.n != de.n || se.c != de.c {
        return Err(ScaleError::ExtentMismatch { operation: "resize", src: se, dst: de });
    }

    if se == de {
        return copy(src, dst);
    }

    match algorithm {
        ResizeAlgorithm::NoResize => Err(ScaleError::ExtentMismatch {
            operation: "resize without resampling",
            src: se,
            dst: de,
        }),
        ResizeAlgorithm::Nearest => {
            resize_nearest(src, dst);
            Ok(())
        }
        ResizeAlgorithm::Bilinear | ResizeAlgorithm::Area => {
            // for_algorithm only returns None for NoResize and Lanczos3
            let (Some(xs), Some(ys)) = (
                AxisPlan::for_algorithm(algorithm, se.w, de.w),
                AxisPlan::for_algorithm(algorithm, se.h, de.h),
            ) else {
                return Err(ScaleError::Unsupported {
                    algorithm,
                    reason: "tap-based resampling".to_string(),
                });
            };
            resample(src, dst, &xs, &ys);
            Ok(())
        }
        ResizeAlgorithm::Lanczos3 => Err(ScaleError::Unsupported {
            algorithm,
            reason: format!("generic {} strided views", T::NAME),
        }),
    }
}

/// Element-exact copy between views of equal extent.
pub fn copy<T: Sample>(src: &View<'_, T>, dst: &mut ViewMut<'_, T>) -> Result<(), ScaleError> {
    let e = src.extent();
    if e != dst.extent() {
        return Err(ScaleError::ExtentMismatch { operation: "copy", src: e, dst: dst.extent() });
    }
    for n in 0..e.n {
        for c in 0..e.c {
            for h in 0..e.h {
                for w in 0..e.w {
                    dst.set(n, c, h, w, src.at(n, c, h, w));
                }
            }
        }
    }
    Ok(())
}

/// Samples are copied, never blended, so any precision survives unchanged.
fn resize_nearest<T: Sample>(src: &View<'_, T>, dst: &mut ViewMut<'_, T>) {
    let (se, de) = (src.extent(), dst.extent());
    let xs = AxisPlan::nearest(se.w, de.w);
    let ys = AxisPlan::nearest(se.h, de.h);
    for n in 0..de.n {
        for c in 0..de.c {
            for y in 0..de.h {
                let sy = ys.taps(y)[0].index;
                for x in 0..de.w {
                    let sx = xs.taps(x)[0].index;
                    dst.set(n, c, y, x, src.at(n, c, sy, sx));
                }
            }
        }
    }
}

/// Separable weighted resampling; accumulation in `f32`.
///
/// Weights sum to one only within rounding, so the blend is clamped to the
/// range of the samples it read. A uniform footprint comes back exactly.
fn resample<T: Sample>(src: &View<'_, T>, dst: &mut ViewMut<'_, T>, xs: &AxisPlan, ys: &AxisPlan) {
    let de = dst.extent();
    for n in 0..de.n {
        for c in 0..de.c {
            for y in 0..de.h {
                let row_taps = ys.taps(y);
                for x in 0..de.w {
                    let col_taps = xs.taps(x);
                    let mut acc = 0.0f32;
                    let (mut lo, mut hi) = (f32::INFINITY, f32::NEG_INFINITY);
                    for ty in row_taps {
                        let mut row = 0.0f32;
                        for tx in col_taps {
                            let v = src.at(n, c, ty.index, tx.index).to_f32();
                            lo = lo.min(v);
                            hi = hi.max(v);
                            row += tx.weight * v;
                        }
                        acc += ty.weight * row;
                    }
                    dst.set(n, c, y, x, T::from_f32(clamp_to(acc, lo, hi)));
                }
            }
        }
    }
}

// Not `f32::clamp`: an all-NaN footprint leaves `lo > hi`, which must not panic.
#[inline]
fn clamp_to(v: f32, lo: f32, hi: f32) -> f32 {
    if v < lo {
        lo
    } else if v > hi {
        hi
    } else {
        v
    }
}
