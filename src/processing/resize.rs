//! # Resize Stage
//!
//! Runs the resize kernels of `roi_scale` over tensor buffers. The caller
//! hands in a source region and a locked destination; this module checks the
//! pair, picks the element type from the shared precision and dispatches.
//!
//! | Algorithm | Runs on | Kernel |
//! |-----------|---------|--------|
//! | `none` | any | exact copy, extents must already match |
//! | `nearest` | any | index copy |
//! | `bilinear` | any | 2x2 taps, `f32` |
//! | `area` | any | box footprint when shrinking, bilinear taps when growing |
//! | `lanczos3` | `U8` interleaved, 1-4 channels | `fast_image_resize` convolution |

use fast_image_resize::Resizer;
use roi_scale::convolution::{self, Staging};
use roi_scale::{Extent, ResizeAlgorithm, cpu};

use crate::core::tensor::{BlobRef, Layout, Precision, TensorBuffer, TensorRead, TensorWrite};
use crate::dispatch_precision;
use crate::error::{PreprocessError, PreprocessResult};
use crate::processing::roi::{Region, RoiBlob};

/// Checks a resize from `src` to `dst` extents before anything is written.
pub fn validate_extents(src: Extent, dst: Extent, algorithm: ResizeAlgorithm) -> PreprocessResult<()> {
    if src.is_empty() {
        return Err(PreprocessError::shape_mismatch("resize", "non-empty source region", src.to_string()));
    }
    if dst.is_empty() {
        return Err(PreprocessError::shape_mismatch("resize", "non-empty destination", dst.to_string()));
    }
    if src.n != dst.n || src.c != dst.c {
        return Err(PreprocessError::shape_mismatch(
            "resize",
            format!("N={} C={}", dst.n, dst.c),
            format!("N={} C={}", src.n, src.c),
        ));
    }
    if algorithm == ResizeAlgorithm::NoResize && (src.h != dst.h || src.w != dst.w) {
        return Err(PreprocessError::shape_mismatch(
            "crop without resize",
            format!("{}x{} region", dst.w, dst.h),
            format!("{}x{} region", src.w, src.h),
        )
        .with_recovery_suggestion("Pick a resize algorithm or match the ROI to the input size"));
    }
    Ok(())
}

/// Checks that `algorithm` can run on data stored as `precision`/`layout`.
/// Equal extents are always copied, so only real resizes are restricted.
pub fn validate_support(
    algorithm: ResizeAlgorithm,
    precision: Precision,
    layout: Layout,
    src: Extent,
    dst: Extent,
) -> PreprocessResult<()> {
    if algorithm != ResizeAlgorithm::Lanczos3 || src == dst {
        return Ok(());
    }
    if precision != Precision::U8 || !layout.is_interleaved() || !convolution::supports_channels(src.c) {
        return Err(PreprocessError::unsupported_algorithm(
            algorithm.name(),
            format!("{precision} {layout} with {} channels; needs U8 interleaved with 1-4 channels", src.c),
        ));
    }
    Ok(())
}

/// Resize kernels plus the reusable state of the convolution path.
pub struct Resampler {
    resizer: Resizer,
    staging: Staging,
}

impl Default for Resampler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Resampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resampler")
            .field("staging_bytes", &self.staging.capacity())
            .finish()
    }
}

impl Resampler {
    pub fn new() -> Self {
        Self {
            resizer: Resizer::new(),
            staging: Staging::default(),
        }
    }

    /// Resizes `region` of `src` into the whole of `dst`. Both sides must share
    /// precision; layouts may differ.
    pub fn resize(
        &mut self,
        src: &TensorRead<'_>,
        region: Region,
        dst: &mut TensorWrite<'_>,
        algorithm: ResizeAlgorithm,
    ) -> PreprocessResult<()> {
        let (sd, dd) = (*src.desc(), *dst.desc());
        if sd.precision() != dd.precision() {
            return Err(PreprocessError::shape_mismatch(
                "resize",
                dd.precision().name(),
                sd.precision().name(),
            ));
        }
        validate_extents(region.extent, dd.dims(), algorithm)?;
        validate_support(algorithm, sd.precision(), sd.layout(), region.extent, dd.dims())?;

        if algorithm == ResizeAlgorithm::Lanczos3 && region.extent != dd.dims() {
            let sv = src.view_region::<u8>(region.origin, region.extent)?;
            let mut dv = dst.view_mut::<u8>()?;
            convolution::resize_lanczos3(&mut self.resizer, &sv, &mut dv, &mut self.staging)?;
            return Ok(());
        }

        dispatch_precision!(sd.precision(), T => {
            let sv = src.view_region::<T>(region.origin, region.extent)?;
            let mut dv = dst.view_mut::<T>()?;
            cpu::resize(&sv, &mut dv, algorithm)?;
        });
        Ok(())
    }
}

/// Resizes the region of `src` into `dst`. Same precision required.
///
/// When `dst` is the ROI's own parent the region is copied out first.
pub fn resize(src: &RoiBlob, dst: &BlobRef, algorithm: ResizeAlgorithm) -> PreprocessResult<()> {
    let mut resampler = Resampler::new();
    if src.crops(dst) {
        let snapshot = TensorBuffer::allocate(src.cropped_desc()?)?;
        crate::processing::convert::convert_region(
            &src.parent().read(),
            src.region(),
            &mut snapshot.write(),
        )?;
        let full = Region::full(snapshot.desc());
        return resampler.resize(&snapshot.read(), full, &mut dst.write(), algorithm);
    }
    resampler.resize(&src.parent().read(), src.region(), &mut dst.write(), algorithm)
}
