//! Layout/precision conversion between tensor buffers.
//!
//! Shapes must be equal; only the memory order and element type change. Equal
//! precisions are copied bit-exactly, different precisions are cast through
//! `f64` with round-half-away-from-zero and saturation.

use roi_scale::{cpu, reorder};

use crate::core::tensor::{BlobRef, TensorBuffer, TensorRead, TensorWrite};
use crate::dispatch_precision;
use crate::error::{PreprocessError, PreprocessResult};
use crate::processing::roi::{Region, RoiBlob};

/// Checks that a region of `src` extent can be converted into `dst`.
pub fn validate(src: roi_scale::Extent, dst: roi_scale::Extent) -> PreprocessResult<()> {
    if src != dst {
        return Err(PreprocessError::shape_mismatch(
            "convert",
            dst.to_string(),
            src.to_string(),
        ));
    }
    Ok(())
}

/// Converts `region` of `src` into the whole of `dst`.
pub fn convert_region(
    src: &TensorRead<'_>,
    region: Region,
    dst: &mut TensorWrite<'_>,
) -> PreprocessResult<()> {
    let (sp, dp) = (src.desc().precision(), dst.desc().precision());
    validate(region.extent, dst.desc().dims())?;

    if sp == dp {
        dispatch_precision!(sp, T => {
            let sv = src.view_region::<T>(region.origin, region.extent)?;
            let mut dv = dst.view_mut::<T>()?;
            cpu::copy(&sv, &mut dv)?;
        });
        return Ok(());
    }

    dispatch_precision!(sp, S => {
        let sv = src.view_region::<S>(region.origin, region.extent)?;
        dispatch_precision!(dp, D => {
            let mut dv = dst.view_mut::<D>()?;
            reorder::reorder(&sv, &mut dv)?;
        });
    });
    Ok(())
}

/// Converts the region of `src` into `dst`, snapshotting first when `dst` is
/// the ROI's own parent.
pub fn convert(src: &RoiBlob, dst: &BlobRef) -> PreprocessResult<()> {
    if src.crops(dst) {
        let snapshot = TensorBuffer::allocate(src.cropped_desc()?)?;
        convert_region(&src.parent().read(), src.region(), &mut snapshot.write())?;
        let full = Region::full(snapshot.desc());
        return convert_region(&snapshot.read(), full, &mut dst.write());
    }
    convert_region(&src.parent().read(), src.region(), &mut dst.write())
}
