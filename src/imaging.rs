//! Conversion between decoded images and tensor buffers.
//!
//! Images enter as `U8` `NHWC` tensors with one batch item; channel count is
//! 1 (luma), 3 (RGB) or 4 (RGBA). Any `U8` tensor with one batch item and
//! 1, 3 or 4 channels can be turned back into an image, whatever its layout.

use std::fs;
use std::path::Path;

use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};

use crate::core::tensor::{BlobRef, Dims, Layout, Precision, TensorBuffer, TensorDesc};
use crate::error::{PreprocessError, PreprocessResult};
use crate::processing::{RoiBlob, convert};

/// Channel counts with an image representation.
pub const IMAGE_CHANNELS: [usize; 3] = [1, 3, 4];

/// Whether `desc` can be written as an image.
pub fn is_image_compatible(desc: &TensorDesc) -> bool {
    let dims = desc.dims();
    desc.precision() == Precision::U8 && dims.n == 1 && IMAGE_CHANNELS.contains(&dims.c)
}

/// Packs `image` into a `U8` `NHWC` tensor with `channels` channels.
pub fn tensor_from_image(image: &DynamicImage, channels: usize) -> PreprocessResult<BlobRef> {
    let (w, h) = (image.width() as usize, image.height() as usize);
    let data = match channels {
        1 => image.to_luma8().into_raw(),
        3 => image.to_rgb8().into_raw(),
        4 => image.to_rgba8().into_raw(),
        other => {
            return Err(PreprocessError::config(
                "channels",
                other.to_string(),
                "images convert to 1, 3 or 4 channels",
            ));
        }
    };
    let desc = TensorDesc::new(Precision::U8, Layout::NHWC, Dims::new(1, channels, h, w))?;
    TensorBuffer::from_bytes(desc, &data)
}

/// Decodes the image at `path` into a tensor, see [`tensor_from_image`].
pub fn load(path: &Path, channels: usize) -> PreprocessResult<BlobRef> {
    let image = image::open(path)
        .map_err(PreprocessError::from)
        .map_err(|e| e.with_operation("imaging::load").with_metadata("path", path.display().to_string()))?;
    tracing::debug!(path = %path.display(), width = image.width(), height = image.height(), "image decoded");
    tensor_from_image(&image, channels)
}

/// Converts an image-compatible tensor back into an image.
pub fn image_from_tensor(blob: &BlobRef) -> PreprocessResult<DynamicImage> {
    let desc = *blob.desc();
    if !is_image_compatible(&desc) {
        return Err(PreprocessError::shape_mismatch(
            "image_from_tensor",
            "U8 with N=1 and 1, 3 or 4 channels",
            desc.to_string(),
        ));
    }
    let dims = desc.dims();
    let raw = if desc.layout().is_interleaved() {
        blob.to_bytes()
    } else {
        let packed = TensorBuffer::allocate(desc.with_format(Precision::U8, Layout::NHWC)?)?;
        convert(&RoiBlob::full(blob.clone()), &packed)?;
        packed.to_bytes()
    };

    let (w, h) = (dimension(dims.w)?, dimension(dims.h)?);
    let image = match dims.c {
        1 => GrayImage::from_raw(w, h, raw).map(DynamicImage::ImageLuma8),
        3 => RgbImage::from_raw(w, h, raw).map(DynamicImage::ImageRgb8),
        _ => RgbaImage::from_raw(w, h, raw).map(DynamicImage::ImageRgba8),
    };
    image.ok_or_else(|| {
        PreprocessError::shape_mismatch("image_from_tensor", format!("{w}x{h} image"), desc.to_string())
    })
}

fn dimension(v: usize) -> PreprocessResult<u32> {
    u32::try_from(v).map_err(|_| PreprocessError::out_of_bounds("image dimension", format!("{v} exceeds u32")))
}

/// Tensor bytes with every element in little-endian order.
pub fn to_le_bytes(blob: &BlobRef) -> Vec<u8> {
    let mut bytes = blob.to_bytes();
    if cfg!(target_endian = "big") {
        let size = blob.precision().size();
        for element in bytes.chunks_exact_mut(size) {
            element.reverse();
        }
    }
    bytes
}

/// Writes `blob` to `path`: PNG when it has an image form, raw
/// little-endian element bytes otherwise. Returns whether PNG was written.
pub fn save(blob: &BlobRef, path: &Path) -> PreprocessResult<bool> {
    if is_image_compatible(blob.desc()) {
        image_from_tensor(blob)?
            .save_with_format(path, image::ImageFormat::Png)
            .map_err(PreprocessError::from)
            .map_err(|e| e.with_operation("imaging::save").with_metadata("path", path.display().to_string()))?;
        return Ok(true);
    }
    fs::write(path, to_le_bytes(blob))
        .map_err(|e| PreprocessError::io_with_path("write raw tensor", path.display().to_string(), e))?;
    Ok(false)
}
