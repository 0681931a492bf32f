//! Region-of-interest descriptors.
//!
//! A [`RoiBlob`] is a rectangle inside a parent tensor. It is applied to every
//! batch item and every channel of the parent; only the spatial plane is
//! cropped.

use std::fmt;

use crate::core::tensor::{BlobRef, Dims, TensorBuffer, TensorDesc};
use crate::error::{PreprocessError, PreprocessResult};

/// Spatial rectangle in elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Roi {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Roi {
    pub const fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle covering a whole plane of `dims`.
    pub const fn full(dims: Dims) -> Self {
        Self::new(0, 0, dims.w, dims.h)
    }

    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn area(&self) -> usize {
        self.width.saturating_mul(self.height)
    }

    /// Whether `x + width` and `y + height` stay within `dims`.
    pub fn fits(&self, dims: Dims) -> bool {
        let right = self.x.checked_add(self.width);
        let bottom = self.y.checked_add(self.height);
        matches!((right, bottom), (Some(r), Some(b)) if r <= dims.w && b <= dims.h)
    }
}

impl fmt::Display for Roi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// Element origin and extent of a strided region inside a tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub origin: usize,
    pub extent: Dims,
}

impl Region {
    /// The whole tensor.
    pub fn full(desc: &TensorDesc) -> Self {
        Self {
            origin: 0,
            extent: desc.dims(),
        }
    }
}

/// A rectangle bound to the tensor it crops.
#[derive(Debug, Clone)]
pub struct RoiBlob {
    parent: BlobRef,
    roi: Roi,
}

impl RoiBlob {
    /// Fails with `OutOfBounds` when the rectangle leaves the parent's plane.
    /// Zero-sized rectangles are accepted here and rejected at execution.
    pub fn new(parent: BlobRef, roi: Roi) -> PreprocessResult<Self> {
        let dims = parent.dims();
        if !roi.fits(dims) {
            return Err(PreprocessError::out_of_bounds(
                "roi",
                format!("{roi} exceeds parent plane {}x{}", dims.w, dims.h),
            )
            .with_operation("RoiBlob::new"));
        }
        Ok(Self { parent, roi })
    }

    /// ROI covering the whole parent.
    pub fn full(parent: BlobRef) -> Self {
        let roi = Roi::full(parent.dims());
        Self { parent, roi }
    }

    pub fn parent(&self) -> &BlobRef {
        &self.parent
    }

    pub fn roi(&self) -> Roi {
        self.roi
    }

    /// Logical extent of the cropped region: parent `N` and `C`, ROI plane.
    pub fn extent(&self) -> Dims {
        self.parent.dims().with_plane(self.roi.height, self.roi.width)
    }

    /// Region inside the parent, addressed with the parent's strides.
    pub fn region(&self) -> Region {
        let s = self.parent.desc().strides();
        Region {
            origin: self.roi.y * s.h + self.roi.x * s.w,
            extent: self.extent(),
        }
    }

    /// Parent format with the ROI extent. Fails for zero-sized rectangles.
    pub fn cropped_desc(&self) -> PreprocessResult<TensorDesc> {
        self.parent.desc().with_dims(self.extent())
    }

    pub fn is_full(&self) -> bool {
        self.roi == Roi::full(self.parent.dims())
    }

    /// Whether the parent is `other`.
    pub fn crops(&self, other: &BlobRef) -> bool {
        TensorBuffer::same_buffer(&self.parent, other)
    }
}
