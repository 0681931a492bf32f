// SPDX-License-Identifier: MIT
//! Errors raised by the kernels.

use fast_image_resize as fir;
use thiserror::Error;

use crate::plan::ResizeAlgorithm;
use crate::view::Extent;

#[derive(Debug, Error)]
pub enum ScaleError {
    /// A view would address elements past the end of its backing slice.
    #[error("view of {extent} at origin {origin} needs {needed} elements, buffer has {len}")]
    ViewOutOfBounds {
        extent: Extent,
        origin: usize,
        needed: usize,
        len: usize,
    },
    /// Source and destination extents are incompatible for the operation.
    #[error("{operation}: source {src} is incompatible with destination {dst}")]
    ExtentMismatch {
        operation: &'static str,
        src: Extent,
        dst: Extent,
    },
    /// A view with a zero-sized dimension was handed to a kernel.
    #[error("{operation}: empty extent {extent}")]
    EmptyExtent {
        operation: &'static str,
        extent: Extent,
    },
    /// The selector is known but cannot run on this data.
    #[error("{algorithm} resize is not supported for {reason}")]
    Unsupported {
        algorithm: ResizeAlgorithm,
        reason: String,
    },
    /// The selector name or code does not name any algorithm.
    #[error("unknown resize algorithm '{0}'")]
    UnknownAlgorithm(String),
    #[error("fast_image_resize: {0}")]
    Fir(#[from] fir::ResizeError),
    #[error("fast_image_resize buffer: {0}")]
    ImageBuf(#[from] fir::ImageBufferError),
}
