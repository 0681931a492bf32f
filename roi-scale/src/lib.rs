// SPDX-License-Identifier: MIT
//! # roi-scale: Resize and Reorder Kernels for Network Input Preprocessing
//!
//! This crate holds the pure, allocation-light kernels that turn a region of a
//! source tensor into the exact extent, layout and precision a compiled network
//! expects. It knows nothing about tensor ownership or locking: every kernel
//! takes a borrowed strided [`View`] and writes into a borrowed [`ViewMut`].
//!
//! ## Key Components
//!
//! - [`sample`]: element types and the round/saturate rule shared by all kernels
//! - [`view`]: strided 4-D views (`N, C, H, W` addressing over any layout)
//! - [`plan`]: algorithm selector and per-axis sampling taps
//! - [`cpu`]: nearest, bilinear and area resamplers
//! - [`reorder`]: layout and precision conversion
//! - [`convolution`]: Lanczos3 via `fast_image_resize` for interleaved 8-bit data
//!
//! ## Sampling Conventions
//!
//! - Nearest picks `floor(x * src / dst)` with integer arithmetic
//! - Bilinear uses half-pixel centres and clamps to the edge of the region
//! - Area averages the overlapped footprint when an axis shrinks and falls back
//!   to bilinear taps when it grows
//! - Equal extents are copied exactly, whatever the algorithm
//!
//! ## Usage Example
//!
//! ```rust
//! use roi_scale::{cpu, Extent, ResizeAlgorithm, Strides, View, ViewMut};
//!
//! let src_extent = Extent::new(1, 1, 4, 4);
//! let dst_extent = Extent::new(1, 1, 2, 2);
//! let src: Vec<u8> = (0..16).collect();
//! let mut dst = vec![0u8; 4];
//!
//! let src_view = View::new(&src, 0, src_extent, Strides::dense_nchw(src_extent)).unwrap();
//! let mut dst_view = ViewMut::new(&mut dst, 0, dst_extent, Strides::dense_nchw(dst_extent)).unwrap();
//! cpu::resize(&src_view, &mut dst_view, ResizeAlgorithm::Nearest).unwrap();
//! assert_eq!(dst, vec![0, 2, 8, 10]);
//! ```

pub mod convolution;
pub mod cpu;
pub mod error;
pub mod plan;
pub mod reorder;
pub mod sample;
pub mod view;

pub use error::ScaleError;
pub use plan::{AxisPlan, ResizeAlgorithm, ScaleDirection, Size, Tap};
pub use sample::Sample;
pub use view::{Extent, Strides, View, ViewMut};
