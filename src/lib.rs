//! # ROI Input Preprocessing
//!
//! Turns a rectangular region of a source tensor into the exact shape, memory
//! layout and numeric precision a compiled network expects at one of its
//! inputs.
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//! - `core`: tensor buffers, scratch slots and the profiling hook
//! - `processing`: ROI descriptors, the resize stage and the layout/precision converter
//! - `session`: the per-input state machine that chains the stages
//! - `config`: session configuration and validation
//! - `imaging`: decoded images in and out of tensors
//!
//! The resize and reorder kernels themselves live in the `roi-scale` crate.
//!
//! ## Example
//!
//! ```rust
//! use roi_preprocess::{
//!     Dims, Layout, PreProcessSession, Precision, ResizeAlgorithm, Roi, RoiBlob, TensorBuffer,
//!     TensorDesc,
//! };
//!
//! # fn main() -> Result<(), roi_preprocess::PreprocessError> {
//! let frame = TensorBuffer::allocate(TensorDesc::new(
//!     Precision::U8,
//!     Layout::NHWC,
//!     Dims::new(1, 3, 480, 640),
//! )?)?;
//! let input = TensorBuffer::allocate(TensorDesc::new(
//!     Precision::FP32,
//!     Layout::NCHW,
//!     Dims::new(1, 3, 224, 224),
//! )?)?;
//!
//! let mut session = PreProcessSession::new();
//! session.set_roi_blob(Some(RoiBlob::new(frame, Roi::new(80, 40, 320, 320))?));
//! session.execute(&input, ResizeAlgorithm::Bilinear)?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod imaging;
pub mod processing;
pub mod session;

/// Re-export error types for convenience
pub use error::{
    ErrorContext, ErrorSeverity, HasRecoverySuggestion, HasSeverity, PreprocessError,
    PreprocessResult, Retryable,
};

pub use crate::config::PreprocessConfig;
pub use crate::core::profiling::{
    NoopProfiler, ProfilingRegistry, ProfilingReport, ProfilingSink, SpanGuard, SpanSummary,
    spans,
};
pub use crate::core::scratch::{AllocationPolicy, ScratchSlot, ScratchStats};
pub use crate::core::tensor::{
    BlobRef, Dims, Element, Layout, MAX_TENSOR_BYTES, Precision, TensorBuffer, TensorDesc,
};
pub use processing::{Region, Roi, RoiBlob};
pub use roi_scale::ResizeAlgorithm;
pub use session::{
    ExecutionPlan, PreProcessSession, PreProcessSessionBuilder, Route, SessionMap, SessionState,
};

#[doc(hidden)]
pub use half;

/// One-shot preprocessing of `roi` into `dest` with a throwaway session.
///
/// Recording goes to [`ProfilingRegistry::global`]. Callers that execute
/// repeatedly should keep a [`PreProcessSession`] so scratch tensors are
/// reused.
pub fn preprocess(roi: RoiBlob, dest: &BlobRef, algorithm: ResizeAlgorithm) -> PreprocessResult<()> {
    let mut session = PreProcessSession::new();
    session.set_roi_blob(Some(roi));
    session.execute(dest, algorithm)
}
