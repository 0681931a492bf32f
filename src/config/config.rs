//! # Session Configuration
//!
//! Settings shared by every preprocessing session: the algorithm used when a
//! caller does not pick one, allocation limits for scratch tensors, and
//! whether timing spans are recorded.
//!
//! ## Configuration Parameters
//!
//! | Parameter | Type | Default | Description |
//! |-----------|------|---------|-------------|
//! | `default_algorithm` | `ResizeAlgorithm` | `bilinear` | Algorithm for [`PreProcessSession::execute_default`](crate::PreProcessSession::execute_default) |
//! | `max_tensor_bytes` | `usize` | `isize::MAX` | Upper bound for one scratch allocation |
//! | `mapped_threshold_bytes` | `Option<usize>` | `None` | Scratch tensors at least this large are memory-mapped |
//! | `profiling` | `bool` | `true` | Record `Preprocessing`/`Resize`/`Reorder` spans |
//!
//! ## Examples
//!
//! ```rust
//! use roi_preprocess::config::config::PreprocessConfig;
//! use roi_preprocess::ResizeAlgorithm;
//!
//! let config = PreprocessConfig::new(ResizeAlgorithm::Area, 64 << 20, Some(8 << 20), false);
//! assert!(config.validate().is_ok());
//! ```

use roi_scale::ResizeAlgorithm;

use crate::core::scratch::AllocationPolicy;
use crate::core::tensor::MAX_TENSOR_BYTES;
use crate::error::{PreprocessError, PreprocessResult};

/// Configuration for a preprocessing session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreprocessConfig {
    /// Algorithm used by `execute_default`.
    pub default_algorithm: ResizeAlgorithm,

    /// Largest scratch tensor a session may allocate, in bytes.
    /// Must be greater than 0.
    pub max_tensor_bytes: usize,

    /// Scratch tensors of at least this many bytes are backed by an anonymous
    /// memory map instead of the heap. `None` keeps everything on the heap.
    /// Must not exceed `max_tensor_bytes`.
    pub mapped_threshold_bytes: Option<usize>,

    /// Record timing spans. When `false` the session uses a no-op sink.
    pub profiling: bool,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            default_algorithm: ResizeAlgorithm::Bilinear,
            max_tensor_bytes: MAX_TENSOR_BYTES,
            mapped_threshold_bytes: None,
            profiling: true,
        }
    }
}

impl PreprocessConfig {
    pub fn new(
        default_algorithm: ResizeAlgorithm,
        max_tensor_bytes: usize,
        mapped_threshold_bytes: Option<usize>,
        profiling: bool,
    ) -> Self {
        Self {
            default_algorithm,
            max_tensor_bytes,
            mapped_threshold_bytes,
            profiling,
        }
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> PreprocessResult<()> {
        if self.max_tensor_bytes == 0 {
            return Err(PreprocessError::config(
                "max_tensor_bytes",
                "0",
                "must be greater than 0",
            ));
        }
        if self.max_tensor_bytes > MAX_TENSOR_BYTES {
            return Err(PreprocessError::config(
                "max_tensor_bytes",
                self.max_tensor_bytes.to_string(),
                format!("must not exceed {MAX_TENSOR_BYTES}"),
            ));
        }
        match self.mapped_threshold_bytes {
            Some(0) => Err(PreprocessError::config(
                "mapped_threshold_bytes",
                "0",
                "must be greater than 0 when set",
            )),
            Some(t) if t > self.max_tensor_bytes => Err(PreprocessError::config(
                "mapped_threshold_bytes",
                t.to_string(),
                "must not exceed max_tensor_bytes",
            )),
            _ => Ok(()),
        }
    }

    /// Allocation policy for scratch slots.
    pub fn allocation_policy(&self) -> AllocationPolicy {
        AllocationPolicy {
            max_bytes: self.max_tensor_bytes,
            mapped_threshold: self.mapped_threshold_bytes,
        }
    }
}
