//! # Error Handling
//!
//! Every fallible operation of the preprocessing engine returns a
//! [`PreprocessResult`]. Errors are raised synchronously at the point of
//! failure, never retried internally and never swallowed: resizing and
//! conversion are deterministic, so repeating a failed call with the same
//! inputs fails the same way.
//!
//! ## Error Kinds
//!
//! - `Allocation`: a tensor or scratch buffer could not be allocated
//! - `OutOfBounds`: an ROI, element index or byte range falls outside a buffer
//! - `ShapeMismatch`: extents, batch/channel counts or precisions disagree
//! - `UnsupportedAlgorithm`: the resize selector is unknown or cannot run on the data
//! - `Config`, `Io`, `External`: configuration, file and third-party failures
//!
//! Each kind carries an [`ErrorContext`] with a timestamp, the failing
//! operation, a recovery suggestion, a severity and free-form metadata.
//!
//! ## Usage
//!
//! ```rust
//! use roi_preprocess::error::{HasRecoverySuggestion, PreprocessError, Retryable};
//!
//! let error = PreprocessError::shape_mismatch("convert", "[1x3x4x4]", "[1x1x4x4]")
//!     .with_context("converting scratch into network input")
//!     .with_metadata("input", "data");
//!
//! assert_eq!(error.category(), "shape_mismatch");
//! assert!(!error.is_retryable());
//! assert!(error.recovery_suggestion().is_some());
//! ```

use std::{collections::HashMap, error::Error as StdError, time::SystemTime};

use roi_scale::ScaleError;
use thiserror::Error;

/// Severity levels for errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Debug,
    Info,
    Warning,
    /// Affects the current call only
    Error,
    /// The process is short on resources
    Critical,
    /// Cannot be fixed without changing the caller's setup
    Fatal,
}

/// Metadata about when and where an error occurred
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// When the error occurred
    pub timestamp: SystemTime,
    /// The operation being performed when the error occurred
    pub operation: Option<String>,
    /// Additional context about the error
    pub context: Option<String>,
    /// Suggested recovery action
    pub recovery_suggestion: Option<String>,
    /// Error severity level
    pub severity: ErrorSeverity,
    /// Whether repeating the call may succeed
    pub retryable: bool,
    /// Additional metadata as key-value pairs
    pub metadata: HashMap<String, String>,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            timestamp: SystemTime::now(),
            operation: None,
            context: None,
            recovery_suggestion: None,
            severity: ErrorSeverity::Error,
            retryable: false,
            metadata: HashMap::new(),
        }
    }
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_recovery_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.recovery_suggestion = Some(suggestion.into());
        self
    }

    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

fn path_suffix(path: &Option<String>) -> String {
    path.as_ref().map(|p| format!(" on '{p}'")).unwrap_or_default()
}

/// Base error type for the preprocessing engine
#[derive(Debug, Error)]
pub enum PreprocessError {
    /// Buffer allocation failures
    #[error("allocation of {requested} bytes for {what} failed: {reason}")]
    Allocation {
        what: String,
        requested: usize,
        reason: String,
        context: ErrorContext,
    },
    /// Index, ROI or byte range outside a buffer
    #[error("{what} out of bounds: {reason}")]
    OutOfBounds {
        what: String,
        reason: String,
        context: ErrorContext,
    },
    /// Incompatible extents, batch/channel counts or precisions
    #[error("shape mismatch during {operation}: expected {expected}, got {actual}")]
    ShapeMismatch {
        operation: String,
        expected: String,
        actual: String,
        context: ErrorContext,
    },
    /// Unknown selector, or a selector that cannot run on the given data
    #[error("resize algorithm '{algorithm}' is not supported: {reason}")]
    UnsupportedAlgorithm {
        algorithm: String,
        reason: String,
        context: ErrorContext,
    },
    /// Configuration validation errors
    #[error("invalid configuration for '{field}' (value: {value}): {reason}")]
    Config {
        field: String,
        value: String,
        reason: String,
        context: ErrorContext,
    },
    /// I/O errors
    #[error("I/O error during {operation}{}: {source}", path_suffix(.path))]
    Io {
        operation: String,
        path: Option<String>,
        source: std::io::Error,
        context: ErrorContext,
    },
    /// External library errors
    #[error("external library error in {library}: {source}")]
    External {
        library: String,
        source: Box<dyn StdError + Send + Sync>,
        context: ErrorContext,
    },
}

impl PreprocessError {
    pub fn allocation(what: impl Into<String>, requested: usize, reason: impl Into<String>) -> Self {
        Self::Allocation {
            what: what.into(),
            requested,
            reason: reason.into(),
            context: ErrorContext::new()
                .with_severity(ErrorSeverity::Critical)
                .with_recovery_suggestion(
                    "Reduce the destination or ROI extent, or raise max_tensor_bytes",
                ),
        }
    }

    pub fn out_of_bounds(what: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::OutOfBounds {
            what: what.into(),
            reason: reason.into(),
            context: ErrorContext::new()
                .with_recovery_suggestion("Keep offsets plus extents within the buffer dims"),
        }
    }

    pub fn shape_mismatch(
        operation: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::ShapeMismatch {
            operation: operation.into(),
            expected: expected.into(),
            actual: actual.into(),
            context: ErrorContext::new().with_recovery_suggestion(
                "Check batch, channel and spatial extents of the ROI against the destination",
            ),
        }
    }

    pub fn unsupported_algorithm(algorithm: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsupportedAlgorithm {
            algorithm: algorithm.into(),
            reason: reason.into(),
            context: ErrorContext::new()
                .with_recovery_suggestion("Use one of: none, nearest, bilinear, area, lanczos3"),
        }
    }

    pub fn config(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Config {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
            context: ErrorContext::new().with_severity(ErrorSeverity::Fatal),
        }
    }

    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            path: None,
            source,
            context: ErrorContext::new(),
        }
    }

    pub fn io_with_path(
        operation: impl Into<String>,
        path: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Self::Io {
            operation: operation.into(),
            path: Some(path.into()),
            source,
            context: ErrorContext::new(),
        }
    }

    pub fn external(
        library: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            library: library.into(),
            source: Box::new(source),
            context: ErrorContext::new(),
        }
    }

    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::Allocation { context, .. }
            | Self::OutOfBounds { context, .. }
            | Self::ShapeMismatch { context, .. }
            | Self::UnsupportedAlgorithm { context, .. }
            | Self::Config { context, .. }
            | Self::Io { context, .. }
            | Self::External { context, .. } => context,
        }
    }

    pub fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            Self::Allocation { context, .. }
            | Self::OutOfBounds { context, .. }
            | Self::ShapeMismatch { context, .. }
            | Self::UnsupportedAlgorithm { context, .. }
            | Self::Config { context, .. }
            | Self::Io { context, .. }
            | Self::External { context, .. } => context,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context_mut().context = Some(context.into());
        self
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.context_mut().operation = Some(operation.into());
        self
    }

    pub fn with_recovery_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context_mut().recovery_suggestion = Some(suggestion.into());
        self
    }

    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.context_mut().severity = severity;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context_mut().metadata.insert(key.into(), value.into());
        self
    }

    /// Marks an `Io` or `External` error as worth repeating. Has no effect on
    /// the deterministic kinds.
    pub fn retryable(mut self) -> Self {
        self.context_mut().retryable = true;
        self
    }

    /// Short machine-readable name of the error kind
    pub fn category(&self) -> &'static str {
        match self {
            Self::Allocation { .. } => "allocation",
            Self::OutOfBounds { .. } => "out_of_bounds",
            Self::ShapeMismatch { .. } => "shape_mismatch",
            Self::UnsupportedAlgorithm { .. } => "unsupported_algorithm",
            Self::Config { .. } => "config",
            Self::Io { .. } => "io",
            Self::External { .. } => "external",
        }
    }
}

/// Result type alias using the engine's error type
pub type PreprocessResult<T> = Result<T, PreprocessError>;

/// Trait for errors that can be retried
pub trait Retryable {
    fn is_retryable(&self) -> bool;

    /// Recommended retry delay in milliseconds
    fn retry_delay_ms(&self) -> Option<u64> {
        None
    }
}

impl Retryable for PreprocessError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Allocation { .. }
            | Self::OutOfBounds { .. }
            | Self::ShapeMismatch { .. }
            | Self::UnsupportedAlgorithm { .. }
            | Self::Config { .. } => false,
            Self::Io { context, .. } | Self::External { context, .. } => context.retryable,
        }
    }

    fn retry_delay_ms(&self) -> Option<u64> {
        match self {
            Self::Io { .. } if self.is_retryable() => Some(100),
            _ => None,
        }
    }
}

/// Trait for errors with severity levels
pub trait HasSeverity {
    fn severity(&self) -> ErrorSeverity;
}

impl HasSeverity for PreprocessError {
    fn severity(&self) -> ErrorSeverity {
        self.context().severity
    }
}

/// Trait for errors that provide recovery suggestions
pub trait HasRecoverySuggestion {
    fn recovery_suggestion(&self) -> Option<&str>;
}

impl HasRecoverySuggestion for PreprocessError {
    fn recovery_suggestion(&self) -> Option<&str> {
        self.context().recovery_suggestion.as_deref()
    }
}

/// Error classification utilities
pub mod classify {
    use super::*;

    /// The caller passed arguments that can never succeed as given
    pub fn is_caller_error(error: &PreprocessError) -> bool {
        matches!(
            error,
            PreprocessError::OutOfBounds { .. }
                | PreprocessError::ShapeMismatch { .. }
                | PreprocessError::UnsupportedAlgorithm { .. }
                | PreprocessError::Config { .. }
        )
    }

    pub fn is_resource_exhaustion(error: &PreprocessError) -> bool {
        matches!(error, PreprocessError::Allocation { .. })
    }

    pub fn is_fatal(error: &PreprocessError) -> bool {
        matches!(error, PreprocessError::Config { .. }) || error.severity() == ErrorSeverity::Fatal
    }

    /// Higher numbers mean higher priority
    pub fn priority(error: &PreprocessError) -> u8 {
        match error.severity() {
            ErrorSeverity::Debug => 0,
            ErrorSeverity::Info => 1,
            ErrorSeverity::Warning => 2,
            ErrorSeverity::Error => 3,
            ErrorSeverity::Critical => 4,
            ErrorSeverity::Fatal => 5,
        }
    }
}

impl From<std::io::Error> for PreprocessError {
    fn from(error: std::io::Error) -> Self {
        Self::io("unknown", error)
    }
}

impl From<ScaleError> for PreprocessError {
    fn from(error: ScaleError) -> Self {
        match error {
            ScaleError::ViewOutOfBounds { .. } => Self::out_of_bounds("view", error.to_string()),
            ScaleError::ExtentMismatch { operation, src, dst } => {
                Self::shape_mismatch(operation, dst.to_string(), src.to_string())
            }
            ScaleError::EmptyExtent { operation, extent } => {
                Self::shape_mismatch(operation, "non-empty extent", extent.to_string())
            }
            ScaleError::Unsupported { algorithm, reason } => {
                Self::unsupported_algorithm(algorithm.name(), reason)
            }
            ScaleError::UnknownAlgorithm(name) => {
                Self::unsupported_algorithm(name, "unknown selector")
            }
            other @ (ScaleError::Fir(_) | ScaleError::ImageBuf(_)) => {
                Self::external("fast_image_resize", other)
            }
        }
    }
}

impl From<image::ImageError> for PreprocessError {
    fn from(error: image::ImageError) -> Self {
        Self::external("image", error)
    }
}

impl From<serde_json::Error> for PreprocessError {
    fn from(error: serde_json::Error) -> Self {
        Self::external("serde_json", error)
    }
}
