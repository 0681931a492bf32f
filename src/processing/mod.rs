//! # Processing Module
//!
//! The stages a preprocessing call is built from: region-of-interest
//! descriptors, the resize stage and the layout/precision converter.

pub mod convert;
pub mod resize;
pub mod roi;

// Re-export commonly used types for convenience
pub use convert::{convert, convert_region};
pub use resize::{Resampler, resize};
pub use roi::{Region, Roi, RoiBlob};
