//! # Core Infrastructure Module
//!
//! Tensor memory, scratch-buffer reuse and timing spans shared by the
//! processing stages and the preprocessing session.

pub mod profiling;
pub mod scratch;
pub mod tensor;
