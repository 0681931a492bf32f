//! Unit tests for individual components
//!
//! Property tests of the tensor buffer, the resize stage and the
//! layout/precision converter, run through the public API.

#[path = "../common/mod.rs"]
mod common;

mod buffers;
mod processing;
