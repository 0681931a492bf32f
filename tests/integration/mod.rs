//! Integration tests combining multiple components
//!
//! These tests drive whole sessions and the `roiprep` binary with real
//! tensors, images and files.

#[path = "../common/mod.rs"]
mod common;

mod cli;
