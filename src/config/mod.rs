//! # Configuration Module
//!
//! Session configuration and its validation.

pub mod config;

pub use config::PreprocessConfig;
