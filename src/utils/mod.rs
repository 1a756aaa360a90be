// src/utils/mod.rs
//! Common utilities shared across the recorder
//!
//! - **config**: Recorder configuration loading and validation
//! - **errors**: Error types and the crate-wide `Result` alias

pub mod config;
pub mod errors;

pub use config::{ChangeInputPolicy, RecorderConfig};
pub use errors::{RecorderError, Result};
