// src/lib.rs
//! Underhand interaction recorder
//!
//! Observes user input and DOM changes inside a document subtree, turns each
//! occurrence into a compact typed record, and periodically hands a
//! serialized (optionally compressed) batch to a sink.
//!
//! # Architecture
//!
//! - **dom**: Document access and selector resolution
//! - **recording**: Classification, buffering, codec and flush control
//! - **observability**: Tracing and metrics setup
//! - **utils**: Configuration and errors

// Public module exports
pub mod dom;
pub mod observability;
pub mod recording;
pub mod utils;

// Re-export commonly used types
pub use dom::{Document, DomTree, NodeId};
pub use recording::{BatchController, EventRecorder, Occurrence, PayloadSink};
pub use utils::config::RecorderConfig;
pub use utils::errors::{RecorderError, Result};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
