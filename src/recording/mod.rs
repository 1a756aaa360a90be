// src/recording/mod.rs
//! Interaction recording
//!
//! This module turns raw occurrences into compact batched payloads:
//!
//! - **Occurrence**: Tagged union of input events and DOM mutations
//! - **Classifier**: Occurrence → typed record, or dropped
//! - **Record**: Fixed-shape records and their wire tuples
//! - **Buffer**: Records grouped by category key
//! - **Codec / Compressor**: JSON text, zstd and base64
//! - **Controller**: Count and time based flush state machine
//! - **Recorder**: tokio task hosting a controller for one document
//!
//! # Architecture
//!
//! ```text
//! Input source → Occurrence → classify() → RecordBuffer
//!                                               ↓
//!                          count ≥ threshold  or  timer fired
//!                                               ↓
//!                               {"cl": [[...]], "mua": [[...]]}
//!                                               ↓
//!                                     zstd + base64 (optional)
//!                                               ↓
//!                                       PayloadSink::send()
//! ```

pub mod buffer;
pub mod classifier;
pub mod codec;
pub mod compressor;
pub mod controller;
pub mod input;
pub mod occurrence;
pub mod record;
pub mod recorder;
pub mod session;
pub mod sink;

// Re-export commonly used types
pub use buffer::{RecordBuffer, RecordGroups};
pub use classifier::Classifier;
pub use codec::PayloadCodec;
pub use compressor::Compressor;
pub use controller::{BatchController, ControllerState, ControllerStats, FlushOutcome};
pub use input::PointerThrottle;
pub use occurrence::{CategoryKey, Modifiers, Occurrence, OccurrenceKind};
pub use record::{KeyValue, Record};
pub use recorder::EventRecorder;
pub use session::{FlushTimer, Session};
pub use sink::{ChannelSink, PayloadSink};
