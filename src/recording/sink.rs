// src/recording/sink.rs
//! Payload sinks
//!
//! A sink receives each encoded payload exactly once and is never asked for
//! a result. Delivery errors belong to the sink; the controller neither
//! waits nor retries.

use tokio::sync::mpsc;
use tracing::warn;

/// Destination for encoded payloads
pub trait PayloadSink: Send {
    fn send(&self, payload: String);
}

impl<F> PayloadSink for F
where
    F: Fn(String) + Send,
{
    fn send(&self, payload: String) {
        self(payload)
    }
}

/// Forwards payloads to an unbounded tokio channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<String>,
}

impl ChannelSink {
    pub fn new(sender: mpsc::UnboundedSender<String>) -> Self {
        Self { sender }
    }
}

impl PayloadSink for ChannelSink {
    fn send(&self, payload: String) {
        if self.sender.send(payload).is_err() {
            warn!("Payload receiver dropped, payload discarded");
        }
    }
}
