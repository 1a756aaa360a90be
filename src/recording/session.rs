// src/recording/session.rs
//! Recording session state
//!
//! One session spans a page lifetime: it fixes the start time, owns the
//! record buffer and holds the single pending flush timer.

use crate::dom::NodeId;
use crate::recording::buffer::RecordBuffer;
use chrono::{DateTime, Utc};
use tokio::time::Instant;

/// Pending flush deadline
///
/// Each reschedule produces a new generation; a fire carrying an older
/// generation is stale and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushTimer {
    pub deadline: Instant,
    pub generation: u64,
}

/// State of one recording session
#[derive(Debug)]
pub struct Session {
    started_at: DateTime<Utc>,
    started: Instant,
    last_flush_at: Option<Instant>,
    scope: NodeId,
    buffer: RecordBuffer,
    timer: Option<FlushTimer>,
    generation: u64,
}

impl Session {
    /// Open a session observing the subtree rooted at `scope`
    pub fn new(scope: NodeId, started_at: DateTime<Utc>, now: Instant) -> Self {
        Self {
            started_at,
            started: now,
            last_flush_at: None,
            scope,
            buffer: RecordBuffer::new(),
            timer: None,
            generation: 0,
        }
    }

    /// Wall-clock start time
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn last_flush_at(&self) -> Option<Instant> {
        self.last_flush_at
    }

    pub(crate) fn mark_flushed(&mut self, now: Instant) {
        self.last_flush_at = Some(now);
    }

    /// Root of the observed subtree
    pub fn scope(&self) -> NodeId {
        self.scope
    }

    /// Milliseconds since session start, never decreasing
    pub fn elapsed_ms(&self, now: Instant) -> u64 {
        now.saturating_duration_since(self.started).as_millis() as u64
    }

    pub fn buffer(&self) -> &RecordBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut RecordBuffer {
        &mut self.buffer
    }

    pub fn timer(&self) -> Option<FlushTimer> {
        self.timer
    }

    /// Replace any pending timer with one firing at `deadline`
    pub fn schedule(&mut self, deadline: Instant) -> FlushTimer {
        self.generation += 1;
        let timer = FlushTimer {
            deadline,
            generation: self.generation,
        };
        self.timer = Some(timer);
        timer
    }

    pub fn cancel_timer(&mut self) {
        self.timer = None;
    }

    /// Whether `generation` is the pending timer
    pub fn is_current(&self, generation: u64) -> bool {
        self.timer.map(|t| t.generation) == Some(generation)
    }
}
