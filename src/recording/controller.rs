// src/recording/controller.rs
//! Batch controller
//!
//! Owns the session and decides when buffered records leave the process.
//!
//! ```text
//!            start()                 threshold reached / timer fired
//!   Idle ───────────→ Armed ─────────────────────────────→ Flushing
//!                       ↑                                      │
//!                       └──────── reset buffer, re-arm ────────┘
//!                       │
//!                       └── teardown() → final flush → TornDown
//! ```
//!
//! Everything runs synchronously on the caller's thread. Time is passed in
//! by the host, which keeps the state machine deterministic. Delivery is
//! at most once: a flush resets the buffer whether or not the payload
//! reached anyone.

use crate::dom::{DomTree, NodeId, NodeType};
use crate::recording::buffer::RecordGroups;
use crate::recording::classifier::Classifier;
use crate::recording::codec::PayloadCodec;
use crate::recording::input::PointerThrottle;
use crate::recording::occurrence::Occurrence;
use crate::recording::session::{FlushTimer, Session};
use crate::recording::sink::PayloadSink;
use crate::utils::config::RecorderConfig;
use crate::utils::errors::{RecorderError, Result};
use chrono::Utc;
use serde_json::json;
use tokio::time::Instant;
use tracing::{debug, error, info, trace, warn};

/// Controller lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// No session
    Idle,

    /// Session open, timer pending
    Armed,

    /// Serialize, compress and emit in progress
    Flushing,

    /// Terminal
    TornDown,
}

/// Result of one flush
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing buffered, only the timer was re-armed
    Empty,

    /// Payload handed to the sink
    Emitted { records: usize, bytes: usize },

    /// No sink configured, records dropped
    Discarded { records: usize },

    /// Encoding failed, records dropped
    Failed { records: usize },
}

/// Controller statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControllerStats {
    pub occurrences_seen: u64,
    pub records_buffered: u64,
    pub occurrences_dropped: u64,
    pub flushes: u64,
    pub payloads_emitted: u64,
    pub bytes_emitted: u64,
}

/// Classification and batching state machine
pub struct BatchController {
    config: RecorderConfig,
    classifier: Classifier,
    codec: PayloadCodec,
    throttle: PointerThrottle,
    sink: Option<Box<dyn PayloadSink>>,
    state: ControllerState,
    session: Option<Session>,
    stats: ControllerStats,
}

impl BatchController {
    /// Create a controller; without a sink flushes still reset the buffer
    pub fn new(config: RecorderConfig, sink: Option<Box<dyn PayloadSink>>) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            classifier: Classifier::new(config.change_policy),
            codec: PayloadCodec::new(config.compress),
            throttle: PointerThrottle::new(config.pointer_move_threshold),
            config,
            sink,
            state: ControllerState::Idle,
            session: None,
            stats: ControllerStats::default(),
        })
    }

    /// Create a controller emitting through `sink`
    pub fn with_sink<S: PayloadSink + 'static>(config: RecorderConfig, sink: S) -> Result<Self> {
        Self::new(config, Some(Box::new(sink)))
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn stats(&self) -> &ControllerStats {
        &self.stats
    }

    pub fn codec(&self) -> &PayloadCodec {
        &self.codec
    }

    /// Pending flush timer, if any
    pub fn timer(&self) -> Option<FlushTimer> {
        match self.state {
            ControllerState::Armed => self.session.as_ref().and_then(Session::timer),
            _ => None,
        }
    }

    /// Start a session observing `target` (`None` for the whole document)
    ///
    /// A target that cannot be found leaves the controller inert.
    pub fn start<D: DomTree + ?Sized>(
        &mut self,
        dom: &D,
        target: Option<&str>,
        now: Instant,
    ) -> Result<()> {
        if self.state != ControllerState::Idle {
            return Err(RecorderError::InvalidState(format!(
                "cannot start a session while {:?}",
                self.state
            )));
        }

        let scope = match target {
            Some(selector) => dom.query_selector(selector).ok_or_else(|| {
                error!("Initialization failed: target {:?} not found", selector);
                RecorderError::InitializationFailed(format!("target {:?} not found", selector))
            })?,
            None => dom.root(),
        };

        let session = Session::new(scope, Utc::now(), now);
        let started_at = session.started_at();
        self.session = Some(session);
        self.state = ControllerState::Armed;
        self.throttle.reset();
        self.reschedule(now);

        if self.config.send_initial {
            self.send_initial(dom, started_at.timestamp_millis());
        }

        info!("Recording session started");
        Ok(())
    }

    fn send_initial<D: DomTree + ?Sized>(&mut self, dom: &D, started_at_ms: i64) {
        let viewport = dom.viewport();
        let value = json!({
            "init": [started_at_ms, viewport.inner_width, viewport.inner_height]
        });

        match self.codec.encode_value(&value) {
            Ok(payload) => self.emit(payload),
            Err(e) => warn!("Failed to encode initial record: {}", e),
        }
    }

    /// Feed one occurrence; returns whether a record was buffered
    pub fn on_occurrence<D: DomTree + ?Sized>(
        &mut self,
        dom: &D,
        occurrence: &Occurrence,
        now: Instant,
    ) -> bool {
        if self.state != ControllerState::Armed {
            trace!("Ignoring occurrence while {:?}", self.state);
            return false;
        }
        let Some(session) = self.session.as_mut() else {
            return false;
        };

        self.stats.occurrences_seen += 1;

        if let Occurrence::PointerMove { page_x, page_y, .. } = occurrence {
            if !self.throttle.admit(*page_x, *page_y) {
                return false;
            }
        }

        let record = match occurrence.kind() {
            Some(kind) if in_scope(dom, session.scope(), occurrence) => self
                .classifier
                .classify(dom, occurrence, session.elapsed_ms(now))
                .map(|record| (kind, record)),
            _ => None,
        };

        let Some((kind, record)) = record else {
            self.stats.occurrences_dropped += 1;
            metrics::counter!("underhand_occurrences_dropped_total").increment(1);
            return false;
        };

        let buffer = session.buffer_mut();
        buffer.push(record, kind.category_key());
        let count = buffer.total_count();

        self.stats.records_buffered += 1;
        metrics::counter!("underhand_records_total", "category" => kind.category_key().as_str())
            .increment(1);

        if count >= self.config.actions_threshold {
            debug!("Buffered {} records, flushing early", count);
            self.flush(now);
        }

        true
    }

    /// Timer fire for `generation`; stale generations are ignored
    pub fn on_timer(&mut self, generation: u64, now: Instant) -> Option<FlushOutcome> {
        if self.state != ControllerState::Armed {
            return None;
        }
        if !self.session.as_ref()?.is_current(generation) {
            trace!("Ignoring stale timer generation {}", generation);
            return None;
        }

        Some(self.flush(now))
    }

    /// Flush buffered records now and re-arm the timer
    pub fn flush(&mut self, now: Instant) -> FlushOutcome {
        if self.state != ControllerState::Armed {
            return FlushOutcome::Empty;
        }
        let Some(session) = self.session.as_mut() else {
            return FlushOutcome::Empty;
        };

        self.state = ControllerState::Flushing;

        let outcome = if session.buffer().is_empty() {
            FlushOutcome::Empty
        } else {
            let records = session.buffer().total_count();
            let groups = session.buffer_mut().take();
            session.mark_flushed(now);
            self.deliver(&groups, records)
        };

        self.state = ControllerState::Armed;
        self.reschedule(now);

        outcome
    }

    fn deliver(&mut self, groups: &RecordGroups, records: usize) -> FlushOutcome {
        self.stats.flushes += 1;
        metrics::counter!("underhand_flushes_total").increment(1);

        let payload = match self.codec.encode_groups(groups) {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to encode {} records, dropping them: {}", records, e);
                return FlushOutcome::Failed { records };
            }
        };

        if self.sink.is_none() {
            debug!("No sink configured, dropping {} records", records);
            return FlushOutcome::Discarded { records };
        }

        let bytes = payload.len();
        debug!("Flushing {} records ({} bytes)", records, bytes);
        self.emit(payload);

        FlushOutcome::Emitted { records, bytes }
    }

    fn emit(&mut self, payload: String) {
        let Some(sink) = self.sink.as_ref() else {
            return;
        };

        let bytes = payload.len();
        sink.send(payload);

        self.stats.payloads_emitted += 1;
        self.stats.bytes_emitted += bytes as u64;
        metrics::histogram!("underhand_payload_bytes").record(bytes as f64);
    }

    fn reschedule(&mut self, now: Instant) {
        let interval = self.config.flush_interval();
        let Some(session) = self.session.as_mut() else {
            return;
        };

        match now.checked_add(interval) {
            Some(deadline) => {
                session.schedule(deadline);
            }
            None => {
                warn!("Flush interval {:?} overflows the clock, timed flushes disabled", interval);
                session.cancel_timer();
            }
        }
    }

    /// Final flush and timer cancellation; no transitions afterwards
    pub fn teardown(&mut self, now: Instant) -> Option<FlushOutcome> {
        let outcome = match self.state {
            ControllerState::TornDown => return None,
            ControllerState::Armed => Some(self.flush(now)),
            ControllerState::Idle | ControllerState::Flushing => None,
        };

        if let Some(session) = self.session.as_mut() {
            session.cancel_timer();
        }
        self.state = ControllerState::TornDown;

        info!("Recording session torn down");
        outcome
    }
}

/// Whether the occurrence belongs to the observed subtree
///
/// Pointer moves, resizes and document scrolls are window-level and always
/// pass.
fn in_scope<D: DomTree + ?Sized>(dom: &D, scope: NodeId, occurrence: &Occurrence) -> bool {
    if scope == dom.root() {
        return true;
    }

    match occurrence {
        Occurrence::PointerMove { .. } | Occurrence::Resize => true,
        Occurrence::Scroll { target } if dom.node_type(*target) == Some(NodeType::Document) => true,
        _ => occurrence
            .target()
            .map(|target| dom.contains(scope, target))
            .unwrap_or(false),
    }
}
