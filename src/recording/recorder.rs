// src/recording/recorder.rs
//! Session host driving the batch controller on a tokio task
//!
//! Occurrences are classified on the caller's thread, against the document
//! as it is at that moment. A background task owns the flush timer: it waits
//! on the pending deadline, an explicit flush request or shutdown. The
//! controller sits behind a mutex, so an occurrence is buffered, and any
//! threshold flush it triggers completes, before the next one is handled.

use crate::dom::DomTree;
use crate::recording::controller::{BatchController, ControllerStats};
use crate::recording::occurrence::Occurrence;
use crate::recording::session::FlushTimer;
use crate::recording::sink::PayloadSink;
use crate::utils::config::RecorderConfig;
use crate::utils::errors::{RecorderError, Result};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

enum Command {
    Flush,
    Shutdown,
}

/// Recorder bound to one live document
pub struct EventRecorder<D> {
    config: RecorderConfig,
    dom: Arc<RwLock<D>>,
    sink: Option<Box<dyn PayloadSink>>,
    controller: Option<Arc<Mutex<BatchController>>>,
    sender: Option<mpsc::UnboundedSender<Command>>,
    timer_handle: Option<JoinHandle<ControllerStats>>,
}

impl<D> EventRecorder<D>
where
    D: DomTree + Send + Sync + 'static,
{
    /// Create a recorder; nothing is observed until [`start`](Self::start)
    pub fn new(config: RecorderConfig, dom: Arc<RwLock<D>>) -> Self {
        Self {
            config,
            dom,
            sink: None,
            controller: None,
            sender: None,
            timer_handle: None,
        }
    }

    /// Deliver payloads to `sink`
    pub fn with_sink<S: PayloadSink + 'static>(mut self, sink: S) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Shared handle to the observed document
    pub fn dom(&self) -> Arc<RwLock<D>> {
        Arc::clone(&self.dom)
    }

    pub fn is_running(&self) -> bool {
        self.controller.is_some()
    }

    /// Start the session and the timer task
    ///
    /// Must be called inside a tokio runtime. On failure the recorder stays
    /// inert and every later [`record`](Self::record) fails.
    pub fn start(&mut self, target: Option<&str>) -> Result<()> {
        if self.timer_handle.is_some() {
            return Err(RecorderError::InvalidState("recorder already started".to_string()));
        }

        let mut controller = BatchController::new(self.config.clone(), self.sink.take())?;
        {
            let dom = self.dom.read();
            controller.start(&*dom, target, Instant::now())?;
        }

        info!("Starting recorder timer task");

        let controller = Arc::new(Mutex::new(controller));
        let (sender, commands) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run(Arc::clone(&controller), commands));

        self.controller = Some(controller);
        self.sender = Some(sender);
        self.timer_handle = Some(handle);
        Ok(())
    }

    /// Classify and buffer an occurrence against the current document
    ///
    /// Returns whether a record was buffered.
    pub fn record(&self, occurrence: Occurrence) -> Result<bool> {
        let controller = self.controller.as_ref().ok_or(RecorderError::RecorderStopped)?;
        let now = Instant::now();

        let dom = self.dom.read();
        let buffered = controller.lock().on_occurrence(&*dom, &occurrence, now);
        Ok(buffered)
    }

    /// Request an immediate flush
    pub fn flush(&self) -> Result<()> {
        self.sender
            .as_ref()
            .ok_or(RecorderError::RecorderStopped)?
            .send(Command::Flush)
            .map_err(|_| RecorderError::RecorderStopped)
    }

    /// Final flush, then stop the timer task
    pub async fn shutdown(&mut self) -> Result<ControllerStats> {
        info!("Shutting down recorder");

        // Dropping our handle lets the sink go once the task finishes.
        self.controller = None;
        if let Some(sender) = self.sender.take() {
            if sender.send(Command::Shutdown).is_err() {
                warn!("Recorder task already stopped");
            }
        }

        match self.timer_handle.take() {
            Some(handle) => handle
                .await
                .map_err(|e| RecorderError::InvalidState(format!("recorder task failed: {}", e))),
            None => Ok(ControllerStats::default()),
        }
    }
}

async fn run(
    controller: Arc<Mutex<BatchController>>,
    mut commands: mpsc::UnboundedReceiver<Command>,
) -> ControllerStats {
    loop {
        // A flush triggered from `record` re-arms with a later deadline; the
        // stale wake-up below is then ignored by generation.
        let timer = controller.lock().timer();

        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Flush) => {
                    let outcome = controller.lock().flush(Instant::now());
                    debug!("Explicit flush: {:?}", outcome);
                }
                Some(Command::Shutdown) | None => {
                    controller.lock().teardown(Instant::now());
                    break;
                }
            },

            Some(generation) = wait_for(timer) => {
                controller.lock().on_timer(generation, Instant::now());
            }
        }
    }

    let stats = controller.lock().stats().clone();
    stats
}

async fn wait_for(timer: Option<FlushTimer>) -> Option<u64> {
    match timer {
        Some(timer) => {
            tokio::time::sleep_until(timer.deadline).await;
            Some(timer.generation)
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Document, NodeId, Viewport};
    use crate::recording::occurrence::Modifiers;
    use crate::recording::sink::ChannelSink;
    use serde_json::{json, Value};
    use std::time::Duration;

    fn document() -> (Arc<RwLock<Document>>, NodeId) {
        let mut doc = Document::new();
        let root = doc.root();
        let body = doc.append_element(root, "body", &[]).unwrap();
        let foo = doc.append_element(body, "button", &[("id", "foo")]).unwrap();
        doc.set_viewport(Viewport {
            inner_width: 800,
            inner_height: 600,
            ..Default::default()
        });
        (Arc::new(RwLock::new(doc)), foo)
    }

    fn config(actions_threshold: usize, send_initial: bool) -> RecorderConfig {
        RecorderConfig {
            compress: false,
            send_any_secs: 10.0,
            actions_threshold,
            send_initial,
            ..Default::default()
        }
    }

    fn click(target: NodeId) -> Occurrence {
        Occurrence::Click {
            target,
            page_x: 10,
            page_y: 20,
            button: 1,
            modifiers: Modifiers::NONE,
        }
    }

    fn parse(payload: &str) -> Value {
        serde_json::from_str(payload).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_flush_delivers_payload() {
        let (dom, foo) = document();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut recorder = EventRecorder::new(config(100, true), dom).with_sink(ChannelSink::new(tx));
        let started = Instant::now();
        recorder.start(None).unwrap();

        let init = parse(&rx.recv().await.unwrap());
        assert_eq!(init["init"][1], json!(800));

        recorder.record(click(foo)).unwrap();
        let payload = parse(&rx.recv().await.unwrap());

        assert_eq!(payload, json!({"cl": [[0, "#foo", 10, 20, 1]]}));
        assert!(Instant::now() - started >= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_threshold_flush_beats_timer() {
        let (dom, foo) = document();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut recorder = EventRecorder::new(config(2, false), dom).with_sink(ChannelSink::new(tx));
        let started = Instant::now();
        recorder.start(None).unwrap();

        recorder.record(click(foo)).unwrap();
        recorder.record(click(foo)).unwrap();

        let payload = parse(&rx.recv().await.unwrap());
        assert_eq!(payload["cl"].as_array().unwrap().len(), 2);
        assert!(Instant::now() - started < Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_flushes_remaining() {
        let (dom, foo) = document();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut recorder = EventRecorder::new(config(100, false), dom).with_sink(ChannelSink::new(tx));
        recorder.start(None).unwrap();

        recorder.record(click(foo)).unwrap();
        recorder
            .record(Occurrence::Unsupported {
                kind: "wheel".to_string(),
            })
            .unwrap();
        let stats = recorder.shutdown().await.unwrap();

        assert_eq!(stats.occurrences_seen, 2);
        assert_eq!(stats.records_buffered, 1);
        assert_eq!(stats.payloads_emitted, 1);

        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_none());
        assert!(matches!(recorder.record(click(foo)), Err(RecorderError::RecorderStopped)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_flush() {
        let (dom, foo) = document();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut recorder = EventRecorder::new(config(100, false), dom).with_sink(ChannelSink::new(tx));
        let started = Instant::now();
        recorder.start(None).unwrap();

        recorder.record(click(foo)).unwrap();
        recorder.flush().unwrap();

        assert!(rx.recv().await.is_some());
        assert!(Instant::now() - started < Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reads_current_dom_state() {
        let (dom, foo) = document();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut recorder =
            EventRecorder::new(config(1, false), Arc::clone(&dom)).with_sink(ChannelSink::new(tx));
        recorder.start(None).unwrap();

        recorder.dom().write().set_attribute(foo, "title", "Send").unwrap();
        recorder
            .record(Occurrence::AttributeMutation {
                target: foo,
                attribute_name: "title".to_string(),
            })
            .unwrap();

        let payload = parse(&rx.recv().await.unwrap());
        assert_eq!(payload, json!({"mua": [[0, "#foo", "title", "Send"]]}));
    }

    #[tokio::test]
    async fn test_missing_target_keeps_recorder_inert() {
        let (dom, foo) = document();
        let mut recorder = EventRecorder::new(config(1, false), dom);

        let result = recorder.start(Some("#absent"));
        assert!(matches!(result, Err(RecorderError::InitializationFailed(_))));
        assert!(!recorder.is_running());
        assert!(matches!(recorder.record(click(foo)), Err(RecorderError::RecorderStopped)));
        assert_eq!(recorder.shutdown().await.unwrap(), ControllerStats::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_records_reflect_state_at_record_time() {
        let (dom, _) = document();
        let agree = {
            let mut doc = dom.write();
            let body = doc.parent(doc.query_selector("#foo").unwrap()).unwrap();
            doc.append_element(body, "input", &[("id", "agree"), ("type", "checkbox")])
                .unwrap()
        };
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut recorder =
            EventRecorder::new(config(3, false), Arc::clone(&dom)).with_sink(ChannelSink::new(tx));
        recorder.start(None).unwrap();

        dom.write().set_checked(agree, true).unwrap();
        assert!(recorder.record(Occurrence::Change { target: agree }).unwrap());
        dom.write().set_checked(agree, false).unwrap();
        assert!(recorder.record(Occurrence::Change { target: agree }).unwrap());

        tokio::time::advance(Duration::from_millis(250)).await;
        dom.write().set_checked(agree, true).unwrap();
        assert!(recorder.record(Occurrence::Change { target: agree }).unwrap());

        let payload = parse(&rx.recv().await.unwrap());
        assert_eq!(
            payload,
            json!({"ch": [[0, "#agree", "1"], [0, "#agree", "0"], [250, "#agree", "1"]]})
        );
    }
}
