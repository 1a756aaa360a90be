// src/main.rs
//! Underhand recorder
//!
//! Replays a stream of occurrences against a document snapshot and prints
//! each emitted payload on its own line.
//!
//! Occurrences are read from stdin as JSON lines, e.g.
//! `{"kind":"click","target":3,"page_x":10,"page_y":20,"button":1}`.

use anyhow::{Context, Result};
use clap::Parser;
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use underhand::dom::{Document, DomSnapshot};
use underhand::observability::{init_metrics, init_tracing};
use underhand::recording::{ChannelSink, EventRecorder, Occurrence};
use underhand::utils::config::RecorderConfig;
use underhand::RecorderError;

#[derive(Debug, Parser)]
#[command(name = "underhand", version, about = "Record DOM interactions into batched payloads")]
struct Args {
    /// Document snapshot (JSON)
    #[arg(long)]
    dom: PathBuf,

    /// Selector of the observed subtree (document root when omitted)
    #[arg(long)]
    target: Option<String>,

    /// Configuration file; `UNDERHAND_*` environment variables override it
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing()?;
    let metrics = init_metrics()?;

    info!("Starting underhand v{}", underhand::VERSION);

    let config = RecorderConfig::load(args.config.as_deref())?;
    info!("Configuration loaded: {:?}", config);

    let raw = tokio::fs::read_to_string(&args.dom)
        .await
        .with_context(|| format!("reading snapshot {}", args.dom.display()))?;
    let snapshot: DomSnapshot = serde_json::from_str(&raw).context("parsing snapshot")?;
    let document = Document::from_snapshot(&snapshot)?;

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let printer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(payload) = rx.recv().await {
            stdout.write_all(payload.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
        Ok::<_, std::io::Error>(())
    });

    let mut recorder = EventRecorder::new(config, Arc::new(RwLock::new(document)))
        .with_sink(ChannelSink::new(tx));
    recorder.start(args.target.as_deref())?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut line_no = 0usize;
    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }

        let occurrence = serde_json::from_str::<serde_json::Value>(&line)
            .map_err(RecorderError::from)
            .and_then(Occurrence::from_value);
        match occurrence {
            Ok(occurrence) => {
                recorder.record(occurrence)?;
            }
            Err(e) => warn!("Skipping line {}: {}", line_no, e),
        }
    }

    let stats = recorder.shutdown().await?;
    printer.await??;

    info!(
        "Recorder stopped: {} occurrences, {} records, {} payloads ({} bytes)",
        stats.occurrences_seen, stats.records_buffered, stats.payloads_emitted, stats.bytes_emitted
    );
    debug!("Metrics:\n{}", metrics.render());

    Ok(())
}
