//! Scan orchestration: chunk planning, worker dispatch, and aggregation.
//!
//! The orchestrator plans byte ranges once, fans them out to a bounded pool
//! of scan workers, and routes every match batch through a single sink
//! thread, then joins everything before reporting an outcome.

pub mod workers;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam_channel::bounded;
use tracing::info;

use crate::chunk::plan_chunks;
use crate::scanner::DateScanner;
use crate::sink::MatchSink;
use crate::source::LogFile;

use workers::{ChunkFailure, MatchBatch, ScanJob};

const CHANNEL_CAPACITY_MULTIPLIER: usize = 4;
const MIN_CHANNEL_CAPACITY: usize = 16;

/// Statistics collected during one scan run
#[derive(Debug)]
pub struct ScanStats {
    pub bytes_scanned: u64,
    pub chunks_processed: u64,
    pub lines_matched: u64,
    pub lines_written: u64,
    pub sink_errors: u64,
    pub failed_chunks: Vec<ChunkFailure>,
    pub elapsed: Duration,
    pub cancelled: bool,
}

impl ScanStats {
    /// True when every dispatched chunk made it into the artifact.
    pub fn is_complete(&self) -> bool {
        self.failed_chunks.is_empty() && self.sink_errors == 0 && !self.cancelled
    }
}

/// Machine-readable run summary for the `--summary` sidecar
#[derive(Debug, Clone, serde::Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub tool_version: String,
    pub config_hash: String,
    pub search_date: String,
    pub input_path: String,
    pub output_path: Option<String>,
    pub bytes_scanned: u64,
    pub chunks_processed: u64,
    pub lines_matched: u64,
    pub lines_written: u64,
    pub failed_chunks: Vec<u64>,
    pub elapsed_seconds: f64,
    pub cancelled: bool,
}

/// Run the scan pipeline to completion.
///
/// Plans one chunk per worker, dispatches them over a bounded channel, and
/// blocks until every scan worker and the sink thread have joined. Chunk
/// failures are collected into the stats rather than aborting siblings.
pub fn run_scan(
    source: Arc<LogFile>,
    search_date: &str,
    sink: Box<dyn MatchSink>,
    workers: usize,
) -> Result<ScanStats> {
    run_scan_inner(source, search_date, sink, workers, None)
}

/// Run the scan with an external cancellation flag (e.g. Ctrl-C). The flag
/// is checked before each dispatch; in-flight chunks still finish.
pub fn run_scan_with_cancel(
    source: Arc<LogFile>,
    search_date: &str,
    sink: Box<dyn MatchSink>,
    workers: usize,
    cancel_flag: Arc<AtomicBool>,
) -> Result<ScanStats> {
    run_scan_inner(source, search_date, sink, workers, Some(cancel_flag))
}

fn run_scan_inner(
    source: Arc<LogFile>,
    search_date: &str,
    sink: Box<dyn MatchSink>,
    workers: usize,
    cancel_flag: Option<Arc<AtomicBool>>,
) -> Result<ScanStats> {
    let workers = workers.max(1);
    let total_bytes = source.len();
    let chunks = plan_chunks(total_bytes, workers);
    info!(
        "chunk_count={} total_bytes={} workers={}",
        chunks.len(),
        total_bytes,
        workers
    );

    let channel_cap = workers
        .saturating_mul(CHANNEL_CAPACITY_MULTIPLIER)
        .max(MIN_CHANNEL_CAPACITY);
    let (job_tx, job_rx) = bounded::<ScanJob>(channel_cap);
    let (batch_tx, batch_rx) = bounded::<MatchBatch>(channel_cap);

    let lines_matched = Arc::new(AtomicU64::new(0));
    let lines_written = Arc::new(AtomicU64::new(0));
    let sink_errors = Arc::new(AtomicU64::new(0));
    let failures: Arc<Mutex<Vec<ChunkFailure>>> = Arc::new(Mutex::new(Vec::new()));

    let sink_handle = workers::spawn_sink_thread(
        sink,
        batch_rx,
        lines_written.clone(),
        failures.clone(),
        sink_errors.clone(),
    );
    let scan_handles = workers::spawn_scan_workers(
        workers,
        source.clone(),
        Arc::new(DateScanner::new(search_date)),
        job_rx,
        batch_tx.clone(),
        lines_matched.clone(),
        failures.clone(),
    );

    let start_time = Instant::now();
    let mut cancelled = false;
    let mut bytes_scanned = 0u64;
    let mut chunks_processed = 0u64;

    for chunk in chunks {
        if let Some(flag) = &cancel_flag {
            if flag.load(Ordering::Relaxed) {
                cancelled = true;
                break;
            }
        }
        bytes_scanned += chunk.len();
        chunks_processed += 1;
        let chunk_id = chunk.id;
        job_tx
            .send(ScanJob { chunk })
            .with_context(|| format!("scan channel closed while sending chunk {chunk_id}"))?;
    }

    // Close the channels in dispatch order so every thread drains and exits.
    drop(job_tx);
    for handle in scan_handles {
        let _ = handle.join();
    }
    drop(batch_tx);
    let _ = sink_handle.join();

    let mut failed_chunks = std::mem::take(&mut *failures.lock().unwrap());
    failed_chunks.sort_by_key(|f| f.chunk_id);

    let stats = ScanStats {
        bytes_scanned,
        chunks_processed,
        lines_matched: lines_matched.load(Ordering::Relaxed),
        lines_written: lines_written.load(Ordering::Relaxed),
        sink_errors: sink_errors.load(Ordering::Relaxed),
        failed_chunks,
        elapsed: start_time.elapsed(),
        cancelled,
    };

    if stats.cancelled {
        info!("shutdown requested; stopping early");
    }
    info!(
        "run_summary bytes_scanned={} chunks_processed={} lines_matched={} lines_written={} failed_chunks={} elapsed_ms={}",
        stats.bytes_scanned,
        stats.chunks_processed,
        stats.lines_matched,
        stats.lines_written,
        stats.failed_chunks.len(),
        stats.elapsed.as_millis()
    );

    Ok(stats)
}
