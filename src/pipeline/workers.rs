//! Worker thread spawning for the scan pipeline.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use crossbeam_channel::{Receiver, Sender};
use tracing::warn;

use crate::chunk::ScanChunk;
use crate::scanner::DateScanner;
use crate::sink::MatchSink;
use crate::source::LogFile;

/// Job handing one planned chunk to a scan worker
pub struct ScanJob {
    pub chunk: ScanChunk,
}

/// One chunk's matched lines, in file order
pub struct MatchBatch {
    pub chunk_id: u64,
    pub lines: Vec<String>,
}

/// A chunk that failed to scan or to reach the artifact
#[derive(Debug, Clone)]
pub struct ChunkFailure {
    pub chunk_id: u64,
    pub cause: String,
}

/// Spawn the scan worker threads
pub fn spawn_scan_workers(
    workers: usize,
    source: Arc<LogFile>,
    scanner: Arc<DateScanner>,
    rx: Receiver<ScanJob>,
    batch_tx: Sender<MatchBatch>,
    lines_matched: Arc<AtomicU64>,
    failures: Arc<Mutex<Vec<ChunkFailure>>>,
) -> Vec<thread::JoinHandle<()>> {
    let mut handles = Vec::new();
    let worker_count = workers.max(1);

    for _ in 0..worker_count {
        let source = source.clone();
        let scanner = scanner.clone();
        let rx = rx.clone();
        let batch_tx = batch_tx.clone();
        let lines_matched = lines_matched.clone();
        let failures = failures.clone();

        handles.push(thread::spawn(move || {
            for job in rx {
                let chunk_id = job.chunk.id;
                match scanner.scan(source.data(), &job.chunk) {
                    Ok(lines) => {
                        if lines.is_empty() {
                            continue;
                        }
                        lines_matched.fetch_add(lines.len() as u64, Ordering::Relaxed);
                        if let Err(err) = batch_tx.send(MatchBatch { chunk_id, lines }) {
                            warn!(
                                "match channel closed while sending batch for chunk {chunk_id}: {err}"
                            );
                            break;
                        }
                    }
                    Err(err) => {
                        warn!("scan failed for chunk {chunk_id}: {err}");
                        failures.lock().unwrap().push(ChunkFailure {
                            chunk_id,
                            cause: err.to_string(),
                        });
                    }
                }
            }
        }));
    }

    handles
}

/// Spawn the single sink thread draining match batches into the artifact
pub fn spawn_sink_thread(
    sink: Box<dyn MatchSink>,
    rx: Receiver<MatchBatch>,
    lines_written: Arc<AtomicU64>,
    failures: Arc<Mutex<Vec<ChunkFailure>>>,
    sink_errors: Arc<AtomicU64>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        for batch in rx {
            match sink.append(&batch.lines) {
                Ok(()) => {
                    lines_written.fetch_add(batch.lines.len() as u64, Ordering::Relaxed);
                }
                Err(err) => {
                    sink_errors.fetch_add(1, Ordering::Relaxed);
                    warn!("append failed for chunk {}: {err}", batch.chunk_id);
                    failures.lock().unwrap().push(ChunkFailure {
                        chunk_id: batch.chunk_id,
                        cause: err.to_string(),
                    });
                }
            }
        }
        if let Err(err) = sink.flush() {
            sink_errors.fetch_add(1, Ordering::Relaxed);
            warn!("sink flush error: {err}");
        }
    })
}
