use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Output destination for matched lines.
///
/// `append` writes one chunk's whole batch as a unit; batches from different
/// chunks never interleave mid-batch, but cross-batch order is whatever the
/// workers' completion order happens to be. Append is not idempotent.
pub trait MatchSink: Send + Sync {
    fn append(&self, lines: &[String]) -> Result<(), SinkError>;
    fn flush(&self) -> Result<(), SinkError>;
}

/// Plain-text sink backing the `output_{date}.txt` artifact.
pub struct TextFileSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl TextFileSink {
    /// Creates (or truncates) the artifact before any worker runs.
    pub fn create(path: &Path) -> Result<Self, SinkError> {
        let file = File::create(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MatchSink for TextFileSink {
    fn append(&self, lines: &[String]) -> Result<(), SinkError> {
        // One lock acquisition per batch keeps the batch atomic.
        let mut guard = self.writer.lock().unwrap();
        for line in lines {
            guard.write_all(line.as_bytes())?;
            guard.write_all(b"\n")?;
        }
        Ok(())
    }

    fn flush(&self) -> Result<(), SinkError> {
        let mut guard = self.writer.lock().unwrap();
        guard.flush()?;
        Ok(())
    }
}

/// Sink for dry runs; accepts every batch and writes nothing.
pub struct NullSink;

impl MatchSink for NullSink {
    fn append(&self, _lines: &[String]) -> Result<(), SinkError> {
        Ok(())
    }

    fn flush(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Artifact location for a given search date.
pub fn output_path(output_dir: &Path, search_date: &str) -> PathBuf {
    output_dir.join(format!("output_{search_date}.txt"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn derives_artifact_path_from_date() {
        let path = output_path(Path::new("/tmp/out"), "2024-12-01");
        assert_eq!(path, Path::new("/tmp/out/output_2024-12-01.txt"));
    }

    #[test]
    fn appends_batch_with_terminators() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.txt");
        let sink = TextFileSink::create(&path).expect("sink");
        sink.append(&["one".to_string(), "two".to_string()])
            .expect("append");
        sink.flush().expect("flush");
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "one\ntwo\n");
    }

    #[test]
    fn create_truncates_previous_artifact() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.txt");
        std::fs::write(&path, "stale\n").expect("write");
        let sink = TextFileSink::create(&path).expect("sink");
        sink.flush().expect("flush");
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "");
    }

    #[test]
    fn concurrent_batches_never_interleave() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.txt");
        let sink = Arc::new(TextFileSink::create(&path).expect("sink"));

        let mut handles = Vec::new();
        for worker in 0..8u32 {
            let sink = Arc::clone(&sink);
            handles.push(std::thread::spawn(move || {
                let batch: Vec<String> =
                    (0..50).map(|i| format!("w{worker} line {i}")).collect();
                sink.append(&batch).expect("append");
            }));
        }
        for handle in handles {
            handle.join().expect("join");
        }
        sink.flush().expect("flush");

        let contents = std::fs::read_to_string(&path).expect("read");
        assert_eq!(contents.lines().count(), 400);

        // Within each worker's batch the line order must survive intact.
        for worker in 0..8u32 {
            let seq: Vec<&str> = contents
                .lines()
                .filter(|l| l.starts_with(&format!("w{worker} ")))
                .collect();
            let expected: Vec<String> =
                (0..50).map(|i| format!("w{worker} line {i}")).collect();
            assert_eq!(seq, expected);
        }
    }
}
