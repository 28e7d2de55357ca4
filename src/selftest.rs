//! Built-in end-to-end check: runs the engine against a known fixture in a
//! scratch directory and verifies the extracted set.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Result, anyhow, bail};
use tracing::info;

use crate::pipeline;
use crate::sink::{self, TextFileSink};
use crate::source::LogFile;

const FIXTURE: &str = "2024-12-01 14:23:45 INFO User logged in\n\
2024-12-01 14:24:10 ERROR Failed to connect to the database\n\
2024-12-02 09:15:30 WARN Disk space running low\n\
2024-12-01 16:45:00 INFO File uploaded successfully\n";

const FIXTURE_DATE: &str = "2024-12-01";

pub fn run_self_test() -> Result<()> {
    let scratch = std::env::temp_dir().join(format!("logsieve_selftest_{}", std::process::id()));
    fs::create_dir_all(&scratch)?;
    let result = exercise_engine(&scratch);
    let _ = fs::remove_dir_all(&scratch);
    result
}

fn exercise_engine(scratch: &Path) -> Result<()> {
    let input_path = scratch.join("fixture.log");
    fs::write(&input_path, FIXTURE)?;

    let source = Arc::new(LogFile::open(&input_path)?);
    let artifact_path = sink::output_path(scratch, FIXTURE_DATE);
    let match_sink = TextFileSink::create(&artifact_path)?;

    let stats = pipeline::run_scan(source, FIXTURE_DATE, Box::new(match_sink), 2)?;
    if !stats.is_complete() {
        bail!("self-test run reported {} failed chunk(s)", stats.failed_chunks.len());
    }

    let contents = fs::read_to_string(&artifact_path)?;
    let mut lines: Vec<&str> = contents.lines().collect();
    lines.sort_unstable();

    let mut expected = vec![
        "2024-12-01 14:23:45 INFO User logged in",
        "2024-12-01 14:24:10 ERROR Failed to connect to the database",
        "2024-12-01 16:45:00 INFO File uploaded successfully",
    ];
    expected.sort_unstable();

    if lines != expected {
        return Err(anyhow!("self-test mismatch: extracted {lines:#?}"));
    }

    info!("self-test passed: {} lines matched", stats.lines_matched);
    Ok(())
}
