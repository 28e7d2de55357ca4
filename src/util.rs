use std::fs::OpenOptions;
use std::path::Path;

use anyhow::{Result, anyhow};
use once_cell::sync::Lazy;
use regex::Regex;

static DATE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").expect("date pattern"));

/// Syntax gate for the search date. The engine itself only does literal
/// prefix comparison and never re-validates.
pub fn is_valid_search_date(value: &str) -> bool {
    DATE_PATTERN.is_match(value)
}

/// Ensure the output directory exists and is writable.
pub fn ensure_output_dir(path: &Path) -> Result<()> {
    if path.exists() {
        if !std::fs::metadata(path)?.is_dir() {
            return Err(anyhow!(
                "output path is not a directory: {}",
                path.display()
            ));
        }
    } else {
        std::fs::create_dir_all(path)?;
    }

    let probe_path = path.join(".logsieve_write_probe");
    match OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&probe_path)
    {
        Ok(_) => {
            let _ = std::fs::remove_file(&probe_path);
            Ok(())
        }
        Err(err) => Err(anyhow!(
            "output directory is not writable: {} ({})",
            path.display(),
            err
        )),
    }
}
