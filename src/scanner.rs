use memchr::memchr;
use thiserror::Error;
use tracing::warn;

use crate::chunk::ScanChunk;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("chunk {id} range {start}..{end} exceeds mapped length {len}")]
    RangeOutOfBounds {
        id: u64,
        start: u64,
        end: u64,
        len: u64,
    },
}

/// Extracts the lines of one chunk that start with the search date.
///
/// Ownership rule for lines crossing raw chunk boundaries: a line belongs to
/// the chunk that contains its first byte. A chunk whose raw start falls
/// mid-line skips forward past the next terminator (chunk 0 never does), and
/// the line that starts before the raw end is read past `end` to its
/// terminator. Every line is scanned by exactly one worker.
pub struct DateScanner {
    prefix: Vec<u8>,
}

impl DateScanner {
    pub fn new(search_date: &str) -> Self {
        Self {
            prefix: search_date.as_bytes().to_vec(),
        }
    }

    pub fn scan(&self, data: &[u8], chunk: &ScanChunk) -> Result<Vec<String>, ScanError> {
        let len = data.len() as u64;
        if chunk.start > chunk.end || chunk.end > len {
            return Err(ScanError::RangeOutOfBounds {
                id: chunk.id,
                start: chunk.start,
                end: chunk.end,
                len,
            });
        }
        if chunk.is_empty() {
            return Ok(Vec::new());
        }

        let start = chunk.start as usize;
        let end = chunk.end as usize;

        let mut matches = Vec::new();
        let mut pos = owned_line_start(data, start);
        while pos < end {
            let line_end = match memchr(b'\n', &data[pos..]) {
                Some(i) => pos + i,
                None => data.len(),
            };
            let line = &data[pos..line_end];
            if line.starts_with(&self.prefix) {
                matches.push(decode_line(line, chunk.id));
            }
            pos = line_end + 1;
        }

        Ok(matches)
    }
}

/// First byte of the first line owned by a chunk with raw start `raw_start`.
fn owned_line_start(data: &[u8], raw_start: usize) -> usize {
    if raw_start == 0 {
        return 0;
    }
    if data[raw_start - 1] == b'\n' {
        return raw_start;
    }
    match memchr(b'\n', &data[raw_start..]) {
        Some(i) => raw_start + i + 1,
        None => data.len(),
    }
}

fn decode_line(line: &[u8], chunk_id: u64) -> String {
    let line = match line.last() {
        Some(b'\r') => &line[..line.len() - 1],
        _ => line,
    };
    match String::from_utf8_lossy(line) {
        std::borrow::Cow::Borrowed(s) => s.to_owned(),
        std::borrow::Cow::Owned(s) => {
            warn!("invalid UTF-8 replaced in matched line from chunk {chunk_id}");
            s
        }
    }
}
