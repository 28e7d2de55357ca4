use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("log file not found: {0}")]
    NotFound(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read-only view over the input log file, shared by all scan workers.
///
/// Non-empty files are memory-mapped once at open so workers slice the same
/// mapping instead of copying gigabyte-scale buffers. The file must not be
/// written to while a scan is running.
#[derive(Debug)]
pub struct LogFile {
    map: Option<Mmap>,
    len: u64,
}

impl LogFile {
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => SourceError::NotFound(path.to_path_buf()),
            _ => SourceError::Io(e),
        })?;
        let len = file.metadata()?.len();

        // mmap of a zero-length file is an error on several platforms
        let map = if len == 0 {
            None
        } else {
            Some(unsafe { Mmap::map(&file) }?)
        };

        Ok(Self { map, len })
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn data(&self) -> &[u8] {
        self.map.as_deref().unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn opens_and_maps_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("sample.log");
        let mut file = File::create(&path).expect("create");
        file.write_all(b"2024-12-01 hello\n").expect("write");
        drop(file);

        let source = LogFile::open(&path).expect("open");
        assert_eq!(source.len(), 17);
        assert_eq!(source.data(), b"2024-12-01 hello\n");
    }

    #[test]
    fn empty_file_maps_to_empty_slice() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("empty.log");
        File::create(&path).expect("create");

        let source = LogFile::open(&path).expect("open");
        assert!(source.is_empty());
        assert!(source.data().is_empty());
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = LogFile::open(&dir.path().join("nope.log")).expect_err("should fail");
        assert!(matches!(err, SourceError::NotFound(_)));
    }
}
