use super::{Result, ShardFile, ShardSink, WriterError};
use pantry_common::checksum::finalize_hex;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

const SEPARATOR: &[u8] = b"\n";

/// Newline-separated writer that fingerprints its own output.
///
/// The file is created (and truncated) on the first write, or by
/// [`finish`](HashingWriter::finish) when nothing was written.
pub struct HashingWriter {
    path: PathBuf,
    file: Option<BufWriter<File>>,
    hasher: Sha256,
    bytes_written: u64,
    records: usize,
}

impl HashingWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
            hasher: Sha256::new(),
            bytes_written: 0,
            records: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes on disk so far, separators included
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn records(&self) -> usize {
        self.records
    }

    /// Size of the file after `write(payload)`
    pub(crate) fn size_after(&self, payload: &[u8]) -> u64 {
        let separator = if self.records == 0 { 0 } else { SEPARATOR.len() };
        self.bytes_written + (separator + payload.len()) as u64
    }

    fn open(&mut self) -> Result<&mut BufWriter<File>> {
        match self.file {
            Some(ref mut file) => Ok(file),
            None => {
                debug!(path = %self.path.display(), "Creating shard file");
                let file = File::create(&self.path).map_err(|source| WriterError::Create {
                    path: self.path.clone(),
                    source,
                })?;
                Ok(self.file.insert(BufWriter::new(file)))
            },
        }
    }

    pub fn write(&mut self, payload: &[u8]) -> Result<()> {
        let first = self.records == 0;
        let result = {
            let file = self.open()?;
            if first {
                file.write_all(payload)
            } else {
                file.write_all(SEPARATOR).and_then(|_| file.write_all(payload))
            }
        };
        result.map_err(|source| WriterError::Write {
            path: self.path.clone(),
            source,
        })?;

        if !first {
            self.hasher.update(SEPARATOR);
            self.bytes_written += SEPARATOR.len() as u64;
        }
        self.hasher.update(payload);
        self.bytes_written += payload.len() as u64;
        self.records += 1;
        Ok(())
    }

    /// Flush and close the file, returning the hex digest of its contents
    pub fn finish(mut self) -> Result<String> {
        self.open()?;
        if let Some(file) = self.file.take() {
            file.into_inner()
                .map_err(|e| e.into_error())
                .and_then(|file| file.sync_all())
                .map_err(|source| WriterError::Write {
                    path: self.path.clone(),
                    source,
                })?;
        }

        let digest = finalize_hex(self.hasher);
        debug!(
            path = %self.path.display(),
            records = self.records,
            bytes = self.bytes_written,
            sha256 = %digest,
            "Closed shard file"
        );
        Ok(digest)
    }
}

impl ShardSink for HashingWriter {
    fn write_record(&mut self, record: &[u8]) -> Result<()> {
        self.write(record)
    }

    fn into_files(self) -> Result<Vec<ShardFile>> {
        let path = self.path.clone();
        let sha256 = self.finish()?;
        Ok(vec![ShardFile { path, sha256 }])
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pantry_common::checksum::{compute_file_checksum, EMPTY_SHA256};

    const TWO_LINES_SHA256: &str = "39cdba54bd51e3056ae3c2308fa9d32be97fd405fd0444195f2e638ad98cb7eb";

    #[test]
    fn test_lines_are_newline_separated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.json");

        let mut writer = HashingWriter::new(&path);
        writer.write(b"Test 1").unwrap();
        writer.write(b"Test 2").unwrap();
        let digest = writer.finish().unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Test 1\nTest 2");
        assert_eq!(digest, TWO_LINES_SHA256);
    }

    #[test]
    fn test_digest_matches_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shard.json");

        let mut writer = HashingWriter::new(&path);
        for i in 0..1000 {
            writer.write(format!("{{\"n\":{}}}", i).as_bytes()).unwrap();
        }
        let size = writer.bytes_written();
        let digest = writer.finish().unwrap();

        assert_eq!(digest, compute_file_checksum(&path).unwrap());
        assert_eq!(std::fs::metadata(&path).unwrap().len(), size);
    }

    #[test]
    fn test_existing_file_is_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.json");
        std::fs::write(&path, "Old content").unwrap();

        let mut writer = HashingWriter::new(&path);
        writer.write(b"Test 1").unwrap();
        writer.write(b"Test 2").unwrap();
        assert_eq!(writer.finish().unwrap(), TWO_LINES_SHA256);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Test 1\nTest 2");
    }

    #[test]
    fn test_file_is_created_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lazy.json");

        let mut writer = HashingWriter::new(&path);
        assert!(!path.exists());
        writer.write(b"x").unwrap();
        assert!(path.exists());
        writer.finish().unwrap();
    }

    #[test]
    fn test_finish_without_writes_creates_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.json");
        std::fs::write(&path, "Old content").unwrap();

        let digest = HashingWriter::new(&path).finish().unwrap();
        assert_eq!(digest, EMPTY_SHA256);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn test_missing_directory_fails_on_first_write() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = HashingWriter::new(dir.path().join("missing").join("shard.json"));
        assert!(matches!(writer.write(b"x"), Err(WriterError::Create { .. })));
    }

    #[test]
    fn test_size_after_counts_separator() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = HashingWriter::new(dir.path().join("s.json"));
        assert_eq!(writer.size_after(b"abc"), 3);
        writer.write(b"abc").unwrap();
        assert_eq!(writer.size_after(b"de"), 6);
    }

    #[test]
    fn test_shard_sink_reports_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.json");
        let mut writer = HashingWriter::new(&path);
        writer.write_record(b"{}").unwrap();

        let files = writer.into_files().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, path);
        assert_eq!(files[0].sha256, compute_file_checksum(&path).unwrap());
    }
}
