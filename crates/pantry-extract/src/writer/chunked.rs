use super::{HashingWriter, Result, ShardFile, ShardSink, WriterError};
use std::path::{Path, PathBuf};
use tracing::info;

/// Largest part a [`ChunkedWriter`] produces by default (24 MiB)
pub const DEFAULT_MAX_PART_SIZE: u64 = 24 * 1024 * 1024;

/// Writer that splits a shard into size-bounded parts.
///
/// Output starts at the plain path (`name.ext`). On the first rotation that
/// file becomes `name-0.ext` and writing continues in `name-1.ext`,
/// `name-2.ext` and so on. A part is only rotated once it holds at least one
/// record, so a single oversized record still gets written.
pub struct ChunkedWriter {
    base_path: PathBuf,
    max_part_size: u64,
    current: HashingWriter,
    part: usize,
    finished: Vec<ShardFile>,
}

impl ChunkedWriter {
    pub fn new(path: impl Into<PathBuf>, max_part_size: u64) -> Self {
        let base_path = path.into();
        Self {
            current: HashingWriter::new(&base_path),
            base_path,
            max_part_size,
            part: 0,
            finished: Vec::new(),
        }
    }

    /// Path of part `index`
    pub fn part_path(&self, index: usize) -> PathBuf {
        part_path(&self.base_path, index)
    }

    pub fn write(&mut self, payload: &[u8]) -> Result<()> {
        if self.current.records() > 0 && self.current.size_after(payload) > self.max_part_size {
            self.rotate()?;
        }
        self.current.write(payload)
    }

    fn rotate(&mut self) -> Result<()> {
        let next = HashingWriter::new(self.part_path(self.part + 1));
        let full = std::mem::replace(&mut self.current, next);
        let mut path = full.path().to_path_buf();
        let sha256 = full.finish()?;

        if self.part == 0 {
            let renamed = self.part_path(0);
            std::fs::rename(&path, &renamed).map_err(|source| WriterError::Rename {
                from: path.clone(),
                to: renamed.clone(),
                source,
            })?;
            path = renamed;
        }

        info!(part = self.part, path = %path.display(), "Shard part complete");
        self.finished.push(ShardFile { path, sha256 });
        self.part += 1;
        Ok(())
    }

    /// Close the last part and return all parts in order.
    ///
    /// Nothing is created when no record was ever written.
    pub fn finish(mut self) -> Result<Vec<ShardFile>> {
        if self.current.records() > 0 {
            let path = self.current.path().to_path_buf();
            let sha256 = self.current.finish()?;
            self.finished.push(ShardFile { path, sha256 });
        }
        Ok(self.finished)
    }
}

fn part_path(base: &Path, index: usize) -> PathBuf {
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match base.extension() {
        Some(ext) => format!("{}-{}.{}", stem, index, ext.to_string_lossy()),
        None => format!("{}-{}", stem, index),
    };
    base.with_file_name(name)
}

impl ShardSink for ChunkedWriter {
    fn write_record(&mut self, record: &[u8]) -> Result<()> {
        self.write(record)
    }

    fn into_files(self) -> Result<Vec<ShardFile>> {
        self.finish()
    }
}
