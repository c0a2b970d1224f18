//! Shard writers
//!
//! Records are written as JSON Lines: the first record bare, every later one
//! preceded by `\n`, so a shard never ends with a newline. Each writer hashes
//! exactly the bytes it puts on disk.

pub mod chunked;
pub mod hashing;

pub use chunked::{ChunkedWriter, DEFAULT_MAX_PART_SIZE};
pub use hashing::HashingWriter;

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WriterError {
    #[error("Failed to create {}: {source}", .path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to rename {} to {}: {source}", .from.display(), .to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, WriterError>;

/// A file produced by a writer together with its digest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardFile {
    pub path: PathBuf,
    /// Lowercase hex SHA-256 of the file contents
    pub sha256: String,
}

/// Destination for the records of one (datasource, language) shard.
pub trait ShardSink: Sized {
    fn write_record(&mut self, record: &[u8]) -> Result<()>;

    /// Close the sink and return every file it produced, in order
    fn into_files(self) -> Result<Vec<ShardFile>>;
}
