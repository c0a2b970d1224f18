//! Error types for Pantry

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for Pantry operations
pub type Result<T> = std::result::Result<T, PantryError>;

/// Main error type for shared Pantry operations
#[derive(Error, Debug)]
pub enum PantryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Checksum mismatch for '{file}': expected {expected}, got {actual}")]
    ChecksumMismatch {
        file: String,
        expected: String,
        actual: String,
    },

    #[error(transparent)]
    Destination(#[from] DestinationError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl PantryError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}

/// Pre-condition violations on an output location.
///
/// These are checked before any byte is written or fetched.
#[derive(Error, Debug)]
pub enum DestinationError {
    #[error("A file already exists at the target path: {}", .0.display())]
    ExistingFileAtTargetPath(PathBuf),

    #[error("Parent directory does not exist: {}", .0.display())]
    MissingParentDirectory(PathBuf),
}

impl DestinationError {
    /// Ensure `dir` exists and is a directory.
    pub fn check_directory(dir: &Path) -> std::result::Result<(), Self> {
        if dir.is_dir() {
            Ok(())
        } else {
            Err(Self::MissingParentDirectory(dir.to_path_buf()))
        }
    }

    /// Ensure `path` is free and its parent directory exists.
    pub fn check_new_file(path: &Path) -> std::result::Result<(), Self> {
        if path.exists() {
            return Err(Self::ExistingFileAtTargetPath(path.to_path_buf()));
        }
        match path.parent() {
            Some(parent) if parent.as_os_str().is_empty() => Ok(()),
            Some(parent) => Self::check_directory(parent),
            None => Err(Self::MissingParentDirectory(path.to_path_buf())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_check_new_file_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taken.jsonl");
        std::fs::write(&path, b"data").unwrap();

        let err = DestinationError::check_new_file(&path).unwrap_err();
        assert!(matches!(err, DestinationError::ExistingFileAtTargetPath(_)));
    }

    #[test]
    fn test_check_new_file_missing_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("file.jsonl");

        let err = DestinationError::check_new_file(&path).unwrap_err();
        assert!(matches!(err, DestinationError::MissingParentDirectory(_)));
    }

    #[test]
    fn test_check_new_file_ok() {
        let dir = tempfile::tempdir().unwrap();
        assert!(DestinationError::check_new_file(&dir.path().join("free.jsonl")).is_ok());
        // A bare file name resolves against the working directory
        assert!(DestinationError::check_new_file(Path::new("pantry-not-there.jsonl")).is_ok());
    }
}
