//! SHA-256 helpers for content-addressed shards
//!
//! Shard digests are always lowercase hex, 64 characters long.

use crate::error::{PantryError, Result};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

/// Digest of a zero-length payload.
pub const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Finalize a running hasher into a lowercase hex string
pub fn finalize_hex(hasher: Sha256) -> String {
    hex::encode(hasher.finalize())
}

/// Compute SHA-256 checksum of bytes
pub fn compute_checksum(data: &[u8]) -> String {
    finalize_hex(Sha256::new_with_prefix(data))
}

/// Compute SHA-256 checksum of any readable source
pub fn compute_reader_checksum<R: Read>(reader: &mut R) -> Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(finalize_hex(hasher))
}

/// Compute SHA-256 checksum of a file
pub fn compute_file_checksum(path: impl AsRef<Path>) -> Result<String> {
    let mut file = std::fs::File::open(path.as_ref())?;
    compute_reader_checksum(&mut file)
}

/// Verify that a file matches the expected checksum
pub fn verify_file_checksum(path: impl AsRef<Path>, expected: &str) -> Result<()> {
    let path = path.as_ref();
    let actual = compute_file_checksum(path)?;
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(PantryError::ChecksumMismatch {
            file: path.display().to_string(),
            expected: expected.to_string(),
            actual,
        })
    }
}
