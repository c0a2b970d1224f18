//! Pantry Common Library
//!
//! Shared types, utilities, and error handling for the Pantry workspace.
//!
//! # Overview
//!
//! - **Error Handling**: [`PantryError`], [`DestinationError`] and the [`Result`] alias
//! - **Checksums**: SHA-256 helpers used to content-address output shards
//! - **Logging**: `tracing` subscriber setup shared by every binary
//! - **Types**: [`Language`], [`Datasource`], [`SmallProduct`] and the manifest model
//!
//! # Example
//!
//! ```no_run
//! use pantry_common::checksum::compute_file_checksum;
//! use pantry_common::Result;
//!
//! fn verify(path: &str, expected: &str) -> Result<bool> {
//!     Ok(compute_file_checksum(path)? == expected)
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod checksum;
pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{DestinationError, PantryError, Result};
pub use types::{Datasource, JsonFile, Language, LanguagePackage, Manifest, SmallProduct};
