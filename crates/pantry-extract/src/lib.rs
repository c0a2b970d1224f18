//! Pantry Extract Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Streams multi-gigabyte product dumps into compact, per-language JSON Lines
//! shards plus a manifest of their SHA-256 digests.
//!
//! # Supported Data Sources
//!
//! - **OpenFoodFacts**: the public `openfoodfacts-products.jsonl` export
//! - **NutritionPrivacy**: product previews from the NutritionPrivacy API
//!
//! # Example
//!
//! ```no_run
//! use pantry_common::{Datasource, Language, Manifest};
//! use pantry_extract::normalize::OpenFoodFactsProduct;
//! use pantry_extract::pipeline::{ExtractionPipeline, TracingProgress};
//!
//! fn main() -> anyhow::Result<()> {
//!     let pipeline = ExtractionPipeline::<OpenFoodFactsProduct>::new();
//!     let report = pipeline.run(
//!         "openfoodfacts-products.jsonl",
//!         "./public",
//!         Datasource::OpenFoodFacts,
//!         &Language::ALL,
//!         &TracingProgress,
//!     )?;
//!
//!     let manifest: Manifest = report.packages.into_iter().collect();
//!     manifest.save("./public/overview.json")?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod download;
pub mod line_stream;
pub mod normalize;
pub mod pipeline;
pub mod retry;
pub mod writer;

pub use line_stream::LineStream;
pub use normalize::{DecodeError, RecordNormalizer};
pub use pipeline::{ExtractError, ExtractionPipeline, ExtractionReport, Progress, ProgressObserver};
pub use retry::{retrying, RetryError, RetryPolicy};
pub use writer::{ChunkedWriter, HashingWriter, ShardSink};
