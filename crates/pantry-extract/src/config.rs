//! Configuration management
//!
//! Values come from the environment (a `.env` file is honored) and fall back
//! to the `DEFAULT_*` constants below. CLI flags override both.

use crate::line_stream::DEFAULT_CHUNK_SIZE;
use crate::pipeline::DEFAULT_PROGRESS_EVERY;
use crate::retry::{RetryPolicy, DEFAULT_MAX_RETRY_COUNT};
use pantry_common::{Datasource, PantryError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

// ============================================================================
// Extraction Configuration Constants
// ============================================================================

/// Directory shards and the manifest are written to.
pub const DEFAULT_OUTPUT_DIR: &str = "./public";

/// Directory downloaded dumps are stored in and read from.
pub const DEFAULT_DOWNLOAD_DIR: &str = ".";

/// Full OpenFoodFacts JSONL export.
pub const DEFAULT_OPENFOODFACTS_URL: &str = "https://static.openfoodfacts.org/data/openfoodfacts-products.jsonl.gz";

/// NutritionPrivacy product preview export.
pub const DEFAULT_NUTRITION_PRIVACY_URL: &str = "https://api.nutritionprivacy.de/productPreviews";

pub const OPENFOODFACTS_FILE_NAME: &str = "openfoodfacts-products.jsonl.gz";

pub const NUTRITION_PRIVACY_FILE_NAME: &str = "nutritionprivacy-products.jsonl";

/// Extraction and download settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractConfig {
    pub output_dir: PathBuf,
    pub download_dir: PathBuf,
    pub openfoodfacts_url: String,
    pub nutrition_privacy_url: String,
    pub progress_every: u64,
    pub chunk_size: usize,
    /// Split shards into parts of at most this many bytes
    pub max_part_size: Option<u64>,
    pub max_retry_count: u32,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            download_dir: PathBuf::from(DEFAULT_DOWNLOAD_DIR),
            openfoodfacts_url: DEFAULT_OPENFOODFACTS_URL.to_string(),
            nutrition_privacy_url: DEFAULT_NUTRITION_PRIVACY_URL.to_string(),
            progress_every: DEFAULT_PROGRESS_EVERY,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_part_size: None,
            max_retry_count: DEFAULT_MAX_RETRY_COUNT,
        }
    }
}

fn parse_var<T: FromStr>(name: &str, value: Option<String>) -> Result<Option<T>> {
    value
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|_| PantryError::config(format!("{} has an invalid value: {}", name, raw)))
        })
        .transpose()
}

impl ExtractConfig {
    /// Load configuration from `.env`, the environment and defaults
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            output_dir: lookup("PANTRY_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            download_dir: lookup("PANTRY_DOWNLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.download_dir),
            openfoodfacts_url: lookup("PANTRY_OPENFOODFACTS_URL").unwrap_or(defaults.openfoodfacts_url),
            nutrition_privacy_url: lookup("PANTRY_NUTRITION_PRIVACY_URL").unwrap_or(defaults.nutrition_privacy_url),
            progress_every: parse_var("PANTRY_PROGRESS_EVERY", lookup("PANTRY_PROGRESS_EVERY"))?
                .unwrap_or(defaults.progress_every),
            chunk_size: parse_var("PANTRY_CHUNK_SIZE", lookup("PANTRY_CHUNK_SIZE"))?.unwrap_or(defaults.chunk_size),
            max_part_size: parse_var("PANTRY_MAX_PART_SIZE", lookup("PANTRY_MAX_PART_SIZE"))?,
            max_retry_count: parse_var("PANTRY_MAX_RETRIES", lookup("PANTRY_MAX_RETRIES"))?
                .unwrap_or(defaults.max_retry_count),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(PantryError::config("Chunk size must be greater than 0"));
        }

        if self.max_part_size == Some(0) {
            return Err(PantryError::config("Max part size must be greater than 0"));
        }

        for url in [&self.openfoodfacts_url, &self.nutrition_privacy_url] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(PantryError::config(format!("Unsupported download URL: {}", url)));
            }
        }

        Ok(())
    }

    pub fn source_url(&self, datasource: Datasource) -> &str {
        match datasource {
            Datasource::OpenFoodFacts => &self.openfoodfacts_url,
            Datasource::NutritionPrivacy => &self.nutrition_privacy_url,
        }
    }

    /// Local path of the dump for `datasource`
    pub fn source_path(&self, datasource: Datasource) -> PathBuf {
        let name = match datasource {
            Datasource::OpenFoodFacts => OPENFOODFACTS_FILE_NAME,
            Datasource::NutritionPrivacy => NUTRITION_PRIVACY_FILE_NAME,
        };
        self.download_dir.join(name)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default().with_max_retry_count(self.max_retry_count)
    }
}
