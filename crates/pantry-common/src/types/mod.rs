//! Common types used across Pantry

mod manifest;

pub use manifest::{JsonFile, LanguagePackage, Manifest, MANIFEST_FILE_NAME};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ============================================================================
// Language
// ============================================================================

/// Target language of an output shard.
///
/// Adding a variant adds a new shard per datasource; existing shards keep
/// their names because the suffix of an existing variant never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    English,
    German,
}

impl Language {
    /// Every supported language, in shard order
    pub const ALL: [Language; 2] = [Language::English, Language::German];

    /// Short language code
    pub fn code(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::German => "de",
        }
    }

    /// Suffix appended to shard file names (`small_products_de.json`)
    pub fn file_suffix(self) -> &'static str {
        match self {
            Language::English => "_en",
            Language::German => "_de",
        }
    }

    /// Parse a BCP 47 style tag such as `de_DE`, `de-CH`, `en_US` or `en`.
    ///
    /// Only the primary subtag is considered.
    pub fn from_bcp47(tag: &str) -> Option<Self> {
        let primary = tag.split(['_', '-']).next()?;
        match primary.to_ascii_lowercase().as_str() {
            "en" => Some(Language::English),
            "de" => Some(Language::German),
            _ => None,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Language {
    type Err = crate::PantryError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "english" => Ok(Language::English),
            "german" => Ok(Language::German),
            other => Language::from_bcp47(other)
                .ok_or_else(|| crate::PantryError::parse(format!("Unknown language: {}", s))),
        }
    }
}

// ============================================================================
// Datasource
// ============================================================================

/// Provider that produced a record.
///
/// Serialized as a small integer to keep shards compact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Datasource {
    OpenFoodFacts = 0,
    NutritionPrivacy = 1,
}

impl Datasource {
    /// Prefix of every shard produced from this datasource
    pub fn file_prefix(self) -> &'static str {
        match self {
            Datasource::OpenFoodFacts => "off_",
            Datasource::NutritionPrivacy => "np_",
        }
    }

    /// Shard file name for `language`, e.g. `off_small_products_de.json`
    pub fn shard_file_name(self, language: Language) -> String {
        format!("{}small_products{}.json", self.file_prefix(), language.file_suffix())
    }

    pub fn from_repr(value: u8) -> Option<Self> {
        match value {
            0 => Some(Datasource::OpenFoodFacts),
            1 => Some(Datasource::NutritionPrivacy),
            _ => None,
        }
    }
}

impl std::fmt::Display for Datasource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Datasource::OpenFoodFacts => f.write_str("openfoodfacts"),
            Datasource::NutritionPrivacy => f.write_str("nutritionprivacy"),
        }
    }
}

impl std::str::FromStr for Datasource {
    type Err = crate::PantryError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "openfoodfacts" | "off" => Ok(Datasource::OpenFoodFacts),
            "nutritionprivacy" | "np" => Ok(Datasource::NutritionPrivacy),
            _ => Err(crate::PantryError::parse(format!("Unknown datasource: {}", s))),
        }
    }
}

impl Serialize for Datasource {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

impl<'de> Deserialize<'de> for Datasource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = u8::deserialize(deserializer)?;
        Datasource::from_repr(value)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown datasource {}", value)))
    }
}

// ============================================================================
// SmallProduct
// ============================================================================

/// Canonical compact product record written to shards.
///
/// Absent optionals are omitted from the JSON object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmallProduct {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    pub barcode: String,
    /// kcal per 100g / 100ml
    pub energy: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serving: Option<String>,
    pub source: Datasource,
}
