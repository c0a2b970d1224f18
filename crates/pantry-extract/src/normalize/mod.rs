//! Per-record normalization of provider exports
//!
//! Each provider schema implements [`RecordNormalizer`], which turns one raw
//! JSON line into a record the pipeline can fan out into
//! [`SmallProduct`]s, one per language the record is named in.

pub mod fields;
pub mod nutrition_privacy;
pub mod openfoodfacts;
pub mod quantity;

pub use fields::FieldKey;
pub use nutrition_privacy::NutritionPrivacyProduct;
pub use openfoodfacts::OpenFoodFactsProduct;
pub use quantity::{Quantity, Unit};

use pantry_common::{Datasource, Language, SmallProduct};
use std::collections::BTreeMap;
use thiserror::Error;

/// Why a single record could not be normalized
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Record is not a JSON object")]
    NotAnObject,

    #[error("Missing required field '{0}'")]
    MissingField(String),

    #[error("Field '{field}' is not a valid {expected}")]
    TypeMismatch { field: String, expected: &'static str },

    #[error("Record has no name in any supported language")]
    MissingName,

    #[error("Record has neither a quantity nor a serving size")]
    MissingUnit,

    #[error("Cannot build lookup key from '{0}'")]
    KeyConstruction(String),
}

impl DecodeError {
    /// Whether the error points at a bug rather than at a bad record.
    ///
    /// Only fatal errors abort a run; everything else skips the line.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DecodeError::KeyConstruction(_))
    }
}

/// A provider record decoded from one JSON line.
pub trait RecordNormalizer: Sized {
    fn decode(line: &[u8]) -> Result<Self, DecodeError>;

    /// Non-empty display names keyed by language
    fn names(&self) -> &BTreeMap<Language, String>;

    fn brand(&self) -> Option<&str>;

    /// Provider identifier, emitted as the barcode
    fn id(&self) -> &str;

    /// kcal per 100g / 100ml
    fn energy_kcal(&self) -> i64;

    fn quantity(&self) -> Option<&Quantity>;

    fn serving_size(&self) -> Option<&Quantity>;

    /// Canonical record for `language`, if the record is named in it.
    fn to_small_product(&self, language: Language, source: Datasource) -> Option<SmallProduct> {
        let name = self.names().get(&language)?;
        Some(SmallProduct {
            name: name.clone(),
            brand: self.brand().map(str::to_string),
            barcode: self.id().to_string(),
            energy: self.energy_kcal(),
            quantity: self.quantity().map(Quantity::to_string),
            serving: self.serving_size().map(Quantity::to_string),
            source,
        })
    }
}

/// Trimmed value, or `None` when nothing is left
pub(crate) fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_only_key_construction_is_fatal() {
        assert!(DecodeError::KeyConstruction(String::new()).is_fatal());
        assert!(!DecodeError::MissingName.is_fatal());
        assert!(!DecodeError::MissingUnit.is_fatal());
        assert!(!DecodeError::NotAnObject.is_fatal());
        assert!(!DecodeError::MissingField("code".to_string()).is_fatal());
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty("  Rivella "), Some("Rivella".to_string()));
        assert_eq!(non_empty("   "), None);
        assert_eq!(non_empty(""), None);
    }
}
