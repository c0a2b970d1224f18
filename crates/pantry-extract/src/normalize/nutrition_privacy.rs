//! NutritionPrivacy product previews

use super::fields::{self, FieldKey, Object};
use super::{non_empty, DecodeError, Quantity, RecordNormalizer, Unit};
use pantry_common::Language;
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct NutritionPrivacyProduct {
    id: String,
    names: BTreeMap<Language, String>,
    brand: Option<String>,
    total_quantity: Option<Quantity>,
    serving: Option<Quantity>,
    calories: i64,
}

fn as_object<'v>(value: &'v Value, field: &FieldKey<'_>) -> Result<&'v Object, DecodeError> {
    value.as_object().ok_or_else(|| DecodeError::TypeMismatch {
        field: field.to_string(),
        expected: "object",
    })
}

/// `[{value, languageCode}]`, skipping entries in unsupported languages.
///
/// Later entries for the same language replace earlier ones.
fn decode_localized(items: &[Value], field: &FieldKey<'_>) -> Result<BTreeMap<Language, String>, DecodeError> {
    let value_key = FieldKey::new("value")?;
    let language_key = FieldKey::new("languageCode")?;

    let mut localized = BTreeMap::new();
    for item in items {
        let item = as_object(item, field)?;
        let language = fields::optional_str(item, &language_key)?.and_then(Language::from_bcp47);
        let value = fields::optional_str(item, &value_key)?.and_then(non_empty);
        if let (Some(language), Some(value)) = (language, value) {
            localized.insert(language, value);
        }
    }
    Ok(localized)
}

/// `{unit, value}`
fn decode_quantity(object: &Object, field: &FieldKey<'_>) -> Result<Quantity, DecodeError> {
    let unit_key = FieldKey::new("unit")?;
    let code = fields::require_str(object, &unit_key)?;
    let unit = Unit::from_code(code).ok_or_else(|| DecodeError::TypeMismatch {
        field: format!("{}.{}", field, unit_key),
        expected: "unit",
    })?;
    let value = fields::require_i64(object, &FieldKey::new("value")?)?;

    Ok(Quantity::new(value as f64, unit))
}

fn decode_id(object: &Object) -> Result<String, DecodeError> {
    let key = FieldKey::new("id")?;
    let id = Uuid::parse_str(fields::require_str(object, &key)?).map_err(|_| DecodeError::TypeMismatch {
        field: key.to_string(),
        expected: "UUID",
    })?;
    Ok(id.hyphenated().to_string().to_uppercase())
}

impl RecordNormalizer for NutritionPrivacyProduct {
    fn decode(line: &[u8]) -> Result<Self, DecodeError> {
        let object = fields::parse_object(line)?;

        let id = decode_id(&object)?;

        let names_key = FieldKey::new("names")?;
        let names = decode_localized(fields::require_array(&object, &names_key)?, &names_key)?;
        if names.is_empty() {
            return Err(DecodeError::MissingName);
        }

        let brands_key = FieldKey::new("brands")?;
        let brand = match fields::optional_array(&object, &brands_key)?.and_then(<[Value]>::first) {
            Some(first) => fields::optional_str(as_object(first, &brands_key)?, &FieldKey::new("value")?)?
                .and_then(non_empty),
            None => None,
        };

        let total_quantity_key = FieldKey::new("totalQuantity")?;
        let total_quantity = match fields::get(&object, &total_quantity_key) {
            Some(value) => Some(decode_quantity(as_object(value, &total_quantity_key)?, &total_quantity_key)?),
            None => None,
        };

        let servings_key = FieldKey::new("servings")?;
        let serving = match fields::optional_array(&object, &servings_key)?.and_then(<[Value]>::first) {
            Some(first) => {
                let underlying_key = FieldKey::new("underlyingQuantity")?;
                let underlying = fields::require_object(as_object(first, &servings_key)?, &underlying_key)?;
                Some(decode_quantity(underlying, &underlying_key)?)
            },
            None => None,
        };

        let calories = fields::require_i64(&object, &FieldKey::new("calories")?)?;

        Ok(Self {
            id,
            names,
            brand,
            total_quantity,
            serving,
            calories,
        })
    }

    fn names(&self) -> &BTreeMap<Language, String> {
        &self.names
    }

    fn brand(&self) -> Option<&str> {
        self.brand.as_deref()
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn energy_kcal(&self) -> i64 {
        self.calories
    }

    fn quantity(&self) -> Option<&Quantity> {
        self.total_quantity.as_ref()
    }

    fn serving_size(&self) -> Option<&Quantity> {
        self.serving.as_ref()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pantry_common::Datasource;
    use serde_json::json;

    fn preview() -> Value {
        json!({
            "id": "3f2504e0-4f89-41d3-9a0c-0305e82c3301",
            "names": [
                {"value": "Rivella Rot", "languageCode": "de_CH"},
                {"value": "Rivella Red", "languageCode": "en_US"},
                {"value": "Rivella Rouge", "languageCode": "fr_CH"}
            ],
            "brands": [{"value": "Rivella", "languageCode": "de_CH"}],
            "totalQuantity": {"unit": "ml", "value": 500},
            "servings": [{"name": "portion", "underlyingQuantity": {"unit": "ml", "value": 330}}],
            "calories": 38,
            "verified": true
        })
    }

    fn decode(value: &Value) -> Result<NutritionPrivacyProduct, DecodeError> {
        NutritionPrivacyProduct::decode(&serde_json::to_vec(value).unwrap())
    }

    #[test]
    fn test_decode_preview() {
        let product = decode(&preview()).unwrap();

        assert_eq!(product.id(), "3F2504E0-4F89-41D3-9A0C-0305E82C3301");
        assert_eq!(product.names().len(), 2);
        assert_eq!(product.names().get(&Language::German).unwrap(), "Rivella Rot");
        assert_eq!(product.brand(), Some("Rivella"));
        assert_eq!(product.energy_kcal(), 38);
        assert_eq!(product.quantity().unwrap().to_string(), "500ml");
        assert_eq!(product.serving_size().unwrap().to_string(), "330ml");
    }

    #[test]
    fn test_to_small_product_uses_uuid_as_barcode() {
        let product = decode(&preview()).unwrap();
        let small = product
            .to_small_product(Language::English, Datasource::NutritionPrivacy)
            .unwrap();

        assert_eq!(small.name, "Rivella Red");
        assert_eq!(small.barcode, "3F2504E0-4F89-41D3-9A0C-0305E82C3301");
        assert_eq!(small.quantity.as_deref(), Some("500ml"));
        assert_eq!(small.source, Datasource::NutritionPrivacy);
    }

    #[test]
    fn test_optional_sections_may_be_absent() {
        let mut value = preview();
        let object = value.as_object_mut().unwrap();
        object.remove("brands");
        object.remove("servings");
        object.insert("totalQuantity".to_string(), Value::Null);

        let product = decode(&value).unwrap();
        assert_eq!(product.brand(), None);
        assert_eq!(product.quantity(), None);
        assert_eq!(product.serving_size(), None);
    }

    #[test]
    fn test_lenient_calories() {
        let mut value = preview();
        value["calories"] = json!("38");
        assert_eq!(decode(&value).unwrap().energy_kcal(), 38);

        value["calories"] = json!(38.5);
        assert!(matches!(decode(&value), Err(DecodeError::TypeMismatch { .. })));
    }

    #[test]
    fn test_invalid_id() {
        let mut value = preview();
        value["id"] = json!("not-a-uuid");
        assert!(matches!(decode(&value), Err(DecodeError::TypeMismatch { field, .. }) if field == "id"));
    }

    #[test]
    fn test_unknown_unit_fails_record() {
        let mut value = preview();
        value["totalQuantity"] = json!({"unit": "oz", "value": 12});
        assert!(matches!(decode(&value), Err(DecodeError::TypeMismatch { .. })));
    }

    #[test]
    fn test_names_in_unsupported_languages_only() {
        let mut value = preview();
        value["names"] = json!([{"value": "Rivella Rouge", "languageCode": "fr_CH"}, {"languageCode": "de_CH"}]);
        assert!(matches!(decode(&value), Err(DecodeError::MissingName)));
    }
}
