//! OpenFoodFacts JSONL export records

use super::fields::{self, FieldKey, Object};
use super::{non_empty, DecodeError, Quantity, RecordNormalizer};
use pantry_common::Language;
use std::collections::BTreeMap;

/// Per-100g nutrition values every usable record carries
#[derive(Debug, Clone, PartialEq)]
pub struct BaseNutriments {
    pub energy_kcal: i64,
    pub proteins: f64,
    pub fat: f64,
    pub carbohydrates: f64,
}

impl BaseNutriments {
    fn decode(object: &Object) -> Result<Self, DecodeError> {
        let nutriment = |name: &str| FieldKey::suffixed(name, "_100g");

        Ok(Self {
            energy_kcal: fields::require_i64(object, &nutriment("energy-kcal")?)?,
            proteins: fields::require_f64(object, &nutriment("proteins")?)?,
            fat: fields::require_f64(object, &nutriment("fat")?)?,
            carbohydrates: fields::require_f64(object, &nutriment("carbohydrates")?)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenFoodFactsProduct {
    names: BTreeMap<Language, String>,
    brand: Option<String>,
    barcode: String,
    nutriments: BaseNutriments,
    quantity: Option<Quantity>,
    serving_size: Option<Quantity>,
}

/// `product_name` holds the English name, other languages add `_<code>`
fn name_key(language: Language) -> Result<FieldKey<'static>, DecodeError> {
    let suffix = match language {
        Language::English => String::new(),
        other => format!("_{}", other.code()),
    };
    FieldKey::suffixed("product_name", &suffix)
}

fn decode_barcode(object: &Object) -> Result<String, DecodeError> {
    let key = FieldKey::new("code")?;
    let barcode = match fields::require(object, &key)? {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Number(n) if n.is_u64() => n.to_string(),
        _ => {
            return Err(DecodeError::TypeMismatch {
                field: key.to_string(),
                expected: "barcode",
            })
        },
    };

    if barcode.is_empty() {
        return Err(DecodeError::MissingField(key.to_string()));
    }
    Ok(barcode)
}

fn decode_quantity(object: &Object, key: &str) -> Result<Option<Quantity>, DecodeError> {
    Ok(fields::optional_str(object, &FieldKey::new(key)?)?.and_then(Quantity::parse))
}

impl OpenFoodFactsProduct {
    pub fn nutriments(&self) -> &BaseNutriments {
        &self.nutriments
    }
}

impl RecordNormalizer for OpenFoodFactsProduct {
    fn decode(line: &[u8]) -> Result<Self, DecodeError> {
        let object = fields::parse_object(line)?;

        let mut names = BTreeMap::new();
        for language in Language::ALL {
            if let Some(name) = fields::optional_str(&object, &name_key(language)?)?.and_then(non_empty) {
                names.insert(language, name);
            }
        }
        if names.is_empty() {
            return Err(DecodeError::MissingName);
        }

        let brand = fields::optional_str(&object, &FieldKey::new("brands")?)?
            .and_then(|brands| brands.split(',').find_map(non_empty));

        let barcode = decode_barcode(&object)?;
        let nutriments = BaseNutriments::decode(fields::require_object(&object, &FieldKey::new("nutriments")?)?)?;

        let quantity = decode_quantity(&object, "quantity")?;
        let serving_size = decode_quantity(&object, "serving_size")?;
        if quantity.is_none() && serving_size.is_none() {
            return Err(DecodeError::MissingUnit);
        }

        Ok(Self {
            names,
            brand,
            barcode,
            nutriments,
            quantity,
            serving_size,
        })
    }

    fn names(&self) -> &BTreeMap<Language, String> {
        &self.names
    }

    fn brand(&self) -> Option<&str> {
        self.brand.as_deref()
    }

    fn id(&self) -> &str {
        &self.barcode
    }

    fn energy_kcal(&self) -> i64 {
        self.nutriments.energy_kcal
    }

    fn quantity(&self) -> Option<&Quantity> {
        self.quantity.as_ref()
    }

    fn serving_size(&self) -> Option<&Quantity> {
        self.serving_size.as_ref()
    }
}
