//! Amount + unit values such as `1200g` or `0,5 l`

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    Milliliter,
    Liter,
    Microgram,
    Milligram,
    Gram,
    Kilogram,
}

impl Unit {
    /// Canonical code written to shards
    pub fn code(self) -> &'static str {
        match self {
            Unit::Milliliter => "ml",
            Unit::Liter => "l",
            Unit::Microgram => "microgram",
            Unit::Milligram => "mg",
            Unit::Gram => "g",
            Unit::Kilogram => "kg",
        }
    }

    /// Case-insensitive lookup of a unit code or its spelled-out English or
    /// German name (`grams`, `litre`, `Gramm`, ...)
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_lowercase().as_str() {
            "ml" | "milliliter" | "millilitre" | "milliliters" | "millilitres" => Some(Unit::Milliliter),
            "l" | "liter" | "litre" | "liters" | "litres" => Some(Unit::Liter),
            "microgram" | "micrograms" | "mcg" | "µg" | "μg" | "ug" => Some(Unit::Microgram),
            "mg" | "milligram" | "milligrams" | "milligramm" => Some(Unit::Milligram),
            "g" | "gr" | "gram" | "grams" | "gramm" | "gramme" | "grammes" => Some(Unit::Gram),
            "kg" | "kgs" | "kilogram" | "kilograms" | "kilogramm" => Some(Unit::Kilogram),
            _ => None,
        }
    }
}

/// Parsed quantity.
///
/// Formatting truncates the amount to a whole number, so `1.5kg` is written
/// back as `1kg`. The round trip is lossy on purpose: shards only carry the
/// integer form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantity {
    pub amount: f64,
    pub unit: Unit,
}

impl Quantity {
    pub fn new(amount: f64, unit: Unit) -> Self {
        Self { amount, unit }
    }

    /// Parse free text like `"1200 g (4 x 300g)"`.
    ///
    /// The leading number is the amount (`.` or `,` as decimal separator)
    /// and the alphabetic token after it is the unit. Anything else yields
    /// `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let number_end = text
            .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == ','))
            .unwrap_or(text.len());
        if number_end == 0 {
            return None;
        }

        let amount = text[..number_end].replace(',', ".").parse::<f64>().ok()?;

        let rest = text[number_end..].trim_start();
        let unit_end = rest.find(|c: char| !c.is_alphabetic()).unwrap_or(rest.len());
        let unit = Unit::from_code(&rest[..unit_end])?;

        Some(Self { amount, unit })
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount.trunc() as i64, self.unit.code())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_compact_and_spaced() {
        assert_eq!(Quantity::parse("1200g"), Some(Quantity::new(1200.0, Unit::Gram)));
        assert_eq!(Quantity::parse("500 ml"), Some(Quantity::new(500.0, Unit::Milliliter)));
        assert_eq!(Quantity::parse(" 1.5 kg "), Some(Quantity::new(1.5, Unit::Kilogram)));
        assert_eq!(Quantity::parse("0,33 L"), Some(Quantity::new(0.33, Unit::Liter)));
    }

    #[test]
    fn test_kilogram_is_not_read_as_gram() {
        assert_eq!(Quantity::parse("2kg").unwrap().unit, Unit::Kilogram);
        assert_eq!(Quantity::parse("250mg").unwrap().unit, Unit::Milligram);
    }

    #[test]
    fn test_microgram_aliases() {
        for text in ["40 mcg", "40µg", "40 microgram", "40UG"] {
            assert_eq!(Quantity::parse(text).unwrap().unit, Unit::Microgram, "{}", text);
        }
    }

    #[test]
    fn test_spelled_out_units() {
        let cases = [
            ("500 grams", Unit::Gram),
            ("250 gr", Unit::Gram),
            ("100 Gramm", Unit::Gram),
            ("1 litre", Unit::Liter),
            ("1 Liter", Unit::Liter),
            ("2 kgs", Unit::Kilogram),
            ("1 Kilogramm", Unit::Kilogram),
            ("330 millilitres", Unit::Milliliter),
            ("5 milligram", Unit::Milligram),
        ];
        for (text, unit) in cases {
            assert_eq!(Quantity::parse(text).map(|q| q.unit), Some(unit), "{}", text);
        }
        assert_eq!(Quantity::parse("500 grams").unwrap().to_string(), "500g");
    }

    #[test]
    fn test_trailing_text_is_ignored() {
        assert_eq!(Quantity::parse("1200 g (4 x 300g)"), Some(Quantity::new(1200.0, Unit::Gram)));
    }

    #[test]
    fn test_unparseable() {
        assert_eq!(Quantity::parse(""), None);
        assert_eq!(Quantity::parse("500"), None);
        assert_eq!(Quantity::parse("g500"), None);
        assert_eq!(Quantity::parse("2 x 150g"), None);
        assert_eq!(Quantity::parse("1.2.3g"), None);
        assert_eq!(Quantity::parse("12 oz"), None);
    }

    #[test]
    fn test_display_truncates() {
        assert_eq!(Quantity::new(1200.0, Unit::Gram).to_string(), "1200g");
        assert_eq!(Quantity::new(1.5, Unit::Kilogram).to_string(), "1kg");
        assert_eq!(Quantity::new(0.33, Unit::Liter).to_string(), "0l");
        assert_eq!(Quantity::new(40.0, Unit::Microgram).to_string(), "40microgram");
    }
}
