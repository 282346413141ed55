//! Unit conversion functions
//!
//! Maps a quantity + unit to grams. Sources are tried in priority order:
//! custom conversions, supplier portions, the standard table. The first
//! match wins; if none applies the result is [`Confidence::Unknown`] with
//! zero grams and it is up to the caller to refuse or estimate.

use serde::Serialize;

use crate::models::{ConversionTable, FoodPortion};
use super::units::{standard_unit, Confidence};

/// Food-specific conversion data
#[derive(Debug, Clone, Copy, Default)]
pub struct ConversionContext<'a> {
    pub custom_conversions: Option<&'a ConversionTable>,
    pub supplier_portions: &'a [FoodPortion],
}

impl<'a> ConversionContext<'a> {
    pub fn new(custom_conversions: Option<&'a ConversionTable>, supplier_portions: &'a [FoodPortion]) -> Self {
        Self {
            custom_conversions,
            supplier_portions,
        }
    }
}

/// Where a gram weight came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionSource {
    Custom,
    SupplierPortion,
    Standard,
    Unresolved,
}

/// Result of a unit conversion
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Conversion {
    pub grams: f64,
    pub confidence: Confidence,
    pub source: ConversionSource,
    /// A fixed estimate (pinch, large) rather than a measured weight
    pub approximate: bool,
}

impl Conversion {
    pub fn is_resolved(&self) -> bool {
        self.confidence != Confidence::Unknown
    }
}

/// Convert `quantity` of `unit` to grams
///
/// Quantities must already be validated as positive and finite.
pub fn convert(quantity: f64, unit: &str, context: ConversionContext<'_>) -> Conversion {
    if let Some(grams_per) = context
        .custom_conversions
        .and_then(|table| table.get(unit))
        .filter(|g| g.is_finite() && *g > 0.0)
    {
        return Conversion {
            grams: quantity * grams_per,
            confidence: Confidence::High,
            source: ConversionSource::Custom,
            approximate: false,
        };
    }

    if let Some(grams_per) = context
        .supplier_portions
        .iter()
        .filter(|p| p.matches(unit))
        .find_map(FoodPortion::grams_per_unit)
    {
        return Conversion {
            grams: quantity * grams_per,
            confidence: Confidence::High,
            source: ConversionSource::SupplierPortion,
            approximate: false,
        };
    }

    if let Some(standard) = standard_unit(unit) {
        return Conversion {
            grams: quantity * standard.grams_per_unit,
            confidence: standard.confidence,
            source: ConversionSource::Standard,
            approximate: standard.is_approximate(),
        };
    }

    tracing::debug!("No gram conversion for unit '{}'", unit);
    Conversion {
        grams: 0.0,
        confidence: Confidence::Unknown,
        source: ConversionSource::Unresolved,
        approximate: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn portion(unit: &str, amount: f64, gram_weight: f64) -> FoodPortion {
        FoodPortion {
            amount,
            unit: unit.into(),
            abbreviation: None,
            modifier: None,
            gram_weight,
        }
    }

    #[test]
    fn test_custom_conversion_for_flour() {
        let custom = ConversionTable::new().with("cup", 120.0);
        let result = convert(2.0, "cup", ConversionContext::new(Some(&custom), &[]));
        assert_eq!(result.grams, 240.0);
        assert_eq!(result.confidence, Confidence::High);
        assert_eq!(result.source, ConversionSource::Custom);
    }

    #[test]
    fn test_custom_beats_supplier_and_standard() {
        let custom = ConversionTable::new().with("Cups", 125.0);
        let portions = vec![portion("cup", 1.0, 140.0)];
        for unit in ["cup", "CUP", " cups "] {
            let result = convert(1.0, unit, ConversionContext::new(Some(&custom), &portions));
            assert_eq!(result.grams, 125.0);
            assert_eq!(result.source, ConversionSource::Custom);
        }
    }

    #[test]
    fn test_supplier_portion_divides_by_amount() {
        let portions = vec![portion("tbsp", 2.0, 30.0)];
        let result = convert(3.0, "tablespoon", ConversionContext::new(None, &portions));
        assert_eq!(result.source, ConversionSource::Standard);

        let portions = vec![FoodPortion {
            abbreviation: Some("tablespoon".into()),
            ..portion("tbsp", 2.0, 30.0)
        }];
        let result = convert(3.0, "Tablespoons", ConversionContext::new(None, &portions));
        assert_eq!(result.grams, 45.0);
        assert_eq!(result.confidence, Confidence::High);
        assert_eq!(result.source, ConversionSource::SupplierPortion);
    }

    #[test]
    fn test_supplier_size_modifier() {
        let portions = vec![FoodPortion {
            modifier: Some("large".into()),
            ..portion("egg", 1.0, 50.0)
        }];
        let result = convert(2.0, "large", ConversionContext::new(None, &portions));
        assert_eq!(result.grams, 100.0);
        assert_eq!(result.source, ConversionSource::SupplierPortion);
    }

    #[test]
    fn test_standard_table_fallback() {
        let result = convert(2.0, "lb", ConversionContext::default());
        assert!((result.grams - 907.18474).abs() < 1e-9);
        assert_eq!(result.confidence, Confidence::Medium);

        assert!(!result.approximate);

        let result = convert(1.0, "pinch", ConversionContext::default());
        assert_eq!(result.confidence, Confidence::Medium);
        assert!(result.approximate);
    }

    #[test]
    fn test_unknown_unit() {
        let result = convert(3.0, "scoop", ConversionContext::default());
        assert_eq!(result.grams, 0.0);
        assert_eq!(result.confidence, Confidence::Unknown);
        assert!(!result.is_resolved());
    }

    #[test]
    fn test_unusable_custom_entry_is_skipped() {
        let custom = ConversionTable::new().with("cup", 0.0);
        let result = convert(1.0, "cup", ConversionContext::new(Some(&custom), &[]));
        assert_eq!(result.source, ConversionSource::Standard);
    }
}
