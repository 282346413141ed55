//! Unit types and conversion constants
//!
//! The standard (tier 3) conversion table and unit-string normalization.
//! Every entry is medium confidence. Volume units assume the density of
//! water (1 g/ml); loose measures and size descriptors are rough estimates
//! and report [`StandardUnit::is_approximate`].

use serde::{Deserialize, Serialize};

/// How authoritative a gram-equivalence is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Unknown,
    Low,
    Medium,
    High,
}

/// Category of a measurement unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitCategory {
    /// Exact mass units (g, oz, lb, kg)
    Weight,
    /// Volume units converted at water density
    Volume,
    /// Pinch, dash, smidgen
    Loose,
    /// Small/medium/large single items
    Size,
    /// Anything the standard table does not know
    Custom,
}

/// A standard-table entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StandardUnit {
    pub canonical: &'static str,
    pub grams_per_unit: f64,
    pub category: UnitCategory,
    pub confidence: Confidence,
}

impl StandardUnit {
    /// Loose measures and size words: fixed estimates, not measurements
    pub fn is_approximate(&self) -> bool {
        matches!(self.category, UnitCategory::Loose | UnitCategory::Size)
    }
}

// ============================================================================
// Weight Conversion Constants (to grams, exact)
// ============================================================================

pub const G_PER_MG: f64 = 0.001;
pub const G_PER_KG: f64 = 1000.0;
/// International avoirdupois ounce
pub const G_PER_OZ: f64 = 28.349523125;
/// International avoirdupois pound
pub const G_PER_LB: f64 = 453.59237;

// ============================================================================
// Volume Conversion Constants (to milliliters, US customary)
// ============================================================================

pub const ML_PER_TSP: f64 = 4.92892159375;
pub const ML_PER_TBSP: f64 = 14.78676478125;
pub const ML_PER_FL_OZ: f64 = 29.5735295625;
pub const ML_PER_CUP: f64 = 236.5882365;
pub const ML_PER_PINT: f64 = 473.176473;
pub const ML_PER_QUART: f64 = 946.352946;
pub const ML_PER_LITER: f64 = 1000.0;
pub const ML_PER_GALLON: f64 = 3785.411784;

/// Grams of water per milliliter
pub const WATER_DENSITY_G_PER_ML: f64 = 1.0;

// ============================================================================
// Approximate measures (not authoritative)
// ============================================================================

/// About 1/16 tsp of a dry spice
pub const G_PER_PINCH: f64 = 0.3;
/// About 1/8 tsp
pub const G_PER_DASH: f64 = 0.6;
/// About 1/32 tsp
pub const G_PER_SMIDGEN: f64 = 0.15;

/// Representative single-item weights for produce/eggs-sized foods
pub const G_PER_SMALL: f64 = 75.0;
pub const G_PER_MEDIUM: f64 = 110.0;
pub const G_PER_LARGE: f64 = 150.0;
pub const G_PER_EXTRA_LARGE: f64 = 200.0;
pub const G_PER_JUMBO: f64 = 250.0;

// ============================================================================
// Normalization
// ============================================================================

/// Fold case, whitespace, periods and plurals so unit strings compare equal
///
/// "Cups " → "cup", "Tbsps." → "tbsp", "fl. oz" → "fl oz", "pinches" → "pinch"
pub fn normalize_unit(unit: &str) -> String {
    let lower = unit.trim().to_lowercase().replace('.', " ");
    let collapsed = lower.split_whitespace().collect::<Vec<_>>().join(" ");
    let singular: Vec<String> = collapsed.split(' ').map(singularize).collect();
    singular.join(" ")
}

fn singularize(word: &str) -> String {
    if word.len() <= 2 || word.ends_with("ss") {
        return word.to_string();
    }
    if let Some(stem) = word.strip_suffix("ies") {
        return format!("{}y", stem);
    }
    if let Some(stem) = word.strip_suffix("es") {
        if stem.ends_with("ch") || stem.ends_with("sh") || stem.ends_with('x') || stem.ends_with('o') {
            return stem.to_string();
        }
    }
    match word.strip_suffix('s') {
        Some(stem) => stem.to_string(),
        None => word.to_string(),
    }
}

/// Look up a unit in the standard table (after normalization)
pub fn standard_unit(unit: &str) -> Option<StandardUnit> {
    let normalized = normalize_unit(unit);
    let entry = |canonical: &'static str, grams_per_unit: f64, category: UnitCategory| StandardUnit {
        canonical,
        grams_per_unit,
        category,
        confidence: Confidence::Medium,
    };
    let volume = |canonical: &'static str, ml: f64| entry(canonical, ml * WATER_DENSITY_G_PER_ML, UnitCategory::Volume);
    use UnitCategory::{Loose, Size, Weight};

    let found = match normalized.as_str() {
        "g" | "gram" | "gramme" | "gr" => entry("g", 1.0, Weight),
        "mg" | "milligram" => entry("mg", G_PER_MG, Weight),
        "kg" | "kilogram" | "kilo" => entry("kg", G_PER_KG, Weight),
        "oz" | "ounce" => entry("oz", G_PER_OZ, Weight),
        "lb" | "pound" => entry("lb", G_PER_LB, Weight),

        "ml" | "milliliter" | "millilitre" | "cc" => volume("ml", 1.0),
        "l" | "liter" | "litre" => volume("l", ML_PER_LITER),
        "tsp" | "teaspoon" => volume("tsp", ML_PER_TSP),
        "tbsp" | "tablespoon" | "tbs" | "tb" | "tbl" => volume("tbsp", ML_PER_TBSP),
        "fl oz" | "floz" | "fluid ounce" | "fl ounce" => volume("fl oz", ML_PER_FL_OZ),
        "cup" | "c" => volume("cup", ML_PER_CUP),
        "pint" | "pt" => volume("pint", ML_PER_PINT),
        "quart" | "qt" => volume("quart", ML_PER_QUART),
        "gallon" | "gal" => volume("gallon", ML_PER_GALLON),

        "pinch" => entry("pinch", G_PER_PINCH, Loose),
        "dash" => entry("dash", G_PER_DASH, Loose),
        "smidgen" | "smidge" => entry("smidgen", G_PER_SMIDGEN, Loose),

        "small" | "sm" => entry("small", G_PER_SMALL, Size),
        "medium" | "med" => entry("medium", G_PER_MEDIUM, Size),
        "large" | "lg" => entry("large", G_PER_LARGE, Size),
        "extra large" | "extra-large" | "xl" => entry("extra large", G_PER_EXTRA_LARGE, Size),
        "jumbo" => entry("jumbo", G_PER_JUMBO, Size),
        _ => return None,
    };
    Some(found)
}

/// Determine the category of a unit string
pub fn categorize_unit(unit: &str) -> UnitCategory {
    standard_unit(unit)
        .map(|u| u.category)
        .unwrap_or(UnitCategory::Custom)
}

/// Count-style words that are units when they follow a quantity, even though
/// they have no standard gram weight ("2 cloves garlic", "1 can beans")
const COUNT_UNITS: &[&str] = &[
    "each", "piece", "clove", "can", "slice", "stick", "bunch", "sprig", "head", "stalk",
    "package", "pkg", "jar", "bottle", "handful", "serving", "leaf", "fillet", "whole",
];

/// Whether a token can act as the unit of an ingredient line
pub fn is_known_unit(token: &str) -> bool {
    let normalized = normalize_unit(token);
    standard_unit(&normalized).is_some() || COUNT_UNITS.contains(&normalized.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_folds_case_whitespace_and_plurals() {
        assert_eq!(normalize_unit(" Cups "), "cup");
        assert_eq!(normalize_unit("Tbsps."), "tbsp");
        assert_eq!(normalize_unit("fl.  oz."), "fl oz");
        assert_eq!(normalize_unit("pinches"), "pinch");
        assert_eq!(normalize_unit("lbs"), "lb");
        assert_eq!(normalize_unit("g"), "g");
        assert_eq!(normalize_unit("glass"), "glass");
        assert_eq!(normalize_unit("tomatoes"), "tomato");
        assert_eq!(normalize_unit("berries"), "berry");
    }

    #[test]
    fn test_categorize_units() {
        assert_eq!(categorize_unit("g"), UnitCategory::Weight);
        assert_eq!(categorize_unit("ounces"), UnitCategory::Weight);
        assert_eq!(categorize_unit("tbsp"), UnitCategory::Volume);
        assert_eq!(categorize_unit("Gallons"), UnitCategory::Volume);
        assert_eq!(categorize_unit("dash"), UnitCategory::Loose);
        assert_eq!(categorize_unit("jumbo"), UnitCategory::Size);
        assert_eq!(categorize_unit("scoop"), UnitCategory::Custom);
    }

    #[test]
    fn test_exact_mass_factors() {
        assert_eq!(standard_unit("lb").unwrap().grams_per_unit, 453.59237);
        assert_eq!(standard_unit("oz").unwrap().grams_per_unit, 28.349523125);
        assert_eq!(standard_unit("kg").unwrap().grams_per_unit, 1000.0);
    }

    #[test]
    fn test_volume_uses_water_density() {
        let cup = standard_unit("cup").unwrap();
        assert!((cup.grams_per_unit - 236.588).abs() < 0.001);
        assert_eq!(cup.confidence, Confidence::Medium);
        assert!((standard_unit("fl oz").unwrap().grams_per_unit - 29.5735).abs() < 0.001);
    }

    #[test]
    fn test_estimates_are_medium_but_approximate() {
        let pinch = standard_unit("pinch").unwrap();
        assert_eq!(pinch.confidence, Confidence::Medium);
        assert!(pinch.is_approximate());
        let large = standard_unit("Large").unwrap();
        assert_eq!(large.confidence, Confidence::Medium);
        assert!(large.is_approximate());
        assert!(!standard_unit("cup").unwrap().is_approximate());
        assert!(!standard_unit("oz").unwrap().is_approximate());
    }

    #[test]
    fn test_known_units_include_count_words() {
        assert!(is_known_unit("cloves"));
        assert!(is_known_unit("cup"));
        assert!(!is_known_unit("tomato"));
    }
}
