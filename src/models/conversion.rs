//! Conversion entry models
//!
//! Per-food gram weights: user-entered custom conversions and supplier
//! portion data from the food database.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::nutrition::units::normalize_unit;

/// User-entered unit → grams-per-unit overrides
///
/// Keys are normalized on insert, and lookups normalize both sides (tables
/// decoded from storage may carry raw keys), so "Cups", " cup " and "cup"
/// all hit the same entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversionTable(BTreeMap<String, f64>);

impl ConversionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, unit: impl Into<String>, grams_per_unit: f64) {
        let unit = unit.into();
        let key = normalize_unit(&unit);
        self.0.retain(|k, _| normalize_unit(k) != key);
        self.0.insert(key, grams_per_unit);
    }

    pub fn with(mut self, unit: impl Into<String>, grams_per_unit: f64) -> Self {
        self.insert(unit, grams_per_unit);
        self
    }

    /// Grams per one `unit`, if an entry exists
    pub fn get(&self, unit: &str) -> Option<f64> {
        let wanted = normalize_unit(unit);
        self.0
            .iter()
            .find(|(k, _)| normalize_unit(k) == wanted)
            .map(|(_, v)| *v)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &f64)> {
        self.0.iter()
    }
}

impl FromIterator<(String, f64)> for ConversionTable {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        let mut table = ConversionTable::new();
        for (unit, grams) in iter {
            table.insert(unit, grams);
        }
        table
    }
}

/// Supplier-provided household measure for a food ("1 cup, chopped = 160 g")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodPortion {
    /// How many `unit`s the gram weight covers
    pub amount: f64,
    pub unit: String,
    #[serde(default)]
    pub abbreviation: Option<String>,
    /// Size or preparation qualifier ("large", "chopped")
    #[serde(default)]
    pub modifier: Option<String>,
    pub gram_weight: f64,
}

impl FoodPortion {
    /// Grams in a single unit of this portion, if the data is usable
    pub fn grams_per_unit(&self) -> Option<f64> {
        if self.amount > 0.0 && self.amount.is_finite() && self.gram_weight.is_finite() && self.gram_weight > 0.0 {
            Some(self.gram_weight / self.amount)
        } else {
            None
        }
    }

    /// Whether this portion describes `unit` (by name, abbreviation or size modifier)
    pub fn matches(&self, unit: &str) -> bool {
        let wanted = normalize_unit(unit);
        if wanted.is_empty() {
            return false;
        }
        std::iter::once(Some(self.unit.as_str()))
            .chain(std::iter::once(self.abbreviation.as_deref()))
            .chain(std::iter::once(self.modifier.as_deref()))
            .flatten()
            .any(|candidate| normalize_unit(candidate) == wanted)
    }
}
