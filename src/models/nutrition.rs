//! Shared nutrition data structure
//!
//! A [`NutrientProfile`] always describes 100 grams of food. The set of
//! nutrients is fixed; [`Nutrient`] names each field so tables (rounding,
//! daily values, FDC nutrient numbers) can be keyed by it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DataQualityWarning, ValidationError};

/// Unit a nutrient amount is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NutrientUnit {
    Kcal,
    Gram,
    Milligram,
    Microgram,
}

impl NutrientUnit {
    /// Suffix used on labels ("" for energy)
    pub fn label_suffix(&self) -> &'static str {
        match self {
            NutrientUnit::Kcal => "",
            NutrientUnit::Gram => "g",
            NutrientUnit::Milligram => "mg",
            NutrientUnit::Microgram => "mcg",
        }
    }
}

macro_rules! nutrients {
    ($( $variant:ident => $field:ident, $label:literal, $unit:ident; )*) => {
        /// One named field of a [`NutrientProfile`]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum Nutrient {
            $($variant,)*
        }

        impl Nutrient {
            /// Every nutrient, in label order
            pub const ALL: &'static [Nutrient] = &[$(Nutrient::$variant,)*];

            /// snake_case field name
            pub fn key(self) -> &'static str {
                match self {
                    $(Nutrient::$variant => stringify!($field),)*
                }
            }

            /// Human-readable label text
            pub fn label(self) -> &'static str {
                match self {
                    $(Nutrient::$variant => $label,)*
                }
            }

            pub fn unit(self) -> NutrientUnit {
                match self {
                    $(Nutrient::$variant => NutrientUnit::$unit,)*
                }
            }
        }

        /// Nutrient amounts per 100 g of food
        #[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
        #[serde(default)]
        pub struct NutrientProfile {
            $(pub $field: f64,)*
        }

        impl NutrientProfile {
            pub fn get(&self, nutrient: Nutrient) -> f64 {
                match nutrient {
                    $(Nutrient::$variant => self.$field,)*
                }
            }

            pub fn set(&mut self, nutrient: Nutrient, value: f64) {
                match nutrient {
                    $(Nutrient::$variant => self.$field = value,)*
                }
            }
        }
    };
}

nutrients! {
    Calories => calories, "Calories", Kcal;
    TotalFat => total_fat, "Total Fat", Gram;
    SaturatedFat => saturated_fat, "Saturated Fat", Gram;
    TransFat => trans_fat, "Trans Fat", Gram;
    PolyunsaturatedFat => polyunsaturated_fat, "Polyunsaturated Fat", Gram;
    MonounsaturatedFat => monounsaturated_fat, "Monounsaturated Fat", Gram;
    Cholesterol => cholesterol, "Cholesterol", Milligram;
    Sodium => sodium, "Sodium", Milligram;
    TotalCarbohydrate => total_carbohydrate, "Total Carbohydrate", Gram;
    DietaryFiber => dietary_fiber, "Dietary Fiber", Gram;
    TotalSugars => total_sugars, "Total Sugars", Gram;
    AddedSugars => added_sugars, "Added Sugars", Gram;
    Protein => protein, "Protein", Gram;
    VitaminD => vitamin_d, "Vitamin D", Microgram;
    Calcium => calcium, "Calcium", Milligram;
    Iron => iron, "Iron", Milligram;
    Potassium => potassium, "Potassium", Milligram;
    VitaminA => vitamin_a, "Vitamin A", Microgram;
    VitaminC => vitamin_c, "Vitamin C", Milligram;
    VitaminE => vitamin_e, "Vitamin E", Milligram;
    VitaminK => vitamin_k, "Vitamin K", Microgram;
    Thiamin => thiamin, "Thiamin", Milligram;
    Riboflavin => riboflavin, "Riboflavin", Milligram;
    Niacin => niacin, "Niacin", Milligram;
    VitaminB6 => vitamin_b6, "Vitamin B6", Milligram;
    Folate => folate, "Folate", Microgram;
    VitaminB12 => vitamin_b12, "Vitamin B12", Microgram;
    Magnesium => magnesium, "Magnesium", Milligram;
    Phosphorus => phosphorus, "Phosphorus", Milligram;
    Zinc => zinc, "Zinc", Milligram;
    Copper => copper, "Copper", Milligram;
    Manganese => manganese, "Manganese", Milligram;
    Selenium => selenium, "Selenium", Microgram;
}

impl Nutrient {
    /// Look up a nutrient by field name, label, or a common alias
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized: String = name
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c == ' ' || c == '-' { '_' } else { c })
            .collect();

        if let Some(n) = Nutrient::ALL.iter().find(|n| n.key() == normalized) {
            return Some(*n);
        }

        match normalized.as_str() {
            "energy" | "kcal" | "calorie" => Some(Nutrient::Calories),
            "fat" => Some(Nutrient::TotalFat),
            "sat_fat" | "saturated" => Some(Nutrient::SaturatedFat),
            "trans" => Some(Nutrient::TransFat),
            "carbs" | "carbohydrate" | "carbohydrates" | "total_carbs" => {
                Some(Nutrient::TotalCarbohydrate)
            }
            "fiber" | "fibre" => Some(Nutrient::DietaryFiber),
            "sugar" | "sugars" => Some(Nutrient::TotalSugars),
            "added_sugar" => Some(Nutrient::AddedSugars),
            "vitamin_b_6" | "b6" => Some(Nutrient::VitaminB6),
            "vitamin_b_12" | "b12" => Some(Nutrient::VitaminB12),
            "vitamin_b1" => Some(Nutrient::Thiamin),
            "vitamin_b2" => Some(Nutrient::Riboflavin),
            "vitamin_b3" => Some(Nutrient::Niacin),
            _ => None,
        }
    }
}

impl FromStr for Nutrient {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Nutrient::from_name(s).ok_or_else(|| ValidationError::UnknownNutrient(s.to_string()))
    }
}

impl fmt::Display for Nutrient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl NutrientProfile {
    /// Create a new profile with all zeros
    pub fn zero() -> Self {
        Self::default()
    }

    /// Iterate over (nutrient, value) pairs in label order
    pub fn iter(&self) -> impl Iterator<Item = (Nutrient, f64)> + '_ {
        Nutrient::ALL.iter().map(move |n| (*n, self.get(*n)))
    }

    /// Scale every field by a multiplier
    pub fn scale(&self, multiplier: f64) -> Self {
        let mut out = Self::zero();
        for (n, v) in self.iter() {
            out.set(n, v * multiplier);
        }
        out
    }

    /// Field-wise sum
    pub fn add(&self, other: &NutrientProfile) -> Self {
        let mut out = Self::zero();
        for (n, v) in self.iter() {
            out.set(n, v + other.get(n));
        }
        out
    }

    /// True when every field is finite and non-negative
    pub fn is_valid(&self) -> bool {
        self.iter().all(|(_, v)| v.is_finite() && v >= 0.0)
    }

    /// Replace NaN, infinite and negative fields with zero, reporting each one
    pub fn sanitized(&self, subject: &str) -> (Self, Vec<DataQualityWarning>) {
        let mut out = *self;
        let mut warnings = Vec::new();
        for (n, v) in self.iter() {
            if !v.is_finite() || v < 0.0 {
                warnings.push(DataQualityWarning::new(
                    subject,
                    format!("{} value {} is invalid; using 0", n.label(), v),
                ));
                out.set(n, 0.0);
            }
        }
        (out, warnings)
    }
}

impl std::ops::Add for NutrientProfile {
    type Output = NutrientProfile;

    fn add(self, other: NutrientProfile) -> NutrientProfile {
        NutrientProfile::add(&self, &other)
    }
}

impl std::ops::Mul<f64> for NutrientProfile {
    type Output = NutrientProfile;

    fn mul(self, multiplier: f64) -> NutrientProfile {
        self.scale(multiplier)
    }
}

impl std::iter::Sum for NutrientProfile {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(NutrientProfile::zero(), |acc, n| acc + n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set_roundtrip_every_field() {
        let mut p = NutrientProfile::zero();
        for (i, n) in Nutrient::ALL.iter().enumerate() {
            p.set(*n, i as f64);
        }
        for (i, n) in Nutrient::ALL.iter().enumerate() {
            assert_eq!(p.get(*n), i as f64);
        }
    }

    #[test]
    fn test_serde_keys_match_field_names() {
        let p = NutrientProfile {
            vitamin_b12: 1.5,
            ..Default::default()
        };
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["vitamin_b12"], 1.5);

        let key = serde_json::to_value(Nutrient::VitaminB12).unwrap();
        assert_eq!(key, "vitamin_b12");
        assert_eq!(Nutrient::VitaminB12.key(), "vitamin_b12");
    }

    #[test]
    fn test_missing_fields_deserialize_as_zero() {
        let p: NutrientProfile = serde_json::from_str(r#"{"calories": 120}"#).unwrap();
        assert_eq!(p.calories, 120.0);
        assert_eq!(p.sodium, 0.0);
    }

    #[test]
    fn test_scale_and_sum() {
        let a = NutrientProfile {
            calories: 100.0,
            protein: 2.0,
            ..Default::default()
        };
        let b = NutrientProfile {
            calories: 50.0,
            sodium: 10.0,
            ..Default::default()
        };
        let total: NutrientProfile = vec![a * 2.0, b].into_iter().sum();
        assert_eq!(total.calories, 250.0);
        assert_eq!(total.protein, 4.0);
        assert_eq!(total.sodium, 10.0);
    }

    #[test]
    fn test_sanitized_clamps_invalid_values() {
        let p = NutrientProfile {
            calories: f64::NAN,
            sodium: -3.0,
            protein: 4.0,
            iron: f64::INFINITY,
            ..Default::default()
        };
        assert!(!p.is_valid());
        let (clean, warnings) = p.sanitized("broth");
        assert!(clean.is_valid());
        assert_eq!(clean.protein, 4.0);
        assert_eq!(clean.sodium, 0.0);
        assert_eq!(warnings.len(), 3);
        assert!(warnings.iter().all(|w| w.subject == "broth"));
    }

    #[test]
    fn test_nutrient_from_name() {
        assert_eq!(Nutrient::from_name("sodium"), Some(Nutrient::Sodium));
        assert_eq!(Nutrient::from_name("Total Fat"), Some(Nutrient::TotalFat));
        assert_eq!(Nutrient::from_name("carbs"), Some(Nutrient::TotalCarbohydrate));
        assert_eq!(Nutrient::from_name("vitamin-b6"), Some(Nutrient::VitaminB6));
        assert!("unobtainium".parse::<Nutrient>().is_err());
    }
}
