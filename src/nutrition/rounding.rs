//! Nutrient rounding
//!
//! Label rounding rules modeled on 21 CFR 101.9(c). Each nutrient has its own
//! ascending list of tiers; the first tier whose upper bound exceeds the
//! value decides how it is shown.
//!
//! A "less than X" tier reports its lower bound as the rounded number, so
//! rounding an already-rounded value lands in the same tier again.

use serde::Serialize;

use crate::error::ValidationError;
use crate::models::{Nutrient, NutrientUnit};
use super::daily_values::percent_dv;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TierBehavior {
    /// Declare as zero
    Zero,
    /// Declare as "less than" the given amount
    LessThan(f64),
    /// Round to the nearest multiple of the increment
    Nearest(f64),
}

/// One (threshold, behavior) entry; applies to values in `[previous.below, below)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundingTier {
    pub below: f64,
    pub behavior: TierBehavior,
}

const fn tier(below: f64, behavior: TierBehavior) -> RoundingTier {
    RoundingTier { below, behavior }
}

const INF: f64 = f64::INFINITY;
use TierBehavior::{LessThan, Nearest, Zero};

/// Energy: <5 → 0, ≤50 → nearest 5, above → nearest 10
const ENERGY: &[RoundingTier] = &[tier(5.0, Zero), tier(50.0, Nearest(5.0)), tier(INF, Nearest(10.0))];

/// Fats: <0.5 g → 0, <5 g → nearest 0.5 g, above → nearest 1 g
const FAT_GRAMS: &[RoundingTier] = &[tier(0.5, Zero), tier(5.0, Nearest(0.5)), tier(INF, Nearest(1.0))];

/// Carbohydrates, fiber, sugars, protein: <0.5 g → 0, <1 g → "less than 1 g", above → nearest 1 g
const MACRO_GRAMS: &[RoundingTier] = &[tier(0.5, Zero), tier(1.0, LessThan(1.0)), tier(INF, Nearest(1.0))];

/// Cholesterol: <2 mg → 0, 2–5 mg → "less than 5 mg", above → nearest 5 mg
const CHOLESTEROL: &[RoundingTier] = &[tier(2.0, Zero), tier(5.0, LessThan(5.0)), tier(INF, Nearest(5.0))];

/// Sodium, potassium and the major minerals: <5 mg → 0, ≤140 mg → nearest 5, above → nearest 10
const MAJOR_MINERAL_MG: &[RoundingTier] = &[tier(5.0, Zero), tier(140.0, Nearest(5.0)), tier(INF, Nearest(10.0))];

/// Trace nutrients declared to a tenth
const TENTHS: &[RoundingTier] = &[tier(0.05, Zero), tier(INF, Nearest(0.1))];

/// Trace nutrients declared to a hundredth
const HUNDREDTHS: &[RoundingTier] = &[tier(0.005, Zero), tier(INF, Nearest(0.01))];

/// Microgram vitamins declared as whole numbers
const WHOLE_MICROGRAMS: &[RoundingTier] = &[tier(0.5, Zero), tier(INF, Nearest(1.0))];

/// Rounding tiers for a nutrient
pub fn rounding_rule(nutrient: Nutrient) -> &'static [RoundingTier] {
    match nutrient {
        Nutrient::Calories => ENERGY,
        Nutrient::TotalFat
        | Nutrient::SaturatedFat
        | Nutrient::TransFat
        | Nutrient::PolyunsaturatedFat
        | Nutrient::MonounsaturatedFat => FAT_GRAMS,
        Nutrient::Cholesterol => CHOLESTEROL,
        Nutrient::Sodium
        | Nutrient::Potassium
        | Nutrient::Calcium
        | Nutrient::Phosphorus
        | Nutrient::Magnesium => MAJOR_MINERAL_MG,
        Nutrient::TotalCarbohydrate
        | Nutrient::DietaryFiber
        | Nutrient::TotalSugars
        | Nutrient::AddedSugars
        | Nutrient::Protein => MACRO_GRAMS,
        Nutrient::Iron
        | Nutrient::Zinc
        | Nutrient::Niacin
        | Nutrient::VitaminC
        | Nutrient::VitaminE
        | Nutrient::VitaminD
        | Nutrient::VitaminK
        | Nutrient::Selenium => TENTHS,
        Nutrient::Thiamin
        | Nutrient::Riboflavin
        | Nutrient::VitaminB6
        | Nutrient::VitaminB12
        | Nutrient::Copper
        | Nutrient::Manganese => HUNDREDTHS,
        Nutrient::VitaminA | Nutrient::Folate => WHOLE_MICROGRAMS,
    }
}

/// A label-ready nutrient amount
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundedValue {
    pub nutrient: Nutrient,
    pub display_value: String,
    pub rounded_number: f64,
}

/// Round a raw amount by nutrient name
pub fn round_nutrient(name: &str, raw_value: f64) -> Result<RoundedValue, ValidationError> {
    let nutrient: Nutrient = name.parse()?;
    Ok(round_value(nutrient, raw_value))
}

/// %DV by nutrient name; `None` when the nutrient has no Daily Value
pub fn percent_daily_value(name: &str, rounded_number: f64) -> Result<Option<u32>, ValidationError> {
    let nutrient: Nutrient = name.parse()?;
    Ok(percent_dv(nutrient, rounded_number))
}

/// Round a raw amount (NaN, infinite and negative inputs count as zero)
pub fn round_value(nutrient: Nutrient, raw_value: f64) -> RoundedValue {
    let value = if raw_value.is_finite() { raw_value.max(0.0) } else { 0.0 };
    let unit = nutrient.unit();

    let behavior = rounding_rule(nutrient)
        .iter()
        .find(|t| value < t.below)
        .map(|t| t.behavior)
        .unwrap_or(Zero);

    match behavior {
        Zero => zero(nutrient, unit),
        LessThan(limit) => {
            let lower = lower_bound_of(nutrient, limit);
            RoundedValue {
                nutrient,
                display_value: with_unit(&format!("less than {}", format_number(limit, 0)), unit),
                rounded_number: lower,
            }
        }
        Nearest(increment) => {
            let decimals = decimals_for(increment);
            let rounded = clean((value / increment).round() * increment, decimals);
            if rounded == 0.0 {
                return zero(nutrient, unit);
            }
            RoundedValue {
                nutrient,
                display_value: with_unit(&format_number(rounded, decimals), unit),
                rounded_number: rounded,
            }
        }
    }
}

fn zero(nutrient: Nutrient, unit: NutrientUnit) -> RoundedValue {
    RoundedValue {
        nutrient,
        display_value: with_unit("0", unit),
        rounded_number: 0.0,
    }
}

/// Lower edge of the tier whose "less than" limit is `limit`
fn lower_bound_of(nutrient: Nutrient, limit: f64) -> f64 {
    let tiers = rounding_rule(nutrient);
    tiers
        .windows(2)
        .find(|w| w[1].behavior == LessThan(limit))
        .map(|w| w[0].below)
        .unwrap_or(0.0)
}

fn with_unit(number: &str, unit: NutrientUnit) -> String {
    match unit.label_suffix() {
        "" => number.to_string(),
        suffix => format!("{} {}", number, suffix),
    }
}

fn decimals_for(increment: f64) -> usize {
    let mut decimals = 0;
    let mut scaled = increment;
    while decimals < 4 && (scaled - scaled.round()).abs() > 1e-9 {
        scaled *= 10.0;
        decimals += 1;
    }
    decimals
}

fn clean(value: f64, decimals: usize) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Fixed decimals with trailing zeros removed ("2.50" → "2.5", "5.0" → "5")
fn format_number(value: f64, decimals: usize) -> String {
    let s = format!("{:.*}", decimals, value);
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sodium_below_threshold_is_zero() {
        let r = round_nutrient("sodium", 3.0).unwrap();
        assert_eq!(r.display_value, "0 mg");
        assert_eq!(r.rounded_number, 0.0);
    }

    #[test]
    fn test_sodium_steps() {
        assert_eq!(round_nutrient("sodium", 140.0).unwrap().rounded_number, 140.0);
        assert_eq!(round_nutrient("sodium", 143.0).unwrap().rounded_number, 140.0);
        assert_eq!(round_nutrient("sodium", 146.0).unwrap().rounded_number, 150.0);
        assert_eq!(round_nutrient("sodium", 37.0).unwrap().rounded_number, 35.0);
        assert_eq!(round_nutrient("sodium", 143.0).unwrap().display_value, "140 mg");
    }

    #[test]
    fn test_energy_steps() {
        assert_eq!(round_value(Nutrient::Calories, 4.9).display_value, "0");
        assert_eq!(round_value(Nutrient::Calories, 47.0).rounded_number, 45.0);
        assert_eq!(round_value(Nutrient::Calories, 76.9).rounded_number, 80.0);
        assert_eq!(round_value(Nutrient::Calories, 234.0).display_value, "230");
    }

    #[test]
    fn test_fat_half_gram_steps() {
        assert_eq!(round_value(Nutrient::TotalFat, 0.4).display_value, "0 g");
        assert_eq!(round_value(Nutrient::TotalFat, 2.3).display_value, "2.5 g");
        assert_eq!(round_value(Nutrient::TotalFat, 4.8).display_value, "5 g");
        assert_eq!(round_value(Nutrient::SaturatedFat, 7.6).display_value, "8 g");
    }

    #[test]
    fn test_less_than_tiers() {
        let r = round_value(Nutrient::DietaryFiber, 0.7);
        assert_eq!(r.display_value, "less than 1 g");
        assert_eq!(r.rounded_number, 0.5);

        let r = round_value(Nutrient::Cholesterol, 3.0);
        assert_eq!(r.display_value, "less than 5 mg");
        assert_eq!(r.rounded_number, 2.0);

        assert_eq!(round_value(Nutrient::Cholesterol, 1.0).display_value, "0 mg");
        assert_eq!(round_value(Nutrient::Cholesterol, 12.0).display_value, "10 mg");
    }

    #[test]
    fn test_trace_increments() {
        assert_eq!(round_value(Nutrient::Iron, 1.26).display_value, "1.3 mg");
        assert_eq!(round_value(Nutrient::Iron, 0.02).display_value, "0 mg");
        assert_eq!(round_value(Nutrient::Thiamin, 0.123).display_value, "0.12 mg");
        assert_eq!(round_value(Nutrient::VitaminD, 2.04).display_value, "2 mcg");
        assert_eq!(round_value(Nutrient::VitaminA, 87.4).display_value, "87 mcg");
    }

    #[test]
    fn test_invalid_inputs_round_to_zero() {
        assert_eq!(round_value(Nutrient::Protein, f64::NAN).rounded_number, 0.0);
        assert_eq!(round_value(Nutrient::Protein, -4.0).rounded_number, 0.0);
        assert_eq!(round_value(Nutrient::Protein, f64::INFINITY).rounded_number, 0.0);
    }

    #[test]
    fn test_rounding_is_idempotent_for_every_nutrient() {
        let mut samples = vec![0.0, 0.004, 0.005, 0.049, 0.05, 0.35, 0.49, 0.5, 0.74, 0.99, 1.0];
        samples.extend((1..=4000).map(|i| i as f64 * 0.37));
        for n in Nutrient::ALL {
            for &x in &samples {
                let once = round_value(*n, x);
                let twice = round_value(*n, once.rounded_number);
                assert_eq!(once, twice, "{:?} at {}", n, x);
            }
        }
    }

    #[test]
    fn test_every_rule_is_ascending_and_open_ended() {
        for n in Nutrient::ALL {
            let tiers = rounding_rule(*n);
            assert!(tiers.windows(2).all(|w| w[0].below < w[1].below), "{:?}", n);
            assert_eq!(tiers.last().map(|t| t.below), Some(f64::INFINITY));
        }
    }

    #[test]
    fn test_percent_dv_by_name() {
        assert_eq!(percent_daily_value("sodium", 140.0).unwrap(), Some(6));
        assert_eq!(percent_daily_value("trans_fat", 0.5).unwrap(), None);
        assert!(percent_daily_value("moondust", 1.0).is_err());
    }

    #[test]
    fn test_unknown_nutrient_name() {
        assert_eq!(
            round_nutrient("moondust", 1.0),
            Err(ValidationError::UnknownNutrient("moondust".into()))
        );
    }
}
