//! Nutrition Facts label model
//!
//! Scales a per-100 g profile to one serving, rounds every amount with the
//! nutrient rounder and attaches %DV. Presentation only: the profile itself
//! is never recalculated here.

pub mod pdf;

use serde::Serialize;

use crate::error::ValidationError;
use crate::models::{Nutrient, NutrientProfile};
use crate::nutrition::daily_values::percent_dv;
use crate::nutrition::rounding::round_value;

/// Nutrients printed on every label, even when zero
pub const MANDATORY: &[Nutrient] = &[
    Nutrient::Calories,
    Nutrient::TotalFat,
    Nutrient::SaturatedFat,
    Nutrient::TransFat,
    Nutrient::Cholesterol,
    Nutrient::Sodium,
    Nutrient::TotalCarbohydrate,
    Nutrient::DietaryFiber,
    Nutrient::TotalSugars,
    Nutrient::AddedSugars,
    Nutrient::Protein,
    Nutrient::VitaminD,
    Nutrient::Calcium,
    Nutrient::Iron,
    Nutrient::Potassium,
];

/// One printed row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelLine {
    pub nutrient: Nutrient,
    pub label: String,
    pub display_value: String,
    pub rounded_number: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent_daily_value: Option<u32>,
    /// 0 for headline nutrients, 1 for sub-lines, 2 for "Includes Added Sugars"
    pub indent: u8,
    pub mandatory: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelModel {
    pub serving_size_grams: f64,
    pub serving_size_display: String,
    pub servings_per_container: f64,
    pub servings_per_container_display: String,
    /// Rounded calories per serving
    pub calories: f64,
    pub lines: Vec<LabelLine>,
}

impl LabelModel {
    pub fn line(&self, nutrient: Nutrient) -> Option<&LabelLine> {
        self.lines.iter().find(|l| l.nutrient == nutrient)
    }
}

/// Build a label for one serving of a dish
pub fn format(
    profile: &NutrientProfile,
    serving_size_grams: f64,
    servings_per_container: f64,
) -> Result<LabelModel, ValidationError> {
    if !serving_size_grams.is_finite() || serving_size_grams <= 0.0 {
        return Err(ValidationError::InvalidServingSize(serving_size_grams));
    }
    if !servings_per_container.is_finite() || servings_per_container <= 0.0 {
        return Err(ValidationError::InvalidServingCount(servings_per_container));
    }

    let per_serving = profile.scale(serving_size_grams / 100.0);
    let mut lines = Vec::new();
    for (nutrient, amount) in per_serving.iter() {
        let rounded = round_value(nutrient, amount);
        let mandatory = MANDATORY.contains(&nutrient);
        if !mandatory && rounded.rounded_number <= 0.0 {
            continue;
        }
        lines.push(LabelLine {
            nutrient,
            label: line_label(nutrient, &rounded.display_value),
            display_value: rounded.display_value,
            rounded_number: rounded.rounded_number,
            percent_daily_value: percent_dv(nutrient, rounded.rounded_number),
            indent: indent_of(nutrient),
            mandatory,
        });
    }

    let calories = lines
        .iter()
        .find(|l| l.nutrient == Nutrient::Calories)
        .map(|l| l.rounded_number)
        .unwrap_or(0.0);

    Ok(LabelModel {
        serving_size_grams,
        serving_size_display: format!("{}g", format_amount(serving_size_grams.round())),
        servings_per_container,
        servings_per_container_display: servings_display(servings_per_container),
        calories,
        lines,
    })
}

fn indent_of(nutrient: Nutrient) -> u8 {
    match nutrient {
        Nutrient::SaturatedFat
        | Nutrient::TransFat
        | Nutrient::PolyunsaturatedFat
        | Nutrient::MonounsaturatedFat
        | Nutrient::DietaryFiber
        | Nutrient::TotalSugars => 1,
        Nutrient::AddedSugars => 2,
        _ => 0,
    }
}

fn line_label(nutrient: Nutrient, display_value: &str) -> String {
    match nutrient {
        Nutrient::AddedSugars => format!("Includes {} Added Sugars", display_value),
        _ => nutrient.label().to_string(),
    }
}

/// Declared servings: whole above 5, halves from 2 to 5, otherwise 1
pub fn servings_display(servings: f64) -> String {
    let declared = if servings > 5.0 {
        servings.round()
    } else if servings >= 2.0 {
        (servings * 2.0).round() / 2.0
    } else {
        1.0
    };
    let text = format_amount(declared);
    if (declared - servings).abs() > 1e-9 {
        format!("About {}", text)
    } else {
        text
    }
}

fn format_amount(value: f64) -> String {
    let s = format!("{:.1}", value);
    s.strip_suffix(".0").map(str::to_string).unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cookie_profile() -> NutrientProfile {
        let mut p = NutrientProfile::zero();
        p.calories = 480.0;
        p.total_fat = 24.0;
        p.saturated_fat = 14.0;
        p.cholesterol = 60.0;
        p.sodium = 300.0;
        p.total_carbohydrate = 62.0;
        p.dietary_fiber = 2.0;
        p.total_sugars = 35.0;
        p.added_sugars = 30.0;
        p.protein = 5.0;
        p.iron = 2.0;
        p.vitamin_a = 200.0;
        p
    }

    #[test]
    fn test_amounts_are_scaled_then_rounded() {
        let label = format(&cookie_profile(), 30.0, 12.0).unwrap();
        // 480 kcal/100g * 0.3 = 144 -> 140
        assert_eq!(label.calories, 140.0);
        let fat = label.line(Nutrient::TotalFat).unwrap();
        assert_eq!(fat.display_value, "7 g");
        assert_eq!(fat.percent_daily_value, Some(9));
        let sodium = label.line(Nutrient::Sodium).unwrap();
        assert_eq!(sodium.display_value, "90 mg");
        assert_eq!(sodium.percent_daily_value, Some(4));
        assert_eq!(label.serving_size_display, "30g");
        assert_eq!(label.servings_per_container_display, "12");
    }

    #[test]
    fn test_mandatory_lines_always_present() {
        let label = format(&NutrientProfile::zero(), 100.0, 1.0).unwrap();
        assert_eq!(label.lines.len(), MANDATORY.len());
        for n in MANDATORY {
            let line = label.line(*n).unwrap();
            assert_eq!(line.rounded_number, 0.0);
            assert!(line.mandatory);
        }
    }

    #[test]
    fn test_voluntary_nutrients_only_when_present() {
        let label = format(&cookie_profile(), 30.0, 12.0).unwrap();
        assert!(label.line(Nutrient::VitaminA).is_some());
        assert!(label.line(Nutrient::VitaminC).is_none());
        assert!(!label.line(Nutrient::VitaminA).unwrap().mandatory);
    }

    #[test]
    fn test_indent_and_added_sugars_wording() {
        let label = format(&cookie_profile(), 30.0, 12.0).unwrap();
        assert_eq!(label.line(Nutrient::SaturatedFat).unwrap().indent, 1);
        let added = label.line(Nutrient::AddedSugars).unwrap();
        assert_eq!(added.indent, 2);
        assert_eq!(added.label, "Includes 9 g Added Sugars");
        assert_eq!(label.line(Nutrient::TransFat).unwrap().percent_daily_value, None);
    }

    #[test]
    fn test_servings_display() {
        assert_eq!(servings_display(8.0), "8");
        assert_eq!(servings_display(7.6), "About 8");
        assert_eq!(servings_display(3.5), "3.5");
        assert_eq!(servings_display(3.3), "About 3.5");
        assert_eq!(servings_display(1.4), "About 1");
        assert_eq!(servings_display(1.0), "1");
    }

    #[test]
    fn test_invalid_serving_inputs() {
        let p = cookie_profile();
        assert_eq!(format(&p, 0.0, 1.0), Err(ValidationError::InvalidServingSize(0.0)));
        assert!(format(&p, f64::NAN, 1.0).is_err());
        assert_eq!(format(&p, 30.0, -1.0), Err(ValidationError::InvalidServingCount(-1.0)));
    }
}
