//! Reference daily intakes
//!
//! Daily Values for adults and children 4+ on a 2,000 calorie diet
//! (21 CFR 101.9(c)(8)(iv) and (c)(9)), in each nutrient's own unit.

use crate::models::Nutrient;

/// Daily Value for a nutrient, or `None` if no %DV is declared for it
pub fn daily_value(nutrient: Nutrient) -> Option<f64> {
    let dv = match nutrient {
        Nutrient::TotalFat => 78.0,
        Nutrient::SaturatedFat => 20.0,
        Nutrient::Cholesterol => 300.0,
        Nutrient::Sodium => 2300.0,
        Nutrient::TotalCarbohydrate => 275.0,
        Nutrient::DietaryFiber => 28.0,
        Nutrient::AddedSugars => 50.0,
        Nutrient::Protein => 50.0,
        Nutrient::VitaminD => 20.0,
        Nutrient::Calcium => 1300.0,
        Nutrient::Iron => 18.0,
        Nutrient::Potassium => 4700.0,
        Nutrient::VitaminA => 900.0,
        Nutrient::VitaminC => 90.0,
        Nutrient::VitaminE => 15.0,
        Nutrient::VitaminK => 120.0,
        Nutrient::Thiamin => 1.2,
        Nutrient::Riboflavin => 1.3,
        Nutrient::Niacin => 16.0,
        Nutrient::VitaminB6 => 1.7,
        Nutrient::Folate => 400.0,
        Nutrient::VitaminB12 => 2.4,
        Nutrient::Magnesium => 420.0,
        Nutrient::Phosphorus => 1250.0,
        Nutrient::Zinc => 11.0,
        Nutrient::Copper => 0.9,
        Nutrient::Manganese => 2.3,
        Nutrient::Selenium => 55.0,
        Nutrient::Calories
        | Nutrient::TransFat
        | Nutrient::PolyunsaturatedFat
        | Nutrient::MonounsaturatedFat
        | Nutrient::TotalSugars => return None,
    };
    Some(dv)
}

/// Rounded amount as a whole percent of the Daily Value
pub fn percent_dv(nutrient: Nutrient, rounded_amount: f64) -> Option<u32> {
    let dv = daily_value(nutrient)?;
    if !rounded_amount.is_finite() || rounded_amount <= 0.0 {
        return Some(0);
    }
    let pct = (rounded_amount / dv * 100.0).round();
    Some(pct.max(0.0).min(u32::MAX as f64) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_dv() {
        assert_eq!(percent_dv(Nutrient::Sodium, 230.0), Some(10));
        assert_eq!(percent_dv(Nutrient::TotalFat, 8.0), Some(10));
        assert_eq!(percent_dv(Nutrient::Iron, 0.0), Some(0));
        assert_eq!(percent_dv(Nutrient::Iron, -2.0), Some(0));
    }

    #[test]
    fn test_nutrients_without_daily_value() {
        assert_eq!(percent_dv(Nutrient::TransFat, 1.0), None);
        assert_eq!(percent_dv(Nutrient::Calories, 200.0), None);
        assert_eq!(percent_dv(Nutrient::TotalSugars, 12.0), None);
    }

    #[test]
    fn test_every_other_nutrient_has_positive_daily_value() {
        for n in Nutrient::ALL {
            if let Some(dv) = daily_value(*n) {
                assert!(dv > 0.0, "{:?}", n);
            }
        }
    }
}
