//! FoodData Central payloads
//!
//! Wire types for `/food/{id}` and `/foods/search`, and their mapping onto
//! [`FoodRecord`]. Nutrients are matched by FDC nutrient number and
//! converted into the unit each [`Nutrient`] is stored in.

use serde::Deserialize;
use tracing::debug;

use crate::models::{FoodPortion, FoodRecord, FoodSummary, Nutrient, NutrientProfile, NutrientUnit};
use crate::parser::quantity::{leading_quantity, normalize_fractions};

const KJ_PER_KCAL: f64 = 4.184;
/// Vitamin D: 40 IU per microgram
const IU_PER_MCG_VITAMIN_D: f64 = 40.0;

/// Nutrients a usable record must report
pub const REQUIRED_NUTRIENTS: &[Nutrient] = &[
    Nutrient::Calories,
    Nutrient::TotalFat,
    Nutrient::TotalCarbohydrate,
    Nutrient::Protein,
    Nutrient::Sodium,
];

/// FDC nutrient number → (nutrient, preference); lower preference wins
const NUTRIENT_NUMBERS: &[(&str, Nutrient, u8)] = &[
    ("208", Nutrient::Calories, 0),
    ("958", Nutrient::Calories, 1),
    ("957", Nutrient::Calories, 2),
    ("268", Nutrient::Calories, 3),
    ("204", Nutrient::TotalFat, 0),
    ("606", Nutrient::SaturatedFat, 0),
    ("605", Nutrient::TransFat, 0),
    ("646", Nutrient::PolyunsaturatedFat, 0),
    ("645", Nutrient::MonounsaturatedFat, 0),
    ("601", Nutrient::Cholesterol, 0),
    ("307", Nutrient::Sodium, 0),
    ("205", Nutrient::TotalCarbohydrate, 0),
    ("291", Nutrient::DietaryFiber, 0),
    ("269", Nutrient::TotalSugars, 0),
    ("269.3", Nutrient::TotalSugars, 1),
    ("539", Nutrient::AddedSugars, 0),
    ("203", Nutrient::Protein, 0),
    ("328", Nutrient::VitaminD, 0),
    ("324", Nutrient::VitaminD, 1),
    ("301", Nutrient::Calcium, 0),
    ("303", Nutrient::Iron, 0),
    ("306", Nutrient::Potassium, 0),
    ("320", Nutrient::VitaminA, 0),
    ("401", Nutrient::VitaminC, 0),
    ("323", Nutrient::VitaminE, 0),
    ("430", Nutrient::VitaminK, 0),
    ("404", Nutrient::Thiamin, 0),
    ("405", Nutrient::Riboflavin, 0),
    ("406", Nutrient::Niacin, 0),
    ("415", Nutrient::VitaminB6, 0),
    ("435", Nutrient::Folate, 0),
    ("417", Nutrient::Folate, 1),
    ("418", Nutrient::VitaminB12, 0),
    ("304", Nutrient::Magnesium, 0),
    ("305", Nutrient::Phosphorus, 0),
    ("309", Nutrient::Zinc, 0),
    ("312", Nutrient::Copper, 0),
    ("315", Nutrient::Manganese, 0),
    ("317", Nutrient::Selenium, 0),
];

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FdcSearchResponse {
    #[serde(default)]
    pub foods: Vec<FdcSearchFood>,
    #[serde(default)]
    pub total_hits: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FdcSearchFood {
    pub fdc_id: i64,
    pub description: String,
    #[serde(default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub brand_owner: Option<String>,
}

impl From<FdcSearchFood> for FoodSummary {
    fn from(food: FdcSearchFood) -> Self {
        FoodSummary {
            fdc_id: food.fdc_id,
            description: food.description,
            data_type: food.data_type,
            brand_owner: food.brand_owner,
        }
    }
}

/// `/food/{id}` response (Foundation, SR Legacy, Survey and Branded share this shape)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FdcFood {
    pub fdc_id: i64,
    pub description: String,
    #[serde(default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub food_nutrients: Vec<FdcFoodNutrient>,
    #[serde(default)]
    pub food_portions: Vec<FdcPortion>,
    #[serde(default)]
    pub serving_size: Option<f64>,
    #[serde(default)]
    pub serving_size_unit: Option<String>,
    #[serde(default)]
    pub household_serving_full_text: Option<String>,
}

/// Full format nests the nutrient; abridged format flattens it
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FdcFoodNutrient {
    #[serde(default)]
    pub nutrient: Option<FdcNutrient>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub unit_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FdcNutrient {
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub unit_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FdcPortion {
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub gram_weight: Option<f64>,
    #[serde(default)]
    pub modifier: Option<String>,
    #[serde(default)]
    pub portion_description: Option<String>,
    #[serde(default)]
    pub measure_unit: Option<FdcMeasureUnit>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FdcMeasureUnit {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub abbreviation: Option<String>,
}

impl FdcFoodNutrient {
    fn number(&self) -> Option<&str> {
        self.nutrient
            .as_ref()
            .and_then(|n| n.number.as_deref())
            .or(self.number.as_deref())
    }

    fn unit_name(&self) -> Option<&str> {
        self.nutrient
            .as_ref()
            .and_then(|n| n.unit_name.as_deref())
            .or(self.unit_name.as_deref())
    }
}

/// Convert an FDC amount into the unit `target` is stored in
pub fn convert_amount(amount: f64, unit_name: &str, target: Nutrient) -> Option<f64> {
    let unit = unit_name.trim().to_lowercase();
    let target_unit = target.unit();

    let in_grams = |a: f64| -> Option<f64> {
        match unit.as_str() {
            "g" => Some(a),
            "mg" => Some(a / 1_000.0),
            "µg" | "ug" | "mcg" => Some(a / 1_000_000.0),
            _ => None,
        }
    };

    match target_unit {
        NutrientUnit::Kcal => match unit.as_str() {
            "kcal" => Some(amount),
            "kj" => Some(amount / KJ_PER_KCAL),
            _ => None,
        },
        NutrientUnit::Gram => in_grams(amount),
        NutrientUnit::Milligram => in_grams(amount).map(|g| g * 1_000.0),
        NutrientUnit::Microgram => match unit.as_str() {
            "iu" if target == Nutrient::VitaminD => Some(amount / IU_PER_MCG_VITAMIN_D),
            _ => in_grams(amount).map(|g| g * 1_000_000.0),
        },
    }
}

impl FdcFood {
    /// Map onto a record; required nutrients absent from the payload are listed in `missing`
    pub fn into_record(self) -> FoodRecord {
        let mut profile = NutrientProfile::zero();
        let mut chosen: Vec<(Nutrient, u8)> = Vec::new();

        for entry in &self.food_nutrients {
            let (Some(number), Some(amount)) = (entry.number(), entry.amount) else {
                continue;
            };
            let Some((_, nutrient, preference)) = NUTRIENT_NUMBERS.iter().find(|(n, _, _)| *n == number) else {
                continue;
            };
            if chosen
                .iter()
                .any(|(n, p)| n == nutrient && p <= preference)
            {
                continue;
            }
            let unit = entry.unit_name().unwrap_or("");
            match convert_amount(amount, unit, *nutrient) {
                Some(value) => {
                    profile.set(*nutrient, value);
                    chosen.retain(|(n, _)| n != nutrient);
                    chosen.push((*nutrient, *preference));
                }
                None => debug!(
                    "food #{}: cannot convert nutrient {} from '{}'",
                    self.fdc_id, number, unit
                ),
            }
        }

        let missing = REQUIRED_NUTRIENTS
            .iter()
            .copied()
            .filter(|n| !chosen.iter().any(|(c, _)| c == n))
            .collect();

        let mut portions: Vec<FoodPortion> = self.food_portions.iter().filter_map(portion_from).collect();
        portions.extend(serving_portions(&self));

        FoodRecord {
            fdc_id: self.fdc_id,
            description: self.description,
            data_type: self.data_type,
            profile,
            portions,
            missing,
        }
    }
}

fn portion_from(p: &FdcPortion) -> Option<FoodPortion> {
    let gram_weight = p.gram_weight.filter(|g| g.is_finite() && *g > 0.0)?;
    let measure = p.measure_unit.as_ref();
    let unit = measure
        .and_then(|m| m.name.clone())
        .filter(|name| !name.eq_ignore_ascii_case("undetermined"))
        .or_else(|| p.modifier.clone())
        .or_else(|| p.portion_description.clone())?;
    Some(FoodPortion {
        amount: p.amount.filter(|a| *a > 0.0).unwrap_or(1.0),
        unit,
        abbreviation: measure
            .and_then(|m| m.abbreviation.clone())
            .filter(|a| !a.eq_ignore_ascii_case("undetermined")),
        modifier: p.modifier.clone(),
        gram_weight,
    })
}

/// Branded foods: one "serving" portion, plus the household measure when it parses
fn serving_portions(food: &FdcFood) -> Vec<FoodPortion> {
    let grams = match (food.serving_size, food.serving_size_unit.as_deref()) {
        (Some(size), Some(unit))
            if size > 0.0 && matches!(unit.to_lowercase().as_str(), "g" | "grm" | "ml" | "mlt") =>
        {
            size
        }
        _ => return Vec::new(),
    };

    let household = food.household_serving_full_text.clone();
    let mut portions = vec![FoodPortion {
        amount: 1.0,
        unit: "serving".to_string(),
        abbreviation: None,
        modifier: household.clone(),
        gram_weight: grams,
    }];

    if let Some(text) = household {
        let text = normalize_fractions(&text);
        if let Some(q) = leading_quantity(&text) {
            let unit = text[q.consumed..].trim();
            if q.value > 0.0 && !unit.is_empty() {
                portions.push(FoodPortion {
                    amount: q.value,
                    unit: unit.to_string(),
                    abbreviation: None,
                    modifier: None,
                    gram_weight: grams,
                });
            }
        }
    }
    portions
}
