//! Label tools
//!
//! Nutrition Facts models for stored dishes, and PDF export.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::error::ValidationError;
use crate::label::{self, pdf::ExportError, LabelModel};
use crate::models::FinalDish;

/// Response for export_label_pdf
#[derive(Debug, Serialize)]
pub struct ExportLabelResponse {
    pub path: String,
    pub calories_per_serving: f64,
    pub line_count: usize,
}

/// Label for one serving of a stored dish
pub fn build_label(dish: &FinalDish) -> Result<LabelModel, ValidationError> {
    label::format(
        &dish.nutrient_profile,
        dish.serving_size_grams,
        dish.servings_per_container,
    )
}

pub fn export_label_pdf(label: &LabelModel, title: &str, output_path: &Path) -> Result<ExportLabelResponse, ExportError> {
    label::pdf::export_pdf(label, title, output_path)?;
    info!("Exported label '{}' to {}", title, output_path.display());
    Ok(ExportLabelResponse {
        path: output_path.display().to_string(),
        calories_per_serving: label.calories,
        line_count: label.lines.len(),
    })
}

/// `<dir>/<slug>-label.pdf` for a dish name
pub fn default_label_path(dir: &Path, name: &str) -> PathBuf {
    let slug: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    let slug = if slug.is_empty() { "dish".to_string() } else { slug };
    dir.join(format!("{}-label.pdf", slug))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NutrientProfile, YieldInfo};

    fn dish() -> FinalDish {
        let mut profile = NutrientProfile::zero();
        profile.calories = 200.0;
        profile.sodium = 400.0;
        FinalDish {
            id: "fd_1".into(),
            name: "Chili & Beans".into(),
            ingredients: vec![],
            yield_info: YieldInfo::new(1000.0, 900.0, None).unwrap(),
            nutrient_profile: profile,
            serving_size_grams: 250.0,
            servings_per_container: 3.6,
            allergens: vec![],
            notes: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_build_label_uses_dish_serving() {
        let label = build_label(&dish()).unwrap();
        assert_eq!(label.calories, 500.0);
        assert_eq!(label.servings_per_container_display, "About 3.5");
        let sodium = label.line(crate::models::Nutrient::Sodium).unwrap();
        assert_eq!(sodium.display_value, "1000 mg");
    }

    #[test]
    fn test_invalid_serving_rejected() {
        let mut d = dish();
        d.serving_size_grams = 0.0;
        assert!(matches!(build_label(&d), Err(ValidationError::InvalidServingSize(_))));
    }

    #[test]
    fn test_default_label_path() {
        let path = default_label_path(Path::new("/tmp/labels"), "Chili & Beans!");
        assert_eq!(path, PathBuf::from("/tmp/labels/chili-beans-label.pdf"));
        assert!(default_label_path(Path::new("."), "??").ends_with("dish-label.pdf"));
    }
}
