//! Printable Nutrition Facts panel
//!
//! Draws a [`LabelModel`] onto a letter-size page with printpdf's built-in
//! Helvetica faces.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use printpdf::*;
use thiserror::Error;

use crate::models::Nutrient;
use super::{LabelLine, LabelModel};

const COLOR_BLACK: (u8, u8, u8) = (0, 0, 0);
const COLOR_GRAY: (u8, u8, u8) = (110, 110, 110);

const PAGE_WIDTH: f32 = 215.9;
const PAGE_HEIGHT: f32 = 279.4;
const PANEL_LEFT: f32 = 20.0;
const PANEL_WIDTH: f32 = 90.0;
const ROW_HEIGHT: f32 = 5.5;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Cannot write label file: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF error: {0}")]
    Pdf(String),
}

fn rgb_to_printpdf(r: u8, g: u8, b: u8) -> Color {
    Color::Rgb(Rgb::new(
        r as f32 / 255.0,
        g as f32 / 255.0,
        b as f32 / 255.0,
        None,
    ))
}

fn add_text(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    text: &str,
    x: f32,
    y: f32,
    size: f32,
    color: (u8, u8, u8),
) {
    layer.set_fill_color(rgb_to_printpdf(color.0, color.1, color.2));
    layer.use_text(text, size, Mm(x), Mm(y), font);
}

fn add_rule(layer: &PdfLayerReference, y: f32, width: f32) {
    layer.set_outline_color(rgb_to_printpdf(0, 0, 0));
    layer.set_outline_thickness(width);
    let line = Line {
        points: vec![
            (Point::new(Mm(PANEL_LEFT), Mm(y)), false),
            (Point::new(Mm(PANEL_LEFT + PANEL_WIDTH), Mm(y)), false),
        ],
        is_closed: false,
    };
    layer.add_line(line);
}

/// Rough right-alignment for Helvetica at `size` points
fn right_aligned_x(text: &str, size: f32) -> f32 {
    let approx_width_mm = text.chars().count() as f32 * size * 0.18;
    PANEL_LEFT + PANEL_WIDTH - approx_width_mm
}

/// Render the label to a PDF file, creating parent directories as needed
pub fn export_pdf(label: &LabelModel, title: &str, output_path: &Path) -> Result<(), ExportError> {
    let (doc, page, layer) = PdfDocument::new(
        format!("Nutrition Facts - {}", title),
        Mm(PAGE_WIDTH),
        Mm(PAGE_HEIGHT),
        "Layer 1",
    );
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ExportError::Pdf(e.to_string()))?;
    let font_bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| ExportError::Pdf(e.to_string()))?;
    let layer = doc.get_page(page).get_layer(layer);

    let mut y = PAGE_HEIGHT - 25.0;
    add_text(&layer, &font, title, PANEL_LEFT, y, 10.0, COLOR_GRAY);
    y -= 10.0;

    add_text(&layer, &font_bold, "Nutrition Facts", PANEL_LEFT, y, 24.0, COLOR_BLACK);
    y -= 4.0;
    add_rule(&layer, y, 0.5);
    y -= 6.0;

    add_text(
        &layer,
        &font,
        &format!("{} servings per container", label.servings_per_container_display),
        PANEL_LEFT,
        y,
        10.0,
        COLOR_BLACK,
    );
    y -= ROW_HEIGHT;
    add_text(&layer, &font_bold, "Serving size", PANEL_LEFT, y, 11.0, COLOR_BLACK);
    add_text(
        &layer,
        &font_bold,
        &label.serving_size_display,
        right_aligned_x(&label.serving_size_display, 11.0),
        y,
        11.0,
        COLOR_BLACK,
    );
    y -= 3.0;
    add_rule(&layer, y, 6.0);
    y -= 6.0;

    add_text(&layer, &font_bold, "Amount per serving", PANEL_LEFT, y, 8.0, COLOR_BLACK);
    y -= 7.0;
    let calories = format!("{}", label.calories);
    add_text(&layer, &font_bold, "Calories", PANEL_LEFT, y, 18.0, COLOR_BLACK);
    add_text(&layer, &font_bold, &calories, right_aligned_x(&calories, 18.0), y, 18.0, COLOR_BLACK);
    y -= 3.0;
    add_rule(&layer, y, 3.0);
    y -= 5.0;

    let dv = "% Daily Value*";
    add_text(&layer, &font_bold, dv, right_aligned_x(dv, 8.0), y, 8.0, COLOR_BLACK);
    y -= 2.0;

    let mut past_macros = false;
    for line in label.lines.iter().filter(|l| l.nutrient != Nutrient::Calories) {
        if !past_macros && is_micronutrient(line) {
            add_rule(&layer, y, 6.0);
            y -= 1.0;
            past_macros = true;
        } else {
            add_rule(&layer, y, 0.3);
        }
        y -= ROW_HEIGHT - 1.0;
        draw_row(&layer, &font, &font_bold, line, y);
        y -= 1.5;
    }

    add_rule(&layer, y, 3.0);
    y -= 5.0;
    for footnote in [
        "* The % Daily Value (DV) tells you how much a nutrient in a serving",
        "of food contributes to a daily diet. 2,000 calories a day is used",
        "for general nutrition advice.",
    ] {
        add_text(&layer, &font, footnote, PANEL_LEFT, y, 7.0, COLOR_BLACK);
        y -= 3.5;
    }

    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(output_path)?;
    let mut writer = BufWriter::new(file);
    doc.save(&mut writer)
        .map_err(|e| ExportError::Pdf(e.to_string()))?;
    Ok(())
}

/// Vitamins and minerals go below the heavy rule, in label order
fn is_micronutrient(line: &LabelLine) -> bool {
    line.nutrient >= Nutrient::VitaminD
}

fn draw_row(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    font_bold: &IndirectFontRef,
    line: &LabelLine,
    y: f32,
) {
    let x = PANEL_LEFT + 4.0 * line.indent as f32;
    match line.indent {
        0 if !is_micronutrient(line) => {
            add_text(layer, font_bold, &line.label, x, y, 9.0, COLOR_BLACK);
            let width = line.label.chars().count() as f32 * 9.0 * 0.19;
            add_text(layer, font, &line.display_value, x + width, y, 9.0, COLOR_BLACK);
        }
        _ if line.nutrient == Nutrient::AddedSugars => {
            add_text(layer, font, &line.label, x, y, 9.0, COLOR_BLACK);
        }
        _ => {
            let text = format!("{} {}", line.label, line.display_value);
            add_text(layer, font, &text, x, y, 9.0, COLOR_BLACK);
        }
    }

    if let Some(pct) = line.percent_daily_value {
        let text = format!("{}%", pct);
        add_text(layer, font_bold, &text, right_aligned_x(&text, 9.0), y, 9.0, COLOR_BLACK);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::format;
    use crate::models::NutrientProfile;

    #[test]
    fn test_export_writes_pdf() {
        let mut profile = NutrientProfile::zero();
        profile.calories = 250.0;
        profile.total_fat = 12.0;
        profile.iron = 3.0;
        let label = format(&profile, 80.0, 4.0).unwrap();

        let dir = std::env::temp_dir().join(format!("nutrilabel-pdf-{}", std::process::id()));
        let path = dir.join("label.pdf");
        export_pdf(&label, "Test Dish", &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        std::fs::remove_dir_all(&dir).ok();
    }
}
