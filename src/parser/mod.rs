//! Recipe text parser
//!
//! Best-effort intake of pasted ingredient lists. Each line is read as
//! `[quantity] [unit] [name][, note] [(parenthetical)]`. A parenthetical that
//! reads like an ingredient list becomes an embedded sub-recipe; anything
//! else in parentheses is kept as a note. Bad lines are reported in `errors`
//! and skipped; the rest of the text still parses.

pub mod classifier;
pub mod quantity;

use serde::Serialize;

use crate::nutrition::units::{is_known_unit, normalize_unit, standard_unit};
use classifier::{classify, WordLists};
use quantity::{leading_quantity, normalize_fractions, quantity_problem};

pub use classifier::{Classification, ItemSignal, WordListError};

/// Longest ingredient name kept, in characters
pub const MAX_NAME_CHARS: usize = 255;

/// Unit recorded for counted items with no unit ("2 eggs")
pub const COUNT_UNIT: &str = "each";

const DEFAULT_RECIPE_NAME: &str = "Untitled recipe";

/// One ingredient line (or one item of an embedded sub-recipe)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedIngredient {
    pub quantity: f64,
    pub unit: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Name of the embedded sub-recipe this line stands for
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_recipe: Option<String>,
    /// 1-based source line
    pub line: usize,
}

/// A sub-recipe discovered inside a parenthetical
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedSubRecipe {
    pub name: String,
    pub ingredients: Vec<ParsedIngredient>,
    pub line: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParsedRecipe {
    pub name: String,
    pub ingredients: Vec<ParsedIngredient>,
    pub sub_recipes: Vec<ParsedSubRecipe>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Parse with the built-in word lists
pub fn parse(text: &str) -> ParsedRecipe {
    RecipeParser::default().parse(text)
}

/// Parser configured with a set of word lists
#[derive(Debug, Clone, Default)]
pub struct RecipeParser {
    words: WordLists,
}

/// Pieces of one line before validation
struct LineParts<'a> {
    main: String,
    parenthetical: Option<&'a str>,
    trailing_note: Option<String>,
    /// Parentheticals after the first one
    extra: Vec<&'a str>,
}

impl RecipeParser {
    pub fn new(words: WordLists) -> Self {
        Self { words }
    }

    pub fn words(&self) -> &WordLists {
        &self.words
    }

    pub fn parse(&self, text: &str) -> ParsedRecipe {
        let mut recipe = ParsedRecipe::default();
        let mut name: Option<String> = None;

        for (index, raw_line) in text.lines().enumerate() {
            let line_no = index + 1;
            let normalized = normalize_fractions(raw_line);
            let line = strip_bullet(normalized.trim());
            if line.is_empty() {
                continue;
            }

            if leading_quantity(line).is_none() {
                let heading = line.trim_start_matches('#').trim().trim_end_matches(':').trim();
                let is_heading = looks_like_heading(heading);
                if is_heading && name.is_none() && recipe.ingredients.is_empty() {
                    name = Some(heading.to_string());
                } else if !(is_heading && line.ends_with(':')) {
                    recipe
                        .errors
                        .push(format!("line {}: no quantity found in '{}'", line_no, line));
                }
                continue;
            }

            self.parse_line(line, line_no, &mut recipe);
        }

        recipe.name = name.unwrap_or_else(|| DEFAULT_RECIPE_NAME.to_string());
        recipe
    }

    fn parse_line(&self, line: &str, line_no: usize, recipe: &mut ParsedRecipe) {
        let parts = match split_parenthetical(line) {
            Ok(parts) => parts,
            Err(problem) => {
                recipe.errors.push(format!("line {}: {}", line_no, problem));
                return;
            }
        };

        let mut ingredient = match self.parse_item(&parts.main, line_no, false, recipe) {
            Some(ingredient) => ingredient,
            None => return,
        };
        if let Some(note) = parts.trailing_note {
            append_note(&mut ingredient, &note);
        }
        for extra in &parts.extra {
            recipe.warnings.push(format!(
                "line {}: only the first parenthetical is read; '({})' kept as a note",
                line_no, extra
            ));
        }

        if let Some(inner) = parts.parenthetical {
            let items = split_items(inner);
            if classify(items.iter().copied(), &self.words).is_sub_recipe() {
                let parsed: Vec<ParsedIngredient> = items
                    .iter()
                    .filter_map(|item| self.parse_item(item, line_no, true, recipe))
                    .collect();
                if parsed.is_empty() {
                    append_note(&mut ingredient, inner.trim());
                } else {
                    ingredient.sub_recipe = Some(ingredient.name.clone());
                    recipe.sub_recipes.push(ParsedSubRecipe {
                        name: ingredient.name.clone(),
                        ingredients: parsed,
                        line: line_no,
                    });
                }
            } else {
                append_note(&mut ingredient, inner.trim());
            }
        }

        for extra in parts.extra {
            append_note(&mut ingredient, extra);
        }
        recipe.ingredients.push(ingredient);
    }

    /// Read `[quantity] [unit] [name][, note]`
    ///
    /// Items inside a sub-recipe may omit the quantity ("cilantro"); it is
    /// assumed to be one and flagged.
    fn parse_item(
        &self,
        text: &str,
        line_no: usize,
        nested: bool,
        recipe: &mut ParsedRecipe,
    ) -> Option<ParsedIngredient> {
        let text = text.trim();
        let (quantity, rest) = match leading_quantity(text) {
            Some(q) => (q.value, &text[q.consumed..]),
            None if nested => {
                recipe.warnings.push(format!(
                    "line {}: no quantity for '{}'; assumed 1",
                    line_no, text
                ));
                (1.0, text)
            }
            None => {
                recipe
                    .errors
                    .push(format!("line {}: no quantity found in '{}'", line_no, text));
                return None;
            }
        };

        if let Some(problem) = quantity_problem(quantity) {
            recipe
                .errors
                .push(format!("line {}: quantity {} {}", line_no, quantity, problem));
            return None;
        }

        let (unit, rest) = take_unit(rest.trim_start());
        let rest = rest.trim_start();
        let rest = rest
            .strip_prefix("of ")
            .or_else(|| rest.strip_prefix("Of "))
            .unwrap_or(rest);

        let (name, note) = match rest.split_once(',') {
            Some((name, note)) => (name.trim(), Some(note.trim().to_string()).filter(|n| !n.is_empty())),
            None => (rest.trim(), None),
        };
        if name.is_empty() {
            recipe
                .errors
                .push(format!("line {}: no ingredient name in '{}'", line_no, text));
            return None;
        }

        let name = if name.chars().count() > MAX_NAME_CHARS {
            recipe.warnings.push(format!(
                "line {}: ingredient name truncated to {} characters",
                line_no, MAX_NAME_CHARS
            ));
            name.chars().take(MAX_NAME_CHARS).collect()
        } else {
            name.to_string()
        };

        Some(ParsedIngredient {
            quantity,
            unit: unit.unwrap_or_else(|| COUNT_UNIT.to_string()),
            name,
            notes: note,
            sub_recipe: None,
            line: line_no,
        })
    }
}

/// A title or section header has words and does not start with a number
fn looks_like_heading(text: &str) -> bool {
    text.chars().any(char::is_alphabetic) && !text.starts_with(|c: char| c.is_numeric())
}

fn strip_bullet(line: &str) -> &str {
    for bullet in ["- ", "* ", "• ", "+ "] {
        if let Some(rest) = line.strip_prefix(bullet) {
            return rest.trim_start();
        }
    }
    // "1. 2 cups flour" / "3) 1 egg": drop the list number when a quantity follows
    if let Some(pos) = line.find(&['.', ')'][..]) {
        let (number, rest) = line.split_at(pos);
        let rest = &rest[1..];
        if !number.is_empty()
            && number.chars().all(|c| c.is_ascii_digit())
            && rest.starts_with(char::is_whitespace)
            && leading_quantity(rest.trim_start()).is_some()
        {
            return rest.trim_start();
        }
    }
    line
}

/// Separate the parentheticals from the rest of the line
///
/// The first group is the one classified; later groups are cut out of the
/// text and returned as `extra`. Nesting is refused.
fn split_parenthetical(line: &str) -> Result<LineParts<'_>, String> {
    let mut groups: Vec<(usize, usize)> = Vec::new();
    let mut open = None;
    for (i, c) in line.char_indices() {
        match c {
            '(' if open.is_some() => return Err("nested parentheses are not supported".to_string()),
            '(' => open = Some(i),
            ')' => match open.take() {
                Some(start) => groups.push((start, i)),
                None => return Err("unbalanced parentheses".to_string()),
            },
            _ => {}
        }
    }
    if open.is_some() {
        return Err("unbalanced parentheses".to_string());
    }

    let Some(&(first_open, first_close)) = groups.first() else {
        return Ok(LineParts {
            main: line.to_string(),
            parenthetical: None,
            trailing_note: None,
            extra: Vec::new(),
        });
    };
    if groups.iter().any(|&(o, c)| line[o + 1..c].trim().is_empty()) {
        return Err("empty parentheses".to_string());
    }

    let mut rest = String::new();
    let mut cursor = first_close + 1;
    for &(o, c) in &groups[1..] {
        rest.push_str(&line[cursor..o]);
        cursor = c + 1;
    }
    rest.push_str(&line[cursor..]);
    let after = rest.split_whitespace().collect::<Vec<_>>().join(" ");

    let before = line[..first_open].trim_end();
    let (main, trailing_note) = match after.strip_prefix(',') {
        Some(note) => (before.to_string(), Some(note.trim().to_string()).filter(|n| !n.is_empty())),
        None if after.is_empty() => (before.to_string(), None),
        // "1 (15 oz) can beans"
        None => (format!("{} {}", before, after), None),
    };

    Ok(LineParts {
        main,
        parenthetical: Some(&line[first_open + 1..first_close]),
        trailing_note,
        extra: groups[1..].iter().map(|&(o, c)| line[o + 1..c].trim()).collect(),
    })
}

/// Comma- or semicolon-separated items, blanks dropped
fn split_items(inner: &str) -> Vec<&str> {
    inner
        .split(|c| c == ',' || c == ';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Two-word units ("fl oz", "extra large") first, then one word
fn take_unit(text: &str) -> (Option<String>, &str) {
    let words: Vec<(usize, &str)> = word_spans(text).take(2).collect();
    if words.len() == 2 {
        let end = words[1].0 + words[1].1.len();
        let candidate = &text[..end];
        if is_known_unit(candidate) && candidate.contains(' ') {
            return (Some(canonical_unit(candidate)), &text[end..]);
        }
    }
    if let Some((start, word)) = words.first() {
        let token = word.trim_end_matches(',');
        // a lone unit word is the ingredient ("1 large" is not a line)
        if is_known_unit(token) && !text[start + word.len()..].trim().is_empty() {
            return (Some(canonical_unit(token)), &text[start + token.len()..]);
        }
    }
    (None, text)
}

fn canonical_unit(token: &str) -> String {
    standard_unit(token)
        .map(|u| u.canonical.to_string())
        .unwrap_or_else(|| normalize_unit(token))
}

fn word_spans(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.split(' ')
        .scan(0usize, |offset, word| {
            let start = *offset;
            *offset += word.len() + 1;
            Some((start, word))
        })
        .filter(|(_, w)| !w.is_empty())
}

fn append_note(ingredient: &mut ParsedIngredient, note: &str) {
    if note.is_empty() {
        return;
    }
    ingredient.notes = Some(match ingredient.notes.take() {
        Some(existing) => format!("{}; {}", existing, note),
        None => note.to_string(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_sub_recipe() {
        let recipe = parse("1 cup salsa (1 tomato, 1 jalapeño, cilantro)");
        assert_eq!(recipe.sub_recipes.len(), 1);
        let salsa = &recipe.sub_recipes[0];
        assert_eq!(salsa.name, "salsa");
        assert_eq!(salsa.ingredients.len(), 3);
        assert_eq!(salsa.ingredients[1].name, "jalapeño");
        assert_eq!(salsa.ingredients[2].name, "cilantro");

        assert_eq!(recipe.ingredients.len(), 1);
        assert_eq!(recipe.ingredients[0].unit, "cup");
        assert_eq!(recipe.ingredients[0].sub_recipe.as_deref(), Some("salsa"));
        assert!(recipe.errors.is_empty());
    }

    #[test]
    fn test_descriptive_parenthetical_stays_a_note() {
        let recipe = parse("1 pound chicken (boneless, skinless, breast)");
        assert!(recipe.sub_recipes.is_empty());
        assert_eq!(recipe.ingredients.len(), 1);
        let chicken = &recipe.ingredients[0];
        assert_eq!(chicken.name, "chicken");
        assert_eq!(chicken.unit, "lb");
        assert_eq!(chicken.sub_recipe, None);
        assert_eq!(chicken.notes.as_deref(), Some("boneless, skinless, breast"));
    }

    #[test]
    fn test_title_units_fractions_and_notes() {
        let text = "Banana Bread:\n\n- 1½ cups all-purpose flour, sifted\n* 2 large eggs\n3 bananas\n1/2 tsp of salt\n2 fl oz milk\n";
        let recipe = parse(text);
        assert_eq!(recipe.name, "Banana Bread");
        assert!(recipe.errors.is_empty(), "{:?}", recipe.errors);
        let lines: Vec<_> = recipe
            .ingredients
            .iter()
            .map(|i| (i.quantity, i.unit.as_str(), i.name.as_str()))
            .collect();
        assert_eq!(
            lines,
            vec![
                (1.5, "cup", "all-purpose flour"),
                (2.0, "large", "eggs"),
                (3.0, "each", "bananas"),
                (0.5, "tsp", "salt"),
                (2.0, "fl oz", "milk"),
            ]
        );
        assert_eq!(recipe.ingredients[0].notes.as_deref(), Some("sifted"));
        assert_eq!(recipe.ingredients[0].line, 3);
    }

    #[test]
    fn test_bad_quantities_are_rejected() {
        let recipe = parse("0 cups sugar\n-2 tbsp butter\n200000 g flour\n1/0 cup milk\n2 cups water");
        assert_eq!(recipe.errors.len(), 4, "{:?}", recipe.errors);
        assert_eq!(recipe.ingredients.len(), 1);
        assert_eq!(recipe.ingredients[0].name, "water");
    }

    #[test]
    fn test_bad_parentheses_are_rejected() {
        let recipe = parse("1 cup salsa (tomato, onion\n1 cup rice )\n2 eggs ()\n1 cup beans");
        assert_eq!(recipe.errors.len(), 3, "{:?}", recipe.errors);
        assert!(recipe.errors[0].contains("unbalanced"));
        assert!(recipe.errors[2].contains("empty"));
        assert_eq!(recipe.ingredients.len(), 1);
    }

    #[test]
    fn test_long_names_truncated_with_warning() {
        let long = "very ".repeat(80) + "long spice";
        let recipe = parse(&format!("1 tsp {}", long));
        assert_eq!(recipe.ingredients[0].name.chars().count(), MAX_NAME_CHARS);
        assert_eq!(recipe.warnings.len(), 1);
    }

    #[test]
    fn test_can_size_parenthetical() {
        let recipe = parse("1 (15 oz) can black beans, drained");
        let beans = &recipe.ingredients[0];
        assert_eq!(beans.unit, "can");
        assert_eq!(beans.name, "black beans");
        assert_eq!(beans.notes.as_deref(), Some("drained; 15 oz"));
    }

    #[test]
    fn test_ranges_and_numbered_lists() {
        let recipe = parse("Soup\n1. 2-3 cloves garlic\n2) 4 cups stock");
        assert_eq!(recipe.ingredients.len(), 2);
        assert_eq!(recipe.ingredients[0].quantity, 2.5);
        assert_eq!(recipe.ingredients[0].unit, "clove");
        assert_eq!(recipe.ingredients[1].unit, "cup");
    }

    #[test]
    fn test_thousands_separator_in_quantity() {
        let recipe = parse("1,000 g flour\n2,5 kg potatoes");
        assert!(recipe.errors.is_empty(), "{:?}", recipe.errors);
        assert_eq!(recipe.ingredients[0].quantity, 1000.0);
        assert_eq!(recipe.ingredients[0].unit, "g");
        assert_eq!(recipe.ingredients[0].name, "flour");
        assert_eq!(recipe.ingredients[1].quantity, 2.5);
    }

    #[test]
    fn test_nested_parentheses_are_rejected() {
        let recipe = parse("1 cup (a,(b,c))\n1 cup salsa (1 can (15 oz) tomatoes, onion)");
        assert_eq!(recipe.errors.len(), 2, "{:?}", recipe.errors);
        assert!(recipe.errors.iter().all(|e| e.contains("nested")));
        assert!(recipe.ingredients.is_empty());
        assert!(recipe.sub_recipes.is_empty());
    }

    #[test]
    fn test_second_parenthetical_becomes_a_note() {
        let recipe = parse("1 cup salsa (1 tomato, 1 jalapeño, cilantro) (extra)");
        let salsa = &recipe.ingredients[0];
        assert_eq!(salsa.name, "salsa");
        assert_eq!(salsa.notes.as_deref(), Some("extra"));
        assert_eq!(recipe.sub_recipes.len(), 1);
        assert_eq!(recipe.sub_recipes[0].ingredients.len(), 3);
        assert_eq!(recipe.warnings.iter().filter(|w| w.contains("(extra)")).count(), 1);
    }

    #[test]
    fn test_unreadable_lines_are_reported() {
        for text in ["1. ", "- -", "###", "..."] {
            let recipe = parse(text);
            assert_eq!(recipe.errors.len(), 1, "{text:?}: {:?}", recipe.errors);
            assert!(recipe.errors[0].contains("no quantity"), "{text:?}");
        }

        let recipe = parse("Soup\n1. \n- -\n2 cups stock");
        assert_eq!(recipe.name, "Soup");
        assert_eq!(recipe.errors.len(), 2, "{:?}", recipe.errors);
        assert_eq!(recipe.ingredients.len(), 1);
    }

    #[test]
    fn test_full_width_digits_are_read() {
        let recipe = parse("１ cup flour\n２ eggs");
        assert!(recipe.errors.is_empty(), "{:?}", recipe.errors);
        assert_eq!(recipe.ingredients[0].quantity, 1.0);
        assert_eq!(recipe.ingredients[0].unit, "cup");
        assert_eq!(recipe.ingredients[1].quantity, 2.0);
    }

    #[test]
    fn test_lines_without_quantity_after_title() {
        let recipe = parse("Omelette\nIngredients:\n2 eggs\nsalt to taste");
        assert_eq!(recipe.name, "Omelette");
        assert_eq!(recipe.ingredients.len(), 1);
        assert_eq!(recipe.errors.len(), 1);
    }
}
