//! Parenthetical classification
//!
//! Decides whether "(1 tomato, 1 jalapeño, cilantro)" is an embedded
//! sub-recipe or "(boneless, skinless, breast)" is just a description.
//! Each comma-separated item scores as ingredient-like (has a number, a
//! measuring unit or a known food noun) or descriptor-like (has a known
//! preparation/state adjective or cut of meat). The word lists are data and
//! can be replaced from a JSON file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::nutrition::units::{normalize_unit, standard_unit, UnitCategory};

const DEFAULT_DESCRIPTORS: &[&str] = &[
    // preparation
    "boneless", "skinless", "diced", "chopped", "minced", "sliced", "grated", "shredded", "crushed",
    "peeled", "seeded", "pitted", "cubed", "julienned", "halved", "quartered", "trimmed", "cored",
    "mashed", "pureed", "ground", "whole", "softened", "melted", "beaten", "sifted", "packed",
    "divided", "rinsed", "drained", "toasted", "roasted", "thawed", "finely", "roughly", "coarsely",
    "thinly", "lightly", "optional", "room temperature", "to taste",
    // state
    "fresh", "frozen", "dried", "canned", "raw", "cooked", "organic", "lean", "extra lean",
    "unsalted", "salted", "low-sodium", "low sodium", "fat-free", "reduced-fat", "ripe", "firm",
    "large", "small", "medium", "cold", "warm", "hot", "boiling",
    // cuts and anatomical parts
    "breast", "breasts", "thigh", "thighs", "leg", "legs", "wing", "wings", "drumstick", "loin",
    "tenderloin", "shoulder", "rib", "ribs", "shank", "belly", "fillet", "fillets", "skin-on",
    "bone-in", "cutlet", "chop", "flank", "brisket", "neck", "tail",
];

const DEFAULT_FOOD_NOUNS: &[&str] = &[
    // produce
    "tomato", "onion", "garlic", "jalapeño", "jalapeno", "pepper", "chili", "cilantro", "parsley",
    "basil", "mint", "oregano", "thyme", "rosemary", "dill", "chive", "scallion", "shallot",
    "lime", "lemon", "orange", "apple", "banana", "berry", "strawberry", "blueberry", "avocado",
    "carrot", "celery", "potato", "spinach", "lettuce", "cabbage", "cucumber", "zucchini",
    "mushroom", "corn", "pea", "bean", "ginger", "cumin", "paprika", "cinnamon", "nutmeg",
    // pantry
    "salt", "sugar", "flour", "oil", "olive oil", "butter", "vinegar", "honey", "mustard",
    "mayonnaise", "ketchup", "soy sauce", "water", "stock", "broth", "rice", "pasta", "oat",
    "yeast", "baking soda", "baking powder", "vanilla", "cocoa", "chocolate", "nut", "almond",
    "walnut", "pecan", "peanut", "sesame", "seed",
    // dairy, eggs, protein
    "milk", "cream", "cheese", "yogurt", "egg", "chicken", "beef", "pork", "turkey", "fish",
    "salmon", "tuna", "shrimp", "tofu", "bacon", "sausage",
];

/// Tunable vocabularies for the heuristic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordLists {
    /// Preparation/state adjectives and anatomical-part nouns
    pub descriptors: Vec<String>,
    pub food_nouns: Vec<String>,
}

impl Default for WordLists {
    fn default() -> Self {
        Self {
            descriptors: DEFAULT_DESCRIPTORS.iter().map(|s| s.to_string()).collect(),
            food_nouns: DEFAULT_FOOD_NOUNS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Failure loading a word-list file
#[derive(Debug, thiserror::Error)]
pub enum WordListError {
    #[error("Cannot read word lists: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid word-list JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl WordLists {
    /// Load from a JSON file of the form `{"descriptors": [...], "food_nouns": [...]}`
    pub fn from_json_file(path: &Path) -> Result<Self, WordListError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, WordListError> {
        Ok(serde_json::from_str(text)?)
    }

    fn is_descriptor(&self, phrase: &str) -> bool {
        contains_any(phrase, &self.descriptors)
    }

    fn has_food_noun(&self, phrase: &str) -> bool {
        contains_any(phrase, &self.food_nouns)
    }
}

/// Signal carried by one parenthetical item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemSignal {
    Ingredient,
    Descriptor,
    Neutral,
}

/// Score summary for a parenthetical list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub ingredient_like: usize,
    pub descriptor_like: usize,
}

impl Classification {
    /// Sub-recipe only with a clear majority of at least two ingredient-like items
    pub fn is_sub_recipe(&self) -> bool {
        self.ingredient_like >= 2 && self.ingredient_like > self.descriptor_like
    }
}

/// Score a single item
pub fn item_signal(item: &str, words: &WordLists) -> ItemSignal {
    let folded = fold(item);
    if folded.is_empty() {
        return ItemSignal::Neutral;
    }
    let has_number = item.chars().any(|c| c.is_ascii_digit() || is_vulgar_fraction(c));
    let has_unit = folded.split(' ').any(is_measuring_unit);

    if has_number || has_unit || words.has_food_noun(&folded) {
        ItemSignal::Ingredient
    } else if words.is_descriptor(&folded) {
        ItemSignal::Descriptor
    } else {
        ItemSignal::Neutral
    }
}

/// Score every item of a parenthetical list
pub fn classify<'a>(items: impl IntoIterator<Item = &'a str>, words: &WordLists) -> Classification {
    let mut result = Classification {
        ingredient_like: 0,
        descriptor_like: 0,
    };
    for item in items {
        match item_signal(item, words) {
            ItemSignal::Ingredient => result.ingredient_like += 1,
            ItemSignal::Descriptor => result.descriptor_like += 1,
            ItemSignal::Neutral => {}
        }
    }
    result
}

// Size words are units for conversion but not evidence of an ingredient list
fn is_measuring_unit(word: &str) -> bool {
    word.len() > 1
        && standard_unit(word)
            .is_some_and(|u| matches!(u.category, UnitCategory::Weight | UnitCategory::Volume))
}

fn is_vulgar_fraction(c: char) -> bool {
    ('\u{2150}'..='\u{215E}').contains(&c) || matches!(c, '¼' | '½' | '¾')
}

/// Lowercase, collapse whitespace and singularize every word
fn fold(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { ' ' })
        .collect();
    normalize_unit(&cleaned)
}

/// Whole-word (or whole-phrase) match of any list entry in a folded phrase
fn contains_any(folded: &str, list: &[String]) -> bool {
    let padded = format!(" {} ", folded);
    list.iter().any(|entry| {
        let entry = fold(entry);
        !entry.is_empty() && padded.contains(&format!(" {} ", entry))
    })
}
