//! Quantity parsing
//!
//! Handles the number formats that show up in pasted recipes: decimals,
//! ASCII fractions ("1/2"), unicode vulgar fractions ("½"), mixed numbers
//! ("1 1/2", "1½") and ranges ("2-3", "2 to 3"), which resolve to their
//! midpoint. A comma followed by groups of exactly three digits is a
//! thousands separator ("1,000"); any other comma is a decimal comma ("2,5").

use once_cell::sync::Lazy;
use regex::Regex;

/// Largest quantity accepted on a single line
pub const MAX_QUANTITY: f64 = 100_000.0;

const AMOUNT: &str =
    r"-?(?:\d+\s+\d+\s*/\s*\d+|\d+\s*/\s*\d+|\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:[.,]\d+)?|[.,]\d+)";

// Constant pattern; a compile failure is a programming error caught by the tests.
static LEADING_QUANTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^\s*(?P<first>{AMOUNT})(?:\s*(?:-|–|—|to)\s*(?P<second>{AMOUNT}))?"
    ))
    .expect("leading quantity pattern")
});

const VULGAR_FRACTIONS: &[(char, &str)] = &[
    ('½', "1/2"),
    ('⅓', "1/3"),
    ('⅔', "2/3"),
    ('¼', "1/4"),
    ('¾', "3/4"),
    ('⅕', "1/5"),
    ('⅖', "2/5"),
    ('⅗', "3/5"),
    ('⅘', "4/5"),
    ('⅙', "1/6"),
    ('⅚', "5/6"),
    ('⅐', "1/7"),
    ('⅛', "1/8"),
    ('⅜', "3/8"),
    ('⅝', "5/8"),
    ('⅞', "7/8"),
    ('⅑', "1/9"),
    ('⅒', "1/10"),
];

/// Rewrite unicode fractions and full-width digits as ASCII
/// ("1½" → "1 1/2", "⅓" → "1/3", "２" → "2")
pub fn normalize_fractions(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '⁄' | '∕' => out.push('/'),
            '０'..='９' => out.push(char::from(b'0' + (c as u32 - '０' as u32) as u8)),
            _ => match VULGAR_FRACTIONS.iter().find(|(f, _)| *f == c) {
                Some((_, ascii)) => {
                    if out.chars().last().is_some_and(|p| p.is_ascii_digit()) {
                        out.push(' ');
                    }
                    out.push_str(ascii);
                }
                None => out.push(c),
            },
        }
    }
    out
}

/// "1,000" or "12,345.5": every group after the first has three digits
fn is_thousands_grouped(token: &str) -> bool {
    let integer = token.split_once('.').map_or(token, |(int, _)| int);
    let mut groups = integer.split(',');
    let first_ok = groups
        .next()
        .is_some_and(|g| (1..=3).contains(&g.len()) && g.bytes().all(|b| b.is_ascii_digit()));
    let rest: Vec<&str> = groups.collect();
    first_ok && !rest.is_empty() && rest.iter().all(|g| g.len() == 3 && g.bytes().all(|b| b.is_ascii_digit()))
}

/// Value of a single amount token ("1 1/2", "3/4", "2.5", "2,5", "1,000")
///
/// A zero denominator yields infinity so the caller's finiteness check
/// reports it.
pub fn parse_amount(token: &str) -> Option<f64> {
    let token = token.trim();
    let (negative, token) = match token.strip_prefix('-') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, token),
    };

    let value = if let Some((left, denominator)) = token.split_once('/') {
        let denominator: f64 = denominator.trim().parse().ok()?;
        let left = left.trim();
        let (whole, numerator) = match left.rsplit_once(char::is_whitespace) {
            Some((whole, numerator)) => (whole.trim().parse::<f64>().ok()?, numerator.parse::<f64>().ok()?),
            None => (0.0, left.parse::<f64>().ok()?),
        };
        whole + numerator / denominator
    } else if is_thousands_grouped(token) {
        token.replace(',', "").parse::<f64>().ok()?
    } else {
        token.replace(',', ".").parse::<f64>().ok()?
    };

    Some(if negative { -value } else { value })
}

/// A quantity found at the start of a line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeadingQuantity {
    pub value: f64,
    /// Byte length of the matched quantity text
    pub consumed: usize,
    pub is_range: bool,
}

/// Parse the quantity at the start of `text` (already fraction-normalized)
pub fn leading_quantity(text: &str) -> Option<LeadingQuantity> {
    let caps = LEADING_QUANTITY.captures(text)?;
    let whole = caps.get(0)?;
    let first = parse_amount(caps.name("first")?.as_str())?;

    // "2 to 3" vs "2 tomatoes": the range word must be followed by an amount
    let (value, is_range) = match caps.name("second").and_then(|m| parse_amount(m.as_str())) {
        Some(second) => ((first + second) / 2.0, true),
        None => (first, false),
    };

    let consumed = whole.end();
    // "1.2.3" or "1/2/3" is not a quantity; an attached unit ("200g") is fine
    if text[consumed..].starts_with(|c: char| c.is_ascii_digit() || c == '/' || c == '.') {
        return None;
    }

    Some(LeadingQuantity {
        value,
        consumed,
        is_range,
    })
}

/// Why a parsed quantity cannot be used
pub fn quantity_problem(value: f64) -> Option<&'static str> {
    if !value.is_finite() {
        Some("is not a finite number")
    } else if value <= 0.0 {
        Some("must be greater than zero")
    } else if value > MAX_QUANTITY {
        Some("is implausibly large")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_normalize_fractions() {
        assert_eq!(normalize_fractions("1½ cups"), "1 1/2 cups");
        assert_eq!(normalize_fractions("⅓ cup"), "1/3 cup");
        assert_eq!(normalize_fractions("1⁄4 tsp"), "1/4 tsp");
        assert_eq!(normalize_fractions("jalapeño"), "jalapeño");
        assert_eq!(normalize_fractions("１２ g"), "12 g");
    }

    #[test]
    fn test_thousands_separator_is_not_a_decimal_comma() {
        assert_eq!(parse_amount("1,000"), Some(1000.0));
        assert_eq!(parse_amount("12,345.5"), Some(12345.5));
        assert_eq!(parse_amount("2,5"), Some(2.5));
        assert_eq!(parse_amount("2,50"), Some(2.5));

        let q = leading_quantity("1,000 g flour").unwrap();
        assert!(approx(q.value, 1000.0));
        assert_eq!(&"1,000 g flour"[q.consumed..], " g flour");
        assert!(approx(leading_quantity("2,5 kg potatoes").unwrap().value, 2.5));
    }

    #[test]
    fn test_parse_amount_formats() {
        assert_eq!(parse_amount("2"), Some(2.0));
        assert_eq!(parse_amount("2.5"), Some(2.5));
        assert_eq!(parse_amount("2,5"), Some(2.5));
        assert_eq!(parse_amount(".5"), Some(0.5));
        assert_eq!(parse_amount("3/4"), Some(0.75));
        assert_eq!(parse_amount("1 1/2"), Some(1.5));
        assert_eq!(parse_amount("-2"), Some(-2.0));
        assert_eq!(parse_amount("1/0"), Some(f64::INFINITY));
        assert_eq!(parse_amount("abc"), None);
    }

    #[test]
    fn test_leading_quantity() {
        let q = leading_quantity("1 1/2 cups flour").unwrap();
        assert!(approx(q.value, 1.5));
        assert_eq!(&"1 1/2 cups flour"[q.consumed..], " cups flour");

        let text = normalize_fractions("1½ cups milk");
        assert!(approx(leading_quantity(&text).unwrap().value, 1.5));

        let q = leading_quantity("2-3 cloves garlic").unwrap();
        assert!(q.is_range);
        assert!(approx(q.value, 2.5));

        let q = leading_quantity("2 to 4 tbsp butter").unwrap();
        assert!(approx(q.value, 3.0));

        let q = leading_quantity("2 tomatoes").unwrap();
        assert!(!q.is_range);
        assert_eq!(q.value, 2.0);

        assert!(leading_quantity("salt to taste").is_none());
    }

    #[test]
    fn test_attached_unit_is_allowed() {
        let q = leading_quantity("200g flour").unwrap();
        assert_eq!(q.value, 200.0);
        assert_eq!(&"200g flour"[q.consumed..], "g flour");
    }

    #[test]
    fn test_quantity_problems() {
        assert_eq!(quantity_problem(2.0), None);
        assert!(quantity_problem(0.0).is_some());
        assert!(quantity_problem(-1.0).is_some());
        assert!(quantity_problem(f64::INFINITY).is_some());
        assert!(quantity_problem(250_000.0).is_some());
        assert_eq!(quantity_problem(MAX_QUANTITY), None);
    }
}
