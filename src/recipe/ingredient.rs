use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::convert::Unit;

/// One parsed ingredient line. Created once at recipe-init time and never
/// mutated in place; scaling and unit conversion hand back derived copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredIngredient {
    pub quantity: Option<f64>,
    pub unit: Option<Unit>,
    /// Lowercased ingredient phrase, used for density lookup. Never empty:
    /// falls back to the whole normalized line when splitting fails.
    pub name: String,
    pub notes: String,
    /// Source line verbatim, kept for fallback display.
    pub original: String,
}

// Leading quantity token: integer, decimal, fraction, or mixed number.
static QTY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+[\d\s/.]*)").unwrap());

// Unit vocabulary, matched right after the quantity. Longer spellings sit
// before their prefixes so the alternation picks the full word.
static UNIT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(cups?|tablespoons?|tbsps?|teaspoons?|tsps?|grams?|g|milliliters?|ml|liters?|l|ounces?|oz|pounds?|lbs?)\b",
    )
    .unwrap()
});

/// Rewrite unicode vulgar fraction glyphs as ASCII ` n/d` so the quantity
/// grammar can pick them up as part of a mixed number.
fn normalize_vulgar_fractions(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 4);
    for ch in text.chars() {
        match ch {
            '½' => out.push_str(" 1/2"),
            '⅓' => out.push_str(" 1/3"),
            '⅔' => out.push_str(" 2/3"),
            '¼' => out.push_str(" 1/4"),
            '¾' => out.push_str(" 3/4"),
            '⅛' => out.push_str(" 1/8"),
            _ => out.push(ch),
        }
    }
    out
}

/// Resolve a quantity token like `"1"`, `"1.5"`, `"3/4"` or `"2 1/2"` to a
/// decimal. Unresolvable tokens (and a bare zero) come back as `None`.
fn parse_mixed_number(token: &str) -> Option<f64> {
    let mut total = 0.0_f64;
    for part in token.split_whitespace() {
        if let Some((num, den)) = part.split_once('/') {
            let (Ok(num), Ok(den)) = (num.parse::<f64>(), den.parse::<f64>()) else {
                continue;
            };
            if den > 0.0 {
                total += num / den;
            }
        } else if let Ok(value) = part.parse::<f64>() {
            total += value;
        }
    }
    if total == 0.0 {
        None
    } else {
        Some(total)
    }
}

/// Heuristic line parser: quantity + unit + name (+ notes after the first
/// comma or open parenthesis). Case-insensitive; returns `None` only for
/// blank input.
pub fn parse_line(line: &str) -> Option<StructuredIngredient> {
    if line.trim().is_empty() {
        return None;
    }
    let raw = normalize_vulgar_fractions(&line.to_lowercase());
    let raw = raw.trim();

    let mut rest = raw;
    let mut quantity = None;
    if let Some(m) = QTY_RE.find(rest) {
        quantity = parse_mixed_number(m.as_str());
        rest = rest[m.end()..].trim_start();
    }

    let mut unit = None;
    let mut name_and_notes = rest;
    if let Some(m) = UNIT_RE.find(rest) {
        if let Some(parsed) = Unit::from_token(m.as_str()) {
            unit = Some(parsed);
            name_and_notes = rest[m.end()..].trim_start();
        }
    }

    let (name_part, notes_part) = match name_and_notes.find([',', '(']) {
        Some(idx) => (&name_and_notes[..idx], &name_and_notes[idx..]),
        None => (name_and_notes, ""),
    };
    let mut name = name_part.trim().to_string();
    let mut notes = notes_part.trim();
    if notes.starts_with([',', '(']) {
        notes = notes[1..].trim_start();
    }

    if name.is_empty() {
        // Couldn't split anything meaningful; keep the whole line as name.
        name = raw.to_string();
    }

    Some(StructuredIngredient {
        quantity,
        unit,
        name,
        notes: notes.to_string(),
        original: line.to_string(),
    })
}

/// Parse every line, dropping the unparseable ones, preserving input order.
pub fn build_structured_ingredients(lines: &[String]) -> Vec<StructuredIngredient> {
    lines.iter().filter_map(|line| parse_line(line)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_number_with_unit_and_name() {
        let ing = parse_line("2 1/2 cups all-purpose flour").unwrap();
        assert_eq!(ing.quantity, Some(2.5));
        assert_eq!(ing.unit, Some(Unit::Cup));
        assert_eq!(ing.name, "all-purpose flour");
        assert_eq!(ing.notes, "");
        assert_eq!(ing.original, "2 1/2 cups all-purpose flour");
    }

    #[test]
    fn parses_unicode_fractions() {
        let ing = parse_line("1½ cups buttermilk").unwrap();
        assert_eq!(ing.quantity, Some(1.5));
        assert_eq!(ing.unit, Some(Unit::Cup));
        assert_eq!(ing.name, "buttermilk");

        let ing = parse_line("¾ tsp salt").unwrap();
        assert_eq!(ing.quantity, Some(0.75));
        assert_eq!(ing.unit, Some(Unit::Tsp));
    }

    #[test]
    fn parses_decimals_and_plain_fractions() {
        assert_eq!(parse_line("1.5 cups sugar").unwrap().quantity, Some(1.5));
        assert_eq!(parse_line("3/4 cup milk").unwrap().quantity, Some(0.75));
        assert_eq!(parse_line("2 tbsp oil").unwrap().quantity, Some(2.0));
    }

    #[test]
    fn normalizes_unit_variants() {
        assert_eq!(parse_line("1 tablespoon honey").unwrap().unit, Some(Unit::Tbsp));
        assert_eq!(parse_line("1 tbsps honey").unwrap().unit, Some(Unit::Tbsp));
        assert_eq!(parse_line("200 grams flour").unwrap().unit, Some(Unit::Gram));
        assert_eq!(parse_line("8 oz cream cheese").unwrap().unit, Some(Unit::Ounce));
        assert_eq!(parse_line("2 lbs potatoes").unwrap().unit, Some(Unit::Pound));
        assert_eq!(parse_line("100 ml water").unwrap().unit, Some(Unit::Milliliter));
    }

    #[test]
    fn missing_unit_leaves_remainder_as_name() {
        let ing = parse_line("2 large eggs").unwrap();
        assert_eq!(ing.quantity, Some(2.0));
        assert_eq!(ing.unit, None);
        assert_eq!(ing.name, "large eggs");
    }

    #[test]
    fn splits_notes_at_comma_and_parenthesis() {
        let ing = parse_line("1 cup flour, sifted").unwrap();
        assert_eq!(ing.name, "flour");
        assert_eq!(ing.notes, "sifted");

        let ing = parse_line("1 cup walnuts (roughly chopped)").unwrap();
        assert_eq!(ing.name, "walnuts");
        assert_eq!(ing.notes, "roughly chopped)");
    }

    #[test]
    fn unquantified_lines_keep_everything_in_name() {
        let ing = parse_line("salt to taste").unwrap();
        assert_eq!(ing.quantity, None);
        assert_eq!(ing.unit, None);
        assert_eq!(ing.name, "salt to taste");
    }

    #[test]
    fn name_is_lowercased() {
        let ing = parse_line("2 Cups All-Purpose FLOUR").unwrap();
        assert_eq!(ing.name, "all-purpose flour");
        assert_eq!(ing.original, "2 Cups All-Purpose FLOUR");
    }

    #[test]
    fn blank_input_is_rejected() {
        assert!(parse_line("").is_none());
        assert!(parse_line("   ").is_none());
    }

    #[test]
    fn builder_drops_blanks_and_preserves_order() {
        let lines = vec![
            "2 cups flour".to_string(),
            "".to_string(),
            "1 tsp vanilla".to_string(),
        ];
        let parsed = build_structured_ingredients(&lines);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].name, "flour");
        assert_eq!(parsed[1].name, "vanilla");
    }

    #[test]
    fn zero_quantity_resolves_to_none() {
        let ing = parse_line("0 cups regret").unwrap();
        assert_eq!(ing.quantity, None);
    }
}
