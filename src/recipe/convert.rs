use serde::{Deserialize, Serialize};

use super::ingredient::StructuredIngredient;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = false;

use crate::log_info;

/// Canonical measurement units recognized by the parser and the converter.
/// Serialized as the canonical lowercase token (`cup`, `g`, `oz`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "tsp")]
    Tsp,
    #[serde(rename = "tbsp")]
    Tbsp,
    #[serde(rename = "cup")]
    Cup,
    #[serde(rename = "g")]
    Gram,
    #[serde(rename = "ml")]
    Milliliter,
    #[serde(rename = "l")]
    Liter,
    #[serde(rename = "oz")]
    Ounce,
    #[serde(rename = "lb")]
    Pound,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Tsp => "tsp",
            Unit::Tbsp => "tbsp",
            Unit::Cup => "cup",
            Unit::Gram => "g",
            Unit::Milliliter => "ml",
            Unit::Liter => "l",
            Unit::Ounce => "oz",
            Unit::Pound => "lb",
        }
    }

    /// Normalize any spelling from the ingredient vocabulary (plural forms,
    /// abbreviations) to a canonical unit. Input is expected lowercased.
    pub fn from_token(token: &str) -> Option<Unit> {
        match token {
            "tsp" | "tsps" | "teaspoon" | "teaspoons" => Some(Unit::Tsp),
            "tbsp" | "tbsps" | "tablespoon" | "tablespoons" => Some(Unit::Tbsp),
            "cup" | "cups" => Some(Unit::Cup),
            "g" | "gram" | "grams" => Some(Unit::Gram),
            "ml" | "milliliter" | "milliliters" => Some(Unit::Milliliter),
            "l" | "liter" | "liters" => Some(Unit::Liter),
            "oz" | "ounce" | "ounces" => Some(Unit::Ounce),
            "lb" | "lbs" | "pound" | "pounds" => Some(Unit::Pound),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum UnitSystem {
    #[default]
    Imperial,
    Metric,
}

impl UnitSystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitSystem::Imperial => "imperial",
            UnitSystem::Metric => "metric",
        }
    }

    /// Wire-level coercion: anything other than `"metric"` means imperial.
    pub fn coerce(raw: &str) -> UnitSystem {
        if raw.trim().eq_ignore_ascii_case("metric") {
            UnitSystem::Metric
        } else {
            UnitSystem::Imperial
        }
    }
}

pub const GRAMS_PER_OUNCE: f64 = 28.3495;
pub const GRAMS_PER_POUND: f64 = 453.592;
pub const TSP_PER_TBSP: f64 = 3.0;
pub const TSP_PER_CUP: f64 = 48.0;
// Water-like approximation used to bring ml back to cups for density lookup.
const ML_PER_CUP: f64 = 240.0;

/// One volume-to-mass rule: if the ingredient name contains `needle`, the
/// ingredient weighs `grams_per_cup` per US cup.
struct DensityRule {
    needle: &'static str,
    grams_per_cup: f64,
}

/// Checked top to bottom, first match wins. Precedence: more specific phrases
/// come before the generic word they contain ("brown sugar" before "sugar"),
/// so declaration order alone decides the outcome.
const DENSITY_RULES: &[DensityRule] = &[
    DensityRule { needle: "all-purpose flour", grams_per_cup: 120.0 },
    DensityRule { needle: "ap flour", grams_per_cup: 120.0 },
    DensityRule { needle: "brown sugar", grams_per_cup: 220.0 }, // packed
    DensityRule { needle: "granulated sugar", grams_per_cup: 200.0 },
    DensityRule { needle: "white sugar", grams_per_cup: 200.0 },
    DensityRule { needle: "flour", grams_per_cup: 120.0 },
    DensityRule { needle: "sugar", grams_per_cup: 200.0 },
    DensityRule { needle: "buttermilk", grams_per_cup: 240.0 },
    DensityRule { needle: "milk", grams_per_cup: 240.0 },
    DensityRule { needle: "water", grams_per_cup: 240.0 },
    DensityRule { needle: "oil", grams_per_cup: 218.0 }, // vegetable oil
    DensityRule { needle: "butter", grams_per_cup: 227.0 }, // 2 sticks per cup
];

fn density_for_name(name: &str) -> Option<f64> {
    DENSITY_RULES
        .iter()
        .find(|rule| name.contains(rule.needle))
        .map(|rule| rule.grams_per_cup)
}

/// Returns a copy with the quantity multiplied by `factor`. Ingredients
/// without a numeric quantity pass through unchanged. Factor validation is
/// the session layer's job.
pub fn scale(ingredient: &StructuredIngredient, factor: f64) -> StructuredIngredient {
    let mut out = ingredient.clone();
    if let Some(qty) = out.quantity {
        out.quantity = Some(qty * factor);
    }
    out
}

/// Best-effort unit-system conversion.
///
/// To metric the mass path is tried first (oz/lb/g), then volume via the
/// density rules. When neither applies the ingredient is returned unchanged;
/// that is a soft failure, not an error.
///
/// Converting to imperial is an explicit unsupported contract: the input is
/// returned unchanged. Guessing grams back to cups would need per-ingredient
/// densities we only trust in the forward direction.
pub fn convert(ingredient: &StructuredIngredient, target: UnitSystem) -> StructuredIngredient {
    match target {
        UnitSystem::Metric => convert_to_metric(ingredient),
        UnitSystem::Imperial => ingredient.clone(),
    }
}

fn convert_to_metric(ingredient: &StructuredIngredient) -> StructuredIngredient {
    let (Some(qty), Some(unit)) = (ingredient.quantity, ingredient.unit) else {
        return ingredient.clone();
    };

    if let Some(grams) = to_grams(qty, unit, &ingredient.name) {
        let mut out = ingredient.clone();
        out.quantity = Some(grams);
        out.unit = Some(Unit::Gram);
        return out;
    }

    log_info!(
        "no mass unit or density for '{}' ({}); leaving unconverted",
        ingredient.name,
        unit.as_str()
    );
    ingredient.clone()
}

fn to_grams(qty: f64, unit: Unit, name: &str) -> Option<f64> {
    // Mass units win before any density lookup.
    match unit {
        Unit::Gram => return Some(qty),
        Unit::Ounce => return Some(qty * GRAMS_PER_OUNCE),
        Unit::Pound => return Some(qty * GRAMS_PER_POUND),
        _ => {}
    }

    let density = density_for_name(name)?;
    let cups = match unit {
        Unit::Cup => qty,
        Unit::Tbsp => qty * TSP_PER_TBSP / TSP_PER_CUP,
        Unit::Tsp => qty / TSP_PER_CUP,
        Unit::Milliliter => qty / ML_PER_CUP,
        // Liters never appear in the density path; leave them alone.
        _ => return None,
    };
    Some(cups * density)
}

/// Human/TTS-friendly rendering: quantity rounded to 2 decimals plus the
/// canonical unit token. Ingredients we never managed to quantify fall back
/// to their original source line verbatim.
pub fn format_amount(ingredient: &StructuredIngredient) -> String {
    let Some(qty) = ingredient.quantity else {
        return ingredient.original.clone();
    };
    let rounded = (qty * 100.0).round() / 100.0;
    match ingredient.unit {
        Some(unit) => format!("{} {} {}", rounded, unit.as_str(), ingredient.name),
        None => format!("{} {}", rounded, ingredient.name),
    }
}
