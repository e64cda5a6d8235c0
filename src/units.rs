//! Unit vocabulary.
//!
//! Free-text unit tokens coming out of extraction are folded onto a short
//! French vocabulary. Anything unknown passes through lowercased; it is not
//! an error.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use crate::model::IngredientRow;
use crate::normalize::fold_diacritics;

/// Canonical units understood by the shopping list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    Grams,
    Kilograms,
    Milligrams,
    Milliliters,
    Centiliters,
    Liters,
    Tablespoon,
    Teaspoon,
    Egg,
    Clove,
    Sachet,
    Slice,
    Carton,
    Pinch,
    Can,
    Stalk,
}

impl Unit {
    /// Short code stored on rows and used in check ids
    pub fn code(&self) -> &'static str {
        match self {
            Unit::Grams => "g",
            Unit::Kilograms => "kg",
            Unit::Milligrams => "mg",
            Unit::Milliliters => "ml",
            Unit::Centiliters => "cl",
            Unit::Liters => "l",
            Unit::Tablespoon => "cs",
            Unit::Teaspoon => "cac",
            Unit::Egg => "oeuf",
            Unit::Clove => "gousse",
            Unit::Sachet => "sachet",
            Unit::Slice => "tranche",
            Unit::Carton => "brique",
            Unit::Pinch => "pincee",
            Unit::Can => "boite",
            Unit::Stalk => "branche",
        }
    }

    /// Parse a free-text unit token
    pub fn parse(raw: &str) -> Option<Unit> {
        UNIT_MAPPINGS.get(clean(raw).as_str()).copied()
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

static UNIT_MAPPINGS: LazyLock<HashMap<&'static str, Unit>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    // Weight
    for k in ["g", "gr", "gramme", "grammes", "gram", "grams"] {
        map.insert(k, Unit::Grams);
    }
    for k in ["kg", "kilo", "kilos", "kilogramme", "kilogrammes", "kilogram", "kilograms"] {
        map.insert(k, Unit::Kilograms);
    }
    for k in ["mg", "milligramme", "milligrammes", "milligram", "milligrams"] {
        map.insert(k, Unit::Milligrams);
    }

    // Volume
    for k in ["ml", "millilitre", "millilitres", "milliliter", "milliliters"] {
        map.insert(k, Unit::Milliliters);
    }
    for k in ["cl", "centilitre", "centilitres", "centiliter", "centiliters"] {
        map.insert(k, Unit::Centiliters);
    }
    for k in ["l", "litre", "litres", "liter", "liters"] {
        map.insert(k, Unit::Liters);
    }

    // Spoons
    for k in [
        "cs",
        "cas",
        "c a s",
        "cuillere a soupe",
        "cuilleres a soupe",
        "cuil a soupe",
        "tbsp",
        "tablespoon",
        "tablespoons",
    ] {
        map.insert(k, Unit::Tablespoon);
    }
    for k in [
        "cac",
        "cc",
        "c a c",
        "cuillere a cafe",
        "cuilleres a cafe",
        "cuil a cafe",
        "tsp",
        "teaspoon",
        "teaspoons",
    ] {
        map.insert(k, Unit::Teaspoon);
    }

    // Pieces
    for k in ["oeuf", "oeufs", "egg", "eggs"] {
        map.insert(k, Unit::Egg);
    }
    for k in ["gousse", "gousses", "clove", "cloves"] {
        map.insert(k, Unit::Clove);
    }
    for k in ["sachet", "sachets"] {
        map.insert(k, Unit::Sachet);
    }
    for k in ["tranche", "tranches", "slice", "slices"] {
        map.insert(k, Unit::Slice);
    }
    for k in ["brique", "briques", "carton", "cartons"] {
        map.insert(k, Unit::Carton);
    }
    for k in ["pincee", "pincees", "pinch", "pinches"] {
        map.insert(k, Unit::Pinch);
    }
    for k in ["boite", "boites", "can", "cans", "box", "boxes", "conserve", "conserves"] {
        map.insert(k, Unit::Can);
    }
    for k in ["branche", "branches", "stalk", "stalks"] {
        map.insert(k, Unit::Stalk);
    }

    map
});

/// Lowercase, fold accents and the œ ligature, drop dots, collapse spaces.
fn clean(raw: &str) -> String {
    fold_diacritics(&raw.replace('œ', "oe").replace('Œ', "oe"))
        .to_lowercase()
        .replace('.', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Canonical short code for a unit token; unknown tokens pass through cleaned.
///
/// ```
/// use meal_basket::units::normalize_unit;
///
/// assert_eq!(normalize_unit("Cuillère à soupe"), "cs");
/// assert_eq!(normalize_unit("Grammes"), "g");
/// assert_eq!(normalize_unit("poignée"), "poignee");
/// assert_eq!(normalize_unit(""), "");
/// ```
pub fn normalize_unit(raw: &str) -> String {
    let cleaned = clean(raw);
    match UNIT_MAPPINGS.get(cleaned.as_str()) {
        Some(unit) => unit.code().to_string(),
        None => cleaned,
    }
}

/// Clear piece units the row name cannot justify, e.g. an "oeuf" unit on
/// "oignon". Package units are left alone.
pub fn sanitize_units(mut row: IngredientRow) -> IngredientRow {
    let name = fold_diacritics(&row.name.replace('œ', "oe")).to_lowercase();
    let contains_any = |keys: &[&str]| keys.iter().any(|k| name.contains(k));

    let keep = match row.unit.as_str() {
        "oeuf" => contains_any(&["oeuf"]),
        "gousse" => contains_any(&["gousse", "ail", "vanille"]),
        "branche" => contains_any(&[
            "branche", "celeri", "thym", "romarin", "persil", "menthe", "coriandre",
        ]),
        "tranche" => contains_any(&["tranche", "jambon", "pain", "fromage", "saumon", "bacon"]),
        _ => true,
    };
    if !keep {
        row.unit.clear();
    }
    row
}
