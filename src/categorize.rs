//! Store-category inference for free-text ingredient names.
//!
//! Rules are tried from the most specific to the most generic:
//! alias, exact name, single token, keyword sets, then [`OTHER`].

use log::trace;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use crate::normalize::{normalize, tokenize};

pub const PANTRY: &str = "Pantry";
pub const FRESH: &str = "Fresh";
pub const FROZEN: &str = "Frozen";
pub const DRINKS: &str = "Drinks";
pub const HYGIENE: &str = "Hygiene";
/// Catch-all category
pub const OTHER: &str = "Other";

/// Aisle order of a typical store walk
pub const DEFAULT_CATEGORY_ORDER: [&str; 6] = [PANTRY, FRESH, FROZEN, DRINKS, HYGIENE, OTHER];

/// Brands and abbreviations
static ALIASES: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ("choco", "chocolat"),
        ("nutella", "chocolat"),
        ("coca", "cola"),
        ("coca-cola", "cola"),
        ("yaour", "yaourt"),
        ("legumes", "legume"),
        ("viandes", "viande"),
        ("icetea", "ice tea"),
    ])
});

/// Full normalized name -> category
static EXACT: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    let mut map = HashMap::new();
    for name in [
        "lait", "yaourt", "fromage", "beurre", "oeuf", "creme", "poulet", "boeuf", "porc",
        "jambon", "steak", "fruit", "legume", "viande",
    ] {
        map.insert(name, FRESH);
    }
    for name in [
        "riz", "pate", "farine", "sucre", "sel", "huile", "vinaigre", "conserve", "thon", "cafe",
        "the", "chocolat", "cacao",
    ] {
        map.insert(name, PANTRY);
    }
    for name in ["eau", "jus", "soda", "biere", "vin", "cola", "ice tea"] {
        map.insert(name, DRINKS);
    }
    for name in ["glace", "surgele"] {
        map.insert(name, FROZEN);
    }
    for name in ["shampoing", "savon", "dentifrice", "papier toilette", "lessive"] {
        map.insert(name, HYGIENE);
    }
    map
});

/// Token keyword sets, first intersecting set wins
static KEYWORDS: LazyLock<Vec<(HashSet<&'static str>, &'static str)>> = LazyLock::new(|| {
    let table: [(&[&'static str], &'static str); 6] = [
        (
            &[
                "lait", "yaourt", "fromage", "beurre", "oeuf", "creme", "poulet", "boeuf", "porc",
                "jambon", "steak", "fruit", "legume", "viande",
            ],
            FRESH,
        ),
        (
            &[
                "pomme", "banane", "poire", "tomate", "salade", "carotte", "oignon", "ail",
                "citron",
            ],
            FRESH,
        ),
        (
            &[
                "riz", "pate", "farine", "sucre", "sel", "huile", "vinaigre", "conserve", "thon",
                "cafe", "the", "chocolat", "cacao",
            ],
            PANTRY,
        ),
        (
            &[
                "eau", "jus", "soda", "biere", "vin", "cola", "orangina", "fanta", "sprite",
                "perrier", "evian", "vittel", "lipton", "ice", "tea",
            ],
            DRINKS,
        ),
        (&["glace", "surgele"], FROZEN),
        (
            &[
                "shampoing", "savon", "dentifrice", "papier", "toilette", "lessive", "gel",
                "douche",
            ],
            HYGIENE,
        ),
    ];
    table
        .into_iter()
        .map(|(words, category)| (words.iter().copied().collect(), category))
        .collect()
});

/// Replace brand names and abbreviations by their generic term
pub fn apply_alias(raw: &str) -> String {
    let n = normalize(raw);
    if let Some(alias) = ALIASES.get(n.as_str()) {
        return alias.to_string();
    }
    let tokens = tokenize(raw);
    if tokens.iter().any(|t| t == "ice") && tokens.iter().any(|t| t == "tea") {
        return "ice tea".to_string();
    }
    n
}

/// Store category for a free-text name. Never fails; unknown names land in [`OTHER`].
///
/// ```
/// use meal_basket::categorize::categorize;
///
/// assert_eq!(categorize("Nutella"), "Pantry");
/// assert_eq!(categorize("Lipton Ice Tea pêche"), "Drinks");
/// assert_eq!(categorize("xylophone"), "Other");
/// ```
pub fn categorize(raw: &str) -> String {
    let aliased = apply_alias(raw);
    if let Some(category) = EXACT.get(aliased.as_str()) {
        trace!("'{}' categorized by exact name", raw);
        return category.to_string();
    }

    let tokens: HashSet<String> = tokenize(&aliased).into_iter().collect();
    if tokens.len() == 1 {
        if let Some(category) = tokens.iter().next().and_then(|t| EXACT.get(t.as_str())) {
            trace!("'{}' categorized by single token", raw);
            return category.to_string();
        }
    }

    for (keywords, category) in KEYWORDS.iter() {
        if tokens.iter().any(|t| keywords.contains(t.as_str())) {
            trace!("'{}' categorized by keyword", raw);
            return category.to_string();
        }
    }

    OTHER.to_string()
}

/// Every normalized name the tables know, including alias targets
pub fn vocabulary() -> impl Iterator<Item = &'static str> {
    EXACT
        .keys()
        .copied()
        .chain(ALIASES.values().copied())
        .chain(["cola", "ice tea"])
}

/// Position of a category in `order`; unknown categories go last.
pub fn category_rank(category: &str, order: &[String]) -> usize {
    order
        .iter()
        .position(|c| c == category)
        .unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_then_exact() {
        assert_eq!(apply_alias("Coca-Cola"), "cola");
        assert_eq!(categorize("Coca-Cola"), DRINKS);
        assert_eq!(categorize("choco"), PANTRY);
    }

    #[test]
    fn test_compound_alias() {
        assert_eq!(apply_alias("Ice Tea pêche"), "ice tea");
        assert_eq!(categorize("thé glacé ice tea"), DRINKS);
    }

    #[test]
    fn test_exact_full_name() {
        assert_eq!(categorize("Papier toilette"), HYGIENE);
        assert_eq!(categorize("Crème"), FRESH);
    }

    #[test]
    fn test_single_token_after_singularization() {
        assert_eq!(categorize("Oeufs"), FRESH);
        assert_eq!(categorize("Œufs"), FRESH);
        assert_eq!(categorize("œufs de poule"), FRESH);
        assert_eq!(categorize("Pâtes"), PANTRY);
        assert_eq!(categorize("glaces"), FROZEN);
    }

    #[test]
    fn test_keyword_sets_in_order() {
        // "lait" (fresh set) comes before "chocolat" (pantry set)
        assert_eq!(categorize("lait chocolat"), FRESH);
        assert_eq!(categorize("tomates cerises"), FRESH);
        assert_eq!(categorize("huile de tournesol"), PANTRY);
        assert_eq!(categorize("gel douche"), HYGIENE);
    }

    #[test]
    fn test_fallback_to_other() {
        assert_eq!(categorize("xylophone"), OTHER);
        assert_eq!(categorize(""), OTHER);
    }

    #[test]
    fn test_category_rank() {
        let order: Vec<String> = DEFAULT_CATEGORY_ORDER.iter().map(|s| s.to_string()).collect();
        assert_eq!(category_rank(PANTRY, &order), 0);
        assert_eq!(category_rank(OTHER, &order), 5);
        assert_eq!(category_rank("Bakery", &order), usize::MAX);
    }
}
