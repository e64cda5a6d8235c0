//! Text normalization for ingredient names.
//!
//! Two flavours live here:
//!
//! - [`normalize`] / [`tokenize`]: display-safe folding used for group keys
//!   and categorization.
//! - [`normalize_for_match`]: a lossier form used only to maximize fuzzy
//!   recall. It strips package-size annotations and runs every token through
//!   a [`TokenReducer`] (French by default).

use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// "(400 g)", "(~1,5 kg)", "(25cl)"
static SIZE_ANNOTATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*\((?:~?\d+(?:[.,]\d+)?\s*(?:mg|g|kg|ml|cl|l))\)\s*")
        .expect("size annotation pattern should be valid")
});

static OPTIONAL_ANNOTATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*\((?:facultatif|optionnel|optional)\)\s*")
        .expect("optional annotation pattern should be valid")
});

static HACHE_ENDING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"hach(?:e|ee|es|er|ez)$").expect("valid pattern"));

static FEMININE_PLURAL_ENDING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:ees|es|e|s|x)$").expect("valid pattern"));

/// Strip diacritics: "crème brûlée" -> "creme brulee".
///
/// "œ" has no canonical decomposition, so it is spelled out first.
pub fn fold_diacritics(s: &str) -> String {
    s.replace('œ', "oe")
        .replace('Œ', "OE")
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

/// Keep `[a-z0-9-]`, turn everything else into single spaces, trim.
fn squash(s: &str) -> String {
    let mapped: String = s
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
                c
            } else {
                ' '
            }
        })
        .collect();
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Fold diacritics, lowercase, drop punctuation, collapse whitespace.
///
/// Total over any input and idempotent.
///
/// ```
/// use meal_basket::normalize::normalize;
///
/// assert_eq!(normalize("  Crème FRAÎCHE (épaisse) "), "creme fraiche epaisse");
/// assert_eq!(normalize(""), "");
/// ```
pub fn normalize(s: &str) -> String {
    squash(&fold_diacritics(s).to_lowercase())
}

/// Singular form for the handful of irregular grocery nouns, else drop a
/// trailing "s"/"x" on tokens longer than three characters.
pub fn singularize(token: &str) -> String {
    match token {
        "oeufs" | "œufs" | "oeuf" | "œuf" => "oeuf".to_string(),
        "pâtes" | "pates" => "pate".to_string(),
        "légumes" | "legumes" => "legume".to_string(),
        "fruits" => "fruit".to_string(),
        "viandes" => "viande".to_string(),
        "yaourts" => "yaourt".to_string(),
        t if t.chars().count() > 3 && (t.ends_with('s') || t.ends_with('x')) => {
            t[..t.len() - 1].to_string()
        }
        t => t.to_string(),
    }
}

/// Normalized, singularized tokens.
pub fn tokenize(s: &str) -> Vec<String> {
    normalize(s).split(' ').filter(|t| !t.is_empty()).map(singularize).collect()
}

/// Per-token suffix reduction applied by [`normalize_for_match_with`].
///
/// Keeps the matcher agnostic to the locale of the catalog.
pub trait TokenReducer: Send + Sync {
    fn reduce(&self, token: &str) -> String;
}

/// Minimal French reducer: "hachée"/"haches" -> "hach", then feminine and
/// plural endings are dropped on tokens longer than three characters.
#[derive(Debug, Default, Clone, Copy)]
pub struct FrenchReducer;

impl TokenReducer for FrenchReducer {
    fn reduce(&self, token: &str) -> String {
        let s = HACHE_ENDING.replace(token, "hach");
        if s.chars().count() > 3 {
            FEMININE_PLURAL_ENDING.replace(&s, "").into_owned()
        } else {
            s.into_owned()
        }
    }
}

/// Reducer that leaves tokens untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityReducer;

impl TokenReducer for IdentityReducer {
    fn reduce(&self, token: &str) -> String {
        token.to_string()
    }
}

/// Aggressive normalization for matching only, never for display.
pub fn normalize_for_match(s: &str) -> String {
    normalize_for_match_with(s, &FrenchReducer)
}

/// [`normalize_for_match`] with a caller supplied reducer.
pub fn normalize_for_match_with(s: &str, reducer: &dyn TokenReducer) -> String {
    let replaced = s.replace('\u{2019}', "'");
    let lowered = fold_diacritics(&replaced).to_lowercase();
    let without_sizes = SIZE_ANNOTATION.replace_all(&lowered, " ");
    let without_optional = OPTIONAL_ANNOTATION.replace_all(&without_sizes, " ");

    squash(&without_optional)
        .split(' ')
        .filter(|t| !t.is_empty())
        .map(|t| reducer.reduce(t))
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_accents_and_punctuation() {
        assert_eq!(normalize("Pâtes  complètes!"), "pates completes");
        assert_eq!(normalize("Coca-Cola"), "coca-cola");
        assert_eq!(normalize("huile d'olive"), "huile d olive");
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize("Œufs frais"), "oeufs frais");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let inputs = [
            "Crème fraîche épaisse (30%)",
            "  ŒUFS   frais\t\n",
            "İstanbul kebab",
            "日本 rice",
            "a--b  c",
            "",
        ];
        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "input: {:?}", input);
        }
    }

    #[test]
    fn test_singularize_irregular_and_generic() {
        assert_eq!(singularize("oeufs"), "oeuf");
        assert_eq!(singularize("œuf"), "oeuf");
        assert_eq!(singularize("pates"), "pate");
        assert_eq!(singularize("yaourts"), "yaourt");
        assert_eq!(singularize("tomates"), "tomate");
        assert_eq!(singularize("poireaux"), "poireau");
        assert_eq!(singularize("riz"), "riz");
        assert_eq!(singularize("gas"), "gas");
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("Tomates cerises"), vec!["tomate", "cerise"]);
        assert_eq!(tokenize("Œufs"), vec!["oeuf"]);
        assert_eq!(tokenize("bœuf haché"), vec!["boeuf", "hache"]);
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn test_match_normalizer_strips_annotations() {
        assert_eq!(normalize_for_match("Tomates pelées (400 g)"), "tomat pel");
        assert_eq!(normalize_for_match("Persil (facultatif)"), "persil");
        assert_eq!(normalize_for_match("Crème (~1,5 kg)"), "crem");
    }

    #[test]
    fn test_match_normalizer_hache_stem() {
        assert_eq!(normalize_for_match("viande hachée"), "viand hach");
        assert_eq!(normalize_for_match("Viande hachee"), "viand hach");
        assert_eq!(normalize_for_match("boeuf haché"), "boeuf hach");
    }

    #[test]
    fn test_match_normalizer_ligature_and_apostrophe() {
        assert_eq!(normalize_for_match("Œufs"), "oeuf");
        assert_eq!(normalize_for_match("huile d\u{2019}olive"), "huil d oliv");
    }

    #[test]
    fn test_identity_reducer_keeps_tokens() {
        assert_eq!(
            normalize_for_match_with("Tomates pelées", &IdentityReducer),
            "tomates pelees"
        );
    }
}
