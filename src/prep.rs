//! Light cleanup of raw OCR text before it is handed to extraction.
//!
//! Nothing here tries to understand the recipe: it finds a servings hint and
//! keeps the lines that look like ingredients.

use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::normalize::fold_diacritics;

static SERVINGS_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\bpour\s*(\d{1,2})\s*(?:pers(?:onnes)?|p|parts?)\b",
        r"(?i)\b(\d{1,2})\s*(?:pers(?:onnes)?|p|parts?)\b",
        r"(?i)\b(?:serves|servings?)\s*:?\s*(\d{1,2})\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("servings pattern should be valid"))
    .collect()
});

static DIGIT_LETTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d)([a-z])").expect("valid pattern"));
static LEADING_DECORATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[\s\-\*\u{00B7}]+|\(\d{1,2}\)\s*)").expect("valid pattern"));
static STARTS_LOWERCASE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zàâäéèêëîïôöùûüç]").expect("valid pattern"));

const KNOWN_UNITS: [&str; 16] = [
    "g", "kg", "mg", "ml", "cl", "l", "cs", "cac", "sachet", "gousse", "pincee", "tranche",
    "boite", "brique", "oeuf", "oeufs",
];

const INSTRUCTION_WORDS: [&str; 17] = [
    "prechauffer", "melanger", "ajouter", "cuire", "battre", "incorporer", "laisser", "verser",
    "fouetter", "emincer", "revenir", "cuisson", "four", "thermostat", "min", "°c", "etape",
];

/// Compact payload `{"s": servings?, "l": [lines]}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinePayload {
    pub s: Option<u32>,
    pub l: Vec<String>,
}

/// "pour 4 personnes", "6 pers", "serves 2"
pub fn detect_servings(text: &str) -> Option<u32> {
    let cleaned = preclean(text);
    SERVINGS_PATTERNS.iter().find_map(|re| {
        re.captures(&cleaned)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    })
}

/// Lines of OCR text that plausibly list an ingredient, deduplicated.
pub fn candidate_lines(text: &str) -> Vec<String> {
    let raw: Vec<String> = text
        .lines()
        .map(preclean)
        .filter(|l| !l.is_empty())
        .collect();

    let mut seen = HashSet::new();
    let lines: Vec<String> = merge_wrapped_lines(raw)
        .into_iter()
        .filter(|line| {
            let folded = fold_diacritics(line).to_lowercase();
            if folded.chars().count() < 3 || is_instruction(&folded) || is_meta(&folded) {
                return false;
            }
            starts_with_number(&folded)
                || contains_known_unit(&folded)
                || folded.starts_with(['-', '*'])
                || wordish(&folded)
        })
        .filter(|line| {
            let key: String = fold_diacritics(line)
                .to_lowercase()
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect();
            seen.insert(key)
        })
        .collect();

    debug!("Kept {} candidate ingredient lines", lines.len());
    lines
}

/// Servings hint plus candidate lines
pub fn prepare_payload(text: &str) -> LinePayload {
    LinePayload {
        s: detect_servings(text),
        l: candidate_lines(text),
    }
}

fn preclean(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let s = trimmed
        .replace('½', "1/2")
        .replace('¼', "1/4")
        .replace('¾', "3/4")
        .replace('\u{2019}', "'")
        .replace(['\u{2013}', '\u{2014}', '\u{2022}', '\u{25E6}'], "-");
    // "400g" -> "400 g"
    let s = DIGIT_LETTER.replace_all(&s, "$1 $2");
    let s = LEADING_DECORATION.replace(&s, "");
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Glue continuation lines ("de tomates", "n", lowercase starts) to the previous line.
fn merge_wrapped_lines(lines: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    for line in lines {
        let is_tiny = line.chars().count() <= 3;
        let starts_connector = ["de ", "d'", "du ", "des "]
            .iter()
            .any(|p| line.starts_with(p));
        let starts_lower = STARTS_LOWERCASE.is_match(&line);

        match out.last_mut() {
            Some(last) if is_tiny || starts_connector || starts_lower => {
                if last.ends_with('-') {
                    last.pop();
                }
                last.push(' ');
                last.push_str(&line);
            }
            _ => out.push(line),
        }
    }
    out
}

fn starts_with_number(s: &str) -> bool {
    s.trim_start().starts_with(|c: char| c.is_ascii_digit())
}

fn contains_known_unit(s: &str) -> bool {
    s.split(' ')
        .any(|tok| KNOWN_UNITS.contains(&tok.replace('.', "").as_str()))
}

fn is_instruction(s: &str) -> bool {
    INSTRUCTION_WORDS.iter().any(|w| s.contains(w))
}

fn is_meta(s: &str) -> bool {
    s.contains("personne")
        || s.contains("pers")
        || s.starts_with("ingredient")
        || s.starts_with("ingrédient")
}

fn wordish(s: &str) -> bool {
    s.chars().filter(|c| c.is_alphabetic()).count() >= 3 && s.contains(' ')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_servings() {
        assert_eq!(detect_servings("Tarte aux pommes\nPour 6 personnes"), Some(6));
        assert_eq!(detect_servings("4 pers."), Some(4));
        assert_eq!(detect_servings("Serves 2"), Some(2));
        assert_eq!(detect_servings("200 g de farine"), None);
    }

    #[test]
    fn test_candidate_lines_filters_instructions_and_meta() {
        let text = "Ingrédients\n\
                    Pour 4 personnes\n\
                    - 400g farine\n\
                    2 oeufs\n\
                    Sel\n\
                    Préchauffer le four à 180°C\n\
                    lait entier";
        let lines = candidate_lines(text);
        assert!(lines.iter().any(|l| l.starts_with("400 g farine")));
        assert!(lines.iter().any(|l| l.starts_with("2 oeufs")));
        assert!(!lines.iter().any(|l| l.contains("four")));
        assert!(!lines.iter().any(|l| l.to_lowercase().contains("personnes")));
    }

    #[test]
    fn test_wrapped_lines_are_merged() {
        let lines = candidate_lines("200 g de tomates\nconcassées\n1 oignon");
        assert_eq!(lines, vec!["200 g de tomates concassées", "1 oignon"]);
    }

    #[test]
    fn test_duplicate_lines_are_dropped() {
        let lines = candidate_lines("2 oeufs\n2  Oeufs");
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn test_prepare_payload_serializes_compactly() {
        let payload = prepare_payload("Pour 2 personnes\n100 g beurre");
        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(json, r#"{"s":2,"l":["100 g beurre"]}"#);
    }
}
