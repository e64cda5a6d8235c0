//! Catalog index proposing ranked candidates for free-text ingredient names.
//!
//! Every catalog entry is indexed under each of its normalized spellings
//! (raw name, canonical name). A query is scored against every spelling:
//!
//! ```text
//! score = 400*exact + 40*prefix + 20*substring + max(levenshtein, jaccard, trigram)
//! ```
//!
//! The weights keep the bands apart: an exact match always outranks a prefix
//! match, which outranks a substring match, which outranks pure similarity.

use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::model::{preferred_name, Ingredient};
use crate::normalize::{normalize_for_match_with, FrenchReducer, TokenReducer};

/// Candidates are never trimmed below this many entries
pub const MIN_CANDIDATES: usize = 5;

const EXACT_WEIGHT: f64 = 400.0;
const PREFIX_WEIGHT: f64 = 40.0;
const SUBSTRING_WEIGHT: f64 = 20.0;
const TIE_EPSILON: f64 = 1e-4;

/// A ranked catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: i64,
    pub name: String,
    pub canonical_name: Option<String>,
    pub score: f64,
}

struct IndexedEntry {
    id: i64,
    name: String,
    canonical_name: Option<String>,
    display_lower: String,
    forms: Vec<String>,
}

/// Precomputed normalized forms of a catalog
pub struct CatalogIndex {
    entries: Vec<IndexedEntry>,
    reducer: Box<dyn TokenReducer>,
}

impl CatalogIndex {
    /// Index with the French token reducer
    pub fn new<'a>(catalog: impl IntoIterator<Item = &'a Ingredient>) -> Self {
        Self::with_reducer(catalog, Box::new(FrenchReducer))
    }

    pub fn with_reducer<'a>(
        catalog: impl IntoIterator<Item = &'a Ingredient>,
        reducer: Box<dyn TokenReducer>,
    ) -> Self {
        let mut entries: Vec<IndexedEntry> = catalog
            .into_iter()
            .map(|ingredient| {
                let mut forms = vec![normalize_for_match_with(&ingredient.name, reducer.as_ref())];
                if let Some(canonical) = ingredient
                    .canonical_name
                    .as_deref()
                    .filter(|c| !c.trim().is_empty())
                {
                    let form = normalize_for_match_with(canonical, reducer.as_ref());
                    if !forms.contains(&form) {
                        forms.push(form);
                    }
                }
                IndexedEntry {
                    id: ingredient.id,
                    name: ingredient.name.clone(),
                    canonical_name: ingredient.canonical_name.clone(),
                    display_lower: preferred_name(ingredient).to_lowercase(),
                    forms,
                }
            })
            .collect();

        // HashMap iteration order must not leak into results
        entries.sort_by(|a, b| {
            a.display_lower
                .cmp(&b.display_lower)
                .then_with(|| a.id.cmp(&b.id))
        });

        debug!("Catalog index built with {} entries", entries.len());
        Self { entries, reducer }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ranked candidates for one query, at most `max(k, 5)` of them.
    pub fn search(&self, query: &str, k: usize) -> Vec<Candidate> {
        let limit = k.max(MIN_CANDIDATES);
        let q = normalize_for_match_with(query, self.reducer.as_ref());

        if q.is_empty() {
            // Alphabetical fallback; entries are already sorted that way
            return self
                .entries
                .iter()
                .take(limit)
                .map(|e| e.candidate(0.0))
                .collect();
        }

        let mut scored: Vec<(&IndexedEntry, f64)> = self
            .entries
            .iter()
            .map(|e| {
                let best = e
                    .forms
                    .iter()
                    .map(|form| combined_score(&q, form))
                    .fold(0.0, f64::max);
                (e, best)
            })
            .collect();

        // Scores in the same TIE_EPSILON bucket rank by name, then id
        scored.sort_by(|(ea, sa), (eb, sb)| {
            tie_bucket(*sb)
                .cmp(&tie_bucket(*sa))
                .then_with(|| ea.display_lower.cmp(&eb.display_lower))
                .then_with(|| ea.id.cmp(&eb.id))
        });

        let ranked: Vec<Candidate> = scored
            .into_iter()
            .take(limit)
            .map(|(e, s)| e.candidate(s))
            .collect();

        trace!(
            "query '{}' -> {}",
            query,
            ranked
                .iter()
                .map(|c| format!("{}({:.2})", c.name, c.score))
                .collect::<Vec<_>>()
                .join(", ")
        );
        ranked
    }

    /// One candidate list per query, keyed by query index
    pub fn build_candidates<S: AsRef<str>>(
        &self,
        queries: &[S],
        k: usize,
    ) -> BTreeMap<usize, Vec<Candidate>> {
        queries
            .iter()
            .enumerate()
            .map(|(idx, q)| (idx, self.search(q.as_ref(), k)))
            .collect()
    }
}

impl IndexedEntry {
    fn candidate(&self, score: f64) -> Candidate {
        Candidate {
            id: self.id,
            name: self.name.clone(),
            canonical_name: self.canonical_name.clone(),
            score,
        }
    }
}

/// Convenience wrapper building a throwaway index
pub fn build_candidates<'a, S: AsRef<str>>(
    queries: &[S],
    catalog: impl IntoIterator<Item = &'a Ingredient>,
    k: usize,
) -> BTreeMap<usize, Vec<Candidate>> {
    CatalogIndex::new(catalog).build_candidates(queries, k)
}

/// Scores closer than `TIE_EPSILON` share a bucket. NaN lands in bucket 0.
fn tie_bucket(score: f64) -> i64 {
    (score / TIE_EPSILON).round() as i64
}

/// Score of two already normalized strings
pub fn combined_score(q: &str, c: &str) -> f64 {
    let exact = q == c;
    let prefix = c.starts_with(q) || q.starts_with(c);
    let substring = c.contains(q) || q.contains(c);
    let fuzzy = levenshtein_ratio(q, c)
        .max(token_jaccard(q, c))
        .max(trigram_similarity(q, c));

    EXACT_WEIGHT * f64::from(u8::from(exact))
        + PREFIX_WEIGHT * f64::from(u8::from(prefix))
        + SUBSTRING_WEIGHT * f64::from(u8::from(substring))
        + fuzzy
}

/// `1 - distance / max_len`, in characters
pub fn levenshtein_ratio(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    (1.0 - strsim::levenshtein(a, b) as f64 / max_len as f64).max(0.0)
}

/// Jaccard index over whitespace tokens
pub fn token_jaccard(a: &str, b: &str) -> f64 {
    let ta: HashSet<&str> = a.split_whitespace().collect();
    let tb: HashSet<&str> = b.split_whitespace().collect();
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }
    let inter = ta.intersection(&tb).count() as f64;
    let union = ta.union(&tb).count() as f64;
    inter / union
}

fn trigrams(s: &str) -> HashSet<String> {
    let padded: Vec<char> = format!("  {}  ", s).chars().collect();
    if padded.len() < 3 {
        return HashSet::new();
    }
    padded.windows(3).map(|w| w.iter().collect()).collect()
}

/// Cosine-like overlap of padded character trigrams
pub fn trigram_similarity(a: &str, b: &str) -> f64 {
    let ta = trigrams(a);
    let tb = trigrams(b);
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }
    let inter = ta.intersection(&tb).count() as f64;
    let denom = (ta.len() as f64 * tb.len() as f64).sqrt();
    if denom == 0.0 {
        0.0
    } else {
        inter / denom
    }
}
