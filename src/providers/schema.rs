//! Wire contracts exchanged with the language model.
//!
//! Field names are deliberately short: they are part of the prompt budget.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Extracted ingredient `{n, q, u}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmItem {
    /// Name
    pub n: String,
    /// Quantity
    #[serde(default)]
    pub q: Option<f64>,
    /// Unit token, free text
    #[serde(default)]
    pub u: Option<String>,
}

/// Extraction input: recipe text plus an optional servings hint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRequest {
    pub t: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u32>,
}

/// Extraction output: title, servings, items and optional preparation steps
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResponse {
    #[serde(default)]
    pub r: Option<String>,
    #[serde(default)]
    pub s: Option<u32>,
    #[serde(default)]
    pub i: Vec<LlmItem>,
    #[serde(default)]
    pub p: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonCandidate {
    pub id: i64,
    pub name: String,
    #[serde(
        rename = "canonicalName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub canonical_name: Option<String>,
}

/// Canonicalization input. Candidate lists are keyed by the item index as a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonRequest {
    pub items: Vec<LlmItem>,
    pub candidates: BTreeMap<String, Vec<CanonCandidate>>,
}

/// One resolver decision. `idx` is signed because models occasionally answer -1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonMapped {
    pub idx: i64,
    #[serde(default)]
    pub canonical_id: Option<i64>,
    #[serde(default)]
    pub canonical_name: Option<String>,
    #[serde(default)]
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonResponse {
    #[serde(default)]
    pub mapped: Vec<CanonMapped>,
}
