//! Resolution of free-text rows to catalog entries.
//!
//! Local fuzzy matching narrows the catalog to a handful of candidates per
//! row; the resolver model picks among them. Only confident answers that
//! point at a real catalog entry are adopted. Everything else is left as
//! typed, which is an ordinary outcome.

use log::{debug, info};
use std::collections::BTreeMap;

use crate::config::MatchingConfig;
use crate::error::PlannerError;
use crate::matching::CatalogIndex;
use crate::model::{preferred_name, Catalog, IngredientRow};
use crate::providers::{CanonCandidate, CanonMapped, CanonRequest, LlmItem, LlmProvider};

/// Candidates proposed per row unless configured otherwise
pub const DEFAULT_CANDIDATE_COUNT: usize = 6;

/// Resolve rows against the catalog with the default candidate count.
pub async fn canonicalize(
    rows: Vec<IngredientRow>,
    catalog: &Catalog,
    provider: &dyn LlmProvider,
    threshold: f64,
) -> Result<Vec<IngredientRow>, PlannerError> {
    let index = CatalogIndex::new(catalog.values());
    canonicalize_with_index(rows, catalog, &index, provider, threshold, DEFAULT_CANDIDATE_COUNT)
        .await
}

/// Same as [`canonicalize`], with candidate count and threshold taken from configuration.
pub async fn canonicalize_with(
    rows: Vec<IngredientRow>,
    catalog: &Catalog,
    provider: &dyn LlmProvider,
    config: &MatchingConfig,
) -> Result<Vec<IngredientRow>, PlannerError> {
    let index = CatalogIndex::new(catalog.values());
    canonicalize_with_index(
        rows,
        catalog,
        &index,
        provider,
        config.confidence_threshold,
        config.candidate_count,
    )
    .await
}

/// Full round-trip with a prebuilt index. Provider errors propagate untouched.
pub async fn canonicalize_with_index(
    rows: Vec<IngredientRow>,
    catalog: &Catalog,
    index: &CatalogIndex,
    provider: &dyn LlmProvider,
    threshold: f64,
    k: usize,
) -> Result<Vec<IngredientRow>, PlannerError> {
    if rows.is_empty() {
        return Ok(rows);
    }

    let request = build_request(&rows, index, k);
    info!(
        "Canonicalizing {} rows with {}",
        rows.len(),
        provider.provider_name()
    );
    let response = provider.canonicalize(&request).await?;
    Ok(apply_mapping(rows, &response.mapped, catalog, threshold))
}

/// Resolver request: one item and one candidate list per row, keyed by row index.
pub fn build_request(rows: &[IngredientRow], index: &CatalogIndex, k: usize) -> CanonRequest {
    let items: Vec<LlmItem> = rows
        .iter()
        .map(|row| LlmItem {
            n: row.name.clone(),
            q: row.quantity,
            u: Some(row.unit.clone()).filter(|u| !u.is_empty()),
        })
        .collect();

    let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
    let candidates: BTreeMap<String, Vec<CanonCandidate>> = index
        .build_candidates(&names, k)
        .into_iter()
        .map(|(idx, ranked)| {
            let list = ranked
                .into_iter()
                .map(|c| CanonCandidate {
                    id: c.id,
                    name: c.name,
                    canonical_name: c.canonical_name,
                })
                .collect();
            (idx.to_string(), list)
        })
        .collect();

    CanonRequest { items, candidates }
}

/// Adopt confident resolver answers.
///
/// A mapping is applied only when its index is in range, its confidence is at
/// least `threshold` and its id exists in the catalog. The adopted row takes
/// the catalog id and the entry's preferred name; quantity and unit are kept.
pub fn apply_mapping(
    mut rows: Vec<IngredientRow>,
    mapped: &[CanonMapped],
    catalog: &Catalog,
    threshold: f64,
) -> Vec<IngredientRow> {
    let mut adopted = 0;
    for m in mapped {
        let Some(row) = usize::try_from(m.idx).ok().and_then(|i| rows.get_mut(i)) else {
            debug!("Ignoring mapping with out-of-range index {}", m.idx);
            continue;
        };
        if m.confidence < threshold {
            continue;
        }
        let Some(entry) = m.canonical_id.and_then(|id| catalog.get(&id)) else {
            continue;
        };
        debug!(
            "'{}' -> '{}' (#{}, confidence {:.2})",
            row.name,
            preferred_name(entry),
            entry.id,
            m.confidence
        );
        row.canonical_id = Some(entry.id);
        row.name = preferred_name(entry).to_string();
        adopted += 1;
    }
    info!("Adopted {} of {} canonical matches", adopted, rows.len());
    rows
}
