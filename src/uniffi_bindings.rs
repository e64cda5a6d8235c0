//! UniFFI bindings for meal-basket
//!
//! This module provides FFI-compatible types and functions for use with iOS and Android.
//! The text helpers are plain functions; the import wraps the async API with a
//! synchronous call that manages its own tokio runtime.

use std::fmt;

use crate::config::MatchingConfig;
use crate::error::PlannerError;
use crate::import::{ProviderKind, RecipeImporter};
use crate::matching::CatalogIndex;
use crate::model::{catalog_from, Ingredient, IngredientRow};

#[cfg(feature = "uniffi")]
uniffi::setup_scaffolding!();

/// FFI-compatible catalog entry
#[derive(Debug, Clone)]
#[cfg_attr(feature = "uniffi", derive(uniffi::Record))]
pub struct FfiIngredient {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub unit: String,
    /// Empty string if none
    pub canonical_name: String,
}

impl From<FfiIngredient> for Ingredient {
    fn from(ffi: FfiIngredient) -> Self {
        let entry = Ingredient::new(ffi.id, ffi.name, ffi.category, ffi.unit);
        if ffi.canonical_name.trim().is_empty() {
            entry
        } else {
            entry.with_canonical_name(ffi.canonical_name)
        }
    }
}

/// FFI-compatible ranked match
#[derive(Debug, Clone)]
#[cfg_attr(feature = "uniffi", derive(uniffi::Record))]
pub struct FfiCandidate {
    pub id: i64,
    pub name: String,
    pub score: f64,
}

/// FFI-compatible ingredient row
#[derive(Debug, Clone)]
#[cfg_attr(feature = "uniffi", derive(uniffi::Record))]
pub struct FfiIngredientRow {
    pub id: String,
    pub name: String,
    pub unit: String,
    pub quantity: Option<f64>,
    pub canonical_id: Option<i64>,
}

impl From<IngredientRow> for FfiIngredientRow {
    fn from(row: IngredientRow) -> Self {
        FfiIngredientRow {
            id: row.id.to_string(),
            name: row.name,
            unit: row.unit,
            quantity: row.quantity,
            canonical_id: row.canonical_id,
        }
    }
}

/// FFI-compatible import result
#[derive(Debug, Clone)]
#[cfg_attr(feature = "uniffi", derive(uniffi::Record))]
pub struct FfiImportedRecipe {
    /// Empty string if the model found no title
    pub title: String,
    pub servings: Option<u32>,
    pub rows: Vec<FfiIngredientRow>,
    pub steps: Vec<String>,
}

/// FFI-compatible LLM provider enum
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "uniffi", derive(uniffi::Enum))]
pub enum FfiLlmProvider {
    OpenAI,
    Anthropic,
    Ollama,
}

impl From<FfiLlmProvider> for ProviderKind {
    fn from(provider: FfiLlmProvider) -> Self {
        match provider {
            FfiLlmProvider::OpenAI => ProviderKind::OpenAI,
            FfiLlmProvider::Anthropic => ProviderKind::Anthropic,
            FfiLlmProvider::Ollama => ProviderKind::Ollama,
        }
    }
}

/// Configuration for importing recipes
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "uniffi", derive(uniffi::Record))]
pub struct FfiImportConfig {
    /// Optional LLM provider (uses default if not specified)
    pub provider: Option<FfiLlmProvider>,
    /// Optional API key (uses environment variable if not specified)
    pub api_key: Option<String>,
    /// Optional model name (uses provider default if not specified)
    pub model: Option<String>,
    /// Optional resolver confidence threshold
    pub confidence_threshold: Option<f64>,
    /// If true, rows are not resolved against the catalog
    pub extract_only: bool,
}

/// FFI-compatible error type
#[derive(Debug, Clone)]
#[cfg_attr(feature = "uniffi", derive(uniffi::Error))]
pub enum FfiPlannerError {
    /// The provider could not be reached or answered with an error
    ProviderError { message: String },
    /// The provider answered with something unusable
    ParseError { message: String },
    /// Invalid input provided
    InvalidInput { message: String },
    /// Configuration error
    ConfigError { message: String },
    /// Runtime error (tokio)
    RuntimeError { message: String },
}

impl fmt::Display for FfiPlannerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FfiPlannerError::ProviderError { message } => write!(f, "Provider error: {}", message),
            FfiPlannerError::ParseError { message } => write!(f, "Parse error: {}", message),
            FfiPlannerError::InvalidInput { message } => write!(f, "Invalid input: {}", message),
            FfiPlannerError::ConfigError { message } => write!(f, "Config error: {}", message),
            FfiPlannerError::RuntimeError { message } => write!(f, "Runtime error: {}", message),
        }
    }
}

impl std::error::Error for FfiPlannerError {}

impl From<PlannerError> for FfiPlannerError {
    fn from(err: PlannerError) -> Self {
        let message = err.to_string();
        match err {
            PlannerError::Http(_) | PlannerError::Provider { .. } => {
                FfiPlannerError::ProviderError { message }
            }
            PlannerError::InvalidResponse(_) | PlannerError::Json(_) => {
                FfiPlannerError::ParseError { message }
            }
            PlannerError::InvalidInput(_) | PlannerError::Io(_) => {
                FfiPlannerError::InvalidInput { message }
            }
            PlannerError::MissingApiKey(_)
            | PlannerError::UnknownProvider(_)
            | PlannerError::ProviderDisabled(_)
            | PlannerError::Config(_) => FfiPlannerError::ConfigError { message },
        }
    }
}

/// Create a new tokio runtime for FFI calls
fn create_runtime() -> Result<tokio::runtime::Runtime, FfiPlannerError> {
    tokio::runtime::Runtime::new().map_err(|e| FfiPlannerError::RuntimeError {
        message: format!("Failed to create async runtime: {}", e),
    })
}

/// Folded, lowercased, punctuation-free form of `text`
#[cfg_attr(feature = "uniffi", uniffi::export)]
pub fn normalize_text(text: String) -> String {
    crate::normalize::normalize(&text)
}

/// Short unit code for a free-text unit token
#[cfg_attr(feature = "uniffi", uniffi::export)]
pub fn normalize_unit_token(unit: String) -> String {
    crate::units::normalize_unit(&unit)
}

/// Shopping category of an ingredient name
#[cfg_attr(feature = "uniffi", uniffi::export)]
pub fn categorize_name(name: String) -> String {
    crate::categorize::categorize(&name)
}

/// "pour 4 personnes" and the like
#[cfg_attr(feature = "uniffi", uniffi::export)]
pub fn detect_servings_hint(text: String) -> Option<u32> {
    crate::prep::detect_servings(&text)
}

/// Top `limit` catalog entries for `query`, best first.
///
/// Ranking is the same as for the resolver; only the count differs, since
/// the resolver always receives at least five candidates.
#[cfg_attr(feature = "uniffi", uniffi::export)]
pub fn match_catalog(query: String, catalog: Vec<FfiIngredient>, limit: u32) -> Vec<FfiCandidate> {
    let entries: Vec<Ingredient> = catalog.into_iter().map(Ingredient::from).collect();
    CatalogIndex::new(&entries)
        .search(&query, limit as usize)
        .into_iter()
        .take(limit as usize)
        .map(|c| FfiCandidate {
            id: c.id,
            name: c.canonical_name.unwrap_or(c.name),
            score: c.score,
        })
        .collect()
}

/// Extract ingredients from OCR text and resolve them against `catalog`
///
/// # Arguments
/// * `text` - Raw OCR text of the recipe
/// * `catalog` - Reference ingredients; empty to skip resolution
/// * `config` - Optional configuration for the import
#[cfg_attr(feature = "uniffi", uniffi::export)]
pub fn import_recipe_text(
    text: String,
    catalog: Vec<FfiIngredient>,
    config: Option<FfiImportConfig>,
) -> Result<FfiImportedRecipe, FfiPlannerError> {
    let rt = create_runtime()?;
    rt.block_on(async { import_recipe_text_async(text, catalog, config).await })
}

async fn import_recipe_text_async(
    text: String,
    catalog: Vec<FfiIngredient>,
    config: Option<FfiImportConfig>,
) -> Result<FfiImportedRecipe, FfiPlannerError> {
    let config = config.unwrap_or_default();

    let mut builder = RecipeImporter::builder()
        .text(text)
        .catalog(catalog_from(catalog.into_iter().map(Ingredient::from)));

    if let Some(provider) = config.provider {
        builder = builder.provider(provider.into());
    }

    if let Some(api_key) = config.api_key {
        builder = builder.api_key(api_key);
    }

    if let Some(model) = config.model {
        builder = builder.model(model);
    }

    if let Some(threshold) = config.confidence_threshold {
        builder = builder.matching(MatchingConfig {
            confidence_threshold: threshold,
            ..Default::default()
        });
    }

    if config.extract_only {
        builder = builder.extract_only();
    }

    let recipe = builder.build().await?;
    Ok(FfiImportedRecipe {
        title: recipe.title.unwrap_or_default(),
        servings: recipe.servings,
        rows: recipe.rows.into_iter().map(Into::into).collect(),
        steps: recipe.steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: i64, name: &str, canonical: &str) -> FfiIngredient {
        FfiIngredient {
            id,
            name: name.to_string(),
            category: "Fresh".to_string(),
            unit: "g".to_string(),
            canonical_name: canonical.to_string(),
        }
    }

    #[test]
    fn test_text_helpers() {
        assert_eq!(normalize_unit_token("Grammes".to_string()), "g");
        assert_eq!(categorize_name("xylophone".to_string()), "Other");
        assert_eq!(detect_servings_hint("Pour 4 personnes".to_string()), Some(4));
        assert_eq!(normalize_text("  Crème   Fraîche ".to_string()), "creme fraiche");
    }

    #[test]
    fn test_match_catalog_uses_preferred_name() {
        let catalog = vec![entry(1, "Tomates", "Tomate"), entry(2, "Riz", "")];
        let found = match_catalog("tomate".to_string(), catalog, 1);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 1);
        assert_eq!(found[0].name, "Tomate");
    }

    #[test]
    fn test_error_mapping() {
        let err: FfiPlannerError = PlannerError::InvalidInput("empty".to_string()).into();
        assert!(matches!(err, FfiPlannerError::InvalidInput { .. }));
        let err: FfiPlannerError = PlannerError::MissingApiKey("OPENAI_API_KEY".to_string()).into();
        assert!(matches!(err, FfiPlannerError::ConfigError { .. }));
    }

    #[test]
    fn test_blank_import_text_is_rejected() {
        let result = import_recipe_text("  ".to_string(), Vec::new(), None);
        assert!(matches!(result, Err(FfiPlannerError::InvalidInput { .. })));
    }
}
