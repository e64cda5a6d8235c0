//! Ingredient reconciliation and shopping-list aggregation for meal planning.
//!
//! Free-text ingredient mentions coming out of OCR are extracted by a
//! language model, matched against a reference catalog, and folded together
//! with standing recipes and manual entries into a checkable shopping list.

pub mod canonicalize;
pub mod categorize;
pub mod config;
pub mod error;
pub mod import;
pub mod matching;
pub mod model;
pub mod normalize;
pub mod parser;
pub mod prep;
pub mod providers;
pub mod shopping;
pub mod uniffi_bindings;
pub mod units;

pub use canonicalize::{apply_mapping, canonicalize, canonicalize_with};
pub use categorize::categorize;
pub use config::{load_config, MatchingConfig, PlannerConfig, ProviderConfig, ShoppingConfig};
pub use error::PlannerError;
pub use import::{ImportSession, ProviderKind, RecipeImporter, RecipeImporterBuilder, RequestTicket};
pub use matching::{build_candidates, combined_score, Candidate, CatalogIndex};
pub use model::{
    catalog_from, preferred_name, BasketEntry, Catalog, Ingredient, IngredientRow, ManualItem,
    Meal, MealIngredient, PlannedRecipe,
};
pub use normalize::{normalize, normalize_for_match};
pub use parser::{parse_with_llm, ParsedRecipe};
pub use prep::detect_servings;
pub use providers::{LlmProvider, ProviderFactory};
pub use shopping::{
    GroupKey, KeyValueStore, MemoryStore, PersistedState, ShoppingItem, ShoppingSection,
    ShoppingStore, ToggleOutcome,
};
pub use units::normalize_unit;
