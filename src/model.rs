use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Catalog ingredient, as loaded from the remote ingredient table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    pub id: i64,
    #[serde(alias = "nom")]
    pub name: String,
    /// Store aisle label
    #[serde(alias = "categorie_rayon")]
    pub category: String,
    /// Default unit
    #[serde(alias = "unite")]
    pub unit: String,
    #[serde(default, alias = "photo_ingredient", skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(default, alias = "nom_canon", alias = "canonical_name", skip_serializing_if = "Option::is_none")]
    pub canonical_name: Option<String>,
    #[serde(default, alias = "pivot_unit", skip_serializing_if = "Option::is_none")]
    pub pivot_unit: Option<String>,
}

impl Ingredient {
    pub fn new(
        id: i64,
        name: impl Into<String>,
        category: impl Into<String>,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            category: category.into(),
            unit: unit.into(),
            photo: None,
            canonical_name: None,
            pivot_unit: None,
        }
    }

    pub fn with_canonical_name(mut self, canonical: impl Into<String>) -> Self {
        self.canonical_name = Some(canonical.into());
        self
    }

    /// Name used for display and grouping
    pub fn preferred_name(&self) -> &str {
        preferred_name(self)
    }
}

/// Canonical name when present and non-blank, raw name otherwise.
pub fn preferred_name(entry: &Ingredient) -> &str {
    match entry.canonical_name.as_deref().map(str::trim) {
        Some(canonical) if !canonical.is_empty() => canonical,
        _ => &entry.name,
    }
}

/// Id-keyed in-memory catalog
pub type Catalog = HashMap<i64, Ingredient>;

/// Build the id-keyed catalog from a wholesale load
pub fn catalog_from(entries: impl IntoIterator<Item = Ingredient>) -> Catalog {
    entries.into_iter().map(|i| (i.id, i)).collect()
}

/// Ingredient line of a standing catalog recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealIngredient {
    pub ingredient_id: i64,
    pub unit: String,
    pub qty_per_person: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pivot_qty_per_person: Option<f64>,
}

/// Standing catalog recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meal {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<MealIngredient>,
}

/// Ingredient line detected by extraction or typed by the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientRow {
    pub id: Uuid,
    #[serde(default = "selected_by_default")]
    pub is_selected: bool,
    pub name: String,
    /// May be empty
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub quantity: Option<f64>,
    /// Quantity at the recipe's base servings
    #[serde(default)]
    pub base_quantity: Option<f64>,
    /// Catalog id set by canonicalization
    #[serde(default)]
    pub canonical_id: Option<i64>,
}

fn selected_by_default() -> bool {
    true
}

impl IngredientRow {
    pub fn new(name: impl Into<String>, unit: impl Into<String>, quantity: Option<f64>) -> Self {
        Self {
            id: Uuid::new_v4(),
            is_selected: true,
            name: name.into(),
            unit: unit.into(),
            quantity,
            base_quantity: quantity,
            canonical_id: None,
        }
    }
}

/// Imported recipe planned for a number of servings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedRecipe {
    pub id: Uuid,
    pub title: String,
    /// Target servings
    pub servings: u32,
    pub base_servings: u32,
    pub date: DateTime<Utc>,
    /// Quantities relative to `base_servings`
    pub ingredients: Vec<IngredientRow>,
}

impl PlannedRecipe {
    pub const DEFAULT_TITLE: &'static str = "Untitled recipe";

    /// Normalizes title, servings and base quantities the way the planner stores them.
    pub fn new(
        title: &str,
        servings: u32,
        base_servings: Option<u32>,
        ingredients: Vec<IngredientRow>,
        date: DateTime<Utc>,
    ) -> Self {
        let trimmed = title.trim();
        let title = if trimmed.is_empty() {
            Self::DEFAULT_TITLE.to_string()
        } else {
            trimmed.to_string()
        };
        let ingredients = ingredients
            .into_iter()
            .map(|mut row| {
                if row.base_quantity.is_none() {
                    row.base_quantity = row.quantity;
                }
                row
            })
            .collect();

        Self {
            id: Uuid::new_v4(),
            title,
            servings: servings.max(1),
            base_servings: base_servings.unwrap_or(servings).max(1),
            date,
            ingredients,
        }
    }

    /// Rows with `quantity = base * servings / base_servings`.
    ///
    /// The stored rows are never touched.
    pub fn scaled_rows(&self) -> Vec<IngredientRow> {
        if self.base_servings == 0 {
            return self.ingredients.clone();
        }
        let factor = f64::from(self.servings) / f64::from(self.base_servings);
        self.ingredients
            .iter()
            .map(|row| {
                let mut copy = row.clone();
                if let Some(base) = row.base_quantity.or(row.quantity) {
                    copy.quantity = Some(base * factor);
                }
                copy
            })
            .collect()
    }
}

/// Standing recipe in the basket, unique per meal id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasketEntry {
    pub meal_id: i64,
    pub persons: u32,
}

/// Free-standing shopping entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualItem {
    pub id: Uuid,
    #[serde(default)]
    pub ingredient_id: Option<i64>,
    pub name: String,
    pub category: String,
    /// Empty when not given
    #[serde(default)]
    pub unit: String,
    /// Zero means "added, amount unknown"
    #[serde(default)]
    pub quantity: f64,
}
