use chrono::{DateTime, Utc};
use log::{debug, info};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use uuid::Uuid;

use super::{GroupKey, StoreChange, StoreObserver};
use crate::categorize::{categorize, vocabulary, DEFAULT_CATEGORY_ORDER};
use crate::config::ShoppingConfig;
use crate::model::{
    preferred_name, BasketEntry, Catalog, Ingredient, IngredientRow, ManualItem, Meal,
    PlannedRecipe,
};
use crate::normalize::{fold_diacritics, normalize};

/// Outcome of the two-phase check gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// First tap: every contributing id is now checked
    Checked,
    /// Second tap: recipe share consumed, manual items removed, ids unchecked
    Consumed,
}

/// State container behind the shopping list.
///
/// Every mutation performs one transition and then notifies the registered
/// observers. Reads never mutate, except [`ShoppingStore::build_shopping_sections`]
/// which keeps the consumed ledger within bounds.
pub struct ShoppingStore {
    pub(super) catalog: Catalog,
    pub(super) meals: HashMap<i64, Meal>,
    pub(super) basket: Vec<BasketEntry>,
    pub(super) planned: Vec<PlannedRecipe>,
    pub(super) manual_items: Vec<ManualItem>,
    pub(super) checked: BTreeSet<String>,
    pub(super) consumed: BTreeMap<GroupKey, f64>,
    pub(super) category_order: Vec<String>,
    observers: Vec<Arc<dyn StoreObserver>>,
}

impl Default for ShoppingStore {
    fn default() -> Self {
        Self::new(Catalog::new())
    }
}

impl ShoppingStore {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            meals: HashMap::new(),
            basket: Vec::new(),
            planned: Vec::new(),
            manual_items: Vec::new(),
            checked: BTreeSet::new(),
            consumed: BTreeMap::new(),
            category_order: DEFAULT_CATEGORY_ORDER.iter().map(|c| c.to_string()).collect(),
            observers: Vec::new(),
        }
    }

    pub fn with_config(catalog: Catalog, config: &ShoppingConfig) -> Self {
        let mut store = Self::new(catalog);
        store.category_order = config.category_order.clone();
        store
    }

    /// Register an observer; it is called after every later mutation.
    pub fn subscribe(&mut self, observer: Arc<dyn StoreObserver>) {
        self.observers.push(observer);
    }

    pub(super) fn notify(&self, change: StoreChange) {
        for observer in &self.observers {
            observer.on_change(change, self);
        }
    }

    // Accessors

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn meals(&self) -> &HashMap<i64, Meal> {
        &self.meals
    }

    pub fn basket(&self) -> &[BasketEntry] {
        &self.basket
    }

    pub fn planned_recipes(&self) -> &[PlannedRecipe] {
        &self.planned
    }

    pub fn manual_items(&self) -> &[ManualItem] {
        &self.manual_items
    }

    pub fn checked(&self) -> &BTreeSet<String> {
        &self.checked
    }

    pub fn consumed(&self) -> &BTreeMap<GroupKey, f64> {
        &self.consumed
    }

    pub fn category_order(&self) -> &[String] {
        &self.category_order
    }

    pub fn is_checked(&self, id: &str) -> bool {
        self.checked.contains(id)
    }

    // Reference data

    /// Replace the catalog after a wholesale reload
    pub fn set_catalog(&mut self, catalog: Catalog) {
        info!("Catalog loaded with {} ingredients", catalog.len());
        self.catalog = catalog;
        self.notify(StoreChange::Catalog);
    }

    pub fn set_meals(&mut self, meals: impl IntoIterator<Item = Meal>) {
        self.meals = meals.into_iter().map(|m| (m.id, m)).collect();
        self.notify(StoreChange::Meals);
    }

    // Basket

    /// Insert the meal, or update its person count if already present.
    pub fn add_to_basket(&mut self, meal_id: i64, persons: u32) {
        let persons = persons.max(1);
        match self.basket.iter_mut().find(|b| b.meal_id == meal_id) {
            Some(entry) => entry.persons = persons,
            None => self.basket.push(BasketEntry { meal_id, persons }),
        }
        self.notify(StoreChange::Basket);
    }

    pub fn update_basket_persons(&mut self, meal_id: i64, persons: u32) {
        if let Some(entry) = self.basket.iter_mut().find(|b| b.meal_id == meal_id) {
            entry.persons = persons.max(1);
            self.notify(StoreChange::Basket);
        }
    }

    pub fn remove_from_basket(&mut self, meal_id: i64) {
        self.basket.retain(|b| b.meal_id != meal_id);
        self.notify(StoreChange::Basket);
    }

    pub fn clear_basket(&mut self) {
        self.basket.clear();
        self.notify(StoreChange::Basket);
    }

    // Planned recipes

    /// Plan an imported recipe. Returns its id.
    pub fn add_planned_recipe(
        &mut self,
        title: &str,
        servings: u32,
        base_servings: Option<u32>,
        rows: Vec<IngredientRow>,
        date: DateTime<Utc>,
    ) -> Uuid {
        let recipe = PlannedRecipe::new(title, servings, base_servings, rows, date);
        let id = recipe.id;
        info!(
            "Planned '{}' ({} rows, {} of {} servings)",
            recipe.title,
            recipe.ingredients.len(),
            recipe.servings,
            recipe.base_servings
        );
        self.planned.push(recipe);
        self.notify(StoreChange::PlannedRecipes);
        id
    }

    /// Change target servings; stored base quantities are untouched.
    pub fn update_planned_recipe_servings(&mut self, id: Uuid, servings: u32) {
        if let Some(recipe) = self.planned.iter_mut().find(|r| r.id == id) {
            recipe.servings = servings.max(1);
            self.notify(StoreChange::PlannedRecipes);
        }
    }

    pub fn set_row_selected(&mut self, recipe_id: Uuid, row_id: Uuid, selected: bool) {
        let row = self
            .planned
            .iter_mut()
            .find(|r| r.id == recipe_id)
            .and_then(|r| r.ingredients.iter_mut().find(|row| row.id == row_id));
        if let Some(row) = row {
            row.is_selected = selected;
            self.notify(StoreChange::PlannedRecipes);
        }
    }

    pub fn remove_planned_recipe(&mut self, id: Uuid) {
        self.planned.retain(|r| r.id != id);
        self.notify(StoreChange::PlannedRecipes);
    }

    // Manual items

    /// Add a manual entry. Zero quantity and empty unit are accepted.
    ///
    /// A catalog-linked entry takes the catalog name and category, falls back
    /// to the catalog unit, and is merged into an existing entry with the same
    /// (ingredient id, unit) by summing quantities. Free-text entries are never
    /// merged; a blank category is inferred. Returns the id of the entry that
    /// holds the quantity, or `None` for a blank name.
    pub fn add_manual_item(
        &mut self,
        name: &str,
        category: &str,
        unit: &str,
        quantity: f64,
        ingredient_id: Option<i64>,
    ) -> Option<Uuid> {
        let name = name.trim();
        let unit = unit.trim();
        if name.is_empty() {
            return None;
        }
        let quantity = quantity.max(0.0);

        let linked = ingredient_id.and_then(|id| self.catalog.get(&id)).cloned();
        let id = match linked {
            Some(ingredient) => self.merge_linked_manual(&ingredient, unit, quantity),
            None => {
                let category = match category.trim() {
                    "" => self.infer_category(name),
                    given => given.to_string(),
                };
                let item = ManualItem {
                    id: Uuid::new_v4(),
                    ingredient_id: None,
                    name: name.to_string(),
                    category,
                    unit: unit.to_string(),
                    quantity,
                };
                let id = item.id;
                self.manual_items.push(item);
                id
            }
        };

        self.notify(StoreChange::ManualItems);
        Some(id)
    }

    fn merge_linked_manual(&mut self, ingredient: &Ingredient, unit: &str, quantity: f64) -> Uuid {
        let display = preferred_name(ingredient).to_string();
        let unit = if unit.is_empty() {
            ingredient.unit.clone()
        } else {
            unit.to_string()
        };

        if let Some(existing) = self
            .manual_items
            .iter_mut()
            .find(|m| m.ingredient_id == Some(ingredient.id) && m.unit == unit)
        {
            existing.quantity += quantity;
            existing.name = display;
            existing.category = ingredient.category.clone();
            debug!("Merged manual quantity into '{}'", existing.name);
            return existing.id;
        }

        let item = ManualItem {
            id: Uuid::new_v4(),
            ingredient_id: Some(ingredient.id),
            name: display,
            category: ingredient.category.clone(),
            unit,
            quantity,
        };
        let id = item.id;
        self.manual_items.push(item);
        id
    }

    /// Quick add from a single text field: `"lait"` or `"lait @Fresh"`.
    /// Unit stays empty and quantity zero.
    pub fn add_manual_quick(&mut self, raw: &str) -> Option<Uuid> {
        let input = raw.trim();
        if input.is_empty() {
            return None;
        }
        let (name, forced) = parse_category_override(input);
        let category = match forced {
            Some(category) => category.to_string(),
            None => self.infer_category(name),
        };
        self.add_manual_item(name, &category, "", 0.0, None)
    }

    pub fn remove_manual_item(&mut self, id: Uuid) {
        self.manual_items.retain(|m| m.id != id);
        self.notify(StoreChange::ManualItems);
    }

    /// Set the quantity of a manual entry, floored at zero
    pub fn update_manual_item(&mut self, id: Uuid, quantity: f64) {
        if let Some(item) = self.manual_items.iter_mut().find(|m| m.id == id) {
            item.quantity = quantity.max(0.0);
            self.notify(StoreChange::ManualItems);
        }
    }

    /// Completions while typing: prefix matches first, then substring
    /// matches, each alphabetical.
    pub fn suggest_manual_names(&self, query: &str, limit: usize) -> Vec<String> {
        let q = normalize(query);
        if q.is_empty() || limit == 0 {
            return Vec::new();
        }

        let mut names: BTreeSet<String> =
            self.catalog.values().map(|i| normalize(&i.name)).collect();
        names.extend(vocabulary().map(str::to_string));

        let (prefix, rest): (Vec<String>, Vec<String>) = names
            .into_iter()
            .filter(|name| name.contains(&q))
            .partition(|name| name.starts_with(&q));

        prefix.into_iter().chain(rest).take(limit).collect()
    }

    // Checks

    pub fn toggle_checked(&mut self, id: &str) {
        if !self.checked.remove(id) {
            self.checked.insert(id.to_string());
        }
        self.notify(StoreChange::Checked);
    }

    /// Uncheck the whole group if any of its ids is checked, otherwise check them all.
    pub fn toggle_checked_for_group(&mut self, name: &str, unit: &str, category: &str) {
        let ids = self.ids_for(&GroupKey::new(name, unit, category));
        if ids.is_empty() {
            return;
        }
        if ids.iter().any(|id| self.checked.contains(id)) {
            for id in &ids {
                self.checked.remove(id);
            }
        } else {
            self.checked.extend(ids);
        }
        self.notify(StoreChange::Checked);
    }

    /// The two-phase gesture on a shopping row.
    ///
    /// While some contributing id is unchecked, checks them all. Once all are
    /// checked, records the recipe share as consumed (never more than the
    /// recipe quantity), removes the manual entries of the row and unchecks
    /// everything. Returns `None` when no group matches or the group has no
    /// row on the list, such as a recipe share already bought.
    pub fn toggle_or_remove(
        &mut self,
        name: &str,
        unit: &str,
        category: &str,
    ) -> Option<ToggleOutcome> {
        let key = GroupKey::new(name, unit, category);
        let totals = self.aggregate_totals();
        let Some(group) = totals.get(&key) else {
            debug!("No shopping group for {}", key);
            return None;
        };
        if !self.is_visible(group) {
            debug!("Group {} is not on the list", key);
            return None;
        }

        let all_checked = group
            .contributing_ids
            .iter()
            .all(|id| self.checked.contains(id));

        if !all_checked {
            self.checked.extend(group.contributing_ids.iter().cloned());
            self.notify(StoreChange::Checked);
            return Some(ToggleOutcome::Checked);
        }

        if group.has_recipe {
            let previous = self.consumed.get(&key).copied().unwrap_or(0.0);
            let consumed = (previous + group.recipe_qty).min(group.recipe_qty);
            self.consumed.insert(key.clone(), consumed);
            debug!("Consumed {} of {}", consumed, key);
        }

        let before = self.manual_items.len();
        let kept: Vec<ManualItem> = self
            .manual_items
            .iter()
            .filter(|m| self.resolve_manual(m).key != key)
            .cloned()
            .collect();
        self.manual_items = kept;
        let removed_manual = before != self.manual_items.len();

        for id in &group.contributing_ids {
            self.checked.remove(id);
        }

        if group.has_recipe {
            self.notify(StoreChange::Consumed);
        }
        if removed_manual {
            self.notify(StoreChange::ManualItems);
        }
        self.notify(StoreChange::Checked);
        Some(ToggleOutcome::Consumed)
    }

    /// Forget every recorded consumption
    pub fn reset_consumed(&mut self) {
        self.consumed.clear();
        self.notify(StoreChange::Consumed);
    }

    fn ids_for(&self, key: &GroupKey) -> Vec<String> {
        self.aggregate_totals()
            .remove(key)
            .map(|g| g.contributing_ids)
            .unwrap_or_default()
    }

    /// Category for free text: a catalog entry with the same folded name,
    /// then one whose name contains it, then the keyword categorizer.
    pub fn infer_category(&self, name: &str) -> String {
        match self.match_catalog_name(name) {
            Some(ingredient) => ingredient.category.clone(),
            None => categorize(name),
        }
    }

    fn match_catalog_name(&self, name: &str) -> Option<&Ingredient> {
        let target = fold_diacritics(name.trim()).to_lowercase();
        if target.is_empty() {
            return None;
        }
        let mut entries: Vec<&Ingredient> = self.catalog.values().collect();
        entries.sort_by_key(|i| i.id);

        let folded = |i: &Ingredient| fold_diacritics(&i.name).to_lowercase();
        entries
            .iter()
            .find(|i| folded(i) == target)
            .or_else(|| entries.iter().find(|i| folded(i).contains(&target)))
            .copied()
    }
}

/// Split `"name @Category"`. Without a name before the `@` the whole input is the name.
fn parse_category_override(input: &str) -> (&str, Option<&str>) {
    match input.split_once('@') {
        Some((name, category)) if !name.trim().is_empty() => {
            let category = category.trim();
            (name.trim(), Some(category).filter(|c| !c.is_empty()))
        }
        _ => (input, None),
    }
}
