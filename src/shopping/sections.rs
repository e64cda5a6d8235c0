use log::debug;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::{GroupKey, ShoppingGroup, ShoppingStore, StoreChange};
use crate::categorize::category_rank;

/// Row of the rendered shopping list
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingItem {
    /// First contributing check id
    pub id: String,
    pub ingredient_id: Option<i64>,
    pub name: String,
    pub category: String,
    pub unit: String,
    /// Recipe share still to buy plus manual quantity. Zero hides the amount.
    pub total_quantity: f64,
    pub recipe_quantity: f64,
    pub manual_quantity: f64,
    pub checked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShoppingSection {
    pub category: String,
    pub items: Vec<ShoppingItem>,
}

impl ShoppingStore {
    /// Render the shopping list.
    ///
    /// Recipe quantities are reduced by what the ledger records as consumed.
    /// A group disappears only when nothing is left to buy, no manual item
    /// is attached and its recipe share is fully consumed. The ledger is kept
    /// within bounds on the way: entries are clamped to the current recipe
    /// quantity, and dropped once no recipe contributes to their group.
    pub fn build_shopping_sections(&mut self) -> Vec<ShoppingSection> {
        let totals = self.aggregate_totals();
        if self.clamp_ledger(&totals) {
            self.notify(StoreChange::Consumed);
        }

        let items: Vec<ShoppingItem> = totals
            .values()
            .filter_map(|group| self.render(group))
            .collect();

        let mut by_category: BTreeMap<String, Vec<ShoppingItem>> = BTreeMap::new();
        for item in items {
            by_category
                .entry(item.category.clone())
                .or_default()
                .push(item);
        }

        let mut sections: Vec<ShoppingSection> = by_category
            .into_iter()
            .map(|(category, mut items)| {
                items.sort_by(|a, b| {
                    a.name
                        .to_lowercase()
                        .cmp(&b.name.to_lowercase())
                        .then_with(|| a.unit.cmp(&b.unit))
                });
                ShoppingSection { category, items }
            })
            .collect();

        sections.sort_by(|a, b| self.compare_categories(&a.category, &b.category));
        sections
    }

    fn compare_categories(&self, a: &str, b: &str) -> Ordering {
        category_rank(a, &self.category_order)
            .cmp(&category_rank(b, &self.category_order))
            .then_with(|| a.cmp(b))
    }

    /// Returns true when the ledger changed
    fn clamp_ledger(&mut self, totals: &BTreeMap<GroupKey, ShoppingGroup>) -> bool {
        let mut changed = false;
        self.consumed.retain(|key, consumed| match totals.get(key) {
            Some(group) if group.has_recipe => {
                if *consumed > group.recipe_qty {
                    debug!("Clamping consumed {} of {} to {}", consumed, key, group.recipe_qty);
                    *consumed = group.recipe_qty;
                    changed = true;
                }
                true
            }
            _ => {
                debug!("Dropping consumed entry for {}", key);
                changed = true;
                false
            }
        });
        changed
    }

    /// Recipe share not yet covered by the ledger
    fn recipe_left(&self, group: &ShoppingGroup) -> f64 {
        let consumed = self.consumed.get(&group.key).copied().unwrap_or(0.0);
        (group.recipe_qty - consumed).max(0.0)
    }

    /// Whether `group` gets a row in [`build_shopping_sections`](Self::build_shopping_sections)
    pub(super) fn is_visible(&self, group: &ShoppingGroup) -> bool {
        let recipe_left = self.recipe_left(group);
        let displayed = recipe_left + group.manual_qty;
        // A recipe share stops holding the row once the ledger covers it
        let active_recipe =
            group.has_recipe && (recipe_left > 0.0 || !self.consumed.contains_key(&group.key));

        displayed > 0.0 || recipe_left > 0.0 || group.has_manual || active_recipe
    }

    fn render(&self, group: &ShoppingGroup) -> Option<ShoppingItem> {
        if !self.is_visible(group) {
            return None;
        }
        let recipe_left = self.recipe_left(group);
        let displayed = recipe_left + group.manual_qty;

        Some(ShoppingItem {
            id: group
                .contributing_ids
                .first()
                .cloned()
                .unwrap_or_else(|| group.key.to_string()),
            ingredient_id: group.any_catalog_id,
            name: group.display_name.clone(),
            category: group.category.clone(),
            unit: group.unit.clone(),
            total_quantity: displayed,
            recipe_quantity: recipe_left,
            manual_quantity: group.manual_qty,
            checked: group
                .contributing_ids
                .iter()
                .any(|id| self.checked.contains(id)),
        })
    }
}
