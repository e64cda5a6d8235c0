use log::trace;
use std::collections::BTreeMap;

use super::{GroupKey, ShoppingStore};
use crate::model::{preferred_name, ManualItem};

/// One aggregated row of the shopping list, recomputed on every call.
#[derive(Debug, Clone, PartialEq)]
pub struct ShoppingGroup {
    pub key: GroupKey,
    pub display_name: String,
    pub category: String,
    pub unit: String,
    pub total_qty: f64,
    pub recipe_qty: f64,
    pub manual_qty: f64,
    /// Check ids of every source folded in, first-seen order, no duplicates
    pub contributing_ids: Vec<String>,
    pub any_catalog_id: Option<i64>,
    pub has_recipe: bool,
    pub has_manual: bool,
}

impl ShoppingGroup {
    fn new(key: GroupKey) -> Self {
        Self {
            key,
            display_name: String::new(),
            category: String::new(),
            unit: String::new(),
            total_qty: 0.0,
            recipe_qty: 0.0,
            manual_qty: 0.0,
            contributing_ids: Vec::new(),
            any_catalog_id: None,
            has_recipe: false,
            has_manual: false,
        }
    }

    fn push_id(&mut self, id: String) {
        if !self.contributing_ids.contains(&id) {
            self.contributing_ids.push(id);
        }
    }
}

/// Display properties of a manual item after catalog inheritance
pub(super) struct ResolvedManual {
    pub key: GroupKey,
    pub name: String,
    pub category: String,
    pub unit: String,
    pub check_id: String,
    pub ingredient_id: Option<i64>,
}

/// Where a contribution comes from
enum Source {
    Recipe,
    Manual,
}

struct Contribution<'a> {
    name: &'a str,
    category: &'a str,
    unit: &'a str,
    qty: f64,
    check_id: String,
    catalog_id: Option<i64>,
    source: Source,
}

fn fold_in(totals: &mut BTreeMap<GroupKey, ShoppingGroup>, c: Contribution<'_>) {
    let key = GroupKey::new(c.name, c.unit, c.category);
    let group = totals
        .entry(key.clone())
        .or_insert_with(|| ShoppingGroup::new(key));

    // First name wins, except that a catalog name replaces a free-typed one
    let catalog_name = c.catalog_id.is_some() && group.any_catalog_id.is_none();
    if group.display_name.is_empty() || catalog_name {
        group.display_name = c.name.to_string();
        group.category = c.category.to_string();
        group.unit = c.unit.to_string();
    }
    group.total_qty += c.qty;
    match c.source {
        Source::Recipe => {
            group.recipe_qty += c.qty;
            group.has_recipe = true;
        }
        Source::Manual => {
            group.manual_qty += c.qty;
            group.has_manual = true;
        }
    }
    group.push_id(c.check_id);
    if group.any_catalog_id.is_none() {
        group.any_catalog_id = c.catalog_id;
    }
}

impl ShoppingStore {
    /// Fold basket meals, selected planned rows and manual items into groups.
    ///
    /// References to unknown meals or catalog entries are skipped, as are
    /// unresolved rows without a name. Manual items count even at zero
    /// quantity.
    pub fn aggregate_totals(&self) -> BTreeMap<GroupKey, ShoppingGroup> {
        let mut totals = BTreeMap::new();

        for entry in &self.basket {
            let Some(meal) = self.meals.get(&entry.meal_id) else {
                trace!("Basket references unknown meal {}", entry.meal_id);
                continue;
            };
            for line in &meal.ingredients {
                let Some(ingredient) = self.catalog.get(&line.ingredient_id) else {
                    trace!("Meal {} references unknown ingredient {}", meal.id, line.ingredient_id);
                    continue;
                };
                fold_in(
                    &mut totals,
                    Contribution {
                        name: preferred_name(ingredient),
                        category: &ingredient.category,
                        unit: &line.unit,
                        qty: line.qty_per_person * f64::from(entry.persons),
                        check_id: format!("{}_{}", ingredient.id, line.unit),
                        catalog_id: Some(ingredient.id),
                        source: Source::Recipe,
                    },
                );
            }
        }

        for recipe in &self.planned {
            for row in recipe.scaled_rows().iter().filter(|r| r.is_selected) {
                let qty = row.quantity.or(row.base_quantity).unwrap_or(0.0);
                let unit = row.unit.trim();

                match row.canonical_id.and_then(|id| self.catalog.get(&id)) {
                    Some(ingredient) => {
                        let unit = if unit.is_empty() { ingredient.unit.as_str() } else { unit };
                        fold_in(
                            &mut totals,
                            Contribution {
                                name: preferred_name(ingredient),
                                category: &ingredient.category,
                                unit,
                                qty,
                                check_id: format!("{}_{}", ingredient.id, unit),
                                catalog_id: Some(ingredient.id),
                                source: Source::Recipe,
                            },
                        );
                    }
                    None => {
                        let name = row.name.trim();
                        if name.is_empty() {
                            continue;
                        }
                        let category = self.infer_category(name);
                        fold_in(
                            &mut totals,
                            Contribution {
                                name,
                                category: &category,
                                unit,
                                qty,
                                check_id: format!("planned:{}:{}", recipe.id, row.id),
                                catalog_id: None,
                                source: Source::Recipe,
                            },
                        );
                    }
                }
            }
        }

        for item in &self.manual_items {
            let resolved = self.resolve_manual(item);
            fold_in(
                &mut totals,
                Contribution {
                    name: &resolved.name,
                    category: &resolved.category,
                    unit: &resolved.unit,
                    qty: item.quantity,
                    check_id: resolved.check_id.clone(),
                    catalog_id: resolved.ingredient_id,
                    source: Source::Manual,
                },
            );
        }

        totals
    }

    /// Inherit blank name and unit from the linked catalog entry; the
    /// category always comes from the catalog when linked.
    pub(super) fn resolve_manual(&self, item: &ManualItem) -> ResolvedManual {
        let linked = item.ingredient_id.and_then(|id| self.catalog.get(&id));
        let (name, category, unit, check_id, ingredient_id) = match linked {
            Some(ingredient) => {
                let name = if item.name.is_empty() {
                    preferred_name(ingredient).to_string()
                } else {
                    item.name.clone()
                };
                let unit = if item.unit.is_empty() {
                    ingredient.unit.clone()
                } else {
                    item.unit.clone()
                };
                let check_id = format!("{}_{}", ingredient.id, unit);
                (name, ingredient.category.clone(), unit, check_id, Some(ingredient.id))
            }
            None => (
                item.name.clone(),
                item.category.clone(),
                item.unit.clone(),
                format!("manual:{}", item.id),
                None,
            ),
        };

        ResolvedManual {
            key: GroupKey::new(&name, &unit, &category),
            name,
            category,
            unit,
            check_id,
            ingredient_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{catalog_from, Ingredient, IngredientRow, Meal, MealIngredient};
    use chrono::Utc;

    fn store() -> ShoppingStore {
        let mut store = ShoppingStore::new(catalog_from(vec![
            Ingredient::new(1, "Pates", "Pantry", "g").with_canonical_name("Pâtes"),
            Ingredient::new(2, "Tomate", "Fresh", "g"),
            Ingredient::new(3, "Lait", "Fresh", "ml"),
        ]));
        store.set_meals(vec![Meal {
            id: 10,
            name: "Pasta".to_string(),
            kind: "plat".to_string(),
            photo: None,
            ingredients: vec![
                MealIngredient {
                    ingredient_id: 1,
                    unit: "g".to_string(),
                    qty_per_person: 100.0,
                    pivot_qty_per_person: None,
                },
                MealIngredient {
                    ingredient_id: 2,
                    unit: "g".to_string(),
                    qty_per_person: 50.0,
                    pivot_qty_per_person: None,
                },
                MealIngredient {
                    ingredient_id: 404,
                    unit: "g".to_string(),
                    qty_per_person: 1.0,
                    pivot_qty_per_person: None,
                },
            ],
        }]);
        store
    }

    #[test]
    fn test_basket_contribution_is_additive() {
        let mut store = store();
        store.add_to_basket(10, 2);
        let key = GroupKey::new("Pâtes", "g", "Pantry");
        let totals = store.aggregate_totals();
        assert_eq!(totals[&key].recipe_qty, 200.0);
        assert_eq!(totals[&key].display_name, "Pâtes");
        assert_eq!(totals[&key].contributing_ids, vec!["1_g".to_string()]);
        assert_eq!(totals.len(), 2);

        store.add_to_basket(10, 4);
        let totals = store.aggregate_totals();
        assert_eq!(totals[&key].recipe_qty, 400.0);
        assert_eq!(totals[&key].total_qty, 400.0);
    }

    #[test]
    fn test_unknown_meal_is_skipped() {
        let mut store = store();
        store.add_to_basket(999, 3);
        assert!(store.aggregate_totals().is_empty());
    }

    #[test]
    fn test_planned_rows_fold_into_catalog_groups() {
        let mut store = store();
        store.add_to_basket(10, 1);

        let mut linked = IngredientRow::new("pates", "", Some(100.0));
        linked.canonical_id = Some(1);
        let free = IngredientRow::new("basilic frais", "", None);
        let free_id = free.id;
        let mut skipped = IngredientRow::new("tomate", "g", Some(80.0));
        skipped.is_selected = false;
        let blank = IngredientRow::new("  ", "", Some(1.0));

        let recipe_id = store.add_planned_recipe(
            "Pasta",
            4,
            Some(2),
            vec![linked, free, skipped, blank],
            Utc::now(),
        );

        let totals = store.aggregate_totals();
        let pates = &totals[&GroupKey::new("Pâtes", "g", "Pantry")];
        // 100 from the basket, 100 * 4/2 from the planned recipe
        assert_eq!(pates.recipe_qty, 300.0);
        assert_eq!(pates.contributing_ids, vec!["1_g".to_string()]);

        let tomate = &totals[&GroupKey::new("Tomate", "g", "Fresh")];
        assert_eq!(tomate.recipe_qty, 50.0);

        let basilic = &totals[&GroupKey::new("basilic frais", "", "Other")];
        assert_eq!(basilic.recipe_qty, 0.0);
        assert!(basilic.has_recipe);
        assert_eq!(
            basilic.contributing_ids,
            vec![format!("planned:{}:{}", recipe_id, free_id)]
        );
        assert_eq!(totals.len(), 3);
    }

    #[test]
    fn test_manual_items_are_manual_contributions() {
        let mut store = store();
        store.add_to_basket(10, 1);
        store.add_manual_item("pates", "", "g", 250.0, Some(1));
        store.add_manual_item("piles", "", "", 0.0, None);

        let totals = store.aggregate_totals();
        let pates = &totals[&GroupKey::new("Pâtes", "g", "Pantry")];
        assert_eq!(pates.recipe_qty, 100.0);
        assert_eq!(pates.manual_qty, 250.0);
        assert_eq!(pates.total_qty, 350.0);
        assert!(pates.has_manual && pates.has_recipe);
        // Linked manual items share the catalog check id
        assert_eq!(pates.contributing_ids, vec!["1_g".to_string()]);
        assert_eq!(pates.display_name, "Pâtes");

        let piles = &totals[&GroupKey::new("piles", "", "Other")];
        assert_eq!(piles.total_qty, 0.0);
        assert!(piles.contributing_ids[0].starts_with("manual:"));
        assert_eq!(piles.any_catalog_id, None);
    }

    #[test]
    fn test_catalog_name_wins_over_typed_names() {
        // Catalog contribution first, free-typed manual item second
        let mut basket_first = store();
        basket_first.add_to_basket(10, 1);
        basket_first.add_manual_item("TOMATE", "Fresh", "g", 30.0, None);
        let totals = basket_first.aggregate_totals();
        let tomate = &totals[&GroupKey::new("Tomate", "g", "Fresh")];
        assert_eq!(tomate.display_name, "Tomate");
        assert_eq!(tomate.total_qty, 80.0);
        assert_eq!(tomate.any_catalog_id, Some(2));

        // Free-typed planned row first, linked manual item second
        let mut planned_first = store();
        planned_first.add_planned_recipe(
            "Salade",
            1,
            None,
            vec![IngredientRow::new("TOMATE", "g", Some(60.0))],
            Utc::now(),
        );
        planned_first.add_manual_item("tomates", "", "", 40.0, Some(2));
        let totals = planned_first.aggregate_totals();
        let tomate = &totals[&GroupKey::new("Tomate", "g", "Fresh")];
        assert_eq!(tomate.display_name, "Tomate");
        assert_eq!(tomate.total_qty, 100.0);

        // Two typed spellings and no catalog entry: the first one stays
        let mut typed = store();
        typed.add_manual_item("Piles AA", "Maison", "", 1.0, None);
        typed.add_manual_item("piles aa", "Maison", "", 2.0, None);
        let totals = typed.aggregate_totals();
        let piles = &totals[&GroupKey::new("piles aa", "", "Maison")];
        assert_eq!(piles.display_name, "Piles AA");
        assert_eq!(piles.total_qty, 3.0);
    }
}
