//! Persisted slices of the shopping state.
//!
//! Storage itself is outside the crate: anything that can get and set
//! strings by key implements [`KeyValueStore`]. Every slice is stored as JSON
//! under its own key so one change rewrites one value.

use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use super::{GroupKey, ShoppingStore, StoreChange, StoreObserver};
use crate::error::PlannerError;
use crate::model::{BasketEntry, ManualItem, PlannedRecipe};

pub const CHECKED_ITEMS_KEY: &str = "checked_items";
pub const MANUAL_ITEMS_KEY: &str = "manual_items";
pub const CONSUMED_GROUPS_KEY: &str = "consumed_groups";
pub const BASKET_MEALS_KEY: &str = "basket_meals";
pub const PLANNED_RECIPES_KEY: &str = "planned_recipes";

/// String storage by key
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, PlannerError>;
    fn set(&self, key: &str, value: &str) -> Result<(), PlannerError>;
}

/// In-memory store, handy for tests and short-lived sessions
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, PlannerError> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PlannerError> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One `<key>.json` file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, PlannerError> {
        match fs::read_to_string(self.path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PlannerError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path(key), value)?;
        Ok(())
    }
}

/// Everything the shopping list needs to survive a restart
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(default)]
    pub checked: BTreeSet<String>,
    #[serde(default)]
    pub manual_items: Vec<ManualItem>,
    #[serde(default)]
    pub consumed: BTreeMap<GroupKey, f64>,
    #[serde(default)]
    pub basket: Vec<BasketEntry>,
    #[serde(default)]
    pub planned_recipes: Vec<PlannedRecipe>,
}

impl PersistedState {
    /// Read every slice. Missing keys give empty slices; unreadable JSON is
    /// logged and treated as missing.
    pub fn load(store: &dyn KeyValueStore) -> Result<Self, PlannerError> {
        Ok(Self {
            checked: load_slice(store, CHECKED_ITEMS_KEY)?,
            manual_items: load_slice(store, MANUAL_ITEMS_KEY)?,
            consumed: load_slice(store, CONSUMED_GROUPS_KEY)?,
            basket: load_slice(store, BASKET_MEALS_KEY)?,
            planned_recipes: load_slice(store, PLANNED_RECIPES_KEY)?,
        })
    }

    pub fn save(&self, store: &dyn KeyValueStore) -> Result<(), PlannerError> {
        store.set(CHECKED_ITEMS_KEY, &serde_json::to_string(&self.checked)?)?;
        store.set(MANUAL_ITEMS_KEY, &serde_json::to_string(&self.manual_items)?)?;
        store.set(CONSUMED_GROUPS_KEY, &serde_json::to_string(&self.consumed)?)?;
        store.set(BASKET_MEALS_KEY, &serde_json::to_string(&self.basket)?)?;
        store.set(PLANNED_RECIPES_KEY, &serde_json::to_string(&self.planned_recipes)?)?;
        Ok(())
    }
}

fn load_slice<T: DeserializeOwned + Default>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<T, PlannerError> {
    let Some(raw) = store.get(key)? else {
        return Ok(T::default());
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(value),
        Err(e) => {
            warn!("Ignoring unreadable '{}' state: {}", key, e);
            Ok(T::default())
        }
    }
}

impl ShoppingStore {
    /// Copy of the persisted slices
    pub fn snapshot(&self) -> PersistedState {
        PersistedState {
            checked: self.checked.clone(),
            manual_items: self.manual_items.clone(),
            consumed: self.consumed.clone(),
            basket: self.basket.clone(),
            planned_recipes: self.planned.clone(),
        }
    }

    /// Replace the persisted slices wholesale. Observers are not notified.
    pub fn restore(&mut self, state: PersistedState) {
        debug!(
            "Restoring {} basket meals, {} planned recipes, {} manual items",
            state.basket.len(),
            state.planned_recipes.len(),
            state.manual_items.len()
        );
        self.checked = state.checked;
        self.manual_items = state.manual_items;
        self.consumed = state.consumed;
        self.basket = state.basket;
        self.planned = state.planned_recipes;
    }

    /// Serialize the slice touched by `change`; `None` for non-persisted slices.
    pub fn serialize_slice(
        &self,
        change: StoreChange,
    ) -> Result<Option<(&'static str, String)>, PlannerError> {
        let entry = match change {
            StoreChange::Checked => (CHECKED_ITEMS_KEY, serde_json::to_string(&self.checked)?),
            StoreChange::ManualItems => {
                (MANUAL_ITEMS_KEY, serde_json::to_string(&self.manual_items)?)
            }
            StoreChange::Consumed => (CONSUMED_GROUPS_KEY, serde_json::to_string(&self.consumed)?),
            StoreChange::Basket => (BASKET_MEALS_KEY, serde_json::to_string(&self.basket)?),
            StoreChange::PlannedRecipes => {
                (PLANNED_RECIPES_KEY, serde_json::to_string(&self.planned)?)
            }
            StoreChange::Catalog | StoreChange::Meals => return Ok(None),
        };
        Ok(Some(entry))
    }
}

/// Observer writing each changed slice through to a [`KeyValueStore`]
pub struct PersistingObserver {
    store: Arc<dyn KeyValueStore>,
}

impl PersistingObserver {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }
}

impl StoreObserver for PersistingObserver {
    fn on_change(&self, change: StoreChange, shopping: &ShoppingStore) {
        let result = shopping
            .serialize_slice(change)
            .and_then(|slice| match slice {
                Some((key, value)) => self.store.set(key, &value),
                None => Ok(()),
            });
        if let Err(e) = result {
            warn!("Failed to persist {:?}: {}", change, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{catalog_from, Ingredient};
    use uuid::Uuid;

    #[test]
    fn test_ledger_and_manual_items_round_trip_exactly() {
        let mut state = PersistedState::default();
        state
            .consumed
            .insert(GroupKey::new("Crème|fraîche", "cl", "Fresh"), 0.1 + 0.2);
        state
            .consumed
            .insert(GroupKey::new("riz", "g", "Pantry"), 1.0 / 3.0);
        state.manual_items.push(ManualItem {
            id: Uuid::new_v4(),
            ingredient_id: Some(7),
            name: "Pâtes \"fraîches\"".to_string(),
            category: "Pantry".to_string(),
            unit: "g".to_string(),
            quantity: 123.456789012345678,
        });
        state.checked.insert("manual:abc".to_string());

        let kv = MemoryStore::new();
        state.save(&kv).unwrap();
        let back = PersistedState::load(&kv).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_missing_and_corrupt_slices_default() {
        let kv = MemoryStore::new();
        kv.set(BASKET_MEALS_KEY, "not json").unwrap();
        let state = PersistedState::load(&kv).unwrap();
        assert_eq!(state, PersistedState::default());
    }

    #[test]
    fn test_persisting_observer_writes_changed_slice() {
        let kv = Arc::new(MemoryStore::new());
        let mut store = ShoppingStore::new(catalog_from(vec![Ingredient::new(
            1, "Lait", "Fresh", "ml",
        )]));
        store.subscribe(Arc::new(PersistingObserver::new(kv.clone())));

        store.add_to_basket(3, 2);
        store.add_manual_quick("piles");
        assert_eq!(
            kv.get(BASKET_MEALS_KEY).unwrap().as_deref(),
            Some(r#"[{"mealId":3,"persons":2}]"#)
        );
        assert!(kv.get(MANUAL_ITEMS_KEY).unwrap().unwrap().contains("piles"));
        assert_eq!(kv.get(CHECKED_ITEMS_KEY).unwrap(), None);

        let mut restored = ShoppingStore::default();
        restored.restore(PersistedState::load(kv.as_ref()).unwrap());
        assert_eq!(restored.basket(), store.basket());
        assert_eq!(restored.manual_items(), store.manual_items());
    }

    #[test]
    fn test_file_store() {
        let dir = std::env::temp_dir().join(format!("meal-basket-{}", Uuid::new_v4()));
        let kv = FileStore::new(&dir);
        assert_eq!(kv.get(CHECKED_ITEMS_KEY).unwrap(), None);
        kv.set(CHECKED_ITEMS_KEY, r#"["1_g"]"#).unwrap();
        assert_eq!(kv.get(CHECKED_ITEMS_KEY).unwrap().as_deref(), Some(r#"["1_g"]"#));
        fs::remove_dir_all(dir).unwrap();
    }
}
