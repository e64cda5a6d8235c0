use super::ShoppingStore;

/// Which slice of the store a mutation touched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreChange {
    Catalog,
    Meals,
    Basket,
    PlannedRecipes,
    ManualItems,
    Checked,
    /// Consumed-quantity ledger, including clamping done while building sections
    Consumed,
}

/// Notified after every state transition of a [`ShoppingStore`].
///
/// Observers see the store after the change. They cannot mutate it.
pub trait StoreObserver: Send + Sync {
    fn on_change(&self, change: StoreChange, store: &ShoppingStore);
}
