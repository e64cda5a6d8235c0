//! Shopping list aggregation.
//!
//! The list is a view: every call to
//! [`ShoppingStore::build_shopping_sections`] recomputes groups from the
//! basket, planned recipes and manual items. Only the checked set and the
//! consumed-quantity ledger carry state between calls.

mod aggregate;
mod key;
mod observer;
pub mod persistence;
mod sections;
mod store;

pub use aggregate::ShoppingGroup;
pub use key::{GroupKey, InvalidGroupKey};
pub use observer::{StoreChange, StoreObserver};
pub use persistence::{FileStore, KeyValueStore, MemoryStore, PersistedState, PersistingObserver};
pub use sections::{ShoppingItem, ShoppingSection};
pub use store::{ShoppingStore, ToggleOutcome};
