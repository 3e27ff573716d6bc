//! Contributor and item models plus the store that owns them.

pub mod contributor;
pub mod item;
pub mod rules;
pub mod snapshot;
pub mod store;

pub use contributor::{Allocation, Contributor, MAX_SHARE_WEIGHT, MIN_SHARE_WEIGHT};
pub use item::{normalize_label, Item, DEFAULT_DESCRIPTION, PLACEHOLDER_DESCRIPTION};
pub use snapshot::{LedgerSnapshot, CURRENT_SCHEMA_VERSION};
pub use store::{EditMode, ItemRef, LedgerStore};
