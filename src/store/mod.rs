//! Tab record store.
//!
//! Owns the `tab_<id>` → [`TabRecord`] map stored under
//! [`StorageKey::TabTracker`](crate::namespace::StorageKey::TabTracker).
//!
//! # Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | `core` | TabStore struct, read paths |
//! | `merge` | Upsert, batch upsert, removal |
//! | `edit` | Partial update, favorite toggle, tags |
//! | `search` | Substring search, domain lookups |
//! | `record` | TabRecord, TabObservation, TabPatch |
//!
//! # Example
//!
//! ```ignore
//! let store = TabStore::new(Arc::new(MemoryNamespace::new()));
//! let id = TabId::new(7).unwrap();
//!
//! store.upsert(&TabObservation::new(id, "https://a.com/x")).await?;
//! store.toggle_favorite(id).await?;
//!
//! let hits = store.search("a.com").await?;
//! ```

// ============================================================================
// Submodules
// ============================================================================

mod core;
mod edit;
mod merge;
mod record;
mod search;

// ============================================================================
// Re-exports
// ============================================================================

pub use core::TabStore;
pub use record::{
    DEFAULT_TITLE, TabObservation, TabPatch, TabRecord, UNKNOWN_DOMAIN, extract_domain,
};
