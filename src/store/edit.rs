//! User edits: partial update, favorite toggle, tags.
//!
//! All edits are no-ops on absent records and report whether a record was
//! found.

use tracing::{debug, trace};

use crate::error::Result;
use crate::identifiers::TabId;

use super::TabStore;
use super::core::{decode_record, encode_record};
use super::record::{TabPatch, TabRecord};

// ============================================================================
// TabStore - Edits
// ============================================================================

impl TabStore {
    /// Shallow-merges `patch` into the record for `id`.
    ///
    /// Returns `false` without writing if the record is absent.
    pub async fn update(&self, id: TabId, patch: &TabPatch) -> Result<bool> {
        debug!(tab_id = %id, "Updating tab");
        let updated = self
            .modify(id, |record| {
                patch.apply(record);
                true
            })
            .await?;
        Ok(updated.is_some())
    }

    /// Flips the favorite flag on the record for `id`.
    ///
    /// Returns the new flag, or `None` if the record is absent.
    pub async fn toggle_favorite(&self, id: TabId) -> Result<Option<bool>> {
        debug!(tab_id = %id, "Toggling favorite");
        let updated = self
            .modify(id, |record| {
                record.is_favorite = !record.is_favorite;
                true
            })
            .await?;
        Ok(updated.map(|r| r.is_favorite))
    }

    /// Adds `tag` to the record for `id` if not already present.
    ///
    /// Returns `false` if the record is absent.
    pub async fn add_tag(&self, id: TabId, tag: &str) -> Result<bool> {
        debug!(tab_id = %id, tag = %tag, "Adding tag");
        let updated = self
            .modify(id, |record| {
                if record.has_tag(tag) {
                    return false;
                }
                record.tags.push(tag.to_string());
                true
            })
            .await?;
        Ok(updated.is_some())
    }

    /// Removes `tag` from the record for `id`.
    ///
    /// Returns `false` if the record is absent.
    pub async fn remove_tag(&self, id: TabId, tag: &str) -> Result<bool> {
        debug!(tab_id = %id, tag = %tag, "Removing tag");
        let updated = self
            .modify(id, |record| {
                let before = record.tags.len();
                record.tags.retain(|t| t != tag);
                record.tags.len() != before
            })
            .await?;
        Ok(updated.is_some())
    }
}

// ============================================================================
// TabStore - Internal
// ============================================================================

impl TabStore {
    /// Read-modify-write of one record.
    ///
    /// `edit` returns whether it changed anything; unchanged records are
    /// not written back. Returns the record after the edit, or `None` if it
    /// was absent.
    async fn modify<F>(&self, id: TabId, edit: F) -> Result<Option<TabRecord>>
    where
        F: FnOnce(&mut TabRecord) -> bool,
    {
        let _guard = self.write_guard().await;

        let key = id.storage_key();
        let mut map = self.read_map().await?;
        let Some(mut record) = map.get(&key).and_then(|value| decode_record(&key, value)) else {
            trace!(tab_id = %id, "Tab not tracked, edit skipped");
            return Ok(None);
        };

        if !edit(&mut record) {
            trace!(tab_id = %id, "Edit changed nothing");
            return Ok(Some(record));
        }

        map.insert(key, encode_record(&record)?);
        self.write_map(map).await?;
        Ok(Some(record))
    }
}

// ============================================================================
// Tests
// ============================================================================
