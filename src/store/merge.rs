//! Upsert and removal: the monitor's entry points.

use tracing::{debug, trace, warn};

use crate::error::Result;
use crate::identifiers::TabId;

use super::TabStore;
use super::core::{TabMap, decode_record, encode_record};
use super::record::{TabObservation, TabRecord};

// ============================================================================
// TabStore - Upsert
// ============================================================================

impl TabStore {
    /// Inserts or merges the record for one observed tab.
    ///
    /// Browser-owned fields are refreshed, `is_favorite` and `tags` are kept,
    /// and `visit_count` increments by one. The whole map is written back.
    pub async fn upsert(&self, observation: &TabObservation) -> Result<TabRecord> {
        let _guard = self.write_guard().await;
        debug!(tab_id = %observation.id, url = %observation.url, "Upserting tab");

        let mut map = self.read_map().await?;
        let now = self.now_ms();
        let record = merge_into(&mut map, observation, now)?;
        self.write_map(map).await?;

        debug!(tab_id = %record.id, visit_count = record.visit_count, "Tab upserted");
        Ok(record)
    }

    /// Upserts several tabs with one read and one write.
    ///
    /// Merge rules are the same as [`TabStore::upsert`]. An id that appears
    /// twice is merged twice, in order.
    pub async fn upsert_batch(&self, observations: &[TabObservation]) -> Result<Vec<TabRecord>> {
        if observations.is_empty() {
            return Ok(Vec::new());
        }

        let _guard = self.write_guard().await;
        debug!(count = observations.len(), "Upserting tab batch");

        let mut map = self.read_map().await?;
        let now = self.now_ms();
        let records = observations
            .iter()
            .map(|obs| merge_into(&mut map, obs, now))
            .collect::<Result<Vec<_>>>()?;
        self.write_map(map).await?;

        debug!(count = records.len(), "Tab batch upserted");
        Ok(records)
    }

    /// Deletes the record for `id`.
    ///
    /// Returns `false` without writing if no record exists.
    pub async fn remove(&self, id: TabId) -> Result<bool> {
        let _guard = self.write_guard().await;
        debug!(tab_id = %id, "Removing tab");

        let mut map = self.read_map().await?;
        if map.remove(&id.storage_key()).is_none() {
            trace!(tab_id = %id, "Tab not tracked, nothing to remove");
            return Ok(false);
        }
        self.write_map(map).await?;

        debug!(tab_id = %id, "Tab removed");
        Ok(true)
    }
}

/// Merges one observation into the in-memory map.
fn merge_into(map: &mut TabMap, observation: &TabObservation, now_ms: u64) -> Result<TabRecord> {
    let key = observation.id.storage_key();
    let stored = map.get(&key);
    let existing = stored.and_then(|value| decode_record(&key, value));
    if stored.is_some() && existing.is_none() {
        warn!(key = %key, "Replacing undecodable tab record with a fresh one");
    }

    let record = TabRecord::observe(observation, existing.as_ref(), now_ms);
    trace!(key = %key, existed = existing.is_some(), "Merged tab record");

    map.insert(key, encode_record(&record)?);
    Ok(record)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::time::Duration;

    use tokio_test::assert_ok;

    use crate::clock::ManualClock;
    use crate::namespace::{MemoryNamespace, Namespace};
    use crate::store::TabPatch;

    fn tab(id: u32) -> TabId {
        TabId::new(id).unwrap()
    }

    fn store_with(ns: &MemoryNamespace, clock: Arc<ManualClock>) -> TabStore {
        TabStore::with_options(Arc::new(ns.clone()), clock, true)
    }

    #[tokio::test]
    async fn test_upsert_twice_preserves_user_fields() {
        let ns = MemoryNamespace::new();
        let clock = Arc::new(ManualClock::new(1_000));
        let store = store_with(&ns, clock.clone());

        let obs = TabObservation::new(tab(3), "https://a.com").with_title("A");
        store.upsert(&obs).await.unwrap();
        store
            .update(tab(3), &TabPatch::new().favorite(true).tags(["read-later"]))
            .await
            .unwrap();

        clock.advance(500);
        let second = store.upsert(&obs.clone().with_title("A2")).await.unwrap();

        assert_eq!(second.visit_count, 2);
        assert!(second.is_favorite);
        assert_eq!(second.tags, vec!["read-later"]);
        assert_eq!(second.title, "A2");
        assert_eq!(second.last_visit, 1_500);
    }

    #[tokio::test]
    async fn test_remove_only_touches_target() {
        let ns = MemoryNamespace::new();
        let store = TabStore::new(Arc::new(ns.clone()));

        for id in 1..=3 {
            let obs = TabObservation::new(tab(id), format!("https://site{id}.com"));
            store.upsert(&obs).await.unwrap();
        }
        let before_1 = store.get_by_id(tab(1)).await.unwrap();
        let before_3 = store.get_by_id(tab(3)).await.unwrap();

        assert!(store.remove(tab(2)).await.unwrap());

        assert_eq!(store.get_by_id(tab(2)).await.unwrap(), None);
        assert_eq!(store.get_by_id(tab(1)).await.unwrap(), before_1);
        assert_eq!(store.get_by_id(tab(3)).await.unwrap(), before_3);
        assert_eq!(store.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_remove_absent_is_noop_without_write() {
        let ns = MemoryNamespace::new();
        let store = TabStore::new(Arc::new(ns.clone()));

        assert!(!store.remove(tab(9)).await.unwrap());
        assert_eq!(ns.write_count(), 0);
    }

    #[tokio::test]
    async fn test_upsert_batch_is_one_write() {
        let ns = MemoryNamespace::new();
        let store = TabStore::new(Arc::new(ns.clone()));

        let batch: Vec<_> = (1..=5)
            .map(|id| TabObservation::new(tab(id), "https://a.com"))
            .collect();
        let records = store.upsert_batch(&batch).await.unwrap();
        assert_eq!(records.len(), 5);
        assert_eq!(ns.write_count(), 1);

        let records = store.upsert_batch(&batch).await.unwrap();
        assert!(records.iter().all(|r| r.visit_count == 2));
        assert_eq!(ns.write_count(), 2);
    }

    #[tokio::test]
    async fn test_upsert_batch_repeated_id_merges_in_order() {
        let store = TabStore::new(Arc::new(MemoryNamespace::new()));
        let obs = TabObservation::new(tab(1), "https://a.com");

        let records = store.upsert_batch(&[obs.clone(), obs]).await.unwrap();
        assert_eq!(records[0].visit_count, 1);
        assert_eq!(records[1].visit_count, 2);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_store_unchanged() {
        let ns = MemoryNamespace::new();
        let store = TabStore::new(Arc::new(ns.clone()));
        let obs = TabObservation::new(tab(1), "https://a.com");
        store.upsert(&obs).await.unwrap();

        ns.fail_next_writes(1);
        let err = store.upsert(&obs).await.unwrap_err();
        assert!(err.is_storage_error());

        let record = store.get_by_id(tab(1)).await.unwrap().unwrap();
        assert_eq!(record.visit_count, 1);
    }

    #[tokio::test]
    async fn test_undecodable_neighbours_survive_upsert() {
        let ns = MemoryNamespace::new();
        ns.set(
            "tabActivityTracker",
            serde_json::json!({ "tab_99": "opaque" }),
        )
        .await
        .unwrap();

        let store = TabStore::new(Arc::new(ns.clone()));
        store
            .upsert(&TabObservation::new(tab(1), "https://a.com"))
            .await
            .unwrap();

        let raw = ns.get("tabActivityTracker").await.unwrap().unwrap();
        assert_eq!(raw["tab_99"], "opaque");
    }

    #[tokio::test]
    async fn test_undecodable_same_key_entry_is_replaced() {
        let ns = MemoryNamespace::new();
        ns.set(
            "tabActivityTracker",
            serde_json::json!({ "tab_7": { "url": 42 }, "tab_8": "opaque" }),
        )
        .await
        .unwrap();

        let store = TabStore::new(Arc::new(ns.clone()));
        let record = store
            .upsert(&TabObservation::new(tab(7), "https://a.com").with_title("A"))
            .await
            .unwrap();

        assert_eq!(record.visit_count, 1);
        assert!(!record.is_favorite);
        let raw = ns.get("tabActivityTracker").await.unwrap().unwrap();
        assert_eq!(raw["tab_7"]["url"], "https://a.com");
        assert_eq!(raw["tab_7"]["visitCount"], 1);
        assert_eq!(raw["tab_8"], "opaque");
        assert_eq!(store.get_by_id(tab(7)).await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn test_unserialized_handles_lose_updates() {
        let ns = MemoryNamespace::new();
        ns.set_latency(Some(Duration::from_millis(20)));

        let clock = Arc::new(ManualClock::new(0));
        let a = TabStore::with_options(Arc::new(ns.clone()), clock.clone(), false);
        let b = TabStore::with_options(Arc::new(ns.clone()), clock, false);

        let obs_1 = TabObservation::new(tab(1), "https://one.com");
        let obs_2 = TabObservation::new(tab(2), "https://two.com");
        let (r1, r2) = tokio::join!(a.upsert(&obs_1), b.upsert(&obs_2));
        assert_ok!(r1);
        assert_ok!(r2);

        // Both read the empty map before either wrote; the second write
        // replaced the first.
        ns.set_latency(None);
        assert_eq!(a.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_serialized_handle_keeps_both_updates() {
        let ns = MemoryNamespace::new();
        ns.set_latency(Some(Duration::from_millis(20)));

        let store = TabStore::new(Arc::new(ns.clone()));
        let other = store.clone();

        let obs_1 = TabObservation::new(tab(1), "https://one.com");
        let obs_2 = TabObservation::new(tab(2), "https://two.com");
        let (r1, r2) = tokio::join!(store.upsert(&obs_1), other.upsert(&obs_2));
        assert_ok!(r1);
        assert_ok!(r2);

        ns.set_latency(None);
        assert_eq!(store.len().await.unwrap(), 2);
    }
}
