//! Search and domain lookups over the stored records.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::Result;

use super::TabStore;
use super::record::TabRecord;

// ============================================================================
// TabStore - Search
// ============================================================================

impl TabStore {
    /// Case-insensitive substring search over title, url and domain.
    ///
    /// Results are unordered.
    pub async fn search(&self, query: &str) -> Result<Vec<TabRecord>> {
        let needle = query.to_lowercase();
        let matches: Vec<TabRecord> = self
            .get_all()
            .await?
            .into_iter()
            .filter(|record| record.matches_lowercase(&needle))
            .collect();

        debug!(query = %query, count = matches.len(), "Searched tabs");
        Ok(matches)
    }

    /// Records whose domain equals `domain` exactly.
    pub async fn by_domain(&self, domain: &str) -> Result<Vec<TabRecord>> {
        Ok(self
            .get_all()
            .await?
            .into_iter()
            .filter(|record| record.domain == domain)
            .collect())
    }

    /// All records grouped by domain.
    pub async fn group_by_domain(&self) -> Result<BTreeMap<String, Vec<TabRecord>>> {
        Ok(crate::query::group_by_domain(self.get_all().await?))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use crate::identifiers::TabId;
    use crate::namespace::MemoryNamespace;
    use crate::store::TabObservation;

    async fn seeded() -> TabStore {
        let store = TabStore::new(Arc::new(MemoryNamespace::new()));
        let tabs = [
            (1, "https://EXAMPLE.com/a", "First"),
            (2, "https://docs.rs/tokio", "tokio - Rust"),
            (3, "https://example.com/b", "Second"),
            (4, "not a url", "Broken"),
        ];
        for (id, url, title) in tabs {
            let obs = TabObservation::new(TabId::new(id).unwrap(), url).with_title(title);
            store.upsert(&obs).await.unwrap();
        }
        store
    }

    fn ids(records: &[TabRecord]) -> Vec<u32> {
        let mut ids: Vec<u32> = records.iter().map(|r| r.id.as_u32()).collect();
        ids.sort_unstable();
        ids
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let store = seeded().await;
        assert_eq!(ids(&store.search("example").await.unwrap()), vec![1, 3]);
        assert_eq!(ids(&store.search("RUST").await.unwrap()), vec![2]);
        assert!(store.search("nothing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_search_matches_all() {
        let store = seeded().await;
        assert_eq!(store.search("").await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_by_domain_is_exact() {
        let store = seeded().await;
        assert_eq!(ids(&store.by_domain("example.com").await.unwrap()), vec![1, 3]);
        assert!(store.by_domain("example").await.unwrap().is_empty());
        assert_eq!(ids(&store.by_domain("unknown").await.unwrap()), vec![4]);
    }

    #[tokio::test]
    async fn test_group_by_domain() {
        let store = seeded().await;
        let groups = store.group_by_domain().await.unwrap();
        assert_eq!(groups.len(), 3);
        assert_eq!(groups["example.com"].len(), 2);
        assert_eq!(groups["docs.rs"].len(), 1);
    }
}
