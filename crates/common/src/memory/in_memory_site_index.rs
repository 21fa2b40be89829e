use crate::domain::{DomainResult, SiteIndexStore};
use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

/// Score with a total order so it can key a `BTreeMap`.
#[derive(Debug, Clone, Copy)]
struct Score(f64);

impl PartialEq for Score {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Score {}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// One sorted set. The insertion sequence breaks score ties.
#[derive(Default)]
struct ScoredMembers {
    members: BTreeMap<(Score, u64), String>,
    next_seq: u64,
}

/// In-memory [`SiteIndexStore`]. Members are kept in ascending score order;
/// equal scores keep insertion order and duplicate members are retained.
pub struct InMemorySiteIndexStore {
    indexes: RwLock<HashMap<String, ScoredMembers>>,
}

impl InMemorySiteIndexStore {
    pub fn new() -> Self {
        Self {
            indexes: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemorySiteIndexStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SiteIndexStore for InMemorySiteIndexStore {
    async fn append(&self, key: &str, member: &str, score: f64) -> DomainResult<()> {
        let mut indexes = self.indexes.write().await;
        let index = indexes.entry(key.to_string()).or_default();

        let seq = index.next_seq;
        index.next_seq += 1;
        // `-0.0 + 0.0` is `0.0`, so both zeros tie.
        index.members.insert((Score(score + 0.0), seq), member.to_string());
        Ok(())
    }

    async fn list(&self, key: &str) -> DomainResult<Vec<String>> {
        let indexes = self.indexes.read().await;
        Ok(indexes
            .get(key)
            .map(|index| index.members.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn ping(&self) -> DomainResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "site:site-001:readings";

    #[tokio::test]
    async fn test_list_orders_by_score_not_insertion() {
        let store = InMemorySiteIndexStore::new();

        store.append(KEY, "late", 300.0).await.unwrap();
        store.append(KEY, "early", 100.0).await.unwrap();
        store.append(KEY, "middle", 200.0).await.unwrap();

        assert_eq!(store.list(KEY).await.unwrap(), vec!["early", "middle", "late"]);
    }

    #[tokio::test]
    async fn test_equal_scores_keep_insertion_order() {
        let store = InMemorySiteIndexStore::new();

        store.append(KEY, "first", 0.0).await.unwrap();
        store.append(KEY, "second", 0.0).await.unwrap();
        store.append(KEY, "before", -1.0).await.unwrap();

        assert_eq!(store.list(KEY).await.unwrap(), vec!["before", "first", "second"]);
    }

    #[tokio::test]
    async fn test_duplicate_members_are_retained() {
        let store = InMemorySiteIndexStore::new();

        store.append(KEY, "same", 1.0).await.unwrap();
        store.append(KEY, "same", 1.0).await.unwrap();

        assert_eq!(store.list(KEY).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_large_index_stays_ordered() {
        let store = InMemorySiteIndexStore::new();

        for i in (0..1_000).rev() {
            store.append(KEY, &i.to_string(), i as f64).await.unwrap();
        }

        let members = store.list(KEY).await.unwrap();
        let expected: Vec<String> = (0..1_000).map(|i: i32| i.to_string()).collect();
        assert_eq!(members, expected);
    }

    #[tokio::test]
    async fn test_signed_zeros_tie_in_insertion_order() {
        let store = InMemorySiteIndexStore::new();

        store.append(KEY, "positive", 0.0).await.unwrap();
        store.append(KEY, "negative", -0.0).await.unwrap();

        assert_eq!(store.list(KEY).await.unwrap(), vec!["positive", "negative"]);
    }

    #[tokio::test]
    async fn test_unknown_key_lists_empty() {
        let store = InMemorySiteIndexStore::new();
        store.append(KEY, "member", 1.0).await.unwrap();

        assert!(store.list("site:other:readings").await.unwrap().is_empty());
    }
}
