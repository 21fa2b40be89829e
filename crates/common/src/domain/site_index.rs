use crate::domain::result::DomainResult;
use async_trait::async_trait;

/// Score-ordered sets keyed by site, holding serialized stored records.
/// Infrastructure layer (Redis sorted sets, in-memory) implements this trait.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait SiteIndexStore: Send + Sync {
    /// Inserts `member` under `key` with the given score.
    async fn append(&self, key: &str, member: &str, score: f64) -> DomainResult<()>;

    /// All members under `key` in ascending score order; empty if the key is absent.
    async fn list(&self, key: &str) -> DomainResult<Vec<String>>;

    async fn ping(&self) -> DomainResult<()>;
}
