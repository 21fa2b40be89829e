use crate::domain::{DomainResult, SiteIndexStore};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::debug;

/// Sorted-set implementation of [`SiteIndexStore`]: one `ZSET` per site key.
///
/// Byte-identical members collapse into one entry (a re-added member only has
/// its score refreshed).
#[derive(Clone)]
pub struct RedisSiteIndexStore {
    connection: ConnectionManager,
}

impl RedisSiteIndexStore {
    pub fn new(connection: ConnectionManager) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl SiteIndexStore for RedisSiteIndexStore {
    async fn append(&self, key: &str, member: &str, score: f64) -> DomainResult<()> {
        let mut conn = self.connection.clone();
        let added: i64 = conn.zadd(key, member, score).await?;
        debug!(key = %key, score, added, "appended member to site index");
        Ok(())
    }

    async fn list(&self, key: &str) -> DomainResult<Vec<String>> {
        let mut conn = self.connection.clone();
        let members: Vec<String> = conn.zrange(key, 0, -1).await?;
        Ok(members)
    }

    async fn ping(&self) -> DomainResult<()> {
        let mut conn = self.connection.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
