use anyhow::{Context, Result};
use redis::aio::ConnectionManager;
use std::time::Duration;
use tracing::{debug, info};

use super::{RedisReadingLog, RedisSiteIndexStore};

/// Redis client wrapper holding a shared, auto-reconnecting connection.
#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
    connection: ConnectionManager,
    connect_timeout: Duration,
}

impl RedisClient {
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self> {
        info!("Connecting to Redis at {} (timeout={:?})", url, timeout);

        let client = redis::Client::open(url).context("Invalid Redis URL")?;
        let connection = Self::open_connection(&client, timeout).await?;

        info!("Successfully connected to Redis");
        Ok(Self {
            client,
            connection,
            connect_timeout: timeout,
        })
    }

    /// Shared connection for short commands (appends, acks, queries).
    pub fn connection(&self) -> ConnectionManager {
        self.connection.clone()
    }

    /// Opens a connection of its own. Blocking stream reads go through one of
    /// these so they never queue behind, or hold up, the shared connection.
    pub async fn dedicated_connection(&self) -> Result<ConnectionManager> {
        debug!("Opening dedicated Redis connection");
        Self::open_connection(&self.client, self.connect_timeout).await
    }

    /// Log backend whose claims run on a dedicated connection.
    pub async fn create_reading_log(&self) -> Result<RedisReadingLog> {
        let blocking = self.dedicated_connection().await?;
        Ok(RedisReadingLog::new(self.connection(), blocking))
    }

    pub fn create_site_index_store(&self) -> RedisSiteIndexStore {
        RedisSiteIndexStore::new(self.connection())
    }

    async fn open_connection(client: &redis::Client, timeout: Duration) -> Result<ConnectionManager> {
        tokio::time::timeout(timeout, ConnectionManager::new(client.clone()))
            .await
            .context("Timed out connecting to Redis")?
            .context("Failed to connect to Redis")
    }
}
