use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Redis Streams log and Redis sorted-set index.
    Redis,
    /// Process-local backends; nothing survives a restart.
    Memory,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit JSON log lines (false for human-readable output)
    #[serde(default = "default_log_json")]
    pub log_json: bool,

    /// Storage backend for the reading log and the site index
    #[serde(default = "default_backend")]
    pub backend: Backend,

    // Redis configuration
    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Stream readings are appended to and consumed from
    #[serde(default = "default_stream_name")]
    pub stream_name: String,

    /// Consumer group shared by all processing workers
    #[serde(default = "default_consumer_group")]
    pub consumer_group: String,

    /// This worker's name within the group
    #[serde(default = "default_consumer_name")]
    pub consumer_name: String,

    // Consumer tuning
    /// Max messages per claim
    #[serde(default = "default_claim_batch_size")]
    pub claim_batch_size: usize,

    /// Max wait for new messages per claim in milliseconds
    #[serde(default = "default_claim_block_ms")]
    pub claim_block_ms: u64,

    /// Backoff after the log is unreachable, in seconds
    #[serde(default = "default_connection_retry_secs")]
    pub connection_retry_secs: u64,

    /// Backoff after other consumer errors, in milliseconds
    #[serde(default = "default_error_retry_ms")]
    pub error_retry_ms: u64,

    // HTTP configuration
    /// Ingestion API host
    #[serde(default = "default_http_host")]
    pub ingestion_http_host: String,

    /// Ingestion API port
    #[serde(default = "default_ingestion_http_port")]
    pub ingestion_http_port: u16,

    /// Processing read API host
    #[serde(default = "default_http_host")]
    pub processing_http_host: String,

    /// Processing read API port
    #[serde(default = "default_processing_http_port")]
    pub processing_http_port: u16,

    // Lifecycle
    /// Startup timeout for initialization operations in seconds
    #[serde(default = "default_startup_timeout_secs")]
    pub startup_timeout_secs: u64,

    /// Time processes get to stop after shutdown starts, in seconds
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_json() -> bool {
    true
}

fn default_backend() -> Backend {
    Backend::Redis
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_stream_name() -> String {
    "energy_readings".to_string()
}

fn default_consumer_group() -> String {
    "processing_group".to_string()
}

fn default_consumer_name() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "processor-1".to_string())
}

fn default_claim_batch_size() -> usize {
    10
}

fn default_claim_block_ms() -> u64 {
    2000
}

fn default_connection_retry_secs() -> u64 {
    5
}

fn default_error_retry_ms() -> u64 {
    1000
}

fn default_http_host() -> String {
    "0.0.0.0".to_string()
}

fn default_ingestion_http_port() -> u16 {
    8000
}

fn default_processing_http_port() -> u16 {
    8001
}

fn default_startup_timeout_secs() -> u64 {
    30
}

fn default_shutdown_timeout_secs() -> u64 {
    10
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("METERFLOW"))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Mutex to ensure tests run serially and don't interfere with each other
    static TEST_LOCK: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "METERFLOW_LOG_LEVEL",
        "METERFLOW_BACKEND",
        "METERFLOW_CLAIM_BATCH_SIZE",
        "METERFLOW_PROCESSING_HTTP_PORT",
        "METERFLOW_CONSUMER_NAME",
    ];

    fn clear_vars() {
        for var in VARS {
            // SAFETY: Test runs with mutex lock to prevent concurrent env access
            unsafe {
                std::env::remove_var(var);
            }
        }
    }

    #[test]
    fn test_default_config() {
        let _lock = TEST_LOCK.lock().unwrap();
        clear_vars();

        let config = ServiceConfig::from_env().unwrap();

        assert_eq!(config.log_level, "info");
        assert_eq!(config.backend, Backend::Redis);
        assert_eq!(config.redis_url, "redis://localhost:6379");
        assert_eq!(config.stream_name, "energy_readings");
        assert_eq!(config.consumer_group, "processing_group");
        assert!(!config.consumer_name.is_empty());
        assert_eq!(config.claim_batch_size, 10);
        assert_eq!(config.claim_block_ms, 2000);
        assert_eq!(config.connection_retry_secs, 5);
        assert_eq!(config.error_retry_ms, 1000);
        assert_eq!(config.ingestion_http_port, 8000);
        assert_eq!(config.processing_http_port, 8001);
    }

    #[test]
    fn test_custom_config() {
        let _lock = TEST_LOCK.lock().unwrap();
        clear_vars();

        // SAFETY: Test runs with mutex lock to prevent concurrent env access
        unsafe {
            std::env::set_var("METERFLOW_LOG_LEVEL", "debug");
            std::env::set_var("METERFLOW_BACKEND", "memory");
            std::env::set_var("METERFLOW_CLAIM_BATCH_SIZE", "25");
            std::env::set_var("METERFLOW_PROCESSING_HTTP_PORT", "9001");
            std::env::set_var("METERFLOW_CONSUMER_NAME", "processor-7");
        }

        let config = ServiceConfig::from_env().unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.backend, Backend::Memory);
        assert_eq!(config.claim_batch_size, 25);
        assert_eq!(config.processing_http_port, 9001);
        assert_eq!(config.consumer_name, "processor-7");

        clear_vars();
    }

    #[test]
    fn test_invalid_backend_is_rejected() {
        let _lock = TEST_LOCK.lock().unwrap();
        clear_vars();

        // SAFETY: Test runs with mutex lock to prevent concurrent env access
        unsafe {
            std::env::set_var("METERFLOW_BACKEND", "postgres");
        }

        assert!(ServiceConfig::from_env().is_err());

        clear_vars();
    }
}
