//! Configuration types for bundle-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Download behavior configuration (directories, paging, concurrency, pacing)
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DownloadConfig {
    /// Base download directory (default: "./downloads")
    #[serde(default = "default_download_dir", alias = "downloadDir")]
    pub download_dir: PathBuf,

    /// Records fetched per page; also the capacity of the record channel (default: 100)
    #[serde(default = "default_batch_size", alias = "batchSize")]
    pub batch_size: usize,

    /// Number of concurrent workers (default: 5)
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Per-request timeout for CDN requests, in seconds (default: 60)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub request_timeout: Duration,

    /// Delay between records when running with a single worker
    #[serde(default)]
    pub pacing: PacingConfig,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            batch_size: default_batch_size(),
            workers: default_workers(),
            request_timeout: default_request_timeout(),
            pacing: PacingConfig::default(),
        }
    }
}

/// Randomized pause between records
///
/// Only applied when `workers == 1`; with several workers throughput comes
/// from parallelism and no pause is taken.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PacingConfig {
    /// Whether to pause between records (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Lower bound of the pause, in seconds (default: 3)
    #[serde(default = "default_min_delay", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub min_delay: Duration,

    /// Upper bound of the pause, in seconds (default: 13)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub max_delay: Duration,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_delay: default_min_delay(),
            max_delay: default_max_delay(),
        }
    }
}

impl PacingConfig {
    /// Pacing that never waits
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PersistenceConfig {
    /// Database path (default: "./bundle-dl.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// API and external server integration configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:8080)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
        }
    }
}

/// Main configuration for BulkDownloader
///
/// Sub-config fields are flattened so the serialized form stays a single
/// level (`{"download_dir": ..., "batch_size": ..., "workers": ...}`).
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Download behavior settings
    #[serde(flatten)]
    pub download: DownloadConfig,

    /// Data storage
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// API server integration
    #[serde(flatten)]
    pub server: ServerIntegrationConfig,
}

impl Config {
    /// Check settings that would make a run impossible or ill-defined
    pub fn validate(&self) -> Result<()> {
        if self.download.download_dir.as_os_str().is_empty() {
            return Err(config_error("download_dir must not be empty", "download_dir"));
        }
        if self.download.batch_size == 0 {
            return Err(config_error("batch_size must be at least 1", "batch_size"));
        }
        if self.download.workers == 0 {
            return Err(config_error("workers must be at least 1", "workers"));
        }
        let pacing = &self.download.pacing;
        if pacing.enabled && pacing.min_delay > pacing.max_delay {
            return Err(config_error(
                "pacing.min_delay must not exceed pacing.max_delay",
                "pacing",
            ));
        }
        Ok(())
    }
}

fn config_error(message: &str, key: &str) -> Error {
    Error::Config {
        message: message.to_string(),
        key: Some(key.to_string()),
    }
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_batch_size() -> usize {
    100
}

fn default_workers() -> usize {
    5
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_min_delay() -> Duration {
    Duration::from_secs(3)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(13)
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./bundle-dl.db")
}

fn default_true() -> bool {
    true
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
