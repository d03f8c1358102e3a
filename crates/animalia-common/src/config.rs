//! Configuration for the Animalia pipeline
//!
//! All settings are loaded from the environment (a `.env` file is honored
//! when the binary loads one via dotenvy) with defaults suitable for local
//! development. The resulting value object is built once at process start
//! and passed by reference into each stage constructor.

use crate::error::{EtlError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// Default Values
// ============================================================================

/// Default target API endpoint for validated records.
pub const DEFAULT_API_URL: &str = "http://localhost:3000/animaux";

/// Default GBIF API base URL.
pub const DEFAULT_GBIF_API_URL: &str = "https://api.gbif.org/v1";

/// Default per-request HTTP timeout in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Default pause between paginated GBIF requests in milliseconds.
pub const DEFAULT_RATE_LIMIT_DELAY_MS: u64 = 200;

/// Default directory for raw fetched artifacts.
pub const DEFAULT_RAW_DATA_DIR: &str = "data/raw";

/// Default directory for processed artifacts.
pub const DEFAULT_PROCESSED_DATA_DIR: &str = "data/processed";

/// Default cap on species collected per taxonomic group.
pub const DEFAULT_MAX_ANIMALS_PER_GROUP: usize = 100;

/// Default cap on records scanned per group before aborting pagination.
pub const DEFAULT_MAX_RECORDS_LIMIT: usize = 500;

/// Default number of retry attempts for network failures.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Target API endpoint receiving validated records
    pub api_url: String,

    /// Per-request HTTP timeout
    pub http_timeout: Duration,

    /// GBIF API base URL
    pub gbif_api_url: String,

    /// Cooperative pause between paginated GBIF requests
    pub rate_limit_delay: Duration,

    /// Directory for raw fetched artifacts
    pub raw_data_dir: PathBuf,

    /// Directory for processed artifacts
    pub processed_data_dir: PathBuf,

    /// Cap on species collected per taxonomic group during batch fetch
    pub max_animals_per_group: usize,

    /// Cap on records scanned per group before aborting pagination
    pub max_records_limit: usize,

    /// Production mode suppresses the startup configuration summary
    pub production_mode: bool,

    /// Whether network failures are retried
    pub enable_retry: bool,

    /// Maximum retry attempts for a single request
    pub max_retries: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            gbif_api_url: DEFAULT_GBIF_API_URL.to_string(),
            rate_limit_delay: Duration::from_millis(DEFAULT_RATE_LIMIT_DELAY_MS),
            raw_data_dir: PathBuf::from(DEFAULT_RAW_DATA_DIR),
            processed_data_dir: PathBuf::from(DEFAULT_PROCESSED_DATA_DIR),
            max_animals_per_group: DEFAULT_MAX_ANIMALS_PER_GROUP,
            max_records_limit: DEFAULT_MAX_RECORDS_LIMIT,
            production_mode: false,
            enable_retry: true,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `API_URL`: target API endpoint
    /// - `HTTP_TIMEOUT`: per-request timeout in seconds
    /// - `GBIF_API_URL`: GBIF API base URL
    /// - `GBIF_RATE_LIMIT_DELAY`: pause between paginated requests in seconds
    /// - `RAW_DATA_DIR`: raw artifact directory
    /// - `PROCESSED_DATA_DIR`: processed artifact directory
    /// - `MAX_ANIMALS_PER_FAMILY`: species cap per taxonomic group
    /// - `MAX_RECORDS_LIMIT`: records scanned per group before abort
    /// - `PRODUCTION_MODE`: true/false
    /// - `ENABLE_RETRY`: true/false
    /// - `MAX_RETRIES`: retry attempts for network failures
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("API_URL") {
            config.api_url = url;
        }

        if let Ok(timeout) = std::env::var("HTTP_TIMEOUT") {
            let secs: u64 = timeout
                .parse()
                .map_err(|_| EtlError::config(format!("invalid HTTP_TIMEOUT: '{timeout}'")))?;
            config.http_timeout = Duration::from_secs(secs);
        }

        if let Ok(url) = std::env::var("GBIF_API_URL") {
            config.gbif_api_url = url;
        }

        if let Ok(delay) = std::env::var("GBIF_RATE_LIMIT_DELAY") {
            let secs: f64 = delay.parse().map_err(|_| {
                EtlError::config(format!("invalid GBIF_RATE_LIMIT_DELAY: '{delay}'"))
            })?;
            config.rate_limit_delay = Duration::from_secs_f64(secs);
        }

        if let Ok(dir) = std::env::var("RAW_DATA_DIR") {
            config.raw_data_dir = PathBuf::from(dir);
        }

        if let Ok(dir) = std::env::var("PROCESSED_DATA_DIR") {
            config.processed_data_dir = PathBuf::from(dir);
        }

        if let Ok(max) = std::env::var("MAX_ANIMALS_PER_FAMILY") {
            config.max_animals_per_group = max.parse().map_err(|_| {
                EtlError::config(format!("invalid MAX_ANIMALS_PER_FAMILY: '{max}'"))
            })?;
        }

        if let Ok(max) = std::env::var("MAX_RECORDS_LIMIT") {
            config.max_records_limit = max
                .parse()
                .map_err(|_| EtlError::config(format!("invalid MAX_RECORDS_LIMIT: '{max}'")))?;
        }

        if let Ok(val) = std::env::var("PRODUCTION_MODE") {
            config.production_mode = val.eq_ignore_ascii_case("true");
        }

        if let Ok(val) = std::env::var("ENABLE_RETRY") {
            config.enable_retry = val.eq_ignore_ascii_case("true");
        }

        if let Ok(max) = std::env::var("MAX_RETRIES") {
            config.max_retries = max
                .parse()
                .map_err(|_| EtlError::config(format!("invalid MAX_RETRIES: '{max}'")))?;
        }

        Ok(config)
    }

    /// Log the active configuration at debug level.
    /// Skipped in production mode by the caller.
    pub fn log_summary(&self) {
        tracing::debug!(
            api_url = %self.api_url,
            gbif_api_url = %self.gbif_api_url,
            http_timeout_secs = self.http_timeout.as_secs(),
            rate_limit_delay_ms = self.rate_limit_delay.as_millis() as u64,
            raw_data_dir = %self.raw_data_dir.display(),
            processed_data_dir = %self.processed_data_dir.display(),
            max_animals_per_group = self.max_animals_per_group,
            max_records_limit = self.max_records_limit,
            enable_retry = self.enable_retry,
            max_retries = self.max_retries,
            "pipeline configuration"
        );
    }
}
