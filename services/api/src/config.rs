//! services/api/src/config.rs
//!
//! Defines the gateway's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development. The resulting `Config` is wrapped in an
//! `Arc` and never mutated afterwards.

use share_link_core::ShareDefaults;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Where the share backend lives and how to authenticate against it.
#[derive(Clone, Default)]
pub struct BackendSettings {
    pub base_url: String,
    pub api_key: String,
}

impl BackendSettings {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// True iff both the URL and the API key are present.
    pub fn is_configured(&self) -> bool {
        !self.base_url.is_empty() && !self.api_key.is_empty()
    }
}

// The API key must never end up in logs.
impl fmt::Debug for BackendSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .finish()
    }
}

/// Where the media catalog (the media server's item API) lives.
#[derive(Clone, Default)]
pub struct CatalogSettings {
    pub base_url: String,
    pub api_key: Option<String>,
}

impl fmt::Debug for CatalogSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub backend: BackendSettings,
    pub catalog: CatalogSettings,
    pub defaults: ShareDefaults,
    pub batch_concurrency: usize,
    pub http_timeout: Duration,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        // --- Load Server Settings ---
        let bind_address: SocketAddr = parse_var("BIND_ADDRESS", &var("BIND_ADDRESS", "0.0.0.0:3000"))?;

        let log_level_str = var("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Share Backend Settings ---
        let backend = BackendSettings::new(
            var("SHARE_BACKEND_URL", "http://localhost:8097"),
            var("SHARE_BACKEND_API_KEY", ""),
        );

        // --- Load Media Catalog Settings ---
        let catalog = CatalogSettings {
            base_url: var("MEDIA_SERVER_URL", "http://localhost:8096")
                .trim_end_matches('/')
                .to_string(),
            api_key: lookup("MEDIA_SERVER_API_KEY").filter(|key| !key.is_empty()),
        };

        // --- Load Share Defaults (0 = unlimited for the caps) ---
        let expiry_minutes: u32 = parse_var("DEFAULT_EXPIRY_MINUTES", &var("DEFAULT_EXPIRY_MINUTES", "1440"))?;
        if expiry_minutes == 0 {
            return Err(ConfigError::InvalidValue(
                "DEFAULT_EXPIRY_MINUTES".to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        let defaults = ShareDefaults {
            expiry_minutes,
            max_total_plays: parse_var("DEFAULT_MAX_PLAYS", &var("DEFAULT_MAX_PLAYS", "0"))?,
            max_concurrent_viewers: parse_var(
                "DEFAULT_MAX_CONCURRENT_VIEWERS",
                &var("DEFAULT_MAX_CONCURRENT_VIEWERS", "0"),
            )?,
        };

        // --- Load Outbound Call Settings ---
        let batch_concurrency: usize = parse_var("BATCH_CONCURRENCY", &var("BATCH_CONCURRENCY", "4"))?;
        if batch_concurrency == 0 {
            return Err(ConfigError::InvalidValue(
                "BATCH_CONCURRENCY".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        let timeout_secs: u64 = parse_var("BACKEND_TIMEOUT_SECS", &var("BACKEND_TIMEOUT_SECS", "30"))?;

        Ok(Self {
            bind_address,
            log_level,
            backend,
            catalog,
            defaults,
            batch_concurrency,
            http_timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// True iff the share backend URL and API key are both set.
    pub fn is_configured(&self) -> bool {
        self.backend.is_configured()
    }
}

fn parse_var<T>(name: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string()))
}
