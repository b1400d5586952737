//! Configuration management

use std::{collections::HashMap, env, path::Path, time::Duration};

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};

use crate::endpoints::DEFAULT_BASE_URL;
use crate::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Environment files to load before resolving the token.
    /// Paths support ~ expansion. Loaded in order, later files override earlier.
    pub env_files: Vec<String>,
    /// Web API access
    pub api: ApiConfig,
    /// Features to apply, in order. Empty means every registered feature.
    pub features: Vec<String>,
    /// Pagination feature
    pub pagination: PaginationConfig,
    /// Rate limit feature
    pub rate_limit: RateLimitConfig,
    /// Response cache feature
    pub cache: CacheConfig,
}

/// Web API access configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Bearer token. Supports a literal value or `env:VAR_NAME`.
    pub token: Option<String>,
    /// API root
    pub base_url: String,
    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            token: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl ApiConfig {
    /// Resolve the token (expand `env:VAR_NAME`)
    #[must_use]
    pub fn resolve_token(&self) -> Option<String> {
        self.token.as_ref().and_then(|token| {
            if let Some(var_name) = token.strip_prefix("env:") {
                env::var(var_name).ok()
            } else {
                Some(token.clone())
            }
        })
    }
}

/// Pagination configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PaginationConfig {
    /// Page size requested from the API. Unset leaves it to the server.
    pub page_limit: Option<u32>,
    /// Extra or overriding endpoint -> result field entries
    pub fields: HashMap<String, String>,
}

/// Rate limit retry configuration
///
/// With neither cap set, rate-limited calls are retried until they succeed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Maximum attempts per call, including the first
    pub max_attempts: Option<u32>,
    /// Maximum total wait per call
    #[serde(with = "humantime_serde")]
    pub max_total_wait: Option<Duration>,
    /// Wait used when a rate-limit response carries no `Retry-After`
    #[serde(with = "humantime_serde")]
    pub default_retry_after: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_attempts: None,
            max_total_wait: None,
            default_retry_after: Duration::from_secs(1),
        }
    }
}

/// Response cache configuration
///
/// With neither bound set, the cache grows for the life of the client.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CacheConfig {
    /// Endpoints to cache in addition to the built-in allowlist
    pub extra_endpoints: Vec<String>,
    /// Built-in endpoints not to cache
    pub exclude: Vec<String>,
    /// Maximum number of entries before the oldest is evicted
    pub max_entries: Option<usize>,
    /// Time-to-live for entries
    #[serde(with = "humantime_serde")]
    pub ttl: Option<Duration>,
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// # Errors
    ///
    /// Returns an error if the config file does not exist or cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        // Load from file if provided
        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        // Merge environment variables (SLACK_PLUS_ prefix)
        figment = figment.merge(Env::prefixed("SLACK_PLUS_").split("__"));

        let config: Self = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        config.load_env_files();

        Ok(config)
    }

    /// Load environment files into the process environment.
    /// Supports ~ expansion. Files that don't exist are silently skipped.
    fn load_env_files(&self) {
        for path_str in &self.env_files {
            let expanded = if path_str.starts_with('~') {
                if let Some(home) = dirs::home_dir() {
                    path_str.replacen('~', &home.display().to_string(), 1)
                } else {
                    path_str.clone()
                }
            } else {
                path_str.clone()
            };

            let path = Path::new(&expanded);
            if path.exists() {
                match dotenvy::from_path(path) {
                    Ok(()) => {
                        tracing::info!("Loaded env file: {expanded}");
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load env file {expanded}: {e}");
                    }
                }
            } else {
                tracing::debug!("Env file not found (skipped): {expanded}");
            }
        }
    }
}
