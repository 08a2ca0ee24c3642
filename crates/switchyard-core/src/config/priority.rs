//! Runtime-adjustable API priority policy
//!
//! One shared handle is consulted across the pipeline: the cache honors the
//! cache policy at lookup time, the orchestrator honors the retry policy when
//! sizing its candidate list, and web-search routing is gated on the
//! `web_search` domain mode. Readers always get an immutable snapshot;
//! updates apply to subsequent reads, never retroactively.

use crate::error::{SwitchyardError, SwitchyardResult};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Default response cache time-to-live
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Default fallback breadth beyond the first candidate
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// How a functional domain should treat the external API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PriorityMode {
    /// Prefer the external API
    ApiFirst,
    /// Prefer local handling, fall back to the API
    LocalFirst,
    /// Never call the external API for this domain
    LocalOnly,
}

impl std::fmt::Display for PriorityMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ApiFirst => write!(f, "api-first"),
            Self::LocalFirst => write!(f, "local-first"),
            Self::LocalOnly => write!(f, "local-only"),
        }
    }
}

impl std::str::FromStr for PriorityMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "api-first" => Ok(Self::ApiFirst),
            "local-first" => Ok(Self::LocalFirst),
            "local-only" => Ok(Self::LocalOnly),
            other => Err(format!("unknown priority mode: {}", other)),
        }
    }
}

/// Response cache policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachePolicy {
    /// Whether responses may be cached at all
    pub enabled: bool,
    /// How long a cached response stays fresh
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: DEFAULT_CACHE_TTL,
        }
    }
}

/// Fallback retry policy
///
/// `max` bounds how many additional candidates dispatch may try after the
/// first; it never means retrying the same provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Whether fallback beyond the first candidate is allowed
    pub enabled: bool,
    /// Additional candidates allowed when enabled
    pub max: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max: DEFAULT_MAX_RETRIES,
        }
    }
}

/// The policy value: domain modes plus cache and retry policies
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiPriorityConfig {
    /// Per-domain API usage modes; unknown domains default to api-first
    #[serde(default)]
    pub domains: HashMap<String, PriorityMode>,
    /// Response cache policy
    #[serde(default)]
    pub cache: CachePolicy,
    /// Fallback retry policy
    #[serde(default)]
    pub retries: RetryPolicy,
}

/// Partial update; each present field replaces its counterpart wholesale
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiPriorityUpdate {
    /// Replace the whole domain map
    pub domains: Option<HashMap<String, PriorityMode>>,
    /// Replace the cache policy
    pub cache: Option<CachePolicy>,
    /// Replace the retry policy
    pub retries: Option<RetryPolicy>,
}

/// Shared live handle over the priority policy
///
/// Cloning is cheap; all clones observe the same policy.
#[derive(Debug, Clone, Default)]
pub struct ApiPriority {
    inner: Arc<RwLock<ApiPriorityConfig>>,
}

impl ApiPriority {
    /// Wrap a policy value in a live handle
    pub fn new(config: ApiPriorityConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Initialize from `SWITCHYARD_*` environment variables
    ///
    /// Recognized: `SWITCHYARD_API_PRIORITY` (comma-separated
    /// `domain=mode` pairs), `SWITCHYARD_CACHE_ENABLED`,
    /// `SWITCHYARD_CACHE_TTL_SECS`, `SWITCHYARD_RETRIES_ENABLED`,
    /// `SWITCHYARD_MAX_RETRIES`. Unset variables keep their defaults;
    /// malformed values are configuration errors.
    pub fn from_env() -> SwitchyardResult<Self> {
        let mut config = ApiPriorityConfig::default();

        if let Ok(value) = std::env::var("SWITCHYARD_API_PRIORITY") {
            for pair in value.split(',').filter(|p| !p.trim().is_empty()) {
                let (domain, mode) = pair.split_once('=').ok_or_else(|| {
                    SwitchyardError::config(format!(
                        "invalid SWITCHYARD_API_PRIORITY entry: {}",
                        pair
                    ))
                })?;
                let mode = mode.trim().parse::<PriorityMode>().map_err(|e| {
                    SwitchyardError::config(format!("invalid SWITCHYARD_API_PRIORITY: {}", e))
                })?;
                config.domains.insert(domain.trim().to_string(), mode);
            }
        }

        if let Ok(value) = std::env::var("SWITCHYARD_CACHE_ENABLED") {
            config.cache.enabled = parse_bool("SWITCHYARD_CACHE_ENABLED", &value)?;
        }

        if let Ok(value) = std::env::var("SWITCHYARD_CACHE_TTL_SECS") {
            let secs = value.parse::<u64>().map_err(|_| {
                SwitchyardError::config(format!(
                    "invalid SWITCHYARD_CACHE_TTL_SECS value: {}",
                    value
                ))
            })?;
            config.cache.ttl = Duration::from_secs(secs);
        }

        if let Ok(value) = std::env::var("SWITCHYARD_RETRIES_ENABLED") {
            config.retries.enabled = parse_bool("SWITCHYARD_RETRIES_ENABLED", &value)?;
        }

        if let Ok(value) = std::env::var("SWITCHYARD_MAX_RETRIES") {
            config.retries.max = value.parse::<u32>().map_err(|_| {
                SwitchyardError::config(format!("invalid SWITCHYARD_MAX_RETRIES value: {}", value))
            })?;
        }

        Ok(Self::new(config))
    }

    /// Immutable snapshot of the current policy
    pub fn get(&self) -> ApiPriorityConfig {
        self.inner.read().clone()
    }

    /// Apply a partial update; present fields replace wholesale
    pub fn update(&self, update: ApiPriorityUpdate) {
        let mut guard = self.inner.write();
        if let Some(domains) = update.domains {
            guard.domains = domains;
        }
        if let Some(cache) = update.cache {
            guard.cache = cache;
        }
        if let Some(retries) = update.retries {
            guard.retries = retries;
        }
        tracing::info!(
            domains = guard.domains.len(),
            cache_enabled = guard.cache.enabled,
            retries_enabled = guard.retries.enabled,
            "api priority policy updated"
        );
    }

    /// Mode for a domain; unknown domains are api-first
    pub fn mode(&self, domain: &str) -> PriorityMode {
        self.inner
            .read()
            .domains
            .get(domain)
            .copied()
            .unwrap_or(PriorityMode::ApiFirst)
    }

    /// Whether the external API may be used for a domain
    pub fn should_use_api(&self, domain: &str) -> bool {
        self.mode(domain) != PriorityMode::LocalOnly
    }

    /// Whether responses may be cached
    pub fn should_cache(&self) -> bool {
        self.inner.read().cache.enabled
    }

    /// Cache time-to-live
    pub fn cache_ttl(&self) -> Duration {
        self.inner.read().cache.ttl
    }

    /// Whether dispatch may try candidates beyond the first
    pub fn should_retry(&self) -> bool {
        self.inner.read().retries.enabled
    }

    /// Additional candidates allowed after the first
    pub fn max_retries(&self) -> u32 {
        self.inner.read().retries.max
    }
}

fn parse_bool(name: &str, value: &str) -> SwitchyardResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(SwitchyardError::config(format!(
            "invalid {} value: {}",
            name, value
        ))),
    }
}
