//! Router configuration value types
//!
//! `RouterConfig` is plain data: it carries the fallback order, thresholds,
//! timeouts, vocabularies, and quota windows, and knows how to merge one
//! layer over another and validate the result. Components receive the pieces
//! they need at construction time; nothing reads configuration globally.

use crate::classify::{KeywordConfig, RoutingTable};
use crate::dispatch::{
    default_fallback_models, default_fallback_order, ModelTiers, ProviderId,
    DEFAULT_ATTEMPT_TIMEOUT,
};
use crate::error::{SwitchyardError, SwitchyardResult};
use crate::pricing::DEFAULT_USD_TO_BRL;
use crate::quota::{QuotaWindow, StaticQuotaPolicy, DEFAULT_ROLE};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Attempt timeouts per provider
///
/// Slow providers get more room; the tiers come from the deployed platform's
/// observed latencies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderTimeouts {
    /// OpenAI attempt timeout
    #[serde(with = "humantime_serde")]
    pub openai: Duration,
    /// Google attempt timeout
    #[serde(with = "humantime_serde")]
    pub google: Duration,
    /// Anthropic attempt timeout
    #[serde(with = "humantime_serde")]
    pub anthropic: Duration,
    /// Perplexity attempt timeout
    #[serde(with = "humantime_serde")]
    pub perplexity: Duration,
    /// Timeout for providers not listed above
    #[serde(with = "humantime_serde")]
    pub other: Duration,
}

impl Default for ProviderTimeouts {
    fn default() -> Self {
        Self {
            openai: Duration::from_secs(30),
            google: Duration::from_secs(45),
            anthropic: Duration::from_secs(60),
            perplexity: Duration::from_secs(45),
            other: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }
}

impl ProviderTimeouts {
    /// Timeout for one provider
    pub fn for_provider(&self, provider: &ProviderId) -> Duration {
        match provider {
            ProviderId::OpenAI => self.openai,
            ProviderId::Google => self.google,
            ProviderId::Anthropic => self.anthropic,
            ProviderId::Perplexity => self.perplexity,
            ProviderId::Custom(_) => self.other,
        }
    }

    /// The timeouts as the orchestrator's per-provider map
    pub fn to_map(&self) -> HashMap<ProviderId, Duration> {
        HashMap::from([
            (ProviderId::OpenAI, self.openai),
            (ProviderId::Google, self.google),
            (ProviderId::Anthropic, self.anthropic),
            (ProviderId::Perplexity, self.perplexity),
        ])
    }
}

/// Quota section: per-role windows and the billing conversion rate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotaConfig {
    /// Role assumed for callers with no explicit mapping
    pub default_role: String,
    /// USD to BRL conversion rate for recorded costs
    pub fx_rate: f64,
    /// Per-role windows; roles not listed get the default window
    pub roles: Vec<QuotaWindow>,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            default_role: DEFAULT_ROLE.to_string(),
            fx_rate: DEFAULT_USD_TO_BRL,
            roles: Vec::new(),
        }
    }
}

impl QuotaConfig {
    /// Build the static policy these windows describe
    pub fn to_policy(&self) -> StaticQuotaPolicy {
        let mut policy = StaticQuotaPolicy::new().with_default_role(self.default_role.clone());
        for window in &self.roles {
            policy = policy.with_window(window.clone());
        }
        policy
    }

    /// Merge another quota section over this one
    pub fn merge(&mut self, other: QuotaConfig) {
        if !other.default_role.is_empty() {
            self.default_role = other.default_role;
        }
        if other.fx_rate > 0.0 {
            self.fx_rate = other.fx_rate;
        }
        if !other.roles.is_empty() {
            self.roles = other.roles;
        }
    }
}

/// Logging section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Output format: "text" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Merge another logging section over this one
    pub fn merge(&mut self, other: LoggingConfig) {
        if !other.level.is_empty() {
            self.level = other.level;
        }
        if !other.format.is_empty() {
            self.format = other.format;
        }
    }

    /// Validate the section
    pub fn validate(&self) -> SwitchyardResult<()> {
        match self.format.as_str() {
            "text" | "json" => Ok(()),
            other => Err(SwitchyardError::config(format!(
                "unknown log format: {} (expected text or json)",
                other
            ))),
        }
    }
}

/// The full router configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Providers in fallback priority order
    pub fallback_order: Vec<ProviderId>,
    /// Consecutive failures at which a provider is considered unhealthy
    pub failure_threshold: u32,
    /// Per-provider attempt timeouts
    pub timeouts: ProviderTimeouts,
    /// Per-provider default models by complexity, keyed by provider name
    pub default_models: HashMap<String, ModelTiers>,
    /// Provider selection table
    pub routing: RoutingTable,
    /// Classifier vocabulary
    pub keywords: KeywordConfig,
    /// Quota windows and billing rate
    pub quota: QuotaConfig,
    /// Response cache capacity in entries
    pub cache_capacity: usize,
    /// Logging section
    pub logging: LoggingConfig,
}

impl Default for RouterConfig {
    fn default() -> Self {
        let default_models = default_fallback_models()
            .into_iter()
            .map(|(provider, tiers)| (provider.to_string(), tiers))
            .collect();
        Self {
            fallback_order: default_fallback_order(),
            failure_threshold: crate::health::DEFAULT_FAILURE_THRESHOLD,
            timeouts: ProviderTimeouts::default(),
            default_models,
            routing: RoutingTable::default(),
            keywords: KeywordConfig::default(),
            quota: QuotaConfig::default(),
            cache_capacity: 128,
            logging: LoggingConfig::default(),
        }
    }
}

impl RouterConfig {
    /// Fallback model tiers as the orchestrator's per-provider map
    ///
    /// Unparseable keys cannot occur: every string resolves to a provider id,
    /// unknown names becoming `Custom`.
    pub fn fallback_models(&self) -> HashMap<ProviderId, ModelTiers> {
        self.default_models
            .iter()
            .filter_map(|(name, tiers)| {
                name.parse::<ProviderId>()
                    .ok()
                    .map(|provider| (provider, tiers.clone()))
            })
            .collect()
    }

    /// Merge another configuration layer over this one
    ///
    /// Later sources win; empty or zero fields in `other` leave this layer's
    /// value in place.
    pub fn merge(&mut self, other: RouterConfig) {
        if !other.fallback_order.is_empty() {
            self.fallback_order = other.fallback_order;
        }
        if other.failure_threshold > 0 {
            self.failure_threshold = other.failure_threshold;
        }
        self.timeouts = other.timeouts;
        if !other.default_models.is_empty() {
            self.default_models = other.default_models;
        }
        self.routing.merge(other.routing);
        self.keywords.merge(other.keywords);
        self.quota.merge(other.quota);
        if other.cache_capacity > 0 {
            self.cache_capacity = other.cache_capacity;
        }
        self.logging.merge(other.logging);
    }

    /// Validate the merged configuration
    pub fn validate(&self) -> SwitchyardResult<()> {
        if self.fallback_order.is_empty() {
            return Err(SwitchyardError::config("fallback_order cannot be empty"));
        }
        let mut seen = Vec::with_capacity(self.fallback_order.len());
        for provider in &self.fallback_order {
            if seen.contains(&provider) {
                return Err(SwitchyardError::config(format!(
                    "fallback_order lists {} more than once",
                    provider
                )));
            }
            seen.push(provider);
        }
        if self.failure_threshold == 0 {
            return Err(SwitchyardError::config(
                "failure_threshold must be at least 1",
            ));
        }
        if self.cache_capacity == 0 {
            return Err(SwitchyardError::config(
                "cache_capacity must be at least 1",
            ));
        }
        if self.quota.fx_rate <= 0.0 {
            return Err(SwitchyardError::config("quota.fx_rate must be positive"));
        }
        self.logging.validate()?;
        Ok(())
    }
}
