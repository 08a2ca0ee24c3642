//! Provider health registry
//!
//! Health is a pure function of the consecutive-failure counter: a provider
//! is unhealthy once its failures reach the threshold, and becomes healthy
//! again only through a recorded success or an administrative reset. There is
//! no timer-based recovery; an unhealthy provider stays unhealthy until
//! something actually succeeds against it.

use crate::dispatch::ProviderId;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Consecutive failures at which a provider is considered unhealthy
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;

/// Snapshot of one provider's health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderStatus {
    /// Provider this snapshot describes
    pub provider_id: ProviderId,
    /// Whether the provider is currently considered usable
    pub healthy: bool,
    /// Consecutive failures since the last success or reset
    pub failures: u32,
    /// When the provider last failed
    pub last_failure_at: Option<DateTime<Utc>>,
    /// When the provider last succeeded
    pub last_success_at: Option<DateTime<Utc>>,
    /// The provider's rank in the configured fallback order, 1-based
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
}

#[derive(Debug, Default)]
struct HealthEntry {
    failures: u32,
    last_failure_at: Option<DateTime<Utc>>,
    last_success_at: Option<DateTime<Utc>>,
}

/// Shared, lock-striped health state for all providers
///
/// Cloning is cheap; all clones observe the same counters. Reads and writes
/// on different providers never contend. The read-then-dispatch-then-record
/// sequence is deliberately not transactional: health is a routing signal,
/// not a correctness gate.
#[derive(Debug, Clone)]
pub struct HealthRegistry {
    entries: Arc<DashMap<ProviderId, HealthEntry>>,
    failure_threshold: u32,
    priorities: Arc<HashMap<ProviderId, u32>>,
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthRegistry {
    /// Create a registry with the default failure threshold
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            priorities: Arc::new(HashMap::new()),
        }
    }

    /// Set the failure threshold (minimum 1)
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold.max(1);
        self
    }

    /// Teach the registry the fallback order so snapshots can report each
    /// provider's configured rank
    pub fn with_fallback_order(mut self, order: &[ProviderId]) -> Self {
        self.priorities = Arc::new(
            order
                .iter()
                .enumerate()
                .map(|(index, provider)| (provider.clone(), index as u32 + 1))
                .collect(),
        );
        self
    }

    /// The provider's 1-based rank in the configured fallback order
    pub fn priority_of(&self, provider: &ProviderId) -> Option<u32> {
        self.priorities.get(provider).copied()
    }

    /// The configured failure threshold
    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    /// Current status of a provider
    ///
    /// Unknown providers materialize as healthy with zero failures; asking
    /// never errors and never marks anything.
    pub fn status(&self, provider: &ProviderId) -> ProviderStatus {
        let entry = self.entries.entry(provider.clone()).or_default();
        ProviderStatus {
            provider_id: provider.clone(),
            healthy: entry.failures < self.failure_threshold,
            failures: entry.failures,
            last_failure_at: entry.last_failure_at,
            last_success_at: entry.last_success_at,
            priority: self.priority_of(provider),
        }
    }

    /// Whether a provider is currently considered usable
    pub fn is_healthy(&self, provider: &ProviderId) -> bool {
        self.status(provider).healthy
    }

    /// Consecutive failures recorded for a provider
    pub fn failures(&self, provider: &ProviderId) -> u32 {
        self.status(provider).failures
    }

    /// Record a failed attempt against a provider
    pub fn record_failure(&self, provider: &ProviderId) {
        let mut entry = self.entries.entry(provider.clone()).or_default();
        entry.failures += 1;
        entry.last_failure_at = Some(Utc::now());

        if entry.failures == self.failure_threshold {
            tracing::warn!(
                provider = %provider,
                failures = entry.failures,
                "provider marked unhealthy"
            );
        } else {
            tracing::debug!(
                provider = %provider,
                failures = entry.failures,
                "provider failure recorded"
            );
        }
    }

    /// Record a successful attempt against a provider
    ///
    /// One success clears the failure history entirely.
    pub fn record_success(&self, provider: &ProviderId) {
        let mut entry = self.entries.entry(provider.clone()).or_default();
        let was_unhealthy = entry.failures >= self.failure_threshold;
        entry.failures = 0;
        entry.last_success_at = Some(Utc::now());

        if was_unhealthy {
            tracing::info!(provider = %provider, "provider recovered");
        }
    }

    /// Administrative reset: clear the failure counter without claiming a
    /// success happened
    pub fn reset(&self, provider: &ProviderId) {
        let mut entry = self.entries.entry(provider.clone()).or_default();
        entry.failures = 0;
        tracing::info!(provider = %provider, "provider status reset");
    }

    /// Snapshot of every provider the registry has seen
    pub fn all_statuses(&self) -> HashMap<ProviderId, ProviderStatus> {
        self.entries
            .iter()
            .map(|entry| {
                let provider = entry.key().clone();
                let status = ProviderStatus {
                    provider_id: provider.clone(),
                    healthy: entry.failures < self.failure_threshold,
                    failures: entry.failures,
                    last_failure_at: entry.last_failure_at,
                    last_success_at: entry.last_success_at,
                    priority: self.priorities.get(entry.key()).copied(),
                };
                (provider, status)
            })
            .collect()
    }
}
