//! Usage records and the store they append to

use crate::dispatch::{ProviderId, TokenUsage};
use crate::error::SwitchyardResult;
use crate::pricing::Cost;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// One append-only usage ledger entry
///
/// `total_tokens` always equals `prompt_tokens + completion_tokens`; the
/// constructors enforce it. Failed dispatches are recorded too, with zero
/// tokens and the failure reason, so the ledger reflects attempts as well as
/// spend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaUsageRecord {
    /// Unique record ID
    pub id: String,
    /// Caller the usage is billed to
    pub user_id: String,
    /// Provider that served (or failed) the request
    pub provider: ProviderId,
    /// Model requested
    pub model: String,
    /// Prompt tokens consumed
    pub prompt_tokens: u32,
    /// Completion tokens generated
    pub completion_tokens: u32,
    /// Always `prompt_tokens + completion_tokens`
    pub total_tokens: u32,
    /// Cost in USD
    pub cost_usd: f64,
    /// Cost in BRL
    pub cost_brl: f64,
    /// Calling module, when known
    pub module: Option<String>,
    /// API endpoint the request arrived through, when known
    pub api_endpoint: Option<String>,
    /// Whether the dispatch succeeded
    pub success: bool,
    /// Failure reason for unsuccessful dispatches
    pub error_message: Option<String>,
    /// When the record was created
    pub timestamp: DateTime<Utc>,
}

impl QuotaUsageRecord {
    /// Create a success record from real provider token counts
    pub fn new(
        user_id: impl Into<String>,
        provider: ProviderId,
        model: impl Into<String>,
        usage: TokenUsage,
        cost: Cost,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            provider,
            model: model.into(),
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total(),
            cost_usd: cost.usd,
            cost_brl: cost.brl,
            module: None,
            api_endpoint: None,
            success: true,
            error_message: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a zero-token record for a dispatch that terminally failed
    pub fn failure(
        user_id: impl Into<String>,
        provider: ProviderId,
        model: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            provider,
            model: model.into(),
            prompt_tokens: 0,
            completion_tokens: 0,
            total_tokens: 0,
            cost_usd: 0.0,
            cost_brl: 0.0,
            module: None,
            api_endpoint: None,
            success: false,
            error_message: Some(error_message.into()),
            timestamp: Utc::now(),
        }
    }

    /// Set the calling module
    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    /// Set the API endpoint
    pub fn with_api_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.api_endpoint = Some(endpoint.into());
        self
    }
}

/// Aggregated usage over a time range
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct UsageTotals {
    /// Sum of `total_tokens`
    pub total_tokens: u64,
    /// Sum of USD costs
    pub cost_usd: f64,
    /// Sum of BRL costs
    pub cost_brl: f64,
    /// Number of records aggregated
    pub records: usize,
}

impl UsageTotals {
    /// Fold one record into the totals
    pub fn add(&mut self, record: &QuotaUsageRecord) {
        self.total_tokens += u64::from(record.total_tokens);
        self.cost_usd += record.cost_usd;
        self.cost_brl += record.cost_brl;
        self.records += 1;
    }
}

/// Durable, append-only usage ledger
///
/// Deployments back this with their database; the in-tree
/// `MemoryUsageStore` covers tests and dry-runs. `sum_usage` bounds are
/// inclusive on both ends.
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Append one record; existing records are never modified
    async fn append(&self, record: QuotaUsageRecord) -> SwitchyardResult<()>;

    /// Aggregate a caller's usage between `start` and `end` inclusive
    async fn sum_usage(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> SwitchyardResult<UsageTotals>;
}

/// In-memory ledger
#[derive(Debug, Clone, Default)]
pub struct MemoryUsageStore {
    records: Arc<RwLock<Vec<QuotaUsageRecord>>>,
}

impl MemoryUsageStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record, in append order
    pub async fn records(&self) -> Vec<QuotaUsageRecord> {
        self.records.read().await.clone()
    }

    /// Number of records held
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the store holds no records
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl UsageStore for MemoryUsageStore {
    async fn append(&self, record: QuotaUsageRecord) -> SwitchyardResult<()> {
        self.records.write().await.push(record);
        Ok(())
    }

    async fn sum_usage(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> SwitchyardResult<UsageTotals> {
        let records = self.records.read().await;
        let mut totals = UsageTotals::default();
        for record in records
            .iter()
            .filter(|r| r.user_id == user_id && r.timestamp >= start && r.timestamp <= end)
        {
            totals.add(record);
        }
        Ok(totals)
    }
}
