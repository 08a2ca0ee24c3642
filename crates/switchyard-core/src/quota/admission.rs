//! Quota admission checks
//!
//! Admission runs before any provider is contacted. The check projects the
//! request's estimated tokens onto the caller's calendar-aligned usage and
//! flags every window that would overflow. Cost ceilings are judged on
//! recorded spend only; estimates never price tokens.
//!
//! `check_quota` then `record_usage` is deliberately not transactional:
//! concurrent requests can overshoot a limit by a bounded amount. Quota here
//! is a soft budget, not an accounting ledger.

use super::recorder::{UsageRecorder, DEFAULT_QUEUE_CAPACITY};
use super::usage::{QuotaUsageRecord, UsageStore};
use super::window::QuotaPolicy;
use crate::error::{QuotaWindowKind, SwitchyardResult};
use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Estimate the token footprint of a request text
///
/// The admission heuristic is one token per four characters, rounded up.
/// Real token counts come from the provider afterwards.
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() as u64).div_ceil(4)
}

/// Verdict of an admission check
///
/// Every exceeded window is flagged; a rejection reason names all of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaDecision {
    /// Whether the request may proceed
    pub allowed: bool,
    /// Human-readable rejection (or fail-open) explanation
    pub reason: Option<String>,
    /// Monthly tokens left if this request proceeds; negative on overshoot
    pub remaining_tokens: i64,
    /// Monthly token ceiling would overflow
    pub monthly_limit_exceeded: bool,
    /// Daily token ceiling would overflow
    pub daily_limit_exceeded: bool,
    /// Hourly token ceiling would overflow
    pub hourly_limit_exceeded: bool,
    /// Recorded spend is at or past a cost ceiling
    pub cost_limit_exceeded: bool,
}

impl QuotaDecision {
    /// Verdict used when the usage ledger cannot be read: allow and say so
    pub fn fail_open() -> Self {
        Self {
            allowed: true,
            reason: Some("quota check unavailable; allowing request".to_string()),
            remaining_tokens: 0,
            monthly_limit_exceeded: false,
            daily_limit_exceeded: false,
            hourly_limit_exceeded: false,
            cost_limit_exceeded: false,
        }
    }

    /// The exceeded windows, in check order
    pub fn exceeded_windows(&self) -> Vec<QuotaWindowKind> {
        let mut windows = Vec::new();
        if self.monthly_limit_exceeded {
            windows.push(QuotaWindowKind::Monthly);
        }
        if self.daily_limit_exceeded {
            windows.push(QuotaWindowKind::Daily);
        }
        if self.hourly_limit_exceeded {
            windows.push(QuotaWindowKind::Hourly);
        }
        if self.cost_limit_exceeded {
            windows.push(QuotaWindowKind::Cost);
        }
        windows
    }
}

/// Point-in-time quota report for the operator surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaStatusReport {
    /// Caller the report describes
    pub user_id: String,
    /// Resolved role
    pub role: String,
    /// Calendar month the totals cover, as `YYYY-MM`
    pub month: String,
    /// Monthly token ceiling
    pub token_limit: u64,
    /// Tokens consumed this month
    pub tokens_used: u64,
    /// Tokens left this month; negative on overshoot
    pub remaining_tokens: i64,
    /// Share of the monthly ceiling consumed, in percent
    pub percentage_used: f64,
    /// Tokens consumed today
    pub daily_tokens_used: u64,
    /// Tokens consumed this hour
    pub hourly_tokens_used: u64,
    /// Spend this month in USD
    pub cost_usd: f64,
    /// Spend this month in BRL
    pub cost_brl: f64,
}

/// Gate that admits or rejects requests against per-role quota windows
pub struct QuotaAdmissionController {
    policy: Arc<dyn QuotaPolicy>,
    store: Arc<dyn UsageStore>,
    recorder: UsageRecorder,
}

impl QuotaAdmissionController {
    /// Create a controller and spawn its usage recorder
    pub fn new(policy: Arc<dyn QuotaPolicy>, store: Arc<dyn UsageStore>) -> Self {
        let recorder = UsageRecorder::spawn(store.clone(), DEFAULT_QUEUE_CAPACITY);
        Self {
            policy,
            store,
            recorder,
        }
    }

    /// Check whether a request estimated at `estimated_tokens` may proceed
    ///
    /// A failing ledger read allows the request; rejecting real traffic on
    /// infrastructure noise costs more than a bounded overshoot.
    pub async fn check_quota(&self, user_id: &str, estimated_tokens: u64) -> QuotaDecision {
        match self.evaluate(user_id, estimated_tokens).await {
            Ok(decision) => decision,
            Err(error) => {
                tracing::error!(
                    user_id,
                    error = %error,
                    "quota check failed; failing open"
                );
                QuotaDecision::fail_open()
            }
        }
    }

    /// Queue a usage record for asynchronous persistence
    pub fn record_usage(&self, record: QuotaUsageRecord) {
        self.recorder.enqueue(record);
    }

    /// The recorder handle, for overload inspection
    pub fn recorder(&self) -> &UsageRecorder {
        &self.recorder
    }

    /// Drain queued records and stop the recorder
    pub async fn shutdown(&self) {
        self.recorder.shutdown().await;
    }

    /// Current consumption report for a caller
    pub async fn quota_status(&self, user_id: &str) -> SwitchyardResult<QuotaStatusReport> {
        let now = Utc::now();
        let role = self.policy.role_of(user_id).await?;
        let window = self.policy.window_for(&role).await?;

        let monthly = self.store.sum_usage(user_id, month_start(now), now).await?;
        let daily = self.store.sum_usage(user_id, day_start(now), now).await?;
        let hourly = self.store.sum_usage(user_id, hour_start(now), now).await?;

        let used = monthly.total_tokens;
        let limit = window.monthly_token_limit;
        let percentage_used = if limit == 0 {
            100.0
        } else {
            (used as f64 / limit as f64) * 100.0
        };

        Ok(QuotaStatusReport {
            user_id: user_id.to_string(),
            role,
            month: now.format("%Y-%m").to_string(),
            token_limit: limit,
            tokens_used: used,
            remaining_tokens: limit as i64 - used as i64,
            percentage_used,
            daily_tokens_used: daily.total_tokens,
            hourly_tokens_used: hourly.total_tokens,
            cost_usd: monthly.cost_usd,
            cost_brl: monthly.cost_brl,
        })
    }

    async fn evaluate(
        &self,
        user_id: &str,
        estimated_tokens: u64,
    ) -> SwitchyardResult<QuotaDecision> {
        let now = Utc::now();
        let role = self.policy.role_of(user_id).await?;
        let window = self.policy.window_for(&role).await?;

        let monthly = self.store.sum_usage(user_id, month_start(now), now).await?;
        let monthly_projected = monthly.total_tokens + estimated_tokens;
        let monthly_limit_exceeded = monthly_projected > window.monthly_token_limit;

        let mut reasons = Vec::new();
        if monthly_limit_exceeded {
            reasons.push(format!(
                "monthly token limit {} reached",
                window.monthly_token_limit
            ));
        }

        let mut daily_limit_exceeded = false;
        if let Some(limit) = window.daily_token_limit {
            let daily = self.store.sum_usage(user_id, day_start(now), now).await?;
            daily_limit_exceeded = daily.total_tokens + estimated_tokens > limit;
            if daily_limit_exceeded {
                reasons.push(format!("daily token limit {} reached", limit));
            }
        }

        let mut hourly_limit_exceeded = false;
        if let Some(limit) = window.hourly_token_limit {
            let hourly = self.store.sum_usage(user_id, hour_start(now), now).await?;
            hourly_limit_exceeded = hourly.total_tokens + estimated_tokens > limit;
            if hourly_limit_exceeded {
                reasons.push(format!("hourly token limit {} reached", limit));
            }
        }

        let mut cost_limit_exceeded = false;
        if let Some(limit) = window.cost_limit_usd {
            if monthly.cost_usd >= limit {
                cost_limit_exceeded = true;
                reasons.push(format!("monthly cost limit ${:.2} reached", limit));
            }
        }
        if let Some(limit) = window.cost_limit_brl {
            if monthly.cost_brl >= limit {
                if !cost_limit_exceeded {
                    reasons.push(format!("monthly cost limit R${:.2} reached", limit));
                }
                cost_limit_exceeded = true;
            }
        }

        let allowed = reasons.is_empty();
        Ok(QuotaDecision {
            allowed,
            reason: if allowed {
                None
            } else {
                Some(reasons.join("; "))
            },
            remaining_tokens: window.monthly_token_limit as i64 - monthly_projected as i64,
            monthly_limit_exceeded,
            daily_limit_exceeded,
            hourly_limit_exceeded,
            cost_limit_exceeded,
        })
    }
}

fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

fn day_start(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), now.day(), 0, 0, 0)
        .single()
        .unwrap_or(now)
}

fn hour_start(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), now.day(), now.hour(), 0, 0)
        .single()
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{ProviderId, TokenUsage};
    use crate::error::SwitchyardError;
    use crate::pricing::Cost;
    use crate::quota::usage::{MemoryUsageStore, UsageTotals};
    use crate::quota::window::{QuotaWindow, StaticQuotaPolicy};
    use async_trait::async_trait;

    fn usage_record(user: &str, tokens: u32, cost_usd: f64) -> QuotaUsageRecord {
        QuotaUsageRecord::new(
            user,
            ProviderId::OpenAI,
            "gpt-4o-mini",
            TokenUsage::new(tokens, 0),
            Cost {
                usd: cost_usd,
                brl: cost_usd * 5.5,
            },
        )
    }

    fn controller(policy: StaticQuotaPolicy, store: Arc<MemoryUsageStore>) -> QuotaAdmissionController {
        QuotaAdmissionController::new(Arc::new(policy), store)
    }

    #[test]
    fn estimation_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
        // Multibyte characters count as characters, not bytes.
        assert_eq!(estimate_tokens("ação"), 1);
    }

    #[tokio::test]
    async fn requests_within_limits_are_allowed() {
        let store = Arc::new(MemoryUsageStore::new());
        let controller = controller(StaticQuotaPolicy::new(), store);

        let decision = controller.check_quota("user-1", 100).await;
        assert!(decision.allowed);
        assert!(decision.reason.is_none());
        assert_eq!(decision.remaining_tokens, 99_900);
        assert!(decision.exceeded_windows().is_empty());
    }

    #[tokio::test]
    async fn projection_crossing_monthly_limit_flags_monthly_only() {
        let store = Arc::new(MemoryUsageStore::new());
        store.append(usage_record("user-1", 99_990, 0.0)).await.unwrap();
        let controller = controller(StaticQuotaPolicy::new(), store);

        let decision = controller.check_quota("user-1", 20).await;
        assert!(!decision.allowed);
        assert!(decision.monthly_limit_exceeded);
        assert!(!decision.daily_limit_exceeded);
        assert!(!decision.hourly_limit_exceeded);
        assert!(!decision.cost_limit_exceeded);
        assert_eq!(decision.remaining_tokens, -10);
        assert!(decision.reason.as_deref().unwrap_or("").contains("monthly"));
    }

    #[tokio::test]
    async fn reaching_the_limit_exactly_is_allowed() {
        let store = Arc::new(MemoryUsageStore::new());
        store.append(usage_record("user-1", 99_900, 0.0)).await.unwrap();
        let controller = controller(StaticQuotaPolicy::new(), store);

        let decision = controller.check_quota("user-1", 100).await;
        assert!(decision.allowed);
        assert_eq!(decision.remaining_tokens, 0);
    }

    #[tokio::test]
    async fn every_exceeded_window_is_flagged() {
        let store = Arc::new(MemoryUsageStore::new());
        store.append(usage_record("user-1", 990, 0.6)).await.unwrap();

        let policy = StaticQuotaPolicy::new().with_window(
            QuotaWindow::for_role("student")
                .with_monthly_limit(1_000)
                .with_daily_limit(100)
                .with_hourly_limit(10)
                .with_cost_limit_usd(0.5),
        );
        let controller = controller(policy, store);

        let decision = controller.check_quota("user-1", 50).await;
        assert!(!decision.allowed);
        assert_eq!(
            decision.exceeded_windows(),
            vec![
                QuotaWindowKind::Monthly,
                QuotaWindowKind::Daily,
                QuotaWindowKind::Hourly,
                QuotaWindowKind::Cost,
            ]
        );
        let reason = decision.reason.unwrap();
        assert!(reason.contains("monthly token limit"));
        assert!(reason.contains("daily token limit"));
        assert!(reason.contains("hourly token limit"));
        assert!(reason.contains("cost limit"));
    }

    #[tokio::test]
    async fn unconfigured_windows_are_not_checked() {
        let store = Arc::new(MemoryUsageStore::new());
        // Well past any plausible hourly budget, but none is configured.
        store.append(usage_record("user-1", 50_000, 0.0)).await.unwrap();
        let controller = controller(StaticQuotaPolicy::new(), store);

        let decision = controller.check_quota("user-1", 10).await;
        assert!(decision.allowed);
        assert!(!decision.hourly_limit_exceeded);
        assert!(!decision.daily_limit_exceeded);
    }

    struct BrokenStore;

    #[async_trait]
    impl UsageStore for BrokenStore {
        async fn append(&self, _record: QuotaUsageRecord) -> crate::error::SwitchyardResult<()> {
            Err(SwitchyardError::recording("ledger unavailable"))
        }

        async fn sum_usage(
            &self,
            _user_id: &str,
            _start: chrono::DateTime<Utc>,
            _end: chrono::DateTime<Utc>,
        ) -> crate::error::SwitchyardResult<UsageTotals> {
            Err(SwitchyardError::other("connection refused"))
        }
    }

    #[tokio::test]
    async fn ledger_failure_fails_open() {
        let controller =
            QuotaAdmissionController::new(Arc::new(StaticQuotaPolicy::new()), Arc::new(BrokenStore));

        let decision = controller.check_quota("user-1", 10_000_000).await;
        assert!(decision.allowed);
        assert!(decision.reason.is_some());
        assert!(decision.exceeded_windows().is_empty());
    }

    #[tokio::test]
    async fn status_report_reflects_consumption() {
        let store = Arc::new(MemoryUsageStore::new());
        store.append(usage_record("user-1", 25_000, 1.0)).await.unwrap();
        let controller = controller(StaticQuotaPolicy::new(), store);

        let report = controller.quota_status("user-1").await.unwrap();
        assert_eq!(report.role, "student");
        assert_eq!(report.token_limit, 100_000);
        assert_eq!(report.tokens_used, 25_000);
        assert_eq!(report.remaining_tokens, 75_000);
        assert!((report.percentage_used - 25.0).abs() < 1e-9);
        assert_eq!(report.daily_tokens_used, 25_000);
        assert_eq!(report.hourly_tokens_used, 25_000);
        assert!((report.cost_brl - 5.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn recorded_usage_flows_through_the_recorder() {
        let store = Arc::new(MemoryUsageStore::new());
        let controller = controller(StaticQuotaPolicy::new(), store.clone());

        controller.record_usage(usage_record("user-1", 42, 0.0));
        controller.shutdown().await;

        assert_eq!(store.len().await, 1);
        let decision = controller.check_quota("user-1", 0).await;
        assert_eq!(decision.remaining_tokens, 100_000 - 42);
    }
}
