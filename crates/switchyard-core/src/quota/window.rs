//! Per-role consumption ceilings

use crate::error::SwitchyardResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Monthly token allowance for roles with no explicit configuration
pub const DEFAULT_MONTHLY_TOKEN_LIMIT: u64 = 100_000;

/// Role assumed for callers the policy has never heard of
pub const DEFAULT_ROLE: &str = "student";

/// Consumption ceilings for one role
///
/// Only the monthly token limit is mandatory. Daily, hourly, and cost
/// ceilings are checked only when configured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaWindow {
    /// Role this window applies to
    pub role: String,
    /// Tokens allowed per calendar month
    pub monthly_token_limit: u64,
    /// Tokens allowed per calendar day, if limited
    pub daily_token_limit: Option<u64>,
    /// Tokens allowed per clock hour, if limited
    pub hourly_token_limit: Option<u64>,
    /// Monthly spend ceiling in USD, if limited
    pub cost_limit_usd: Option<f64>,
    /// Monthly spend ceiling in BRL, if limited
    pub cost_limit_brl: Option<f64>,
}

impl Default for QuotaWindow {
    fn default() -> Self {
        Self::for_role(DEFAULT_ROLE)
    }
}

impl QuotaWindow {
    /// Create the default window for a role
    pub fn for_role(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            monthly_token_limit: DEFAULT_MONTHLY_TOKEN_LIMIT,
            daily_token_limit: None,
            hourly_token_limit: None,
            cost_limit_usd: None,
            cost_limit_brl: None,
        }
    }

    /// Set the monthly token limit
    pub fn with_monthly_limit(mut self, tokens: u64) -> Self {
        self.monthly_token_limit = tokens;
        self
    }

    /// Set a daily token limit
    pub fn with_daily_limit(mut self, tokens: u64) -> Self {
        self.daily_token_limit = Some(tokens);
        self
    }

    /// Set an hourly token limit
    pub fn with_hourly_limit(mut self, tokens: u64) -> Self {
        self.hourly_token_limit = Some(tokens);
        self
    }

    /// Set a monthly USD spend ceiling
    pub fn with_cost_limit_usd(mut self, usd: f64) -> Self {
        self.cost_limit_usd = Some(usd);
        self
    }

    /// Set a monthly BRL spend ceiling
    pub fn with_cost_limit_brl(mut self, brl: f64) -> Self {
        self.cost_limit_brl = Some(brl);
        self
    }
}

/// Resolves callers to roles and roles to quota windows
///
/// Deployments back this with their user directory; the in-tree
/// `StaticQuotaPolicy` covers tests and single-tenant setups.
#[async_trait]
pub trait QuotaPolicy: Send + Sync {
    /// Role of a caller
    async fn role_of(&self, user_id: &str) -> SwitchyardResult<String>;

    /// Quota window for a role
    async fn window_for(&self, role: &str) -> SwitchyardResult<QuotaWindow>;
}

/// Fixed role/window mapping
#[derive(Debug, Clone, Default)]
pub struct StaticQuotaPolicy {
    windows: HashMap<String, QuotaWindow>,
    user_roles: HashMap<String, String>,
    default_role: Option<String>,
}

impl StaticQuotaPolicy {
    /// Create an empty policy; every caller resolves to the default role and
    /// window
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a window under its role
    pub fn with_window(mut self, window: QuotaWindow) -> Self {
        self.windows.insert(window.role.clone(), window);
        self
    }

    /// Pin a caller to a role
    pub fn with_user_role(mut self, user_id: impl Into<String>, role: impl Into<String>) -> Self {
        self.user_roles.insert(user_id.into(), role.into());
        self
    }

    /// Override the fallback role
    pub fn with_default_role(mut self, role: impl Into<String>) -> Self {
        self.default_role = Some(role.into());
        self
    }
}

#[async_trait]
impl QuotaPolicy for StaticQuotaPolicy {
    async fn role_of(&self, user_id: &str) -> SwitchyardResult<String> {
        Ok(self
            .user_roles
            .get(user_id)
            .cloned()
            .or_else(|| self.default_role.clone())
            .unwrap_or_else(|| DEFAULT_ROLE.to_string()))
    }

    async fn window_for(&self, role: &str) -> SwitchyardResult<QuotaWindow> {
        Ok(self
            .windows
            .get(role)
            .cloned()
            .unwrap_or_else(|| QuotaWindow::for_role(role)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_users_get_default_role_and_window() {
        let policy = StaticQuotaPolicy::new();

        let role = policy.role_of("someone").await.unwrap();
        assert_eq!(role, DEFAULT_ROLE);

        let window = policy.window_for(&role).await.unwrap();
        assert_eq!(window.monthly_token_limit, DEFAULT_MONTHLY_TOKEN_LIMIT);
        assert!(window.daily_token_limit.is_none());
    }

    #[tokio::test]
    async fn explicit_mappings_take_precedence() {
        let policy = StaticQuotaPolicy::new()
            .with_window(
                QuotaWindow::for_role("teacher")
                    .with_monthly_limit(500_000)
                    .with_daily_limit(50_000),
            )
            .with_user_role("alice", "teacher");

        let role = policy.role_of("alice").await.unwrap();
        assert_eq!(role, "teacher");

        let window = policy.window_for(&role).await.unwrap();
        assert_eq!(window.monthly_token_limit, 500_000);
        assert_eq!(window.daily_token_limit, Some(50_000));
    }
}
