//! Error classification predicates
//!
//! Providers report failures as free-form messages with inconsistent shapes.
//! These predicates sniff the well-known patterns so dispatch logging and the
//! operator surface can label a failure without parsing provider payloads.

use super::types::SwitchyardError;

/// Quota and rate-limit signatures seen across provider APIs
pub(super) fn is_quota_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    ["quota", "rate limit", "limit exceeded", "too many requests", "429", "rate_limit_exceeded"]
        .iter()
        .any(|kw| lower.contains(kw))
}

/// Credential failure signatures
pub(super) fn is_auth_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    ["api key", "authentication", "unauthorized", "401", "invalid_api_key"]
        .iter()
        .any(|kw| lower.contains(kw))
}

/// Transient infrastructure failure signatures
pub(super) fn is_transient_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    ["503", "502", "504", "overloaded", "timeout", "timed out", "connection", "network"]
        .iter()
        .any(|kw| lower.contains(kw))
}

impl SwitchyardError {
    /// True when the error signals exhausted quota or rate limiting,
    /// either local admission or a provider-side 429-class failure.
    pub fn is_quota_error(&self) -> bool {
        match self {
            Self::QuotaExceeded { .. } => true,
            Self::Provider {
                message,
                status_code,
                ..
            } => *status_code == Some(429) || is_quota_message(message),
            _ => false,
        }
    }

    /// True when the error signals a credential problem with a provider.
    pub fn is_auth_error(&self) -> bool {
        match self {
            Self::Provider {
                message,
                status_code,
                ..
            } => matches!(status_code, Some(401) | Some(403)) || is_auth_message(message),
            _ => false,
        }
    }

    /// True when a later attempt against a different provider could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Provider {
                message,
                status_code,
                ..
            } => match status_code {
                Some(429) | Some(500..=599) => true,
                _ => is_transient_message(message),
            },
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_messages_are_detected() {
        let err = SwitchyardError::provider_with_name("Rate limit exceeded for model", "openai");
        assert!(err.is_quota_error());
        assert!(!err.is_auth_error());

        let err = SwitchyardError::provider_with_status("Too Many Requests", "google", 429);
        assert!(err.is_quota_error());
        assert!(err.is_retryable());
    }

    #[test]
    fn auth_messages_are_detected() {
        let err = SwitchyardError::provider_with_name("Invalid API key provided", "anthropic");
        assert!(err.is_auth_error());
        assert!(!err.is_retryable());

        let err = SwitchyardError::provider_with_status("Forbidden", "openai", 403);
        assert!(err.is_auth_error());
    }

    #[test]
    fn transient_failures_are_retryable() {
        assert!(SwitchyardError::provider("connection reset by peer").is_retryable());
        assert!(SwitchyardError::provider("503 Service Unavailable").is_retryable());
        assert!(SwitchyardError::timeout_with_provider(30, "openai").is_retryable());
        assert!(!SwitchyardError::provider("model not found").is_retryable());
    }

    #[test]
    fn local_quota_rejection_counts_as_quota_error() {
        let err = SwitchyardError::quota_exceeded(
            "monthly token limit reached",
            vec![super::super::types::QuotaWindowKind::Monthly],
        );
        assert!(err.is_quota_error());
        assert!(!err.is_retryable());
    }
}
