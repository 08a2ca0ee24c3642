//! Constructor methods for SwitchyardError

use super::types::{AttemptFailure, QuotaWindowKind, SwitchyardError};

impl SwitchyardError {
    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            context: None,
        }
    }

    /// Create a configuration error with context
    pub fn config_with_context(message: impl Into<String>, context: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            context: Some(context.into()),
        }
    }

    /// Create an invalid input error naming the offending field
    pub fn invalid_input_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a new provider error
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
            provider: None,
            status_code: None,
        }
    }

    /// Create a provider error attributed to a named provider
    pub fn provider_with_name(message: impl Into<String>, provider: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
            provider: Some(provider.into()),
            status_code: None,
        }
    }

    /// Create a provider error with an HTTP status code
    pub fn provider_with_status(
        message: impl Into<String>,
        provider: impl Into<String>,
        status_code: u16,
    ) -> Self {
        Self::Provider {
            message: message.into(),
            provider: Some(provider.into()),
            status_code: Some(status_code),
        }
    }

    /// Create a timeout error attributed to a named provider
    pub fn timeout_with_provider(seconds: u64, provider: impl Into<String>) -> Self {
        Self::Timeout {
            seconds,
            provider: Some(provider.into()),
        }
    }

    /// Create a quota exceeded error listing every exhausted window
    pub fn quota_exceeded(message: impl Into<String>, windows: Vec<QuotaWindowKind>) -> Self {
        Self::QuotaExceeded {
            message: message.into(),
            windows,
        }
    }

    /// Create an aggregated dispatch failure from the per-candidate reasons
    pub fn all_providers_failed(failures: Vec<AttemptFailure>) -> Self {
        let message = if failures.is_empty() {
            "no candidate providers available".to_string()
        } else {
            format!("{} candidate(s) exhausted", failures.len())
        };
        Self::AllProvidersFailed { message, failures }
    }

    /// Create a new usage recording error
    pub fn recording(message: impl Into<String>) -> Self {
        Self::Recording {
            message: message.into(),
        }
    }

    /// Create an IO error with path
    pub fn io_with_path(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
            path: Some(path.into()),
        }
    }

    /// Create a generic error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}
