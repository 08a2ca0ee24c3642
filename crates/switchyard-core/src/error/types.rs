//! Core error types for the switchyard routing pipeline

use thiserror::Error;

/// Result type alias for switchyard operations
pub type SwitchyardResult<T> = Result<T, SwitchyardError>;

/// A consumption window that an admission check found exhausted.
///
/// `QuotaExceeded` carries every window that would overflow, not just the
/// first one checked, so callers can report the full picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuotaWindowKind {
    Monthly,
    Daily,
    Hourly,
    Cost,
}

impl std::fmt::Display for QuotaWindowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Monthly => write!(f, "monthly"),
            Self::Daily => write!(f, "daily"),
            Self::Hourly => write!(f, "hourly"),
            Self::Cost => write!(f, "cost"),
        }
    }
}

/// One failed dispatch attempt, kept verbatim inside `AllProvidersFailed`.
#[derive(Debug, Clone)]
pub struct AttemptFailure {
    /// Provider name (lowercase id)
    pub provider: String,
    /// The attempt's error, rendered to a string
    pub reason: String,
}

impl std::fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.provider, self.reason)
    }
}

/// Main error type for the switchyard pipeline
///
/// Each variant includes contextual information where relevant. Variants that
/// carry structured payloads (`QuotaExceeded`, `AllProvidersFailed`) never
/// collapse them into a bare message.
#[derive(Error, Debug, Clone)]
pub enum SwitchyardError {
    /// Configuration related errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        context: Option<String>,
    },

    /// Invalid input errors
    #[error("Invalid input: {message}")]
    InvalidInput {
        message: String,
        field: Option<String>,
    },

    /// A single provider attempt failed
    #[error("Provider error: {message}")]
    Provider {
        message: String,
        provider: Option<String>,
        status_code: Option<u16>,
    },

    /// A provider attempt exceeded its configured deadline
    #[error("Provider request timed out after {seconds} seconds")]
    Timeout {
        seconds: u64,
        provider: Option<String>,
    },

    /// Admission was refused before any provider was contacted
    #[error("Quota exceeded: {message}")]
    QuotaExceeded {
        message: String,
        /// Every window whose limit the request would overflow
        windows: Vec<QuotaWindowKind>,
    },

    /// Every candidate provider was attempted and failed
    #[error("All providers failed: {message}")]
    AllProvidersFailed {
        message: String,
        /// One entry per exhausted candidate, in attempt order
        failures: Vec<AttemptFailure>,
    },

    /// Usage record persistence failed; recovered by the recorder, never
    /// surfaced to request callers
    #[error("Usage recording error: {message}")]
    Recording { message: String },

    /// IO errors from configuration file plumbing
    #[error("IO error: {message}")]
    Io {
        message: String,
        path: Option<String>,
    },

    /// Generic errors
    #[error("Error: {message}")]
    Other { message: String },
}
