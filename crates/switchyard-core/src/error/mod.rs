//! Error types for the switchyard routing pipeline
//!
//! One error enum covers the whole pipeline. The variants mirror how errors
//! actually propagate: quota rejections stop a request before any provider is
//! contacted, per-provider failures are recovered by advancing to the next
//! candidate and only ever surface inside `AllProvidersFailed`, and usage
//! recording failures are logged by the recorder and never reach callers.

mod classifiers;
mod constructors;
mod types;

// Re-export all public types and traits
pub use types::{AttemptFailure, QuotaWindowKind, SwitchyardError, SwitchyardResult};
