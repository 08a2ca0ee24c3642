//! Configuration: static router settings and the runtime-mutable priority
//! policy
//!
//! `model` holds the value types loaded once at startup, `loader` layers
//! Default/File/Environment sources, and `priority` is the live policy handle
//! the pipeline consults on every request.

mod loader;
mod model;
mod priority;

pub use loader::{default_config_path, ConfigLoader, ConfigSource};
pub use model::{LoggingConfig, ProviderTimeouts, QuotaConfig, RouterConfig};
pub use priority::{
    ApiPriority, ApiPriorityConfig, ApiPriorityUpdate, CachePolicy, PriorityMode, RetryPolicy,
    DEFAULT_CACHE_TTL, DEFAULT_MAX_RETRIES,
};
