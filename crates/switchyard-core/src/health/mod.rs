//! Provider health tracking

mod registry;

pub use registry::{HealthRegistry, ProviderStatus, DEFAULT_FAILURE_THRESHOLD};
