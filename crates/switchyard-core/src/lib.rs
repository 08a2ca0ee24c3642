//! Switchyard core library
//!
//! Routes natural-language requests across interchangeable AI completion
//! providers: keyword classification picks a provider/model, cached answers
//! are served immediately, quota admission gates the rest against per-role
//! consumption windows, and health-aware fallback dispatch walks the
//! candidate chain until one provider answers. Actual usage is recorded
//! asynchronously, off the response path.

pub mod cache;
pub mod classify;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod health;
pub mod pipeline;
pub mod pricing;
pub mod quota;

// Re-export commonly used types
pub use cache::{CachedResponse, ResponseCache};
pub use classify::{Classifier, KeywordConfig, QuestionAnalysis, RoutingTable};
pub use config::{ApiPriority, ApiPriorityConfig, ConfigLoader, RouterConfig};
pub use dispatch::{
    CompletionBackend, CompletionRequest, CompletionResponse, DispatchOutcome, EchoBackend,
    FallbackOrchestrator, ProviderId, TokenUsage,
};
pub use error::{SwitchyardError, SwitchyardResult};
pub use health::{HealthRegistry, ProviderStatus};
pub use pipeline::{Pipeline, PipelineBuilder, PipelineRequest, PipelineResponse};
pub use pricing::PricingTable;
pub use quota::{
    estimate_tokens, MemoryUsageStore, QuotaAdmissionController, QuotaDecision, QuotaPolicy,
    QuotaUsageRecord, QuotaWindow, StaticQuotaPolicy, UsageStore,
};
