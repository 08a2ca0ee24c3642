//! Provider identities, the backend boundary, and fallback dispatch
//!
//! `provider` defines who can be called and what an exchange looks like,
//! `backend` is the seam to real provider APIs, and `orchestrator` walks the
//! health-ordered candidate chain until one provider answers.

mod backend;
mod orchestrator;
mod provider;

pub use backend::{CompletionBackend, EchoBackend};
pub use orchestrator::{
    default_fallback_models, default_fallback_order, default_timeouts, AttemptReport,
    DispatchOptions, DispatchOutcome, FallbackOrchestrator, ModelTiers, DEFAULT_ATTEMPT_TIMEOUT,
};
pub use provider::{CompletionRequest, CompletionResponse, ProviderId, TokenUsage};
