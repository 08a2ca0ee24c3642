//! Request pipeline facade
//!
//! One entry point wires the pieces in the documented order: classify,
//! cache, admission, dispatch, asynchronous usage recording. The builder owns
//! component construction from a `RouterConfig`; nothing in the pipeline is a
//! global.

use crate::cache::{CachedResponse, ResponseCache};
use crate::classify::{Classifier, QuestionAnalysis};
use crate::config::{ApiPriority, RouterConfig};
use crate::dispatch::{
    CompletionBackend, CompletionRequest, FallbackOrchestrator, ProviderId, TokenUsage,
};
use crate::error::{SwitchyardError, SwitchyardResult};
use crate::health::HealthRegistry;
use crate::pricing::PricingTable;
use crate::quota::{
    estimate_tokens, MemoryUsageStore, QuotaAdmissionController, QuotaPolicy, QuotaUsageRecord,
    UsageStore,
};
use std::sync::Arc;

/// One caller request as submitted to the pipeline
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    /// Caller the request is billed to
    pub user_id: String,
    /// The request text
    pub text: String,
    /// Calling module, when known
    pub module: Option<String>,
    /// API surface the request arrived through, when known
    pub api_endpoint: Option<String>,
}

impl PipelineRequest {
    /// Create a request
    pub fn new(user_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            text: text.into(),
            module: None,
            api_endpoint: None,
        }
    }

    /// Set the calling module
    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    /// Set the API endpoint the request came in on
    pub fn with_api_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.api_endpoint = Some(endpoint.into());
        self
    }
}

/// The pipeline's answer to one request
#[derive(Debug, Clone)]
pub struct PipelineResponse {
    /// The completion text
    pub text: String,
    /// Provider that served it (or originally served it, for cache hits)
    pub provider: ProviderId,
    /// Model that served it
    pub model: String,
    /// The classification verdict the routing was based on
    pub analysis: QuestionAnalysis,
    /// Token accounting; zero for cache hits
    pub usage: TokenUsage,
    /// Whether the response came from the cache
    pub from_cache: bool,
}

/// The composed request pipeline
pub struct Pipeline {
    classifier: Classifier,
    health: HealthRegistry,
    orchestrator: FallbackOrchestrator,
    admission: QuotaAdmissionController,
    pricing: PricingTable,
    cache: ResponseCache,
    priority: ApiPriority,
}

impl Pipeline {
    /// Start building a pipeline
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Handle one request end to end
    ///
    /// A cache hit is answered before the ledger is even consulted, so a
    /// caller over quota still gets responses it already paid for. Quota
    /// rejection otherwise fails fast before any provider is contacted.
    /// Usage recording is queued off the response path for both outcomes of
    /// a real dispatch.
    pub async fn handle(&self, request: PipelineRequest) -> SwitchyardResult<PipelineResponse> {
        if request.user_id.trim().is_empty() {
            return Err(SwitchyardError::invalid_input_field(
                "user id must not be empty",
                "user_id",
            ));
        }
        if request.text.trim().is_empty() {
            return Err(SwitchyardError::invalid_input_field(
                "request text must not be empty",
                "text",
            ));
        }

        let allow_web_search = self.priority.should_use_api("web_search");
        let analysis = self.classifier.classify_request(
            &request.text,
            request.module.as_deref(),
            allow_web_search,
        );
        tracing::debug!(
            user_id = %request.user_id,
            route = %Classifier::selection_explanation(&analysis),
            "request classified"
        );

        if let Some(hit) = self.cache.get(request.module.as_deref(), &request.text) {
            tracing::debug!(user_id = %request.user_id, provider = %hit.provider, "cache hit");
            return Ok(PipelineResponse {
                text: hit.text,
                provider: hit.provider,
                model: hit.model,
                analysis,
                usage: TokenUsage::default(),
                from_cache: true,
            });
        }

        let estimated = estimate_tokens(&request.text);
        let decision = self
            .admission
            .check_quota(&request.user_id, estimated)
            .await;
        if !decision.allowed {
            let reason = decision
                .reason
                .clone()
                .unwrap_or_else(|| "quota exceeded".to_string());
            tracing::info!(user_id = %request.user_id, reason = %reason, "request rejected");
            return Err(SwitchyardError::quota_exceeded(
                reason,
                decision.exceeded_windows(),
            ));
        }

        let completion_request = CompletionRequest::new(
            analysis.recommended_model.clone(),
            request.text.clone(),
        );

        match self
            .orchestrator
            .dispatch(&completion_request, &analysis)
            .await
        {
            Ok(outcome) => {
                let usage = outcome.response.usage;
                let cost = self
                    .pricing
                    .cost_of(
                        &outcome.model,
                        u64::from(usage.prompt_tokens),
                        u64::from(usage.completion_tokens),
                    )
                    .unwrap_or_default();
                let mut record = QuotaUsageRecord::new(
                    request.user_id.clone(),
                    outcome.provider.clone(),
                    outcome.model.clone(),
                    usage,
                    cost,
                );
                if let Some(module) = &request.module {
                    record = record.with_module(module.clone());
                }
                if let Some(endpoint) = &request.api_endpoint {
                    record = record.with_api_endpoint(endpoint.clone());
                }
                self.admission.record_usage(record);

                self.cache.put(
                    request.module.as_deref(),
                    &request.text,
                    CachedResponse {
                        text: outcome.response.text.clone(),
                        provider: outcome.provider.clone(),
                        model: outcome.model.clone(),
                        created_at: chrono::Utc::now(),
                    },
                );

                Ok(PipelineResponse {
                    text: outcome.response.text,
                    provider: outcome.provider,
                    model: outcome.model,
                    analysis,
                    usage,
                    from_cache: false,
                })
            }
            Err(error) => {
                // The ledger reflects failed dispatches too: zero tokens, the
                // aggregated reason.
                let mut record = QuotaUsageRecord::failure(
                    request.user_id.clone(),
                    analysis.recommended_provider.clone(),
                    analysis.recommended_model.clone(),
                    error.to_string(),
                );
                if let Some(module) = &request.module {
                    record = record.with_module(module.clone());
                }
                if let Some(endpoint) = &request.api_endpoint {
                    record = record.with_api_endpoint(endpoint.clone());
                }
                self.admission.record_usage(record);
                Err(error)
            }
        }
    }

    /// The classifier, for the standalone diagnostic surface
    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// The provider health surface
    pub fn health(&self) -> &HealthRegistry {
        &self.health
    }

    /// The quota admission surface
    pub fn admission(&self) -> &QuotaAdmissionController {
        &self.admission
    }

    /// The dispatch orchestrator
    pub fn orchestrator(&self) -> &FallbackOrchestrator {
        &self.orchestrator
    }

    /// The pricing table
    pub fn pricing(&self) -> &PricingTable {
        &self.pricing
    }

    /// The response cache
    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// The live priority policy
    pub fn priority(&self) -> &ApiPriority {
        &self.priority
    }

    /// Drain queued usage records and stop the recorder
    pub async fn shutdown(&self) {
        self.admission.shutdown().await;
    }
}

/// Builder assembling a pipeline from a configuration and injected
/// collaborators
pub struct PipelineBuilder {
    backend: Option<Arc<dyn CompletionBackend>>,
    store: Option<Arc<dyn UsageStore>>,
    policy: Option<Arc<dyn QuotaPolicy>>,
    priority: Option<ApiPriority>,
    config: RouterConfig,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineBuilder {
    /// Create a builder with the default configuration
    pub fn new() -> Self {
        Self {
            backend: None,
            store: None,
            policy: None,
            priority: None,
            config: RouterConfig::default(),
        }
    }

    /// Set the completion backend (required)
    pub fn with_backend(mut self, backend: Arc<dyn CompletionBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Set the usage store; defaults to an in-memory ledger
    pub fn with_store(mut self, store: Arc<dyn UsageStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the quota policy; defaults to the configuration's windows
    pub fn with_policy(mut self, policy: Arc<dyn QuotaPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Share a priority policy handle; defaults to a fresh one
    pub fn with_priority(mut self, priority: ApiPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Use a loaded configuration
    pub fn with_config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    /// Assemble the pipeline
    pub fn build(self) -> SwitchyardResult<Pipeline> {
        self.config.validate()?;

        let backend = self
            .backend
            .ok_or_else(|| SwitchyardError::config("pipeline requires a completion backend"))?;
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryUsageStore::new()));
        let policy: Arc<dyn QuotaPolicy> = self
            .policy
            .unwrap_or_else(|| Arc::new(self.config.quota.to_policy()));
        let priority = self.priority.unwrap_or_default();

        let health = HealthRegistry::new()
            .with_failure_threshold(self.config.failure_threshold)
            .with_fallback_order(&self.config.fallback_order);
        let classifier = Classifier::new(
            self.config.keywords.clone(),
            self.config.routing.clone(),
        );
        let orchestrator = FallbackOrchestrator::new(backend, health.clone())
            .with_priority(priority.clone())
            .with_fallback_order(self.config.fallback_order.clone())
            .with_timeouts(self.config.timeouts.to_map())
            .with_fallback_models(self.config.fallback_models());
        let admission = QuotaAdmissionController::new(policy, store);
        let pricing = PricingTable::with_defaults().with_fx_rate(self.config.quota.fx_rate);
        let cache = ResponseCache::new(self.config.cache_capacity, priority.clone());

        Ok(Pipeline {
            classifier,
            health,
            orchestrator,
            admission,
            pricing,
            cache,
            priority,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiPriorityConfig, PriorityMode};
    use crate::dispatch::{CompletionResponse, EchoBackend};
    use crate::quota::{QuotaWindow, StaticQuotaPolicy};
    use async_trait::async_trait;
    use std::collections::HashMap;

    fn pipeline_with(store: Arc<MemoryUsageStore>) -> Pipeline {
        Pipeline::builder()
            .with_backend(Arc::new(EchoBackend))
            .with_store(store)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn successful_request_is_served_and_recorded() {
        let store = Arc::new(MemoryUsageStore::new());
        let pipeline = pipeline_with(store.clone());

        let response = pipeline
            .handle(PipelineRequest::new("user-1", "bom dia").with_module("ti"))
            .await
            .unwrap();

        assert!(!response.from_cache);
        // Module override: simple request from a listed module.
        assert_eq!(response.provider, ProviderId::Google);
        assert_eq!(response.model, "gemini-2.0-flash-exp");
        assert!(response.usage.total() > 0);

        pipeline.shutdown().await;
        let records = store.records().await;
        assert_eq!(records.len(), 1);
        assert!(records[0].success);
        assert_eq!(records[0].module.as_deref(), Some("ti"));
        assert_eq!(
            records[0].total_tokens,
            records[0].prompt_tokens + records[0].completion_tokens
        );
    }

    #[tokio::test]
    async fn repeated_request_is_served_from_cache() {
        let store = Arc::new(MemoryUsageStore::new());
        let pipeline = pipeline_with(store.clone());

        let first = pipeline
            .handle(PipelineRequest::new("user-1", "bom dia"))
            .await
            .unwrap();
        let second = pipeline
            .handle(PipelineRequest::new("user-2", "Bom dia"))
            .await
            .unwrap();

        assert!(!first.from_cache);
        assert!(second.from_cache);
        assert_eq!(second.text, first.text);
        assert_eq!(second.usage.total(), 0);

        // Only the real dispatch reached the ledger.
        pipeline.shutdown().await;
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn exhausted_quota_stops_before_dispatch() {
        let policy = StaticQuotaPolicy::new()
            .with_window(QuotaWindow::for_role("student").with_monthly_limit(1));
        let pipeline = Pipeline::builder()
            .with_backend(Arc::new(EchoBackend))
            .with_policy(Arc::new(policy))
            .build()
            .unwrap();

        let error = pipeline
            .handle(PipelineRequest::new(
                "user-1",
                "uma pergunta longa o bastante para estourar",
            ))
            .await
            .unwrap_err();

        match error {
            SwitchyardError::QuotaExceeded { windows, .. } => {
                assert_eq!(windows, vec![crate::error::QuotaWindowKind::Monthly]);
            }
            other => panic!("unexpected error: {other}"),
        }
        // Nothing was dispatched, so nothing was cached.
        assert!(pipeline.cache().is_empty());
    }

    #[tokio::test]
    async fn blank_input_is_rejected_up_front() {
        let pipeline = pipeline_with(Arc::new(MemoryUsageStore::new()));

        let error = pipeline
            .handle(PipelineRequest::new("user-1", "   "))
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            SwitchyardError::InvalidInput { ref field, .. } if field.as_deref() == Some("text")
        ));

        let error = pipeline
            .handle(PipelineRequest::new("", "bom dia"))
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            SwitchyardError::InvalidInput { ref field, .. } if field.as_deref() == Some("user_id")
        ));
    }

    #[tokio::test]
    async fn ledger_records_carry_the_calling_endpoint() {
        let store = Arc::new(MemoryUsageStore::new());
        let pipeline = pipeline_with(store.clone());

        pipeline
            .handle(
                PipelineRequest::new("user-1", "bom dia").with_api_endpoint("/api/ai-router"),
            )
            .await
            .unwrap();

        pipeline.shutdown().await;
        let records = store.records().await;
        assert_eq!(records[0].api_endpoint.as_deref(), Some("/api/ai-router"));
    }

    #[tokio::test]
    async fn web_search_gate_honors_the_priority_policy() {
        let priority = ApiPriority::new(ApiPriorityConfig {
            domains: HashMap::from([("web_search".to_string(), PriorityMode::LocalOnly)]),
            ..Default::default()
        });
        let pipeline = Pipeline::builder()
            .with_backend(Arc::new(EchoBackend))
            .with_priority(priority)
            .build()
            .unwrap();

        let response = pipeline
            .handle(PipelineRequest::new("user-1", "previsão do tempo para hoje"))
            .await
            .unwrap();

        assert!(!response.analysis.needs_web_search);
        assert_ne!(response.provider, ProviderId::Perplexity);
    }

    struct AlwaysFailingBackend;

    #[async_trait]
    impl CompletionBackend for AlwaysFailingBackend {
        async fn invoke(
            &self,
            provider: &ProviderId,
            _request: &CompletionRequest,
        ) -> SwitchyardResult<CompletionResponse> {
            Err(SwitchyardError::provider_with_name(
                "connection refused",
                provider.to_string(),
            ))
        }
    }

    #[tokio::test]
    async fn terminal_failure_is_aggregated_and_recorded() {
        let store = Arc::new(MemoryUsageStore::new());
        let pipeline = Pipeline::builder()
            .with_backend(Arc::new(AlwaysFailingBackend))
            .with_store(store.clone())
            .build()
            .unwrap();

        let error = pipeline
            .handle(PipelineRequest::new("user-1", "bom dia"))
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            SwitchyardError::AllProvidersFailed { ref failures, .. } if !failures.is_empty()
        ));

        pipeline.shutdown().await;
        let records = store.records().await;
        assert_eq!(records.len(), 1);
        assert!(!records[0].success);
        assert_eq!(records[0].total_tokens, 0);
        assert!(records[0]
            .error_message
            .as_deref()
            .unwrap_or("")
            .contains("failed"));
    }

    #[test]
    fn builder_requires_a_backend() {
        assert!(Pipeline::builder().build().is_err());
    }
}
