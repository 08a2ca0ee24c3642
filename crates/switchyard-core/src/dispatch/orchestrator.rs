//! Health-aware fallback dispatch
//!
//! One request gets one ordered pass over the candidate providers: the
//! classifier's recommendation first, then the configured fallback order.
//! Healthy candidates go first; when nothing is healthy the full list is
//! tried anyway, least-failed first, because reporting a total outage without
//! attempting anything is worse than trying a strained provider. Attempts are
//! strictly sequential and never retry the same provider; a request is never
//! fanned out in parallel, so it can never be billed twice.

use super::backend::CompletionBackend;
use super::provider::{CompletionRequest, CompletionResponse, ProviderId};
use crate::classify::{QuestionAnalysis, QuestionComplexity};
use crate::config::ApiPriority;
use crate::error::{AttemptFailure, SwitchyardError, SwitchyardResult};
use crate::health::HealthRegistry;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Attempt timeout for providers without an explicit configuration
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default model per complexity tier for one provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelTiers {
    /// Model for simple requests
    pub simple: String,
    /// Model for medium requests
    pub medium: String,
    /// Model for complex requests
    pub complex: String,
}

impl ModelTiers {
    /// Same model for every tier
    pub fn uniform(model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            simple: model.clone(),
            medium: model.clone(),
            complex: model,
        }
    }

    /// Model for a complexity tier
    pub fn for_complexity(&self, complexity: QuestionComplexity) -> &str {
        match complexity {
            QuestionComplexity::Simple => &self.simple,
            QuestionComplexity::Medium => &self.medium,
            QuestionComplexity::Complex => &self.complex,
        }
    }
}

/// The deployed providers in priority order
pub fn default_fallback_order() -> Vec<ProviderId> {
    vec![
        ProviderId::OpenAI,
        ProviderId::Google,
        ProviderId::Anthropic,
        ProviderId::Perplexity,
    ]
}

/// Per-provider attempt timeouts of the deployed platform
pub fn default_timeouts() -> HashMap<ProviderId, Duration> {
    HashMap::from([
        (ProviderId::OpenAI, Duration::from_secs(30)),
        (ProviderId::Google, Duration::from_secs(45)),
        (ProviderId::Anthropic, Duration::from_secs(60)),
        (ProviderId::Perplexity, Duration::from_secs(45)),
    ])
}

/// Default model tiers when a fallback candidate serves a request it was not
/// recommended for
pub fn default_fallback_models() -> HashMap<ProviderId, ModelTiers> {
    HashMap::from([
        (
            ProviderId::OpenAI,
            ModelTiers {
                simple: "gpt-4o-mini".to_string(),
                medium: "gpt-4o-mini".to_string(),
                complex: "gpt-5-chat-latest".to_string(),
            },
        ),
        (
            ProviderId::Google,
            ModelTiers::uniform("gemini-2.0-flash-exp"),
        ),
        (
            ProviderId::Anthropic,
            ModelTiers {
                simple: "claude-3-haiku-20240307".to_string(),
                medium: "claude-3-haiku-20240307".to_string(),
                complex: "claude-3-sonnet-20240229".to_string(),
            },
        ),
        (ProviderId::Perplexity, ModelTiers::uniform("sonar")),
    ])
}

/// Per-request dispatch adjustments
#[derive(Debug, Clone, Default)]
pub struct DispatchOptions {
    /// Providers that must not be attempted for this request
    pub exclude: Vec<ProviderId>,
}

/// One attempt in the trail, success or failure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptReport {
    /// Provider attempted
    pub provider: ProviderId,
    /// Model requested from it
    pub model: String,
    /// How long the attempt took
    #[serde(with = "humantime_serde")]
    pub elapsed: Duration,
    /// Failure reason; `None` for the successful attempt
    pub error: Option<String>,
}

/// A successful dispatch with its full attempt trail
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    /// The completion that was returned to the caller
    pub response: CompletionResponse,
    /// Provider that served it
    pub provider: ProviderId,
    /// Model that served it
    pub model: String,
    /// Attempts made, including the successful one
    pub attempts: u32,
    /// Candidates in the order they would have been tried
    pub fallback_chain: Vec<ProviderId>,
    /// Wall time from dispatch entry to success
    pub latency: Duration,
    /// Per-attempt trail, in attempt order
    pub attempt_reports: Vec<AttemptReport>,
}

/// Sequential, health-aware dispatcher over the candidate providers
pub struct FallbackOrchestrator {
    backend: Arc<dyn CompletionBackend>,
    health: HealthRegistry,
    priority: ApiPriority,
    fallback_order: Vec<ProviderId>,
    timeouts: HashMap<ProviderId, Duration>,
    default_timeout: Duration,
    fallback_models: HashMap<ProviderId, ModelTiers>,
}

impl FallbackOrchestrator {
    /// Create an orchestrator with the default order, timeouts, and models
    pub fn new(backend: Arc<dyn CompletionBackend>, health: HealthRegistry) -> Self {
        Self {
            backend,
            health,
            priority: ApiPriority::default(),
            fallback_order: default_fallback_order(),
            timeouts: default_timeouts(),
            default_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            fallback_models: default_fallback_models(),
        }
    }

    /// Share a priority policy handle
    pub fn with_priority(mut self, priority: ApiPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Replace the configured fallback order
    pub fn with_fallback_order(mut self, order: Vec<ProviderId>) -> Self {
        self.fallback_order = order;
        self
    }

    /// Replace the per-provider timeouts
    pub fn with_timeouts(mut self, timeouts: HashMap<ProviderId, Duration>) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Set one provider's attempt timeout
    pub fn with_timeout(mut self, provider: ProviderId, timeout: Duration) -> Self {
        self.timeouts.insert(provider, timeout);
        self
    }

    /// Replace the fallback model tiers
    pub fn with_fallback_models(mut self, models: HashMap<ProviderId, ModelTiers>) -> Self {
        self.fallback_models = models;
        self
    }

    /// The health registry this orchestrator reports into
    pub fn health(&self) -> &HealthRegistry {
        &self.health
    }

    /// Dispatch a request along the candidate chain
    pub async fn dispatch(
        &self,
        request: &CompletionRequest,
        analysis: &QuestionAnalysis,
    ) -> SwitchyardResult<DispatchOutcome> {
        self.dispatch_with_options(request, analysis, &DispatchOptions::default())
            .await
    }

    /// Dispatch with per-request adjustments
    pub async fn dispatch_with_options(
        &self,
        request: &CompletionRequest,
        analysis: &QuestionAnalysis,
        options: &DispatchOptions,
    ) -> SwitchyardResult<DispatchOutcome> {
        let started = Instant::now();
        let candidates = self.candidate_order(analysis, options);
        if candidates.is_empty() {
            return Err(SwitchyardError::all_providers_failed(Vec::new()));
        }

        let mut failures: Vec<AttemptFailure> = Vec::new();
        let mut reports: Vec<AttemptReport> = Vec::new();

        for (index, candidate) in candidates.iter().enumerate() {
            let model = self.model_for(candidate, analysis);
            let mut attempt_request = request.clone();
            attempt_request.model = model.clone();

            let deadline = self.timeout_for(candidate);
            let attempt_started = Instant::now();
            let result = match tokio::time::timeout(
                deadline,
                self.backend.invoke(candidate, &attempt_request),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(SwitchyardError::timeout_with_provider(
                    deadline.as_secs(),
                    candidate.to_string(),
                )),
            };
            let elapsed = attempt_started.elapsed();

            match result {
                Ok(response) => {
                    self.health.record_success(candidate);
                    if index > 0 {
                        tracing::info!(
                            provider = %candidate,
                            model = %model,
                            attempts = index + 1,
                            "request served by fallback provider"
                        );
                    }
                    reports.push(AttemptReport {
                        provider: candidate.clone(),
                        model: model.clone(),
                        elapsed,
                        error: None,
                    });
                    return Ok(DispatchOutcome {
                        response,
                        provider: candidate.clone(),
                        model,
                        attempts: (index + 1) as u32,
                        fallback_chain: candidates.clone(),
                        latency: started.elapsed(),
                        attempt_reports: reports,
                    });
                }
                Err(error) => {
                    self.health.record_failure(candidate);
                    tracing::warn!(
                        provider = %candidate,
                        model = %model,
                        error = %error,
                        retryable = error.is_retryable(),
                        "provider attempt failed; advancing to next candidate"
                    );
                    reports.push(AttemptReport {
                        provider: candidate.clone(),
                        model,
                        elapsed,
                        error: Some(error.to_string()),
                    });
                    failures.push(AttemptFailure {
                        provider: candidate.to_string(),
                        reason: error.to_string(),
                    });
                }
            }
        }

        Err(SwitchyardError::all_providers_failed(failures))
    }

    /// The candidates a dispatch would try, in order
    ///
    /// Recommended provider plus the configured fallback order, de-duplicated
    /// and minus exclusions. Healthy candidates keep list order and go first;
    /// unhealthy ones follow sorted by ascending failures. The retry policy
    /// caps breadth: retries disabled means only the first candidate.
    pub fn candidate_order(
        &self,
        analysis: &QuestionAnalysis,
        options: &DispatchOptions,
    ) -> Vec<ProviderId> {
        let mut candidates = Vec::with_capacity(1 + self.fallback_order.len());
        for provider in
            std::iter::once(&analysis.recommended_provider).chain(self.fallback_order.iter())
        {
            if !candidates.contains(provider) && !options.exclude.contains(provider) {
                candidates.push(provider.clone());
            }
        }

        let (mut healthy, mut unhealthy): (Vec<ProviderId>, Vec<ProviderId>) = candidates
            .into_iter()
            .partition(|p| self.health.is_healthy(p));
        unhealthy.sort_by_key(|p| self.health.failures(p));
        healthy.extend(unhealthy);

        let breadth = if self.priority.should_retry() {
            1 + self.priority.max_retries() as usize
        } else {
            1
        };
        healthy.truncate(breadth);
        healthy
    }

    fn model_for(&self, candidate: &ProviderId, analysis: &QuestionAnalysis) -> String {
        if *candidate == analysis.recommended_provider {
            return analysis.recommended_model.clone();
        }
        self.fallback_models
            .get(candidate)
            .map(|tiers| tiers.for_complexity(analysis.complexity).to_string())
            .unwrap_or_else(|| analysis.recommended_model.clone())
    }

    fn timeout_for(&self, candidate: &ProviderId) -> Duration {
        self.timeouts
            .get(candidate)
            .copied()
            .unwrap_or(self.default_timeout)
    }
}
