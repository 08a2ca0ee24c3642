//! The boundary to real provider APIs
//!
//! The orchestrator never speaks HTTP itself; it hands a request to an
//! injected `CompletionBackend` and interprets the result. Deployments plug
//! in their provider clients here. The in-tree `EchoBackend` serves dry-runs
//! and tests.

use super::provider::{CompletionRequest, CompletionResponse, ProviderId, TokenUsage};
use crate::error::SwitchyardResult;
use async_trait::async_trait;

/// One provider call: request in, completion (or provider-attributed error)
/// out
///
/// Implementations must attribute failures to the provider they called so the
/// aggregated dispatch error stays diagnosable. Timeouts are enforced by the
/// orchestrator, not here.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Invoke a provider with the given request
    async fn invoke(
        &self,
        provider: &ProviderId,
        request: &CompletionRequest,
    ) -> SwitchyardResult<CompletionResponse>;
}

/// Backend that echoes the prompt back without calling anything
///
/// Token counts follow the admission estimate (four characters per token) so
/// dry-runs exercise the full accounting path with plausible numbers.
#[derive(Debug, Clone, Default)]
pub struct EchoBackend;

#[async_trait]
impl CompletionBackend for EchoBackend {
    async fn invoke(
        &self,
        provider: &ProviderId,
        request: &CompletionRequest,
    ) -> SwitchyardResult<CompletionResponse> {
        let text = format!("[{}/{}] {}", provider, request.model, request.prompt);
        let prompt_tokens = (request.prompt.chars().count() as u32).div_ceil(4);
        let completion_tokens = (text.chars().count() as u32).div_ceil(4);
        Ok(CompletionResponse::new(
            text,
            request.model.clone(),
            TokenUsage::new(prompt_tokens, completion_tokens),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echo_reports_plausible_usage() {
        let backend = EchoBackend;
        let request = CompletionRequest::new("gpt-4o-mini", "bom dia");

        let response = backend
            .invoke(&ProviderId::OpenAI, &request)
            .await
            .unwrap();

        assert!(response.text.contains("bom dia"));
        assert!(response.text.contains("openai"));
        assert_eq!(response.model, "gpt-4o-mini");
        assert_eq!(response.usage.prompt_tokens, 2);
        assert!(response.usage.completion_tokens > 0);
    }
}
