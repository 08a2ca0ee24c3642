//! Provider selection table
//!
//! The classifier resolves a request to one branch of this table. Branches
//! are configuration values, so a deployment can repoint a branch at another
//! provider/model pair without touching the classification logic.

use super::analyzer::{QuestionComplexity, QuestionType};
use crate::dispatch::ProviderId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One routing decision: where to send a request and how confident the
/// table is about it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteChoice {
    /// Provider to dispatch to
    pub provider: ProviderId,
    /// Model to request from that provider
    pub model: String,
    /// Routing confidence in [0, 1]
    pub confidence: f32,
}

impl RouteChoice {
    /// Create a route choice
    pub fn new(provider: ProviderId, model: impl Into<String>, confidence: f32) -> Self {
        Self {
            provider,
            model: model.into(),
            confidence,
        }
    }
}

/// Decision table keyed by the classifier's findings
///
/// Branch precedence: web search, then trivial greetings, then complexity
/// and question type. First matching branch wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingTable {
    /// Requests that need fresh web data
    pub web_search: RouteChoice,
    /// Three words or fewer and classified simple (greetings, yes/no)
    pub trivial: RouteChoice,
    /// Complex analytical requests
    pub complex: RouteChoice,
    /// Creative-writing requests
    pub creative: RouteChoice,
    /// Programming/IT requests
    pub technical: RouteChoice,
    /// Medium-weight requests
    pub medium: RouteChoice,
    /// Everything else
    pub simple: RouteChoice,
    /// Per-module preferred routes, applied by the pipeline to simple
    /// non-web-search requests from the named modules
    pub module_overrides: HashMap<String, RouteChoice>,
}

impl Default for RoutingTable {
    fn default() -> Self {
        // Modules whose traffic is conversational enough for the
        // high-throughput tier regardless of provider ranking.
        let simple_modules = [
            "ti",
            "rh",
            "financeiro",
            "secretaria",
            "professor",
            "aula_interativa",
        ];
        let module_route = RouteChoice::new(ProviderId::Google, "gemini-2.0-flash-exp", 0.85);
        let module_overrides = simple_modules
            .iter()
            .map(|m| (m.to_string(), module_route.clone()))
            .collect();

        Self {
            web_search: RouteChoice::new(ProviderId::Perplexity, "sonar", 0.9),
            trivial: RouteChoice::new(ProviderId::OpenAI, "gpt-4o-mini", 0.95),
            complex: RouteChoice::new(ProviderId::OpenAI, "gpt-5-chat-latest", 0.85),
            creative: RouteChoice::new(ProviderId::OpenAI, "gpt-4o-mini", 0.8),
            technical: RouteChoice::new(ProviderId::OpenAI, "gpt-4o-mini", 0.8),
            medium: RouteChoice::new(ProviderId::OpenAI, "gpt-4o-mini", 0.75),
            simple: RouteChoice::new(ProviderId::OpenAI, "gpt-4o-mini", 0.9),
            module_overrides,
        }
    }
}

impl RoutingTable {
    /// Resolve the branch for a classified request
    pub fn choose(
        &self,
        needs_web_search: bool,
        complexity: QuestionComplexity,
        question_type: QuestionType,
        trivial: bool,
    ) -> &RouteChoice {
        if needs_web_search {
            &self.web_search
        } else if trivial && complexity == QuestionComplexity::Simple {
            &self.trivial
        } else if complexity == QuestionComplexity::Complex {
            &self.complex
        } else if question_type == QuestionType::Creative {
            &self.creative
        } else if question_type == QuestionType::Technical {
            &self.technical
        } else if complexity == QuestionComplexity::Medium {
            &self.medium
        } else {
            &self.simple
        }
    }

    /// Preferred route for a module, if one is configured
    pub fn route_for_module(&self, module: &str) -> Option<&RouteChoice> {
        self.module_overrides.get(module)
    }

    /// Merge with another table (other takes precedence, whole table)
    pub fn merge(&mut self, other: RoutingTable) {
        *self = other;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn web_search_outranks_everything() {
        let table = RoutingTable::default();
        let choice = table.choose(
            true,
            QuestionComplexity::Complex,
            QuestionType::WebSearch,
            false,
        );
        assert_eq!(choice.provider, ProviderId::Perplexity);
        assert_eq!(choice.model, "sonar");
    }

    #[test]
    fn trivial_branch_requires_simple_complexity() {
        let table = RoutingTable::default();
        let choice = table.choose(
            false,
            QuestionComplexity::Simple,
            QuestionType::General,
            true,
        );
        assert!((choice.confidence - 0.95).abs() < f32::EPSILON);

        // Three short words that still carry a complex keyword route by
        // complexity, not by length.
        let choice = table.choose(
            false,
            QuestionComplexity::Complex,
            QuestionType::Analysis,
            true,
        );
        assert_eq!(choice.model, "gpt-5-chat-latest");
    }

    #[test]
    fn known_modules_have_overrides() {
        let table = RoutingTable::default();
        let choice = table.route_for_module("professor").unwrap();
        assert_eq!(choice.provider, ProviderId::Google);
        assert!(table.route_for_module("unknown_module").is_none());
    }
}
