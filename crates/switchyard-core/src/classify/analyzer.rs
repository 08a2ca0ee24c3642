//! Request classification
//!
//! `Classifier::classify` is a pure function of the request text: lowercase
//! once, probe the keyword sets in fixed precedence order, derive complexity
//! from word count and keyword hits, then resolve a provider/model through
//! the routing table. It never fails; text with no signal falls through to
//! the simple/general defaults.

use super::keywords::KeywordConfig;
use super::routing::{RouteChoice, RoutingTable};
use crate::dispatch::ProviderId;
use serde::{Deserialize, Serialize};

/// Word-count bound above which a request is considered complex
const COMPLEX_WORD_COUNT: usize = 20;
/// Word-count bound above which a request is considered medium
const MEDIUM_WORD_COUNT: usize = 10;
/// Word-count bound at or below which a simple request is trivial
const TRIVIAL_WORD_COUNT: usize = 3;

/// How heavy a request is expected to be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionComplexity {
    Simple,
    Medium,
    Complex,
}

impl std::fmt::Display for QuestionComplexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Simple => write!(f, "simple"),
            Self::Medium => write!(f, "medium"),
            Self::Complex => write!(f, "complex"),
        }
    }
}

/// What kind of request the text is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    General,
    WebSearch,
    Analysis,
    Creative,
    Technical,
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::General => write!(f, "general"),
            Self::WebSearch => write!(f, "web_search"),
            Self::Analysis => write!(f, "analysis"),
            Self::Creative => write!(f, "creative"),
            Self::Technical => write!(f, "technical"),
        }
    }
}

/// Immutable classification verdict for one request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionAnalysis {
    /// Expected request weight
    pub complexity: QuestionComplexity,
    /// Request category
    pub question_type: QuestionType,
    /// Whether the request needs fresh web data
    pub needs_web_search: bool,
    /// Provider the routing table recommends
    pub recommended_provider: ProviderId,
    /// Model the routing table recommends
    pub recommended_model: String,
    /// Routing confidence in [0, 1]
    pub confidence: f32,
}

/// Keyword-driven request classifier
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    keywords: KeywordConfig,
    routing: RoutingTable,
}

impl Classifier {
    /// Create a classifier with the given vocabulary and routing table
    pub fn new(keywords: KeywordConfig, routing: RoutingTable) -> Self {
        Self { keywords, routing }
    }

    /// Classify a request text
    ///
    /// Pure and infallible: empty or unrecognized text resolves to
    /// simple/general with the default route.
    pub fn classify(&self, text: &str) -> QuestionAnalysis {
        self.classify_with_web_search(text, true)
    }

    /// Classify with web-search routing allowed or suppressed
    ///
    /// With `allow_web_search = false` the text is classified as its
    /// non-web-search reading would be, for deployments whose priority
    /// policy routes the web-search domain locally.
    pub fn classify_with_web_search(&self, text: &str, allow_web_search: bool) -> QuestionAnalysis {
        let lower = text.to_lowercase();
        let word_count = lower.split_whitespace().count();

        let needs_web_search = allow_web_search && self.keywords.matches_web_search(&lower);
        let complex_hit = self.keywords.matches_complex(&lower);

        // Type precedence: web search short-circuits; otherwise creative,
        // then technical, then complex. Overlapping vocabularies resolve by
        // this fixed order.
        let question_type = if needs_web_search {
            QuestionType::WebSearch
        } else if self.keywords.matches_creative(&lower) {
            QuestionType::Creative
        } else if self.keywords.matches_technical(&lower) {
            QuestionType::Technical
        } else if complex_hit {
            QuestionType::Analysis
        } else {
            QuestionType::General
        };

        let complexity = if needs_web_search {
            QuestionComplexity::Medium
        } else if word_count > COMPLEX_WORD_COUNT || complex_hit {
            QuestionComplexity::Complex
        } else if word_count > MEDIUM_WORD_COUNT
            || matches!(question_type, QuestionType::Analysis | QuestionType::Technical)
        {
            QuestionComplexity::Medium
        } else {
            QuestionComplexity::Simple
        };

        let choice = self.routing.choose(
            needs_web_search,
            complexity,
            question_type,
            word_count <= TRIVIAL_WORD_COUNT,
        );

        QuestionAnalysis {
            complexity,
            question_type,
            needs_web_search,
            recommended_provider: choice.provider.clone(),
            recommended_model: choice.model.clone(),
            confidence: choice.confidence,
        }
    }

    /// Classify a request, then apply the module's preferred route when the
    /// verdict allows it
    ///
    /// Module overrides only apply to simple, non-web-search requests; a
    /// module hint never downgrades a complex or web-bound request.
    pub fn classify_for_module(&self, text: &str, module: Option<&str>) -> QuestionAnalysis {
        self.classify_request(text, module, true)
    }

    /// Full pipeline entry: module override plus the web-search gate
    pub fn classify_request(
        &self,
        text: &str,
        module: Option<&str>,
        allow_web_search: bool,
    ) -> QuestionAnalysis {
        let mut analysis = self.classify_with_web_search(text, allow_web_search);
        if analysis.needs_web_search || analysis.complexity != QuestionComplexity::Simple {
            return analysis;
        }
        if let Some(choice) = module.and_then(|m| self.routing.route_for_module(m)) {
            analysis.recommended_provider = choice.provider.clone();
            analysis.recommended_model = choice.model.clone();
            analysis.confidence = choice.confidence;
        }
        analysis
    }

    /// Human-readable rationale for a routing verdict, for logs and the
    /// diagnostic CLI
    pub fn selection_explanation(analysis: &QuestionAnalysis) -> String {
        let reason = if analysis.needs_web_search {
            "needs fresh web data"
        } else {
            match analysis.complexity {
                QuestionComplexity::Complex => "heavyweight request",
                QuestionComplexity::Medium => "medium-weight request",
                QuestionComplexity::Simple => "lightweight request",
            }
        };
        format!(
            "{} question ({}) -> {} / {} (confidence {:.2})",
            analysis.question_type,
            reason,
            analysis.recommended_provider,
            analysis.recommended_model,
            analysis.confidence
        )
    }

    /// The routing table in use
    pub fn routing(&self) -> &RoutingTable {
        &self.routing
    }

    /// The route a module prefers, if configured
    pub fn module_route(&self, module: &str) -> Option<&RouteChoice> {
        self.routing.route_for_module(module)
    }
}
