//! Request classification and provider recommendation
//!
//! A request's text is probed against configurable keyword sets, graded for
//! complexity, and resolved to a provider/model recommendation through a
//! routing table. Classification is pure and never fails; the rest of the
//! pipeline treats its verdict as a hint, not a commitment.

mod analyzer;
mod keywords;
mod routing;

pub use analyzer::{Classifier, QuestionAnalysis, QuestionComplexity, QuestionType};
pub use keywords::KeywordConfig;
pub use routing::{RouteChoice, RoutingTable};
