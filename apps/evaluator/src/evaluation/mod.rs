// Candidate-response evaluation engine.
// normalizer → (keywords ∥ sentiment ∥ coherence) → aggregator → feedback,
// driven by the orchestrator and configured by `settings`.

pub mod aggregator;
pub mod coherence;
pub mod extractor;
pub mod feedback;
pub mod handlers;
pub mod keywords;
pub mod lexicon;
pub mod normalizer;
pub mod orchestrator;
pub mod question_bank;
pub mod sentiment;
pub mod session;
pub mod settings;

pub use orchestrator::EvaluationEngine;
