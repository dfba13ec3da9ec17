//! The extractor capability: consume normalized tokens, produce one typed feature.
//!
//! The set of extractors is closed (keyword, sentiment, coherence) and every
//! call site is statically dispatched. Each variant owns only read-only
//! configuration, so one instance serves every concurrent evaluation.

use crate::errors::EvalError;
use crate::evaluation::keywords::Vocabulary;
use crate::evaluation::normalizer::NormalizedText;
use crate::models::question::QuestionCategory;

/// Per-evaluation input shared (behind an `Arc`) by all three extractors.
#[derive(Debug, Clone)]
pub struct ExtractionInput {
    pub text: NormalizedText,
    pub category: QuestionCategory,
    /// Question-specific expected keywords, already tokenized.
    pub extra_terms: Vocabulary,
}

pub trait FeatureExtractor: Send + Sync + 'static {
    type Output: Send + 'static;

    /// Name used in logs and error messages.
    const NAME: &'static str;

    fn extract(&self, input: &ExtractionInput) -> Result<Self::Output, EvalError>;
}
