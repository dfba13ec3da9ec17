//! Evaluation Orchestrator: drives one answer through the pipeline.
//!
//! Idle → Normalizing → Extracting → Aggregating → Generating → Done
//!
//! A blank answer skips straight from Normalizing to Generating. Any stage may
//! move to the terminal Failed state.
//!
//! The three extractors run concurrently on the blocking pool and meet at a
//! single `try_join!`. Each one is individually bounded by the configured
//! timeout and retried on `ModelUnavailable`; the first failure drops the
//! other in-flight results.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::errors::EvalError;
use crate::evaluation::aggregator::ScoringAggregator;
use crate::evaluation::coherence::CoherenceScorer;
use crate::evaluation::extractor::{ExtractionInput, FeatureExtractor};
use crate::evaluation::feedback::{Feedback, FeedbackGenerator};
use crate::evaluation::keywords::{KeywordExtractor, Vocabulary};
use crate::evaluation::lexicon::SentimentLexicon;
use crate::evaluation::normalizer::{is_blank, length_metric, normalize};
use crate::evaluation::question_bank::QuestionBank;
use crate::evaluation::sentiment::SentimentAnalyzer;
use crate::evaluation::settings::{EngineSettings, LengthPolicy};
use crate::models::evaluation::{EvaluationResult, ExtractedFeatures};
use crate::models::question::{Question, QuestionRef, ResponseInput};

// ────────────────────────────────────────────
// Pipeline state machine
// ────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Idle,
    Normalizing,
    Extracting,
    Aggregating,
    Generating,
    Done,
    Failed,
}

impl PipelineStage {
    pub fn can_transition_to(self, to: PipelineStage) -> bool {
        use PipelineStage::*;
        matches!(
            (self, to),
            (Idle, Normalizing)
                | (Normalizing, Extracting)
                | (Normalizing, Generating)
                | (Extracting, Aggregating)
                | (Aggregating, Generating)
                | (Generating, Done)
                | (Idle | Normalizing | Extracting | Aggregating | Generating, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineStage::Done | PipelineStage::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("illegal pipeline transition {from:?} -> {to:?}")]
pub struct IllegalTransition {
    pub from: PipelineStage,
    pub to: PipelineStage,
}

impl From<IllegalTransition> for EvalError {
    fn from(e: IllegalTransition) -> Self {
        EvalError::Configuration(format!("evaluation pipeline: {e}"))
    }
}

/// Current stage of one evaluation.
#[derive(Debug)]
pub struct StageTracker {
    stage: PipelineStage,
    question_id: String,
}

impl StageTracker {
    pub fn new(question_id: &str) -> Self {
        Self {
            stage: PipelineStage::Idle,
            question_id: question_id.to_string(),
        }
    }

    #[cfg(test)]
    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    pub fn advance(&mut self, to: PipelineStage) -> Result<(), IllegalTransition> {
        if !self.stage.can_transition_to(to) {
            return Err(IllegalTransition {
                from: self.stage,
                to,
            });
        }
        debug!("[{}] {:?} -> {:?}", self.question_id, self.stage, to);
        self.stage = to;
        Ok(())
    }

    /// Moves to `Failed` unless the pipeline already finished.
    pub fn fail(&mut self) {
        if !self.stage.is_terminal() {
            debug!("[{}] {:?} -> Failed", self.question_id, self.stage);
            self.stage = PipelineStage::Failed;
        }
    }
}

// ────────────────────────────────────────────
// Retry and extractor execution
// ────────────────────────────────────────────

/// Runs `operation`, retrying up to `retries` more times while it fails with a
/// retryable error. Other errors surface on the first attempt.
pub async fn with_retry<T, F, Fut>(
    label: &str,
    retries: u32,
    mut operation: F,
) -> Result<T, EvalError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, EvalError>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < retries => {
                attempt += 1;
                warn!("{label} failed ({e}), retry {attempt}/{retries}");
            }
            Err(e) => return Err(e),
        }
    }
}

/// Runs one extractor on the blocking pool under `timeout`, with retries.
///
/// A blocking task cannot be cancelled. On timeout it is abandoned and keeps
/// its pool thread until `extract` returns; only its result is discarded.
pub async fn run_extractor<E: FeatureExtractor>(
    extractor: &Arc<E>,
    input: &Arc<ExtractionInput>,
    timeout: Option<Duration>,
    retries: u32,
) -> Result<E::Output, EvalError> {
    let label = format!("{} extractor", E::NAME);
    with_retry(&label, retries, || {
        let extractor = Arc::clone(extractor);
        let input = Arc::clone(input);
        async move {
            let task = tokio::task::spawn_blocking(move || extractor.extract(&input));
            let joined = match timeout {
                Some(limit) => tokio::time::timeout(limit, task).await.map_err(|_| {
                    EvalError::ModelUnavailable(format!(
                        "{} extractor timed out after {}ms",
                        E::NAME,
                        limit.as_millis()
                    ))
                })?,
                None => task.await,
            };
            joined.map_err(|e| {
                EvalError::ModelUnavailable(format!("{} extractor aborted: {e}", E::NAME))
            })?
        }
    })
    .await
}

// ────────────────────────────────────────────
// Engine
// ────────────────────────────────────────────

/// Holds every read-only resource an evaluation needs. Built once at startup
/// and shared behind an `Arc`.
pub struct EvaluationEngine {
    keywords: Arc<KeywordExtractor>,
    sentiment: Arc<SentimentAnalyzer>,
    coherence: Arc<CoherenceScorer>,
    aggregator: ScoringAggregator,
    feedback: FeedbackGenerator,
    questions: QuestionBank,
    length: LengthPolicy,
    remove_stopwords: bool,
    extractor_timeout: Option<Duration>,
    retry_count: u32,
}

impl EvaluationEngine {
    pub fn new(settings: EngineSettings, lexicon: Arc<SentimentLexicon>) -> Self {
        Self {
            keywords: Arc::new(KeywordExtractor::new(settings.vocabularies)),
            sentiment: Arc::new(SentimentAnalyzer::new(lexicon)),
            coherence: Arc::new(CoherenceScorer),
            aggregator: ScoringAggregator {
                weights: settings.weights,
                keyword_targets: settings.keyword_targets,
                difficulty_curve: settings.difficulty_curve,
                range: settings.range,
                bands: settings.bands,
            },
            feedback: FeedbackGenerator::new(settings.feedback, settings.range.max),
            questions: settings.questions,
            length: settings.length,
            remove_stopwords: settings.remove_stopwords,
            extractor_timeout: settings.extractor_timeout,
            retry_count: settings.retry_count,
        }
    }

    pub fn questions(&self) -> &QuestionBank {
        &self.questions
    }

    pub fn aggregator(&self) -> &ScoringAggregator {
        &self.aggregator
    }

    /// Evaluates `answer` against `question`.
    ///
    /// `None` means the payload carried no text and is rejected. Blank text is
    /// a valid, minimum-score answer.
    pub async fn evaluate(
        &self,
        question: &Question,
        answer: Option<&str>,
    ) -> Result<EvaluationResult, EvalError> {
        let mut tracker = StageTracker::new(&question.id);

        match self.run_pipeline(&mut tracker, question, answer).await {
            Ok(result) => {
                info!(
                    "Evaluated {} ({}/{}): score {:.2} ({}), {} keywords",
                    question.id,
                    question.category.as_str(),
                    question.difficulty.as_str(),
                    result.score,
                    result.band.as_str(),
                    result.features.keywords.len()
                );
                Ok(result)
            }
            Err(e) => {
                tracker.fail();
                warn!("Evaluation of {} failed: {e}", question.id);
                Err(e)
            }
        }
    }

    /// Resolves the question reference, then evaluates.
    pub async fn evaluate_input(
        &self,
        input: &ResponseInput,
    ) -> Result<EvaluationResult, EvalError> {
        let question = self.resolve(&input.question)?;
        self.evaluate(question, input.answer.as_deref()).await
    }

    pub fn resolve<'a>(&'a self, question: &'a QuestionRef) -> Result<&'a Question, EvalError> {
        match question {
            QuestionRef::Bank(id) => self
                .questions
                .get(id)
                .ok_or_else(|| EvalError::InvalidInput(format!("unknown question id '{id}'"))),
            QuestionRef::Inline(q) if q.id.trim().is_empty() || q.text.trim().is_empty() => {
                Err(EvalError::InvalidInput(
                    "inline question needs a non-empty id and text".to_string(),
                ))
            }
            QuestionRef::Inline(q) => Ok(q),
        }
    }

    async fn run_pipeline(
        &self,
        tracker: &mut StageTracker,
        question: &Question,
        answer: Option<&str>,
    ) -> Result<EvaluationResult, EvalError> {
        tracker.advance(PipelineStage::Normalizing)?;
        let text = normalize(answer, self.remove_stopwords)?;

        if answer.is_some_and(is_blank) {
            tracker.advance(PipelineStage::Generating)?;
            let result = self.no_response_result(question);
            tracker.advance(PipelineStage::Done)?;
            return Ok(result);
        }

        tracker.advance(PipelineStage::Extracting)?;
        let word_count = text.word_count();
        let input = Arc::new(ExtractionInput {
            text,
            category: question.category,
            extra_terms: Vocabulary::build_lenient(
                &question.expected_keywords,
                self.remove_stopwords,
            ),
        });

        let timeout = self.extractor_timeout;
        let retries = self.retry_count;
        let (keywords, sentiment, coherence) = tokio::try_join!(
            run_extractor(&self.keywords, &input, timeout, retries),
            run_extractor(&self.sentiment, &input, timeout, retries),
            run_extractor(&self.coherence, &input, timeout, retries),
        )?;

        let features = ExtractedFeatures {
            keywords,
            sentiment,
            coherence,
            normalized_length: length_metric(word_count, &self.length),
            word_count,
        };

        tracker.advance(PipelineStage::Aggregating)?;
        let aggregate = self
            .aggregator
            .aggregate(&features, question.category, question.difficulty);

        tracker.advance(PipelineStage::Generating)?;
        let Feedback {
            text: feedback,
            strengths,
            improvements,
        } = self.feedback.generate(&aggregate, &features);

        tracker.advance(PipelineStage::Done)?;
        Ok(EvaluationResult {
            question_id: question.id.clone(),
            score: aggregate.score,
            band: aggregate.band,
            feedback,
            features,
            breakdown: aggregate.breakdown,
            weakest_signal: aggregate.weakest_signal,
            strengths,
            improvements,
            degenerate: false,
        })
    }

    fn no_response_result(&self, question: &Question) -> EvaluationResult {
        let min = self.aggregator.range.min;
        let feedback = self.feedback.no_response();
        EvaluationResult {
            question_id: question.id.clone(),
            score: min,
            band: self.aggregator.band_for(min),
            feedback: feedback.text,
            features: ExtractedFeatures::empty(),
            breakdown: Vec::new(),
            weakest_signal: None,
            strengths: feedback.strengths,
            improvements: feedback.improvements,
            degenerate: true,
        }
    }
}

/// Engine over the built-in settings and lexicon.
#[cfg(test)]
pub(crate) fn test_engine() -> EvaluationEngine {
    let settings = EngineSettings::builtin().unwrap();
    let lexicon = SentimentLexicon::builtin().unwrap();
    EvaluationEngine::new(settings, Arc::new(lexicon))
}
