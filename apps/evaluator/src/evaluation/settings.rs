//! Engine settings: the TOML configuration surface of the evaluation engine.
//!
//! `SettingsFile` mirrors the file as written; `validate()` turns it into a
//! typed `EngineSettings` or a `Configuration` error. Nothing downstream ever
//! sees an unvalidated value.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::errors::EvalError;
use crate::evaluation::aggregator::SignalWeights;
use crate::evaluation::feedback::FeedbackTemplates;
use crate::evaluation::keywords::Vocabulary;
use crate::evaluation::question_bank::QuestionBank;
use crate::models::question::{Difficulty, Question, QuestionCategory};

const BUILTIN_SETTINGS: &str = include_str!("../../config/evaluator.toml");

const DEFAULT_KEYWORD_TARGET: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScoreRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BandThresholds {
    pub high: f64,
    pub medium: f64,
}

/// Shape of the normalized-length curve.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LengthPolicy {
    /// Word count at which the length signal reaches 0.5.
    pub half_saturation_words: usize,
    /// Above this many words the signal is scaled down.
    pub verbose_limit_words: usize,
}

fn default_timeout_ms() -> u64 {
    250
}

fn default_retry_count() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

/// Raw settings file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsFile {
    #[serde(default = "default_timeout_ms")]
    pub extractor_timeout_ms: u64,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_true")]
    pub remove_stopwords: bool,
    pub no_response_message: String,
    pub score: ScoreRange,
    pub bands: BandThresholds,
    pub length: LengthPolicy,
    pub difficulty_curve: BTreeMap<String, f64>,
    pub category_weights: BTreeMap<String, BTreeMap<String, f64>>,
    #[serde(default)]
    pub keyword_targets: BTreeMap<String, u32>,
    pub keyword_vocabulary: BTreeMap<String, Vec<String>>,
    pub feedback_templates: BTreeMap<String, String>,
    pub signal_hints: BTreeMap<String, String>,
    #[serde(default)]
    pub questions: Vec<Question>,
}

/// Validated, immutable engine configuration.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// `None` disables the per-extractor timeout.
    pub extractor_timeout: Option<Duration>,
    pub retry_count: u32,
    pub remove_stopwords: bool,
    pub range: ScoreRange,
    pub bands: BandThresholds,
    pub length: LengthPolicy,
    pub difficulty_curve: BTreeMap<Difficulty, f64>,
    pub weights: BTreeMap<QuestionCategory, SignalWeights>,
    pub keyword_targets: BTreeMap<QuestionCategory, u32>,
    pub vocabularies: BTreeMap<QuestionCategory, Vocabulary>,
    pub feedback: FeedbackTemplates,
    pub questions: QuestionBank,
}

impl EngineSettings {
    pub fn builtin() -> Result<Self, EvalError> {
        Self::from_toml_str(BUILTIN_SETTINGS)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, EvalError> {
        let file: SettingsFile = toml::from_str(raw)
            .map_err(|e| EvalError::Configuration(format!("settings are not valid: {e}")))?;
        file.validate()
    }

    /// Reads settings from `path`, or falls back to the built-in file.
    pub async fn load(path: Option<&Path>) -> Result<Self, EvalError> {
        let Some(path) = path else {
            info!("Using built-in evaluator settings");
            return Self::builtin();
        };

        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            EvalError::Configuration(format!("cannot read settings {}: {e}", path.display()))
        })?;
        let settings = Self::from_toml_str(&raw)?;
        info!("Evaluator settings loaded from {}", path.display());
        Ok(settings)
    }
}

impl SettingsFile {
    pub fn validate(self) -> Result<EngineSettings, EvalError> {
        let range = self.score;
        if !range.min.is_finite() || !range.max.is_finite() || range.min >= range.max {
            return Err(EvalError::Configuration(format!(
                "score: min must be below max, got {} .. {}",
                range.min, range.max
            )));
        }

        let bands = self.bands;
        if !(range.min < bands.medium && bands.medium < bands.high && bands.high <= range.max) {
            return Err(EvalError::Configuration(format!(
                "bands: expected {} < medium < high <= {}, got medium {} high {}",
                range.min, range.max, bands.medium, bands.high
            )));
        }

        if self.length.half_saturation_words == 0 || self.length.verbose_limit_words == 0 {
            return Err(EvalError::Configuration(
                "length: half_saturation_words and verbose_limit_words must be at least 1"
                    .to_string(),
            ));
        }

        let difficulty_curve = validate_difficulty_curve(&self.difficulty_curve)?;

        let mut weights = BTreeMap::new();
        for (key, table) in &self.category_weights {
            weights.insert(
                category_key("category_weights", key)?,
                SignalWeights::from_table(key, table)?,
            );
        }
        require_all_categories("category_weights", &weights)?;

        let mut keyword_targets: BTreeMap<QuestionCategory, u32> = QuestionCategory::ALL
            .into_iter()
            .map(|c| (c, DEFAULT_KEYWORD_TARGET))
            .collect();
        for (key, &target) in &self.keyword_targets {
            if target == 0 {
                return Err(EvalError::Configuration(format!(
                    "keyword_targets.{key}: target must be at least 1"
                )));
            }
            keyword_targets.insert(category_key("keyword_targets", key)?, target);
        }

        let mut vocabularies = BTreeMap::new();
        for (key, terms) in &self.keyword_vocabulary {
            let category = category_key("keyword_vocabulary", key)?;
            let label = format!("keyword_vocabulary.{key}");
            let vocabulary = Vocabulary::build(&label, terms, self.remove_stopwords)?;
            if vocabulary.is_empty() {
                return Err(EvalError::Configuration(format!("{label}: vocabulary is empty")));
            }
            vocabularies.insert(category, vocabulary);
        }
        require_all_categories("keyword_vocabulary", &vocabularies)?;

        let feedback = FeedbackTemplates::from_config(
            &self.feedback_templates,
            &self.signal_hints,
            &self.no_response_message,
        )?;

        let questions = QuestionBank::new(self.questions, self.remove_stopwords)?;

        let extractor_timeout = match self.extractor_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };

        Ok(EngineSettings {
            extractor_timeout,
            retry_count: self.retry_count,
            remove_stopwords: self.remove_stopwords,
            range,
            bands,
            length: self.length,
            difficulty_curve,
            weights,
            keyword_targets,
            vocabularies,
            feedback,
            questions,
        })
    }
}

fn category_key(section: &str, key: &str) -> Result<QuestionCategory, EvalError> {
    QuestionCategory::from_key(key).ok_or_else(|| {
        EvalError::Configuration(format!("{section}: unknown question category '{key}'"))
    })
}

fn require_all_categories<V>(
    section: &str,
    map: &BTreeMap<QuestionCategory, V>,
) -> Result<(), EvalError> {
    match QuestionCategory::ALL.iter().find(|c| !map.contains_key(c)) {
        Some(missing) => Err(EvalError::Configuration(format!(
            "{section}: missing entry for category '{}'",
            missing.as_str()
        ))),
        None => Ok(()),
    }
}

fn validate_difficulty_curve(
    raw: &BTreeMap<String, f64>,
) -> Result<BTreeMap<Difficulty, f64>, EvalError> {
    let mut curve = BTreeMap::new();
    for (key, &exponent) in raw {
        let difficulty = Difficulty::from_key(key).ok_or_else(|| {
            EvalError::Configuration(format!("difficulty_curve: unknown difficulty '{key}'"))
        })?;
        if !exponent.is_finite() || exponent <= 0.0 {
            return Err(EvalError::Configuration(format!(
                "difficulty_curve.{key}: exponent must be positive, got {exponent}"
            )));
        }
        curve.insert(difficulty, exponent);
    }
    if let Some(missing) = Difficulty::ALL.iter().find(|d| !curve.contains_key(d)) {
        return Err(EvalError::Configuration(format!(
            "difficulty_curve: missing exponent for '{}'",
            missing.as_str()
        )));
    }
    Ok(curve)
}
