//! Sentiment lexicon: the backing resource of the sentiment analyzer.
//!
//! Loaded exactly once at startup through a `LexiconSource`, then shared
//! read-only behind an `Arc`. Nothing on the evaluation path touches I/O.
//!
//! Failure split:
//! - resource unreachable (I/O)       → `ModelUnavailable`, retried
//! - resource reachable but malformed → `Configuration`, fatal

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use crate::errors::EvalError;

const BUILTIN_LEXICON: &str = include_str!("../../config/sentiment_lexicon.toml");

/// Valences outside this range are rejected as corrupt.
const MAX_ABS_VALENCE: f64 = 4.0;

#[derive(Debug, Deserialize)]
struct LexiconFile {
    valence: BTreeMap<String, f64>,
}

/// Word → valence table.
#[derive(Debug, Clone, PartialEq)]
pub struct SentimentLexicon {
    valences: BTreeMap<String, f64>,
}

impl SentimentLexicon {
    pub fn from_toml_str(raw: &str) -> Result<Self, EvalError> {
        let file: LexiconFile = toml::from_str(raw).map_err(|e| {
            EvalError::Configuration(format!("sentiment lexicon is not valid TOML: {e}"))
        })?;

        if file.valence.is_empty() {
            return Err(EvalError::Configuration(
                "sentiment lexicon has no entries".to_string(),
            ));
        }

        let mut valences = BTreeMap::new();
        for (word, value) in file.valence {
            if !value.is_finite() || value.abs() > MAX_ABS_VALENCE {
                return Err(EvalError::Configuration(format!(
                    "sentiment lexicon: valence for '{word}' must be within \
                     ±{MAX_ABS_VALENCE}, got {value}"
                )));
            }
            valences.insert(word.to_lowercase(), value);
        }

        Ok(Self { valences })
    }

    pub fn builtin() -> Result<Self, EvalError> {
        Self::from_toml_str(BUILTIN_LEXICON)
    }

    pub fn valence(&self, token: &str) -> Option<f64> {
        self.valences.get(token).copied()
    }

    pub fn len(&self) -> usize {
        self.valences.len()
    }
}

/// Where the lexicon comes from. Swapped at startup via `SENTIMENT_LEXICON_PATH`.
#[async_trait]
pub trait LexiconSource: Send + Sync {
    fn describe(&self) -> String;

    async fn load(&self) -> Result<SentimentLexicon, EvalError>;
}

/// The lexicon compiled into the binary.
pub struct BuiltinLexicon;

#[async_trait]
impl LexiconSource for BuiltinLexicon {
    fn describe(&self) -> String {
        "builtin".to_string()
    }

    async fn load(&self) -> Result<SentimentLexicon, EvalError> {
        SentimentLexicon::builtin()
    }
}

/// A lexicon TOML file on disk.
pub struct FileLexicon {
    pub path: PathBuf,
}

#[async_trait]
impl LexiconSource for FileLexicon {
    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }

    async fn load(&self) -> Result<SentimentLexicon, EvalError> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            EvalError::ModelUnavailable(format!(
                "cannot read sentiment lexicon {}: {e}",
                self.path.display()
            ))
        })?;
        SentimentLexicon::from_toml_str(&raw)
    }
}

/// Loads the lexicon, retrying `ModelUnavailable` up to `retries` more times.
pub async fn load_lexicon(
    source: &dyn LexiconSource,
    retries: u32,
) -> Result<SentimentLexicon, EvalError> {
    let mut attempt = 0;
    loop {
        match source.load().await {
            Ok(lexicon) => {
                info!(
                    "Sentiment lexicon loaded from {} ({} entries)",
                    source.describe(),
                    lexicon.len()
                );
                return Ok(lexicon);
            }
            Err(e) if e.is_retryable() && attempt < retries => {
                attempt += 1;
                warn!(
                    "Sentiment lexicon load from {} failed ({e}), retry {attempt}/{retries}",
                    source.describe()
                );
            }
            Err(e) => return Err(e),
        }
    }
}
