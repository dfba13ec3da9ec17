//! Sentiment Analyzer: lexicon-based polarity in -1.0 – 1.0.
//!
//! Runs over the full token list (stopwords included) so negations and
//! boosters stay visible:
//! - a negation within the 3 preceding tokens flips and damps the valence (× -0.74)
//! - a booster/dampener directly before a word shifts its magnitude by ±0.293
//! - the summed valence is squashed with `s / sqrt(s² + 15)`

use std::sync::Arc;

use crate::errors::EvalError;
use crate::evaluation::extractor::{ExtractionInput, FeatureExtractor};
use crate::evaluation::lexicon::SentimentLexicon;

const NEGATIONS: &[&str] = &[
    "not", "no", "never", "dont", "didnt", "doesnt", "cant", "cannot", "wont", "isnt",
    "wasnt", "arent", "werent", "shouldnt", "wouldnt", "couldnt", "nothing", "nobody",
    "neither", "nor", "without",
];

const BOOSTERS: &[(&str, f64)] = &[
    ("very", 0.293),
    ("really", 0.293),
    ("extremely", 0.293),
    ("highly", 0.293),
    ("incredibly", 0.293),
    ("truly", 0.293),
    ("particularly", 0.293),
    ("slightly", -0.293),
    ("somewhat", -0.293),
    ("barely", -0.293),
    ("hardly", -0.293),
];

const NEGATION_WINDOW: usize = 3;
const NEGATION_SCALAR: f64 = -0.74;
const NORMALIZATION_ALPHA: f64 = 15.0;

pub struct SentimentAnalyzer {
    lexicon: Arc<SentimentLexicon>,
}

impl SentimentAnalyzer {
    pub fn new(lexicon: Arc<SentimentLexicon>) -> Self {
        Self { lexicon }
    }

    /// Polarity of a token sequence. Empty input is neutral (0.0).
    pub fn polarity(&self, tokens: &[String]) -> f64 {
        let mut sum = 0.0_f64;

        for (i, token) in tokens.iter().enumerate() {
            let Some(mut valence) = self.lexicon.valence(token) else {
                continue;
            };

            if let Some(boost) = i.checked_sub(1).and_then(|prev| booster(&tokens[prev])) {
                valence += boost * valence.signum();
            }

            let window_start = i.saturating_sub(NEGATION_WINDOW);
            if tokens[window_start..i].iter().any(|t| is_negation(t)) {
                valence *= NEGATION_SCALAR;
            }

            sum += valence;
        }

        if sum == 0.0 {
            return 0.0;
        }
        (sum / (sum * sum + NORMALIZATION_ALPHA).sqrt()).clamp(-1.0, 1.0)
    }
}

impl FeatureExtractor for SentimentAnalyzer {
    type Output = f64;
    const NAME: &'static str = "sentiment";

    fn extract(&self, input: &ExtractionInput) -> Result<f64, EvalError> {
        Ok(self.polarity(&input.text.tokens))
    }
}

fn is_negation(token: &str) -> bool {
    NEGATIONS.contains(&token)
}

fn booster(token: &str) -> Option<f64> {
    BOOSTERS
        .iter()
        .find(|(word, _)| *word == token)
        .map(|(_, boost)| *boost)
}
