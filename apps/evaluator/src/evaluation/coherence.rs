//! Coherence Scorer: structural rating in 0.0 – 1.0.
//!
//! coherence = 0.5 × flow + 0.2 × structure + 0.3 × diversity
//!
//! - flow: mean adjacent-sentence link. A link is the overlap coefficient of
//!   the two sentences' content tokens, or 0.8 when the second sentence opens
//!   with a linking word. A single sentence gets a fixed 0.7.
//! - structure: share of discourse-marker groups present (sequencing,
//!   contrast/causal, example, conclusion).
//! - diversity: unique / total content tokens.
//!
//! Fewer than two content tokens is degenerate and scores the minimum.

use std::collections::BTreeSet;

use crate::errors::EvalError;
use crate::evaluation::extractor::{ExtractionInput, FeatureExtractor};
use crate::evaluation::normalizer::{tokenize, NormalizedText, Sentence};

pub const MIN_COHERENCE: f64 = 0.0;

const FLOW_WEIGHT: f64 = 0.5;
const STRUCTURE_WEIGHT: f64 = 0.2;
const DIVERSITY_WEIGHT: f64 = 0.3;

const SINGLE_SENTENCE_FLOW: f64 = 0.7;
const LINKING_OPENER_SCORE: f64 = 0.8;

const STRUCTURE_INDICATORS: &[&[&str]] = &[
    &[
        "first", "firstly", "second", "secondly", "third", "thirdly", "finally", "lastly",
        "next",
    ],
    &[
        "however", "therefore", "moreover", "furthermore", "additionally", "because",
        "consequently",
    ],
    &["for example", "such as", "specifically", "particularly", "for instance"],
    &["in conclusion", "to summarize", "overall", "in summary", "as a result"],
];

const LINKING_OPENERS: &[&str] = &[
    "this", "that", "it", "they", "also", "then", "however", "therefore", "so", "because",
    "additionally", "moreover", "furthermore", "afterwards", "finally", "next", "second",
    "secondly", "later", "as",
];

pub struct CoherenceScorer;

impl CoherenceScorer {
    pub fn score(&self, text: &NormalizedText) -> f64 {
        if text.content_tokens.len() < 2 {
            return MIN_COHERENCE;
        }

        let flow = flow_score(&text.sentences);
        let structure = structure_score(&text.tokens);
        let diversity = diversity_score(&text.content_tokens);

        (FLOW_WEIGHT * flow + STRUCTURE_WEIGHT * structure + DIVERSITY_WEIGHT * diversity)
            .clamp(0.0, 1.0)
    }
}

impl FeatureExtractor for CoherenceScorer {
    type Output = f64;
    const NAME: &'static str = "coherence";

    fn extract(&self, input: &ExtractionInput) -> Result<f64, EvalError> {
        Ok(self.score(&input.text))
    }
}

fn flow_score(sentences: &[Sentence]) -> f64 {
    let meaningful: Vec<&Sentence> = sentences.iter().filter(|s| !s.content.is_empty()).collect();
    if meaningful.len() <= 1 {
        return SINGLE_SENTENCE_FLOW;
    }

    let links: Vec<f64> = meaningful
        .windows(2)
        .map(|pair| {
            let lexical = overlap_coefficient(&pair[0].content, &pair[1].content);
            let opener = pair[1]
                .tokens
                .first()
                .filter(|t| LINKING_OPENERS.contains(&t.as_str()))
                .map(|_| LINKING_OPENER_SCORE)
                .unwrap_or(0.0);
            lexical.max(opener)
        })
        .collect();

    links.iter().sum::<f64>() / links.len() as f64
}

fn overlap_coefficient(a: &[String], b: &[String]) -> f64 {
    let a: BTreeSet<&str> = a.iter().map(String::as_str).collect();
    let b: BTreeSet<&str> = b.iter().map(String::as_str).collect();
    let smaller = a.len().min(b.len());
    if smaller == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f64 / smaller as f64
}

fn structure_score(tokens: &[String]) -> f64 {
    let groups_present = STRUCTURE_INDICATORS
        .iter()
        .filter(|group| group.iter().any(|phrase| contains_phrase(tokens, phrase)))
        .count();
    groups_present as f64 / STRUCTURE_INDICATORS.len() as f64
}

fn contains_phrase(tokens: &[String], phrase: &str) -> bool {
    let phrase = tokenize(phrase);
    !phrase.is_empty() && tokens.windows(phrase.len()).any(|w| w == phrase.as_slice())
}

fn diversity_score(content: &[String]) -> f64 {
    if content.is_empty() {
        return 0.0;
    }
    let unique: BTreeSet<&String> = content.iter().collect();
    unique.len() as f64 / content.len() as f64
}
