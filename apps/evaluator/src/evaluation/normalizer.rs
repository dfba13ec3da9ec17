//! Text Normalizer: turns a raw candidate answer into token sequences.
//!
//! Lower-cases, strips punctuation, splits sentences and (optionally) drops
//! stopwords. Pure: no I/O, no shared state.

use crate::errors::EvalError;
use crate::evaluation::settings::LengthPolicy;

/// Common English function words. Negations are deliberately absent so that
/// sentiment and phrase matching never lose them.
const STOPWORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "if", "of", "at", "by", "for", "with", "about",
    "to", "from", "in", "on", "into", "over", "under", "i", "me", "my", "we", "our", "us",
    "you", "your", "he", "she", "him", "her", "it", "its", "they", "them", "their", "this",
    "that", "these", "those", "is", "am", "are", "was", "were", "be", "been", "being",
    "have", "has", "had", "do", "does", "did", "will", "would", "should", "can", "could",
    "as", "so", "than", "too", "just", "also", "there", "here", "what", "which", "who",
    "whom", "when", "where", "why", "how", "all", "any", "both", "each", "some", "such",
    "only", "own", "same", "then", "once", "up", "down", "out", "very", "really",
];

const APOSTROPHES: &[char] = &['\'', '\u{2019}'];

/// One sentence of the answer.
#[derive(Debug, Clone, PartialEq)]
pub struct Sentence {
    /// Every token, stopwords included.
    pub tokens: Vec<String>,
    /// Tokens left after stopword removal (equal to `tokens` when removal is off).
    pub content: Vec<String>,
}

/// Normalized form of an answer, shared read-only by all extractors of one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedText {
    pub tokens: Vec<String>,
    pub content_tokens: Vec<String>,
    pub sentences: Vec<Sentence>,
}

impl NormalizedText {
    pub fn word_count(&self) -> usize {
        self.tokens.len()
    }
}

/// Normalizes raw answer text.
///
/// `None` is the only failure: the payload carried no text at all. An empty or
/// blank string is valid and yields empty sequences.
pub fn normalize(raw: Option<&str>, remove_stopwords: bool) -> Result<NormalizedText, EvalError> {
    let raw = raw.ok_or_else(|| {
        EvalError::InvalidInput("response text is missing or not textual".to_string())
    })?;

    let sentences: Vec<Sentence> = split_sentences(raw)
        .into_iter()
        .map(|s| {
            let tokens = tokenize(s);
            let content = filter_stopwords(&tokens, remove_stopwords);
            Sentence { tokens, content }
        })
        .filter(|s| !s.tokens.is_empty())
        .collect();

    let tokens: Vec<String> = sentences.iter().flat_map(|s| s.tokens.clone()).collect();
    let content_tokens: Vec<String> = sentences.iter().flat_map(|s| s.content.clone()).collect();

    Ok(NormalizedText {
        tokens,
        content_tokens,
        sentences,
    })
}

/// Lower-cases and splits on any non-alphanumeric character. Apostrophes are
/// dropped inside words, so "don't" becomes "dont".
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();

    for ch in text.chars() {
        if ch.is_alphanumeric() {
            current.extend(ch.to_lowercase());
        } else if APOSTROPHES.contains(&ch) {
            continue;
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(&token)
}

fn filter_stopwords(tokens: &[String], remove_stopwords: bool) -> Vec<String> {
    if !remove_stopwords {
        return tokens.to_vec();
    }
    tokens
        .iter()
        .filter(|t| !is_stopword(t))
        .cloned()
        .collect()
}

/// Splits on `.`, `!`, `?` followed by whitespace (or end of text) and on newlines.
/// "node.js" stays one sentence.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, ch)) = chars.next() {
        let boundary = match ch {
            '\n' => true,
            '.' | '!' | '?' => chars.peek().map_or(true, |&(_, next)| next.is_whitespace()),
            _ => false,
        };
        if boundary {
            let end = i + ch.len_utf8();
            let piece = text[start..end].trim();
            if !piece.is_empty() {
                sentences.push(piece);
            }
            start = end;
        }
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }

    sentences
}

/// True for text the orchestrator treats as "no answer": empty, whitespace or
/// control characters only.
pub fn is_blank(text: &str) -> bool {
    text.chars().all(|c| c.is_whitespace() || c.is_control())
}

/// Normalized length in 0.0 – 1.0.
///
/// `w / (w + half_saturation)` rises quickly for short answers and flattens out;
/// beyond `verbose_limit_words` it is scaled down by `limit / w`.
pub fn length_metric(word_count: usize, policy: &LengthPolicy) -> f64 {
    if word_count == 0 {
        return 0.0;
    }
    let w = word_count as f64;
    let base = w / (w + policy.half_saturation_words as f64);
    let verbosity = if word_count > policy.verbose_limit_words {
        policy.verbose_limit_words as f64 / w
    } else {
        1.0
    };
    (base * verbosity).clamp(0.0, 1.0)
}
