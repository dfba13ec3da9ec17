//! Keyword Extractor: finds domain-relevant terms in an answer.
//!
//! Algorithm:
//! 1. Candidate terms = category vocabulary ∪ question's expected keywords,
//!    de-duplicated on their singular token form ("team" and "teams" are one term)
//! 2. A term matches at position i if its tokens equal content_tokens[i..i+n]
//!    (a trailing plural `s` on the answer token is tolerated)
//! 3. Longer terms claim their tokens first; a token counts toward one term only
//! 4. Relevance = number of occurrences; ties broken by first occurrence
//!
//! Matching is exact on normalized tokens. No stemming beyond the plural rule.

use std::collections::BTreeMap;

use crate::errors::EvalError;
use crate::evaluation::extractor::{ExtractionInput, FeatureExtractor};
use crate::evaluation::normalizer::{is_stopword, tokenize};
use crate::models::question::QuestionCategory;

/// A vocabulary term as configured, plus its normalized token form.
#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    pub display: String,
    pub tokens: Vec<String>,
}

impl Term {
    /// Identity used for de-duplication: tokens with any plural `s` stripped.
    fn key(&self) -> Vec<&str> {
        self.tokens.iter().map(|t| singular(t)).collect()
    }

    fn matches_at(&self, tokens: &[String], start: usize) -> bool {
        let end = start + self.tokens.len();
        end <= tokens.len()
            && self
                .tokens
                .iter()
                .zip(&tokens[start..end])
                .all(|(expected, actual)| token_matches(expected, actual))
    }
}

/// Ordered, de-duplicated set of terms.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vocabulary {
    pub terms: Vec<Term>,
}

impl Vocabulary {
    /// Builds a vocabulary from configuration. A term that normalizes to nothing
    /// (punctuation only, or only stopwords) is a configuration error.
    pub fn build(
        label: &str,
        raw_terms: &[String],
        remove_stopwords: bool,
    ) -> Result<Self, EvalError> {
        let mut vocabulary = Vocabulary::default();
        for raw in raw_terms {
            let term = normalize_term(raw, remove_stopwords).ok_or_else(|| {
                EvalError::Configuration(format!(
                    "{label}: term '{raw}' is empty after normalization"
                ))
            })?;
            vocabulary.push(term);
        }
        Ok(vocabulary)
    }

    /// Like `build`, but silently drops unusable terms. Used for inline questions
    /// supplied at request time, which must never fail an evaluation.
    pub fn build_lenient(raw_terms: &[String], remove_stopwords: bool) -> Self {
        let mut vocabulary = Vocabulary::default();
        for term in raw_terms
            .iter()
            .filter_map(|raw| normalize_term(raw, remove_stopwords))
        {
            vocabulary.push(term);
        }
        vocabulary
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    fn push(&mut self, term: Term) {
        if !self.terms.iter().any(|t| t.key() == term.key()) {
            self.terms.push(term);
        }
    }
}

fn normalize_term(raw: &str, remove_stopwords: bool) -> Option<Term> {
    let tokens: Vec<String> = tokenize(raw)
        .into_iter()
        .filter(|t| !(remove_stopwords && is_stopword(t)))
        .collect();
    if tokens.is_empty() {
        return None;
    }
    let display = raw
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    Some(Term { display, tokens })
}

fn token_matches(expected: &str, actual: &str) -> bool {
    expected == actual || singular(actual) == expected
}

/// Strips one trailing plural `s` ("teams" → "team", but not "process").
fn singular(token: &str) -> &str {
    if token.len() > 3 && token.ends_with('s') && !token.ends_with("ss") {
        &token[..token.len() - 1]
    } else {
        token
    }
}

#[derive(Debug)]
struct KeywordHit {
    term: String,
    occurrences: usize,
    first_position: usize,
    order: usize,
}

pub struct KeywordExtractor {
    vocabularies: BTreeMap<QuestionCategory, Vocabulary>,
}

impl KeywordExtractor {
    pub fn new(vocabularies: BTreeMap<QuestionCategory, Vocabulary>) -> Self {
        Self { vocabularies }
    }
}

impl FeatureExtractor for KeywordExtractor {
    type Output = Vec<String>;
    const NAME: &'static str = "keyword";

    fn extract(&self, input: &ExtractionInput) -> Result<Vec<String>, EvalError> {
        let tokens = &input.text.content_tokens;
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        let category_terms = self
            .vocabularies
            .get(&input.category)
            .map(|v| v.terms.as_slice())
            .unwrap_or(&[]);

        let mut candidates: Vec<&Term> = Vec::new();
        for term in category_terms.iter().chain(input.extra_terms.terms.iter()) {
            if !candidates.iter().any(|c| c.key() == term.key()) {
                candidates.push(term);
            }
        }

        // Longest first, so "unit testing" consumes the tokens "testing" would match.
        let mut by_length: Vec<(usize, &Term)> = candidates.into_iter().enumerate().collect();
        by_length.sort_by(|a, b| b.1.tokens.len().cmp(&a.1.tokens.len()));

        let mut claimed = vec![false; tokens.len()];
        let mut hits: Vec<KeywordHit> = Vec::new();
        for (order, term) in by_length {
            let width = term.tokens.len();
            let mut occurrences = 0;
            let mut first_position = None;
            let mut i = 0;
            while i < tokens.len() {
                let free = i + width <= tokens.len() && !claimed[i..i + width].contains(&true);
                if free && term.matches_at(tokens, i) {
                    claimed[i..i + width].fill(true);
                    occurrences += 1;
                    first_position.get_or_insert(i);
                    i += width;
                } else {
                    i += 1;
                }
            }
            if let Some(first_position) = first_position {
                hits.push(KeywordHit {
                    term: term.display.clone(),
                    occurrences,
                    first_position,
                    order,
                });
            }
        }

        // Equal (count, position) pairs keep vocabulary order.
        hits.sort_by(|a, b| {
            b.occurrences
                .cmp(&a.occurrences)
                .then(a.first_position.cmp(&b.first_position))
                .then(a.order.cmp(&b.order))
        });

        Ok(hits.into_iter().map(|h| h.term).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::normalizer::normalize;

    fn terms(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn extractor(category: QuestionCategory, list: &[&str]) -> KeywordExtractor {
        let mut vocabularies = BTreeMap::new();
        let vocabulary = Vocabulary::build("test", &terms(list), true).unwrap();
        vocabularies.insert(category, vocabulary);
        KeywordExtractor::new(vocabularies)
    }

    fn input(text: &str, category: QuestionCategory) -> ExtractionInput {
        ExtractionInput {
            text: normalize(Some(text), true).unwrap(),
            category,
            extra_terms: Vocabulary::default(),
        }
    }

    #[test]
    fn test_finds_technical_terms() {
        let ex = extractor(
            QuestionCategory::Technical,
            &["python", "experience", "years", "rust"],
        );
        let found = ex
            .extract(&input("I have 5 years of Python experience", QuestionCategory::Technical))
            .unwrap();
        assert_eq!(found, vec!["years", "python", "experience"]);
    }

    #[test]
    fn test_ranked_by_occurrence_then_first_position() {
        let ex = extractor(QuestionCategory::Technical, &["python", "docker", "sql"]);
        let found = ex
            .extract(&input(
                "Docker first, then SQL. Python, Python and more python.",
                QuestionCategory::Technical,
            ))
            .unwrap();
        assert_eq!(found, vec!["python", "docker", "sql"]);
    }

    #[test]
    fn test_empty_tokens_yield_empty_set() {
        let ex = extractor(QuestionCategory::Technical, &["python"]);
        assert!(ex.extract(&input("", QuestionCategory::Technical)).unwrap().is_empty());
    }

    #[test]
    fn test_vocabulary_is_per_category() {
        let ex = extractor(QuestionCategory::Technical, &["python"]);
        let found = ex
            .extract(&input("python python", QuestionCategory::Behavioral))
            .unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_plural_answer_token_matches_singular_term() {
        let ex = extractor(QuestionCategory::Behavioral, &["team"]);
        let found = ex
            .extract(&input("I work well in teams", QuestionCategory::Behavioral))
            .unwrap();
        assert_eq!(found, vec!["team"]);
    }

    #[test]
    fn test_multi_word_terms_match_consecutive_tokens() {
        let ex = extractor(QuestionCategory::Technical, &["machine learning", "ci/cd"]);
        let found = ex
            .extract(&input(
                "I built CI/CD pipelines for machine learning models",
                QuestionCategory::Technical,
            ))
            .unwrap();
        assert_eq!(found, vec!["ci/cd", "machine learning"]);
    }

    #[test]
    fn test_expected_keywords_extend_vocabulary() {
        let ex = extractor(QuestionCategory::Technical, &["python"]);
        let mut inp = input("Python with Django", QuestionCategory::Technical);
        inp.extra_terms = Vocabulary::build_lenient(&terms(&["Django", "python"]), true);
        let found = ex.extract(&inp).unwrap();
        assert_eq!(found, vec!["python", "django"]);
    }

    #[test]
    fn test_stopword_only_term_is_configuration_error() {
        let err = Vocabulary::build("technical", &terms(&["the"]), true).unwrap_err();
        assert!(matches!(err, EvalError::Configuration(_)));
    }

    #[test]
    fn test_lenient_build_drops_unusable_terms() {
        let v = Vocabulary::build_lenient(&terms(&["!!!", "redis", "Redis"]), true);
        assert_eq!(v.terms.len(), 1);
    }

    #[test]
    fn test_plural_variants_collapse_to_first_term() {
        let v = Vocabulary::build("behavioral", &terms(&["team", "teams"]), true).unwrap();
        assert_eq!(v.terms.len(), 1);

        let ex = extractor(QuestionCategory::Behavioral, &["team"]);
        let mut inp = input("I led two teams", QuestionCategory::Behavioral);
        inp.extra_terms = Vocabulary::build_lenient(&terms(&["teams"]), true);
        assert_eq!(ex.extract(&inp).unwrap(), vec!["team"]);
    }

    #[test]
    fn test_longer_term_claims_shared_tokens() {
        let ex = extractor(QuestionCategory::Technical, &["testing", "unit testing"]);
        let found = ex
            .extract(&input(
                "I wrote unit testing suites and some load testing",
                QuestionCategory::Technical,
            ))
            .unwrap();
        assert_eq!(found, vec!["unit testing", "testing"]);

        let found = ex
            .extract(&input("Mostly unit testing", QuestionCategory::Technical))
            .unwrap();
        assert_eq!(found, vec!["unit testing"]);
    }

    #[test]
    fn test_singular_rule() {
        assert_eq!(singular("teams"), "team");
        assert_eq!(singular("process"), "process");
        assert_eq!(singular("bus"), "bus");
    }
}
