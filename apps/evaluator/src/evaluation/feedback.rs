//! Feedback Generator: turns a score and its features into readable feedback.
//!
//! Text = band template (low/medium/high) + hint for the weakest signal.
//! Templates may use `{score}`, `{max}` and `{keywords}`; anything else is
//! rejected when settings load, so generation itself never fails.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::errors::EvalError;
use crate::evaluation::aggregator::AggregateScore;
use crate::models::evaluation::{ExtractedFeatures, ScoreBand, Signal};

const PLACEHOLDERS: &[&str] = &["score", "max", "keywords"];

/// How many keywords `{keywords}` lists.
const KEYWORDS_SHOWN: usize = 3;
const NO_KEYWORDS_TEXT: &str = "no key terms yet";

const STRENGTH_THRESHOLD: f64 = 0.7;
const IMPROVEMENT_THRESHOLD: f64 = 0.5;

const DEFAULT_STRENGTH: &str = "Shows understanding of the topic";
const DEFAULT_IMPROVEMENT: &str = "Continue practicing to build confidence";
const NO_RESPONSE_IMPROVEMENT: &str = "Provide a response to the question";

/// Validated template set.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackTemplates {
    pub bands: BTreeMap<ScoreBand, String>,
    pub hints: BTreeMap<Signal, String>,
    pub no_response: String,
}

impl FeedbackTemplates {
    pub fn from_config(
        templates: &BTreeMap<String, String>,
        hints: &BTreeMap<String, String>,
        no_response: &str,
    ) -> Result<Self, EvalError> {
        let mut bands = BTreeMap::new();
        for (key, template) in templates {
            let band = ScoreBand::from_key(key).ok_or_else(|| {
                EvalError::Configuration(format!("feedback_templates: unknown score band '{key}'"))
            })?;
            validate_template(&format!("feedback_templates.{key}"), template)?;
            bands.insert(band, template.trim().to_string());
        }
        if let Some(missing) = ScoreBand::ALL.iter().find(|b| !bands.contains_key(b)) {
            return Err(EvalError::Configuration(format!(
                "feedback_templates: missing template for band '{}'",
                missing.as_str()
            )));
        }

        let mut signal_hints = BTreeMap::new();
        for (key, hint) in hints {
            let signal = Signal::from_key(key).ok_or_else(|| {
                EvalError::Configuration(format!("signal_hints: unknown signal '{key}'"))
            })?;
            validate_template(&format!("signal_hints.{key}"), hint)?;
            signal_hints.insert(signal, hint.trim().to_string());
        }
        if let Some(missing) = Signal::ALL.iter().find(|s| !signal_hints.contains_key(s)) {
            return Err(EvalError::Configuration(format!(
                "signal_hints: missing hint for signal '{}'",
                missing.as_str()
            )));
        }

        if no_response.trim().is_empty() {
            return Err(EvalError::Configuration(
                "no_response_message must not be empty".to_string(),
            ));
        }

        Ok(Self {
            bands,
            hints: signal_hints,
            no_response: no_response.trim().to_string(),
        })
    }
}

fn validate_template(label: &str, template: &str) -> Result<(), EvalError> {
    if template.trim().is_empty() {
        return Err(EvalError::Configuration(format!("{label}: template is empty")));
    }

    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let close = after.find('}').ok_or_else(|| {
            EvalError::Configuration(format!("{label}: unclosed '{{' in template"))
        })?;
        let name = &after[..close];
        if !PLACEHOLDERS.contains(&name) {
            return Err(EvalError::Configuration(format!(
                "{label}: unknown placeholder '{{{name}}}'"
            )));
        }
        rest = &after[close + 1..];
    }
    Ok(())
}

/// Feedback for one answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feedback {
    pub text: String,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
}

pub struct FeedbackGenerator {
    templates: FeedbackTemplates,
    max_score: f64,
}

impl FeedbackGenerator {
    pub fn new(templates: FeedbackTemplates, max_score: f64) -> Self {
        Self {
            templates,
            max_score,
        }
    }

    pub fn generate(&self, aggregate: &AggregateScore, features: &ExtractedFeatures) -> Feedback {
        let template = self
            .templates
            .bands
            .get(&aggregate.band)
            .map(String::as_str)
            .unwrap_or_default();
        let mut text = self.render(template, aggregate.score, features);

        if let Some(hint) = aggregate
            .weakest_signal
            .and_then(|s| self.templates.hints.get(&s))
        {
            text.push(' ');
            text.push_str(&self.render(hint, aggregate.score, features));
        }

        let weighted = aggregate.breakdown.iter().filter(|c| c.weight > 0.0);

        let mut strengths: Vec<String> = weighted
            .clone()
            .filter(|c| c.value >= STRENGTH_THRESHOLD)
            .map(|c| strength_label(c.signal).to_string())
            .collect();
        if strengths.is_empty() {
            strengths.push(DEFAULT_STRENGTH.to_string());
        }

        let mut improvements: Vec<String> = weighted
            .filter(|c| c.value < IMPROVEMENT_THRESHOLD)
            .map(|c| improvement_label(c.signal).to_string())
            .collect();
        if improvements.is_empty() {
            improvements.push(DEFAULT_IMPROVEMENT.to_string());
        }

        Feedback {
            text,
            strengths,
            improvements,
        }
    }

    /// Feedback for an empty answer.
    pub fn no_response(&self) -> Feedback {
        Feedback {
            text: self.templates.no_response.clone(),
            strengths: Vec::new(),
            improvements: vec![NO_RESPONSE_IMPROVEMENT.to_string()],
        }
    }

    fn render(&self, template: &str, score: f64, features: &ExtractedFeatures) -> String {
        let keywords = if features.keywords.is_empty() {
            NO_KEYWORDS_TEXT.to_string()
        } else {
            features
                .keywords
                .iter()
                .take(KEYWORDS_SHOWN)
                .cloned()
                .collect::<Vec<_>>()
                .join(", ")
        };
        template
            .replace("{score}", &format_score(score))
            .replace("{max}", &format_score(self.max_score))
            .replace("{keywords}", &keywords)
    }
}

/// "8.36", "7.5", "10".
fn format_score(value: f64) -> String {
    let s = format!("{value:.2}");
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn strength_label(signal: Signal) -> &'static str {
    match signal {
        Signal::KeywordCoverage => "Good use of relevant terminology",
        Signal::Sentiment => "Positive, confident tone",
        Signal::Coherence => "Well-organized response",
        Signal::Length => "Appropriately detailed",
    }
}

fn improvement_label(signal: Signal) -> &'static str {
    match signal {
        Signal::KeywordCoverage => "Include more relevant terms for this question",
        Signal::Sentiment => "Describe your work with more confidence",
        Signal::Coherence => "Improve answer organization and flow",
        Signal::Length => "Provide more detail and a concrete example",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::evaluation::SignalContribution;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn band_templates() -> BTreeMap<String, String> {
        map(&[
            ("high", "Strong answer ({score}/{max}) covering {keywords}."),
            ("medium", "Solid answer ({score}/{max})."),
            ("low", "Needs work ({score}/{max})."),
        ])
    }

    fn hints() -> BTreeMap<String, String> {
        map(&[
            ("keyword_coverage", "Use more key terms."),
            ("sentiment", "Sound more confident."),
            ("coherence", "Connect your points."),
            ("length", "Add detail."),
        ])
    }

    fn generator() -> FeedbackGenerator {
        let templates = FeedbackTemplates::from_config(
            &band_templates(),
            &hints(),
            "Please provide a response.",
        )
        .unwrap();
        FeedbackGenerator::new(templates, 10.0)
    }

    fn contribution(signal: Signal, value: f64) -> SignalContribution {
        SignalContribution {
            signal,
            value,
            weight: 0.25,
            contribution: value * 0.25,
        }
    }

    fn aggregate(score: f64, band: ScoreBand, weakest: Signal) -> AggregateScore {
        AggregateScore {
            score,
            band,
            breakdown: vec![
                contribution(Signal::KeywordCoverage, 1.0),
                contribution(Signal::Sentiment, 0.5),
                contribution(Signal::Coherence, 0.65),
                contribution(Signal::Length, 0.3),
            ],
            weakest_signal: Some(weakest),
        }
    }

    fn features(keywords: &[&str]) -> ExtractedFeatures {
        ExtractedFeatures {
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
            ..ExtractedFeatures::empty()
        }
    }

    #[test]
    fn test_high_band_renders_placeholders_and_hint() {
        let fb = generator().generate(
            &aggregate(8.36, ScoreBand::High, Signal::Length),
            &features(&["python", "years", "experience", "sql"]),
        );
        assert_eq!(
            fb.text,
            "Strong answer (8.36/10) covering python, years, experience. Add detail."
        );
    }

    #[test]
    fn test_empty_keywords_rendered_as_placeholder_text() {
        let fb = generator().generate(
            &aggregate(8.0, ScoreBand::High, Signal::Sentiment),
            &features(&[]),
        );
        assert!(fb.text.contains(NO_KEYWORDS_TEXT));
    }

    #[test]
    fn test_hint_depends_on_weakest_signal() {
        let g = generator();
        let a = g.generate(&aggregate(4.0, ScoreBand::Low, Signal::Coherence), &features(&[]));
        let b = g.generate(&aggregate(4.0, ScoreBand::Low, Signal::Sentiment), &features(&[]));
        assert!(a.text.ends_with("Connect your points."));
        assert!(b.text.ends_with("Sound more confident."));
    }

    #[test]
    fn test_strengths_and_improvements() {
        let fb = generator().generate(
            &aggregate(6.0, ScoreBand::Medium, Signal::Length),
            &features(&[]),
        );
        assert_eq!(fb.strengths, vec!["Good use of relevant terminology"]);
        assert_eq!(fb.improvements, vec!["Provide more detail and a concrete example"]);
    }

    #[test]
    fn test_deterministic() {
        let g = generator();
        let agg = aggregate(6.0, ScoreBand::Medium, Signal::Length);
        let f = features(&["team"]);
        assert_eq!(g.generate(&agg, &f), g.generate(&agg, &f));
    }

    #[test]
    fn test_no_response_feedback() {
        let fb = generator().no_response();
        assert_eq!(fb.text, "Please provide a response.");
        assert!(fb.strengths.is_empty());
    }

    #[test]
    fn test_missing_band_template_rejected() {
        let mut templates = band_templates();
        templates.remove("medium");
        let err = FeedbackTemplates::from_config(&templates, &hints(), "x").unwrap_err();
        assert!(matches!(err, EvalError::Configuration(ref m) if m.contains("medium")));
    }

    #[test]
    fn test_unknown_placeholder_rejected() {
        let mut templates = band_templates();
        templates.insert("low".into(), "Bad {candidate_name}".into());
        let err = FeedbackTemplates::from_config(&templates, &hints(), "x").unwrap_err();
        assert!(matches!(err, EvalError::Configuration(ref m) if m.contains("candidate_name")));
    }

    #[test]
    fn test_unclosed_brace_and_empty_template_rejected() {
        let mut templates = band_templates();
        templates.insert("low".into(), "Score {score".into());
        assert!(FeedbackTemplates::from_config(&templates, &hints(), "x").is_err());
        templates.insert("low".into(), "   ".into());
        assert!(FeedbackTemplates::from_config(&templates, &hints(), "x").is_err());
    }

    #[test]
    fn test_missing_hint_and_empty_no_response_rejected() {
        let mut h = hints();
        h.remove("coherence");
        assert!(FeedbackTemplates::from_config(&band_templates(), &h, "x").is_err());
        assert!(FeedbackTemplates::from_config(&band_templates(), &hints(), " ").is_err());
    }

    #[test]
    fn test_format_score() {
        assert_eq!(format_score(8.36), "8.36");
        assert_eq!(format_score(7.5), "7.5");
        assert_eq!(format_score(10.0), "10");
        assert_eq!(format_score(0.0), "0");
    }
}
