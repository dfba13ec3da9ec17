//! Scoring Aggregator: combines the extracted features into one bounded score.
//!
//! Algorithm:
//! 1. Map every signal onto 0.0 – 1.0
//!    - keyword coverage = min(1, keywords_found / keyword_target[category])
//!    - sentiment        = (polarity + 1) / 2
//!    - coherence, normalized length as extracted
//! 2. raw    = Σ weight[category][signal] × value          (weights sum to 1.0)
//! 3. curved = raw ^ difficulty_curve[difficulty]           (exponent > 0)
//! 4. score  = min + (max − min) × curved, rounded to 2 decimals
//! 5. Band: high (≥ bands.high), medium (≥ bands.medium), low
//!
//! Every step is non-decreasing in every signal, so the score is monotonic in
//! each signal with the others held fixed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::EvalError;
use crate::evaluation::settings::{BandThresholds, ScoreRange};
use crate::models::evaluation::{ExtractedFeatures, ScoreBand, Signal, SignalContribution};
use crate::models::question::{Difficulty, QuestionCategory};

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalWeights {
    pub keyword_coverage: f64,
    pub sentiment: f64,
    pub coherence: f64,
    pub length: f64,
}

impl SignalWeights {
    pub fn get(&self, signal: Signal) -> f64 {
        match signal {
            Signal::KeywordCoverage => self.keyword_coverage,
            Signal::Sentiment => self.sentiment,
            Signal::Coherence => self.coherence,
            Signal::Length => self.length,
        }
    }

    /// Builds weights from a `[category_weights.<category>]` table. Every signal
    /// must be present, no unknown keys, each weight in 0.0 – 1.0, sum 1.0.
    pub fn from_table(category: &str, table: &BTreeMap<String, f64>) -> Result<Self, EvalError> {
        if let Some(unknown) = table.keys().find(|k| Signal::from_key(k).is_none()) {
            return Err(EvalError::Configuration(format!(
                "category_weights.{category}: unknown signal '{unknown}'"
            )));
        }

        let lookup = |signal: Signal| {
            table.get(signal.as_str()).copied().ok_or_else(|| {
                EvalError::Configuration(format!(
                    "category_weights.{category}: missing weight for '{}'",
                    signal.as_str()
                ))
            })
        };

        let weights = SignalWeights {
            keyword_coverage: lookup(Signal::KeywordCoverage)?,
            sentiment: lookup(Signal::Sentiment)?,
            coherence: lookup(Signal::Coherence)?,
            length: lookup(Signal::Length)?,
        };
        weights.validate(category)?;
        Ok(weights)
    }

    pub fn validate(&self, category: &str) -> Result<(), EvalError> {
        for signal in Signal::ALL {
            let w = self.get(signal);
            if !w.is_finite() || !(0.0..=1.0).contains(&w) {
                return Err(EvalError::Configuration(format!(
                    "category_weights.{category}.{}: weight must be within 0.0 – 1.0, got {w}",
                    signal.as_str()
                )));
            }
        }
        let sum: f64 = Signal::ALL.iter().map(|s| self.get(*s)).sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(EvalError::Configuration(format!(
                "category_weights.{category}: weights must sum to 1.0, got {sum}"
            )));
        }
        Ok(())
    }
}

/// Aggregated score plus the rationale behind it.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateScore {
    pub score: f64,
    pub band: ScoreBand,
    pub breakdown: Vec<SignalContribution>,
    /// Lowest-valued signal among those with a non-zero weight.
    pub weakest_signal: Option<Signal>,
}

pub struct ScoringAggregator {
    pub weights: BTreeMap<QuestionCategory, SignalWeights>,
    pub keyword_targets: BTreeMap<QuestionCategory, u32>,
    pub difficulty_curve: BTreeMap<Difficulty, f64>,
    pub range: ScoreRange,
    pub bands: BandThresholds,
}

impl ScoringAggregator {
    pub fn aggregate(
        &self,
        features: &ExtractedFeatures,
        category: QuestionCategory,
        difficulty: Difficulty,
    ) -> AggregateScore {
        let weights = self.weights_for(category);

        let breakdown: Vec<SignalContribution> = Signal::ALL
            .iter()
            .map(|&signal| {
                let value = self.signal_value(signal, features, category);
                let weight = weights.get(signal);
                SignalContribution {
                    signal,
                    value,
                    weight,
                    contribution: value * weight,
                }
            })
            .collect();

        let raw: f64 = breakdown.iter().map(|c| c.contribution).sum::<f64>().clamp(0.0, 1.0);
        let exponent = self.difficulty_curve.get(&difficulty).copied().unwrap_or(1.0);
        let curved = raw.powf(exponent);

        let span = self.range.max - self.range.min;
        let score = round2(self.range.min + span * curved).clamp(self.range.min, self.range.max);

        AggregateScore {
            score,
            band: self.band_for(score),
            weakest_signal: weakest_signal(&breakdown),
            breakdown,
        }
    }

    pub fn band_for(&self, score: f64) -> ScoreBand {
        if score >= self.bands.high {
            ScoreBand::High
        } else if score >= self.bands.medium {
            ScoreBand::Medium
        } else {
            ScoreBand::Low
        }
    }

    fn weights_for(&self, category: QuestionCategory) -> SignalWeights {
        // Settings validation guarantees every category is present.
        self.weights.get(&category).copied().unwrap_or(SignalWeights {
            keyword_coverage: 0.25,
            sentiment: 0.25,
            coherence: 0.25,
            length: 0.25,
        })
    }

    fn signal_value(
        &self,
        signal: Signal,
        features: &ExtractedFeatures,
        category: QuestionCategory,
    ) -> f64 {
        let value = match signal {
            Signal::KeywordCoverage => {
                let target = self.keyword_targets.get(&category).copied().unwrap_or(1).max(1);
                features.keywords.len() as f64 / target as f64
            }
            Signal::Sentiment => (features.sentiment + 1.0) / 2.0,
            Signal::Coherence => features.coherence,
            Signal::Length => features.normalized_length,
        };
        value.clamp(0.0, 1.0)
    }
}

fn weakest_signal(breakdown: &[SignalContribution]) -> Option<Signal> {
    let mut weakest: Option<&SignalContribution> = None;
    for c in breakdown.iter().filter(|c| c.weight > 0.0) {
        if weakest.map_or(true, |w| c.value < w.value) {
            weakest = Some(c);
        }
    }
    weakest.map(|c| c.signal)
}

/// Rounds to two decimals, the precision every reported score uses.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn aggregator() -> ScoringAggregator {
        let mut weights = BTreeMap::new();
        weights.insert(
            QuestionCategory::Technical,
            SignalWeights {
                keyword_coverage: 0.6,
                sentiment: 0.05,
                coherence: 0.2,
                length: 0.15,
            },
        );
        weights.insert(
            QuestionCategory::Behavioral,
            SignalWeights {
                keyword_coverage: 0.1,
                sentiment: 0.35,
                coherence: 0.35,
                length: 0.2,
            },
        );
        let mut keyword_targets = BTreeMap::new();
        keyword_targets.insert(QuestionCategory::Technical, 3);
        keyword_targets.insert(QuestionCategory::Behavioral, 3);
        let mut difficulty_curve = BTreeMap::new();
        difficulty_curve.insert(Difficulty::Easy, 1.15);
        difficulty_curve.insert(Difficulty::Medium, 1.0);
        difficulty_curve.insert(Difficulty::Hard, 0.85);
        ScoringAggregator {
            weights,
            keyword_targets,
            difficulty_curve,
            range: ScoreRange { min: 0.0, max: 10.0 },
            bands: BandThresholds {
                high: 7.5,
                medium: 5.0,
            },
        }
    }

    fn features(
        keywords: usize,
        sentiment: f64,
        coherence: f64,
        length: f64,
    ) -> ExtractedFeatures {
        ExtractedFeatures {
            keywords: (0..keywords).map(|i| format!("kw{i}")).collect(),
            sentiment,
            coherence,
            normalized_length: length,
            word_count: 10,
        }
    }

    #[test]
    fn test_perfect_signals_hit_max() {
        let agg = aggregator();
        let s = agg.aggregate(
            &features(3, 1.0, 1.0, 1.0),
            QuestionCategory::Technical,
            Difficulty::Medium,
        );
        assert_eq!(s.score, 10.0);
        assert_eq!(s.band, ScoreBand::High);
    }

    #[test]
    fn test_zero_signals_hit_min() {
        let agg = aggregator();
        let s = agg.aggregate(
            &features(0, -1.0, 0.0, 0.0),
            QuestionCategory::Behavioral,
            Difficulty::Hard,
        );
        assert_eq!(s.score, 0.0);
        assert_eq!(s.band, ScoreBand::Low);
    }

    #[test]
    fn test_adding_keywords_never_lowers_score() {
        let agg = aggregator();
        for category in [QuestionCategory::Technical, QuestionCategory::Behavioral] {
            for difficulty in Difficulty::ALL {
                let mut previous = f64::MIN;
                for n in 0..=6 {
                    let s = agg
                        .aggregate(&features(n, 0.2, 0.6, 0.5), category, difficulty)
                        .score;
                    assert!(
                        s >= previous,
                        "{category:?}/{difficulty:?}: {n} keywords scored {s} < {previous}"
                    );
                    previous = s;
                }
            }
        }
    }

    #[test]
    fn test_monotonic_in_every_continuous_signal() {
        let agg = aggregator();
        let steps: Vec<f64> = (0..=10).map(|i| i as f64 / 10.0).collect();
        for difficulty in Difficulty::ALL {
            let mut prev = (f64::MIN, f64::MIN, f64::MIN);
            let score = |f: ExtractedFeatures| {
                agg.aggregate(&f, QuestionCategory::Behavioral, difficulty).score
            };
            for &v in &steps {
                let sent = score(features(1, v * 2.0 - 1.0, 0.5, 0.5));
                let coh = score(features(1, 0.0, v, 0.5));
                let len = score(features(1, 0.0, 0.5, v));
                assert!(sent >= prev.0 && coh >= prev.1 && len >= prev.2);
                prev = (sent, coh, len);
            }
        }
    }

    #[test]
    fn test_score_always_within_bounds() {
        let agg = aggregator();
        for kw in [0, 1, 5, 50] {
            for sent in [-1.0, -0.3, 0.0, 0.7, 1.0] {
                for coh in [0.0, 0.4, 1.0] {
                    let s = agg.aggregate(
                        &features(kw, sent, coh, 0.9),
                        QuestionCategory::Technical,
                        Difficulty::Easy,
                    );
                    assert!((0.0..=10.0).contains(&s.score));
                }
            }
        }
    }

    #[test]
    fn test_technical_weights_keywords_highest() {
        let agg = aggregator();
        let keyword_heavy = agg.aggregate(
            &features(3, 0.0, 0.3, 0.3),
            QuestionCategory::Technical,
            Difficulty::Medium,
        );
        let tone_heavy = agg.aggregate(
            &features(0, 1.0, 1.0, 0.3),
            QuestionCategory::Technical,
            Difficulty::Medium,
        );
        assert!(keyword_heavy.score > tone_heavy.score);
    }

    #[test]
    fn test_hard_questions_are_scored_more_leniently() {
        let agg = aggregator();
        let f = features(1, 0.2, 0.5, 0.5);
        let easy = agg.aggregate(&f, QuestionCategory::Technical, Difficulty::Easy).score;
        let hard = agg.aggregate(&f, QuestionCategory::Technical, Difficulty::Hard).score;
        assert!(hard > easy);
    }

    #[test]
    fn test_breakdown_contributions_sum_to_raw() {
        let agg = aggregator();
        let s = agg.aggregate(
            &features(2, 0.0, 0.5, 0.5),
            QuestionCategory::Technical,
            Difficulty::Medium,
        );
        assert_eq!(s.breakdown.len(), 4);
        let raw: f64 = s.breakdown.iter().map(|c| c.contribution).sum();
        assert!((s.score - raw * 10.0).abs() <= 0.005 + 1e-9);
    }

    #[test]
    fn test_weakest_signal_ignores_zero_weight() {
        let contribution = |signal, value, weight| SignalContribution {
            signal,
            value,
            weight,
            contribution: value * weight,
        };
        let breakdown = vec![
            contribution(Signal::KeywordCoverage, 0.0, 0.0),
            contribution(Signal::Sentiment, 0.4, 0.5),
            contribution(Signal::Coherence, 0.4, 0.5),
        ];
        // Ties resolve to the earlier signal.
        assert_eq!(weakest_signal(&breakdown), Some(Signal::Sentiment));
    }

    #[test]
    fn test_weights_not_summing_to_one_rejected() {
        let t = table(&[
            ("keyword_coverage", 0.5),
            ("sentiment", 0.3),
            ("coherence", 0.3),
            ("length", 0.2),
        ]);
        let err = SignalWeights::from_table("technical", &t).unwrap_err();
        assert!(matches!(err, EvalError::Configuration(ref m) if m.contains("sum to 1.0")));
    }

    #[test]
    fn test_negative_weight_rejected() {
        let t = table(&[
            ("keyword_coverage", 1.2),
            ("sentiment", -0.2),
            ("coherence", 0.0),
            ("length", 0.0),
        ]);
        assert!(SignalWeights::from_table("technical", &t).is_err());
    }

    #[test]
    fn test_missing_and_unknown_signals_rejected() {
        let missing = table(&[("keyword_coverage", 0.5), ("sentiment", 0.5)]);
        assert!(SignalWeights::from_table("technical", &missing).is_err());
        let unknown = table(&[
            ("keyword_coverage", 0.5),
            ("sentiment", 0.2),
            ("coherence", 0.1),
            ("length", 0.1),
            ("charisma", 0.1),
        ]);
        let err = SignalWeights::from_table("technical", &unknown).unwrap_err();
        assert!(matches!(err, EvalError::Configuration(ref m) if m.contains("charisma")));
    }

    #[test]
    fn test_valid_weights_accepted() {
        let t = table(&[
            ("keyword_coverage", 0.6),
            ("sentiment", 0.05),
            ("coherence", 0.2),
            ("length", 0.15),
        ]);
        let w = SignalWeights::from_table("technical", &t).unwrap();
        assert_eq!(w.get(Signal::KeywordCoverage), 0.6);
    }
}
