use serde::{Deserialize, Serialize};

/// The four scoring signals, in their fixed tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    KeywordCoverage,
    Sentiment,
    Coherence,
    Length,
}

impl Signal {
    pub const ALL: [Signal; 4] = [
        Signal::KeywordCoverage,
        Signal::Sentiment,
        Signal::Coherence,
        Signal::Length,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::KeywordCoverage => "keyword_coverage",
            Signal::Sentiment => "sentiment",
            Signal::Coherence => "coherence",
            Signal::Length => "length",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == key)
    }
}

/// Discrete score bucket used to pick feedback templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Low,
    Medium,
    High,
}

impl ScoreBand {
    pub const ALL: [ScoreBand; 3] = [ScoreBand::Low, ScoreBand::Medium, ScoreBand::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreBand::Low => "low",
            ScoreBand::Medium => "medium",
            ScoreBand::High => "high",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.as_str() == key)
    }
}

/// Everything the extractors produced for one answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFeatures {
    /// Matched vocabulary terms, most relevant first.
    pub keywords: Vec<String>,
    pub sentiment: f64,         // -1.0 – 1.0
    pub coherence: f64,         // 0.0 – 1.0
    pub normalized_length: f64, // 0.0 – 1.0
    pub word_count: usize,
}

impl ExtractedFeatures {
    pub fn empty() -> Self {
        Self {
            keywords: Vec::new(),
            sentiment: 0.0,
            coherence: 0.0,
            normalized_length: 0.0,
            word_count: 0,
        }
    }
}

/// How one signal fed into the final score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalContribution {
    pub signal: Signal,
    /// Signal mapped onto 0.0 – 1.0.
    pub value: f64,
    pub weight: f64,
    /// value × weight
    pub contribution: f64,
}

/// Final output of one evaluation. Identical input always yields an identical value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub question_id: String,
    pub score: f64,
    pub band: ScoreBand,
    pub feedback: String,
    pub features: ExtractedFeatures,
    pub breakdown: Vec<SignalContribution>,
    pub weakest_signal: Option<Signal>,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    /// True when the answer was empty or whitespace-only.
    pub degenerate: bool,
}

impl EvaluationResult {
    /// Normalized value of `signal`, or 0.0 for degenerate results without a breakdown.
    pub fn signal_value(&self, signal: Signal) -> f64 {
        self.breakdown
            .iter()
            .find(|c| c.signal == signal)
            .map(|c| c.value)
            .unwrap_or(0.0)
    }
}
