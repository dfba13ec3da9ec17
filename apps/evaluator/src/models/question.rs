use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Interview question category. Drives weights, vocabulary and keyword targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionCategory {
    Technical,
    Behavioral,
    Situational,
}

impl QuestionCategory {
    pub const ALL: [QuestionCategory; 3] = [
        QuestionCategory::Technical,
        QuestionCategory::Behavioral,
        QuestionCategory::Situational,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionCategory::Technical => "technical",
            QuestionCategory::Behavioral => "behavioral",
            QuestionCategory::Situational => "situational",
        }
    }

    /// Resolves a configuration table key (`[category_weights.technical]`).
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == key)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.as_str() == key)
    }
}

/// A single interview question. Immutable once the question bank is loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    pub category: QuestionCategory,
    #[serde(default)]
    pub difficulty: Difficulty,
    /// Question-specific terms merged into the category vocabulary.
    #[serde(default)]
    pub expected_keywords: Vec<String>,
}

/// How a submitted answer points at its question.
#[derive(Debug, Clone)]
pub enum QuestionRef {
    Bank(String),
    Inline(Question),
}

/// One submitted answer. `answer` is `None` when the payload carried no text at all.
#[derive(Debug, Clone)]
pub struct ResponseInput {
    pub question: QuestionRef,
    pub answer: Option<String>,
    pub session_id: Option<Uuid>,
}
