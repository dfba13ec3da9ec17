use std::collections::BTreeMap;

use crate::errors::EvalError;
use crate::evaluation::keywords::Vocabulary;
use crate::models::question::Question;

/// Configured questions, addressable by id. Listing order is file order.
#[derive(Debug, Clone, Default)]
pub struct QuestionBank {
    questions: Vec<Question>,
    index: BTreeMap<String, usize>,
}

impl QuestionBank {
    pub fn new(questions: Vec<Question>, remove_stopwords: bool) -> Result<Self, EvalError> {
        let mut index = BTreeMap::new();

        for (position, question) in questions.iter().enumerate() {
            if question.id.trim().is_empty() {
                return Err(EvalError::Configuration(format!(
                    "questions[{position}]: id must not be empty"
                )));
            }
            if question.text.trim().is_empty() {
                return Err(EvalError::Configuration(format!(
                    "questions.{}: text must not be empty",
                    question.id
                )));
            }
            Vocabulary::build(
                &format!("questions.{}.expected_keywords", question.id),
                &question.expected_keywords,
                remove_stopwords,
            )?;
            if index.insert(question.id.clone(), position).is_some() {
                return Err(EvalError::Configuration(format!(
                    "questions: duplicate id '{}'",
                    question.id
                )));
            }
        }

        Ok(Self { questions, index })
    }

    pub fn get(&self, id: &str) -> Option<&Question> {
        self.index.get(id).map(|&i| &self.questions[i])
    }

    pub fn all(&self) -> &[Question] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }
}
