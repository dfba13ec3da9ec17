//! Axum route handlers for the Evaluation API.

use axum::{
    extract::{FromRequest, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::errors::{AppError, EvalError};
use crate::evaluation::session::{evaluate_batch, summarize_session, SessionSummary};
use crate::models::evaluation::EvaluationResult;
use crate::models::question::{Question, QuestionRef, ResponseInput};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

/// `Json` whose rejection renders through `AppError`.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

/// One answer. Exactly one of `question_id` (bank) or `question` (inline) is set.
/// `answer` stays untyped so a non-string value becomes `INVALID_INPUT`
/// instead of a generic body rejection.
#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub question_id: Option<String>,
    pub question: Option<Question>,
    pub answer: Option<Value>,
    pub session_id: Option<Uuid>,
}

impl EvaluateRequest {
    fn into_input(self, session_id: Uuid) -> Result<ResponseInput, EvalError> {
        let question = match (self.question_id, self.question) {
            (Some(id), None) => QuestionRef::Bank(id),
            (None, Some(question)) => QuestionRef::Inline(question),
            (Some(_), Some(_)) => {
                return Err(EvalError::InvalidInput(
                    "provide either question_id or question, not both".to_string(),
                ))
            }
            (None, None) => {
                return Err(EvalError::InvalidInput(
                    "question_id or question is required".to_string(),
                ))
            }
        };

        let answer = match self.answer {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) => Some(text),
            Some(other) => {
                return Err(EvalError::InvalidInput(format!(
                    "answer must be a string, got {}",
                    json_type(&other)
                )))
            }
        };

        Ok(ResponseInput {
            question,
            answer,
            session_id: Some(self.session_id.unwrap_or(session_id)),
        })
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    pub session_id: Uuid,
    pub evaluated_at: DateTime<Utc>,
    pub result: EvaluationResult,
}

#[derive(Debug, Deserialize)]
pub struct BatchEvaluateRequest {
    pub session_id: Option<Uuid>,
    pub items: Vec<EvaluateRequest>,
}

#[derive(Debug, Serialize)]
pub struct BatchEvaluateResponse {
    pub session_id: Uuid,
    pub evaluated_at: DateTime<Utc>,
    pub results: Vec<EvaluationResult>,
    pub summary: SessionSummary,
}

#[derive(Debug, Serialize)]
pub struct QuestionsResponse {
    pub questions: Vec<Question>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/questions
pub async fn handle_list_questions(State(state): State<AppState>) -> Json<QuestionsResponse> {
    Json(QuestionsResponse {
        questions: state.engine.questions().all().to_vec(),
    })
}

/// POST /api/v1/evaluate
///
/// Scores a single answer. A fresh session id is issued when none is sent.
pub async fn handle_evaluate(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<EvaluateRequest>,
) -> Result<Json<EvaluateResponse>, AppError> {
    let session_id = request.session_id.unwrap_or_else(Uuid::new_v4);
    let input = request.into_input(session_id)?;

    let result = state.engine.evaluate_input(&input).await?;
    info!("Session {session_id}: {} scored {:.2}", result.question_id, result.score);

    Ok(Json(EvaluateResponse {
        session_id,
        evaluated_at: Utc::now(),
        result,
    }))
}

/// POST /api/v1/evaluate/batch
///
/// Scores every item in order and summarizes the session.
pub async fn handle_evaluate_batch(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<BatchEvaluateRequest>,
) -> Result<Json<BatchEvaluateResponse>, AppError> {
    if request.items.is_empty() {
        return Err(EvalError::InvalidInput("items must not be empty".to_string()).into());
    }

    let session_id = request.session_id.unwrap_or_else(Uuid::new_v4);
    let inputs = request
        .items
        .into_iter()
        .map(|item| item.into_input(session_id))
        .collect::<Result<Vec<_>, _>>()?;

    let results = evaluate_batch(&state.engine, &inputs).await?;
    let summary = summarize_session(&state.engine, &results);
    info!(
        "Session {session_id}: {} answers, average {:.2}",
        results.len(),
        summary.average_score
    );

    Ok(Json(BatchEvaluateResponse {
        session_id,
        evaluated_at: Utc::now(),
        results,
        summary,
    }))
}
