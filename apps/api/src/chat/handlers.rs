use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::chat::service::process_message;
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AskQuestionRequest {
    pub question: String,
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct AskQuestionResponse {
    pub answer: String,
}

/// POST /chat
pub async fn handle_ask(
    State(state): State<AppState>,
    Json(req): Json<AskQuestionRequest>,
) -> Result<Json<AskQuestionResponse>, AppError> {
    if req.question.trim().is_empty() {
        return Err(AppError::Validation("question must not be empty".to_string()));
    }
    if req.session_id.trim().is_empty() {
        return Err(AppError::Validation("sessionId must not be empty".to_string()));
    }

    let answer = process_message(&state, &req.question, &req.session_id).await?;
    Ok(Json(AskQuestionResponse { answer }))
}
