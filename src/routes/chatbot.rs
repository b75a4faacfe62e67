use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::chatbot::ScamChatbot;
use crate::error::ApiError;
use crate::state::AppState;

const MAX_MESSAGE_CHARS: usize = 4000;

#[derive(Deserialize)]
pub struct MessageBody {
    pub message: String,
}

/// Classify a message the user received and answer in chat form.
pub async fn message(
    State(state): State<Arc<AppState>>,
    Json(body): Json<MessageBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let text = body.message.trim();
    if text.is_empty() {
        return Err(ApiError::BadRequest("Message is required".to_string()));
    }
    if text.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ApiError::BadRequest(format!(
            "Message exceeds {MAX_MESSAGE_CHARS} characters"
        )));
    }

    let chatbot = ScamChatbot::from_state(&state);
    let verdict = chatbot.analyze(text).await;

    let reply = if verdict.is_scam {
        format!(
            "This looks like a scam ({:.0}% confident). {}",
            verdict.confidence * 100.0,
            verdict.advice
        )
    } else {
        format!(
            "This doesn't look like a known scam pattern ({:.0}% confident). {}",
            (1.0 - verdict.confidence) * 100.0,
            verdict.advice
        )
    };

    Ok(Json(json!({ "reply": reply, "verdict": verdict })))
}
