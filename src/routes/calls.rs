use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::db::{DbCall, DbCallRecording};
use crate::error::ApiError;
use crate::state::AppState;

use super::with_db;

const DEFAULT_LIST_LIMIT: i64 = 50;

#[derive(Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCallBody {
    pub caller_number: String,
    pub persona_id: Option<i64>,
    pub scam_type: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteCallBody {
    /// completed | dropped; defaults to completed.
    pub status: Option<String>,
    pub duration_seconds: Option<i64>,
    pub transcript: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingBody {
    pub audio_url: String,
    pub duration_seconds: Option<i64>,
    #[serde(default)]
    pub consent: bool,
}

pub async fn list_calls(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<DbCall>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, 500);
    let calls = with_db(&state, |db| Ok(db.get_recent_calls(limit)?))?;
    Ok(Json(calls))
}

pub async fn list_active_calls(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<DbCall>>, ApiError> {
    let calls = with_db(&state, |db| Ok(db.get_active_calls()?))?;
    Ok(Json(calls))
}

pub async fn create_call(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateCallBody>,
) -> Result<Json<DbCall>, ApiError> {
    if body.caller_number.trim().is_empty() {
        return Err(ApiError::BadRequest("Caller number is required".to_string()));
    }

    let call = with_db(&state, |db| {
        if let Some(pid) = body.persona_id {
            if db.get_persona(pid)?.is_none() {
                return Err(ApiError::NotFound("Persona"));
            }
        }
        Ok(db.insert_call(
            body.persona_id,
            body.caller_number.trim(),
            body.scam_type.as_deref(),
        )?)
    })?;
    Ok(Json(call))
}

pub async fn complete_call(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<CompleteCallBody>,
) -> Result<Json<DbCall>, ApiError> {
    let status = body.status.as_deref().unwrap_or("completed");
    if !matches!(status, "completed" | "dropped") {
        return Err(ApiError::BadRequest(format!("Invalid status: {status}")));
    }

    let call = with_db(&state, |db| {
        if !db.complete_call(id, status, body.duration_seconds, body.transcript.as_deref())? {
            return Err(ApiError::Conflict(
                "Call not found or already closed".to_string(),
            ));
        }
        Ok(db.get_call(id)?.ok_or(ApiError::NotFound("Call"))?)
    })?;
    Ok(Json(call))
}

pub async fn list_recordings(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<DbCallRecording>>, ApiError> {
    let recordings = with_db(&state, |db| {
        if db.get_call(id)?.is_none() {
            return Err(ApiError::NotFound("Call"));
        }
        Ok(db.get_recordings_for_call(id)?)
    })?;
    Ok(Json(recordings))
}

pub async fn create_recording(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<RecordingBody>,
) -> Result<Json<DbCallRecording>, ApiError> {
    if body.audio_url.trim().is_empty() {
        return Err(ApiError::BadRequest("Audio URL is required".to_string()));
    }

    let recording = with_db(&state, |db| {
        if db.get_call(id)?.is_none() {
            return Err(ApiError::NotFound("Call"));
        }
        Ok(db.insert_recording(id, body.audio_url.trim(), body.duration_seconds, body.consent)?)
    })?;
    Ok(Json(recording))
}
