use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::auth::require_admin;
use crate::chatbot::ScamChatbot;
use crate::db::{DbSocialAnalysis, DbYoutubeContent};
use crate::error::ApiError;
use crate::state::AppState;

use super::with_db;

#[derive(Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YoutubeBody {
    pub title: String,
    pub description: Option<String>,
    pub video_url: Option<String>,
    pub call_id: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialBody {
    pub platform: String,
    pub content_url: Option<String>,
    pub content_text: String,
}

pub async fn list_youtube(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<DbYoutubeContent>>, ApiError> {
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let content = with_db(&state, |db| Ok(db.get_youtube_content(limit)?))?;
    Ok(Json(content))
}

pub async fn create_youtube(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<YoutubeBody>,
) -> Result<Json<DbYoutubeContent>, ApiError> {
    require_admin(&state, &headers)?;
    if body.title.trim().is_empty() {
        return Err(ApiError::BadRequest("Title is required".to_string()));
    }

    let content = with_db(&state, |db| {
        if let Some(call_id) = body.call_id {
            if db.get_call(call_id)?.is_none() {
                return Err(ApiError::NotFound("Call"));
            }
        }
        Ok(db.insert_youtube_content(
            body.title.trim(),
            body.description.as_deref(),
            body.video_url.as_deref(),
            body.call_id,
        )?)
    })?;
    Ok(Json(content))
}

/// Run the classifier over a social post and persist the analysis.
pub async fn analyze_social(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SocialBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let text = body.content_text.trim();
    if text.is_empty() {
        return Err(ApiError::BadRequest("Content text is required".to_string()));
    }

    let chatbot = ScamChatbot::from_state(&state);
    let verdict = chatbot.analyze(text).await;

    let label = if verdict.is_scam { "scam" } else { "safe" };
    let analysis = with_db(&state, |db| {
        Ok(db.insert_social_analysis(
            body.platform.trim(),
            body.content_url.as_deref(),
            text,
            verdict.confidence,
            label,
        )?)
    })?;

    Ok(Json(json!({ "analysis": analysis, "verdict": verdict })))
}

pub async fn list_social_analyses(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<DbSocialAnalysis>>, ApiError> {
    require_admin(&state, &headers)?;
    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let analyses = with_db(&state, |db| Ok(db.get_social_analyses(limit)?))?;
    Ok(Json(analyses))
}
