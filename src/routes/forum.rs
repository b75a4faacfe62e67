use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::auth::require_user;
use crate::db::{DbForumAnswer, DbForumQuestion};
use crate::error::ApiError;
use crate::state::AppState;

use super::with_db;

#[derive(Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionBody {
    pub title: String,
    pub body: String,
    pub author_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerBody {
    pub body: String,
    pub author_name: Option<String>,
}

/// Author name resolution: signed-in display name, then the submitted name,
/// then "anonymous".
fn resolve_author(
    state: &AppState,
    headers: &HeaderMap,
    submitted: Option<&str>,
) -> (Option<i64>, String) {
    match require_user(state, headers) {
        Ok(user) => {
            let name = user.display_name.clone().unwrap_or_else(|| user.email.clone());
            (Some(user.id), name)
        }
        Err(_) => (
            None,
            submitted
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or("anonymous")
                .to_string(),
        ),
    }
}

pub async fn list_questions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<DbForumQuestion>>, ApiError> {
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let questions = with_db(&state, |db| Ok(db.get_forum_questions(limit)?))?;
    Ok(Json(questions))
}

pub async fn create_question(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<QuestionBody>,
) -> Result<Json<DbForumQuestion>, ApiError> {
    if body.title.trim().is_empty() || body.body.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Title and body are required".to_string(),
        ));
    }

    let (user_id, author) = resolve_author(&state, &headers, body.author_name.as_deref());
    let question = with_db(&state, |db| {
        Ok(db.insert_forum_question(user_id, &author, body.title.trim(), body.body.trim())?)
    })?;
    Ok(Json(question))
}

/// Question detail: the question plus its answers, accepted answer first.
pub async fn get_question(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (question, answers) = with_db(&state, |db| {
        let question = db
            .get_forum_question(id)?
            .ok_or(ApiError::NotFound("Question"))?;
        let answers = db.get_forum_answers(id)?;
        Ok((question, answers))
    })?;

    Ok(Json(json!({ "question": question, "answers": answers })))
}

pub async fn create_answer(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<AnswerBody>,
) -> Result<Json<DbForumAnswer>, ApiError> {
    if body.body.trim().is_empty() {
        return Err(ApiError::BadRequest("Answer body is required".to_string()));
    }

    let (user_id, author) = resolve_author(&state, &headers, body.author_name.as_deref());
    let answer = with_db(&state, |db| {
        db.insert_forum_answer(id, user_id, &author, body.body.trim())
            .map_err(|e| {
                if e.contains("not found") {
                    ApiError::NotFound("Question")
                } else {
                    ApiError::Database(e)
                }
            })
    })?;
    Ok(Json(answer))
}

/// Accepting is for the question author or an admin.
pub async fn accept_answer(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = require_user(&state, &headers)?;

    with_db(&state, |db| {
        let answer = db.get_forum_answer(id)?.ok_or(ApiError::NotFound("Answer"))?;
        let question = db
            .get_forum_question(answer.question_id)?
            .ok_or(ApiError::NotFound("Question"))?;

        let is_author = question.user_id == Some(user.id);
        if !is_author && user.role != "admin" {
            return Err(ApiError::Forbidden);
        }

        db.accept_forum_answer(id).map_err(ApiError::Database)?;
        Ok(())
    })?;

    Ok(Json(json!({ "accepted": true })))
}
