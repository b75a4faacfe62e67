use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

use crate::auth::require_admin;
use crate::db::{DbFraudEntry, DbFraudSubmission};
use crate::error::ApiError;
use crate::state::AppState;

use super::with_db;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitBody {
    pub phone_number: String,
    pub category: String,
    pub details: Option<String>,
    pub submitter_email: Option<String>,
}

#[derive(Deserialize)]
pub struct LookupQuery {
    pub phone: String,
}

#[derive(Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmBody {
    pub phone_number: String,
}

pub async fn submit(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SubmitBody>,
) -> Result<Json<DbFraudSubmission>, ApiError> {
    let phone = body.phone_number.trim();
    if phone.is_empty() {
        return Err(ApiError::BadRequest("Phone number is required".to_string()));
    }
    if body.category.trim().is_empty() {
        return Err(ApiError::BadRequest("Category is required".to_string()));
    }

    let submission = with_db(&state, |db| {
        db.insert_fraud_submission(
            phone,
            body.category.trim(),
            body.details.as_deref(),
            body.submitter_email.as_deref(),
        )
        .map_err(ApiError::Database)
    })?;
    Ok(Json(submission))
}

pub async fn lookup(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LookupQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let entry = with_db(&state, |db| Ok(db.lookup_fraud_entry(query.phone.trim())?))?;

    Ok(Json(match entry {
        Some(entry) => serde_json::json!({ "known": true, "entry": entry }),
        None => serde_json::json!({ "known": false }),
    }))
}

pub async fn list_confirmed(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<DbFraudEntry>>, ApiError> {
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let offset = query.offset.unwrap_or(0).max(0);
    let entries = with_db(&state, |db| {
        Ok(db.get_confirmed_fraud_entries(limit, offset)?)
    })?;
    Ok(Json(entries))
}

pub async fn confirm(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<ConfirmBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_admin(&state, &headers)?;

    with_db(&state, |db| {
        if !db.confirm_fraud_entry(body.phone_number.trim())? {
            return Err(ApiError::NotFound("Fraud entry"));
        }
        Ok(())
    })?;
    Ok(Json(serde_json::json!({ "confirmed": true })))
}
