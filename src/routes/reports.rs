use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

use crate::auth::require_admin;
use crate::db::reports::REPORT_STATUSES;
use crate::db::DbScamReport;
use crate::discord::DiscordService;
use crate::error::ApiError;
use crate::state::AppState;

use super::with_db;

#[derive(Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitBody {
    pub phone_number: String,
    pub reporter_name: Option<String>,
    pub scam_type: Option<String>,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct StatusBody {
    pub status: String,
}

pub async fn submit_report(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SubmitBody>,
) -> Result<Json<DbScamReport>, ApiError> {
    let phone = body.phone_number.trim();
    if phone.is_empty() {
        return Err(ApiError::BadRequest("Phone number is required".to_string()));
    }

    let report = with_db(&state, |db| {
        Ok(db.insert_scam_report(
            body.reporter_name.as_deref(),
            phone,
            body.scam_type.as_deref(),
            body.description.as_deref(),
        )?)
    })?;

    // Best-effort moderation ping; delivery failures only log.
    if let Some(discord) = DiscordService::from_state(&state) {
        let notify = report.clone();
        tokio::spawn(async move {
            match discord.notify_scam_report(&notify).await {
                Ok(true) => {}
                Ok(false) => log::warn!("Discord refused report #{} notification", notify.id),
                Err(e) => log::warn!("Discord notify failed for report #{}: {}", notify.id, e),
            }
        });
    }

    Ok(Json(report))
}

pub async fn list_reports(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<DbScamReport>>, ApiError> {
    require_admin(&state, &headers)?;

    let limit = query.limit.unwrap_or(100).clamp(1, 1000);
    let reports = with_db(&state, |db| {
        Ok(db.get_scam_reports(query.status.as_deref(), limit)?)
    })?;
    Ok(Json(reports))
}

pub async fn set_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<StatusBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_admin(&state, &headers)?;

    if !REPORT_STATUSES.contains(&body.status.as_str()) {
        return Err(ApiError::BadRequest(format!(
            "Invalid status: {}",
            body.status
        )));
    }

    with_db(&state, |db| {
        if !db.set_scam_report_status(id, &body.status)? {
            return Err(ApiError::NotFound("Report"));
        }
        Ok(())
    })?;

    Ok(Json(serde_json::json!({ "id": id, "status": body.status })))
}
