use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

use crate::auth::require_admin;
use crate::db::{DbAnalyticsSnapshot, DbFundingGoal, DbScamRiskRegion};
use crate::error::ApiError;
use crate::state::AppState;

use super::with_db;

#[derive(Deserialize)]
pub struct SnapshotQuery {
    pub days: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotBody {
    pub total_calls: i64,
    pub total_minutes_wasted: i64,
    pub scammers_engaged: i64,
    pub reports_received: i64,
    #[serde(default)]
    pub top_scam_types: serde_json::Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalBody {
    pub title: String,
    pub description: Option<String>,
    pub target_cents: i64,
    pub deadline: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressBody {
    pub goal_id: i64,
    pub amount_cents: i64,
    pub source: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionBody {
    pub region_name: String,
    pub risk_level: String,
    pub report_count: i64,
}

pub async fn latest_snapshot(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DbAnalyticsSnapshot>, ApiError> {
    let snapshot = with_db(&state, |db| Ok(db.get_latest_snapshot()?))?
        .ok_or(ApiError::NotFound("Snapshot"))?;
    Ok(Json(snapshot))
}

pub async fn list_snapshots(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SnapshotQuery>,
) -> Result<Json<Vec<DbAnalyticsSnapshot>>, ApiError> {
    let days = query.days.unwrap_or(30).clamp(1, 365);
    let snapshots = with_db(&state, |db| Ok(db.get_snapshots_since(days)?))?;
    Ok(Json(snapshots))
}

pub async fn create_snapshot(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<SnapshotBody>,
) -> Result<Json<DbAnalyticsSnapshot>, ApiError> {
    require_admin(&state, &headers)?;

    let top_types = if body.top_scam_types.is_null() {
        "[]".to_string()
    } else {
        body.top_scam_types.to_string()
    };

    let snapshot = with_db(&state, |db| {
        Ok(db.insert_analytics_snapshot(
            body.total_calls,
            body.total_minutes_wasted,
            body.scammers_engaged,
            body.reports_received,
            &top_types,
        )?)
    })?;
    Ok(Json(snapshot))
}

pub async fn list_goals(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<DbFundingGoal>>, ApiError> {
    let goals = with_db(&state, |db| Ok(db.get_active_funding_goals()?))?;
    Ok(Json(goals))
}

pub async fn create_goal(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<GoalBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_admin(&state, &headers)?;
    if body.title.trim().is_empty() || body.target_cents <= 0 {
        return Err(ApiError::BadRequest(
            "Goal needs a title and a positive target".to_string(),
        ));
    }

    let id = with_db(&state, |db| {
        Ok(db.insert_funding_goal(
            body.title.trim(),
            body.description.as_deref(),
            body.target_cents,
            body.deadline.as_deref(),
        )?)
    })?;
    Ok(Json(serde_json::json!({ "id": id })))
}

pub async fn record_progress(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<ProgressBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_admin(&state, &headers)?;
    if body.amount_cents <= 0 {
        return Err(ApiError::BadRequest("Amount must be positive".to_string()));
    }

    let goal = with_db(&state, |db| {
        db.insert_funding_progress(body.goal_id, body.amount_cents, body.source.as_deref())?;
        Ok(db
            .get_active_funding_goals()?
            .into_iter()
            .find(|g| g.id == body.goal_id))
    })?;

    // Announce the crossing, not every contribution.
    if let Some(goal) = goal {
        let crossed = goal.raised_cents >= goal.target_cents
            && goal.raised_cents - body.amount_cents < goal.target_cents;
        if crossed {
            if let Some(discord) = crate::discord::DiscordService::from_state(&state) {
                tokio::spawn(async move {
                    if let Err(e) = discord
                        .notify_funding_milestone(&goal.title, goal.raised_cents, goal.target_cents)
                        .await
                    {
                        log::warn!("Discord funding notification failed: {}", e);
                    }
                });
            }
        }
    }

    Ok(Json(serde_json::json!({ "recorded": true })))
}

pub async fn list_regions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<DbScamRiskRegion>>, ApiError> {
    let regions = with_db(&state, |db| Ok(db.get_regions()?))?;
    Ok(Json(regions))
}

pub async fn upsert_region(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(code): Path<String>,
    Json(body): Json<RegionBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_admin(&state, &headers)?;

    if !matches!(
        body.risk_level.as_str(),
        "low" | "medium" | "high" | "critical"
    ) {
        return Err(ApiError::BadRequest(format!(
            "Invalid risk level: {}",
            body.risk_level
        )));
    }

    with_db(&state, |db| {
        Ok(db.upsert_region(
            code.trim(),
            body.region_name.trim(),
            &body.risk_level,
            body.report_count,
        )?)
    })?;
    Ok(Json(serde_json::json!({ "regionCode": code })))
}
