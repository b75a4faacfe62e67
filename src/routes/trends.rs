use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::db::DbTrendItem;
use crate::error::ApiError;
use crate::state::AppState;
use crate::trends::generate_rss_feed;

use super::with_db;

#[derive(Deserialize)]
pub struct TrendsQuery {
    pub category: Option<String>,
    pub limit: Option<i64>,
}

pub async fn list_trends(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TrendsQuery>,
) -> Result<Json<Vec<DbTrendItem>>, ApiError> {
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let items = with_db(&state, |db| {
        Ok(db.get_trend_items(query.category.as_deref(), limit)?)
    })?;
    Ok(Json(items))
}

/// The aggregated feed, republished as RSS 2.0 XML.
pub async fn rss_feed(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let items = with_db(&state, |db| Ok(db.get_trend_items(None, 100)?))?;
    let xml = generate_rss_feed(&items);

    Ok((
        [(CONTENT_TYPE, "application/rss+xml; charset=utf-8")],
        xml,
    )
        .into_response())
}
