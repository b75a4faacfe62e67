use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::{Duration, Utc};
use serde::Deserialize;

use crate::auth::{require_admin, require_user};
use crate::db::{DbComplianceAudit, DbLegalAgreement, DbRetentionLog};
use crate::error::ApiError;
use crate::state::AppState;

use super::with_db;

#[derive(Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgreementBody {
    pub agreement_type: String,
    pub version: String,
    pub ip_address: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditBody {
    pub audit_type: String,
    pub status: Option<String>,
    pub findings: Option<String>,
    pub auditor: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionBody {
    /// Rows older than this many days are purged. Defaults to 365.
    pub older_than_days: Option<i64>,
}

pub async fn accept_agreement(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<AgreementBody>,
) -> Result<Json<DbLegalAgreement>, ApiError> {
    if body.agreement_type.trim().is_empty() || body.version.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Agreement type and version are required".to_string(),
        ));
    }

    // Acceptance can happen pre-signup; tie it to a user when we have one.
    let user_id = require_user(&state, &headers).ok().map(|u| u.id);

    let agreement = with_db(&state, |db| {
        Ok(db.insert_legal_agreement(
            user_id,
            body.agreement_type.trim(),
            body.version.trim(),
            body.ip_address.as_deref(),
        )?)
    })?;
    Ok(Json(agreement))
}

pub async fn list_agreements(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<DbLegalAgreement>>, ApiError> {
    let user = require_user(&state, &headers)?;
    let agreements = with_db(&state, |db| Ok(db.get_legal_agreements_for_user(user.id)?))?;
    Ok(Json(agreements))
}

pub async fn list_audits(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<DbComplianceAudit>>, ApiError> {
    require_admin(&state, &headers)?;
    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let audits = with_db(&state, |db| Ok(db.get_compliance_audits(limit)?))?;
    Ok(Json(audits))
}

pub async fn create_audit(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<AuditBody>,
) -> Result<Json<DbComplianceAudit>, ApiError> {
    require_admin(&state, &headers)?;
    if body.audit_type.trim().is_empty() {
        return Err(ApiError::BadRequest("Audit type is required".to_string()));
    }

    let audit = with_db(&state, |db| {
        Ok(db.insert_compliance_audit(
            body.audit_type.trim(),
            body.status.as_deref().unwrap_or("open"),
            body.findings.as_deref(),
            body.auditor.as_deref(),
        )?)
    })?;
    Ok(Json(audit))
}

pub async fn list_retention(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<DbRetentionLog>>, ApiError> {
    require_admin(&state, &headers)?;
    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let logs = with_db(&state, |db| Ok(db.get_retention_logs(limit)?))?;
    Ok(Json(logs))
}

pub async fn run_retention(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<RetentionBody>,
) -> Result<Json<Vec<DbRetentionLog>>, ApiError> {
    require_admin(&state, &headers)?;

    let days = body.older_than_days.unwrap_or(365);
    if days < 30 {
        return Err(ApiError::BadRequest(
            "Retention window must be at least 30 days".to_string(),
        ));
    }
    let cutoff = (Utc::now() - Duration::days(days)).to_rfc3339();

    let logs = with_db(&state, |db| {
        db.run_retention(&cutoff).map_err(ApiError::Database)
    })?;
    Ok(Json(logs))
}
