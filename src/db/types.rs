//! Row types for the SQLite store.
//!
//! These structs mirror table columns one-to-one and serialize camelCase,
//! which is the shape the dashboard and marketing site consume directly.
//! JSON columns (specialties, sample responses, top scam types) are kept as
//! raw JSON strings in the row type; handlers parse them at the edge.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Failed to create database directory: {0}")]
    CreateDir(std::io::Error),

    #[error("Migration failed: {0}")]
    Migration(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbPersona {
    pub id: i64,
    pub name: String,
    pub age: Option<i64>,
    pub voice_type: String,
    pub personality: Option<String>,
    pub backstory: Option<String>,
    pub avatar_url: Option<String>,
    /// JSON string array, e.g. `["tech support","gift cards"]`.
    pub specialties: String,
    /// JSON array of scripted lines the persona can fall back to.
    pub sample_responses: String,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbCall {
    pub id: i64,
    pub persona_id: Option<i64>,
    pub caller_number: String,
    pub scam_type: Option<String>,
    pub status: String,
    pub started_at: String,
    pub ended_at: Option<String>,
    pub duration_seconds: Option<i64>,
    pub time_wasted_seconds: i64,
    pub transcript: Option<String>,
    /// Joined from personas for list views; not a column on `calls`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persona_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbCallRecording {
    pub id: i64,
    pub call_id: i64,
    pub audio_url: String,
    pub duration_seconds: Option<i64>,
    pub consent: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbAnalyticsSnapshot {
    pub id: i64,
    pub captured_at: String,
    pub total_calls: i64,
    pub total_minutes_wasted: i64,
    pub scammers_engaged: i64,
    pub reports_received: i64,
    /// JSON `[{"type": "...", "percentage": n}]`.
    pub top_scam_types: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbFundingGoal {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub target_cents: i64,
    pub deadline: Option<String>,
    pub active: bool,
    pub created_at: String,
    /// SUM over funding_progress, computed by the list query.
    pub raised_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbUser {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub display_name: Option<String>,
    pub role: String,
    pub verified: bool,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct DbSession {
    pub id: String,
    pub user_id: i64,
    pub created_at: String,
    pub expires_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbScamReport {
    pub id: i64,
    pub reporter_name: Option<String>,
    pub phone_number: String,
    pub scam_type: Option<String>,
    pub description: Option<String>,
    pub status: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbYoutubeContent {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub video_url: Option<String>,
    pub call_id: Option<i64>,
    pub status: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbScamRiskRegion {
    pub region_code: String,
    pub region_name: String,
    pub risk_level: String,
    pub report_count: i64,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbFraudSubmission {
    pub id: i64,
    pub phone_number: String,
    pub category: String,
    pub details: Option<String>,
    pub submitter_email: Option<String>,
    pub status: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbFraudEntry {
    pub id: i64,
    pub phone_number: String,
    pub category: String,
    pub report_count: i64,
    pub first_reported: String,
    pub last_reported: String,
    pub confirmed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbForumQuestion {
    pub id: i64,
    pub user_id: Option<i64>,
    pub author_name: String,
    pub title: String,
    pub body: String,
    pub answer_count: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbForumAnswer {
    pub id: i64,
    pub question_id: i64,
    pub user_id: Option<i64>,
    pub author_name: String,
    pub body: String,
    pub accepted: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbLegalAgreement {
    pub id: i64,
    pub user_id: Option<i64>,
    pub agreement_type: String,
    pub version: String,
    pub accepted_at: String,
    pub ip_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbComplianceAudit {
    pub id: i64,
    pub audit_type: String,
    pub status: String,
    pub findings: Option<String>,
    pub auditor: Option<String>,
    pub performed_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbRetentionLog {
    pub id: i64,
    pub table_name: String,
    pub rows_purged: i64,
    pub cutoff: String,
    pub executed_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbSocialAnalysis {
    pub id: i64,
    pub platform: String,
    pub content_url: Option<String>,
    pub content_text: String,
    pub risk_score: f64,
    pub verdict: String,
    pub analyzed_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbTrendItem {
    pub id: i64,
    pub source: String,
    pub guid: String,
    pub title: String,
    pub link: Option<String>,
    pub summary: Option<String>,
    pub category: String,
    pub severity_score: i64,
    pub published_at: Option<String>,
    pub fetched_at: String,
}
