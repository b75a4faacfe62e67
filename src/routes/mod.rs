//! REST surface.
//!
//! One file per domain, mirroring the db query modules. Handlers validate,
//! call `AppDb`, and serialize rows straight back out; there is no service
//! layer in between.

use std::sync::Arc;

use axum::routing::{get, patch, post, put};
use axum::Router;

use crate::db::AppDb;
use crate::error::ApiError;
use crate::state::AppState;

pub mod analytics;
pub mod auth;
pub mod calls;
pub mod chatbot;
pub mod compliance;
pub mod content;
pub mod discord;
pub mod forum;
pub mod fraud;
pub mod personas;
pub mod reports;
pub mod trends;

/// Lock the shared connection and run a query closure against it.
pub(crate) fn with_db<T>(
    state: &AppState,
    f: impl FnOnce(&AppDb) -> Result<T, ApiError>,
) -> Result<T, ApiError> {
    let guard = state
        .db
        .lock()
        .map_err(|_| ApiError::Internal("Lock poisoned".to_string()))?;
    let db = guard
        .as_ref()
        .ok_or_else(|| ApiError::Internal("Database not initialized".to_string()))?;
    f(db)
}

async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

/// Assemble the full /api router.
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/health", get(health))
        // Personas & calls
        .route(
            "/api/personas",
            get(personas::list_personas).post(personas::create_persona),
        )
        .route(
            "/api/personas/:id",
            get(personas::get_persona).patch(personas::update_persona),
        )
        .route("/api/calls", get(calls::list_calls).post(calls::create_call))
        .route("/api/calls/active", get(calls::list_active_calls))
        .route("/api/calls/:id/complete", post(calls::complete_call))
        .route(
            "/api/calls/:id/recordings",
            get(calls::list_recordings).post(calls::create_recording),
        )
        // Scam reports & fraud database
        .route(
            "/api/scam-reports",
            get(reports::list_reports).post(reports::submit_report),
        )
        .route("/api/scam-reports/:id/status", patch(reports::set_status))
        .route("/api/fraud/submissions", post(fraud::submit))
        .route("/api/fraud/lookup", get(fraud::lookup))
        .route("/api/fraud/database", get(fraud::list_confirmed))
        .route("/api/fraud/confirm", post(fraud::confirm))
        // Analytics, funding, regions
        .route("/api/analytics/latest", get(analytics::latest_snapshot))
        .route(
            "/api/analytics/snapshots",
            get(analytics::list_snapshots).post(analytics::create_snapshot),
        )
        .route(
            "/api/funding/goals",
            get(analytics::list_goals).post(analytics::create_goal),
        )
        .route("/api/funding/progress", post(analytics::record_progress))
        .route("/api/regions", get(analytics::list_regions))
        .route("/api/regions/:code", put(analytics::upsert_region))
        // Auth
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/verify", post(auth::verify))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/forgot-password", post(auth::forgot_password))
        .route("/api/auth/reset-password", post(auth::reset_password))
        // Legal & compliance
        .route(
            "/api/legal/agreements",
            get(compliance::list_agreements).post(compliance::accept_agreement),
        )
        .route(
            "/api/compliance/audits",
            get(compliance::list_audits).post(compliance::create_audit),
        )
        .route("/api/compliance/retention", get(compliance::list_retention))
        .route(
            "/api/compliance/retention/run",
            post(compliance::run_retention),
        )
        // Forum
        .route(
            "/api/forum/questions",
            get(forum::list_questions).post(forum::create_question),
        )
        .route("/api/forum/questions/:id", get(forum::get_question))
        .route("/api/forum/questions/:id/answers", post(forum::create_answer))
        .route("/api/forum/answers/:id/accept", post(forum::accept_answer))
        // Content & social
        .route(
            "/api/content/youtube",
            get(content::list_youtube).post(content::create_youtube),
        )
        .route("/api/social/analyze", post(content::analyze_social))
        .route("/api/social/analyses", get(content::list_social_analyses))
        // Integrations
        .route(
            "/api/discord/webhook-url",
            get(discord::webhook_url).post(discord::set_webhook_url),
        )
        .route("/api/discord/test", post(discord::send_test))
        .route("/api/discord/interactions", post(discord::interactions))
        .route("/api/scam-trends", get(trends::list_trends))
        .route("/api/scam-trends/rss", get(trends::rss_feed))
        .route("/api/chatbot/message", post(chatbot::message))
}

// =============================================================================
// Handler tests. These drive the extractor-shaped functions directly
// against a temp database, cookie headers and all.
// =============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::extract::{Path, Query, State};
    use axum::http::header::{COOKIE, SET_COOKIE};
    use axum::http::HeaderMap;
    use axum::Json;
    use serde_json::json;

    use crate::db::test_utils::test_db;
    use crate::error::ApiError;
    use crate::state::AppState;

    use super::*;

    fn test_state() -> Arc<AppState> {
        Arc::new(AppState::with_db(test_db()))
    }

    fn body<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> T {
        serde_json::from_value(value).expect("request body")
    }

    /// Register + login, returning request headers carrying the session cookie.
    async fn login_headers(state: &Arc<AppState>, email: &str) -> HeaderMap {
        auth::register(
            State(state.clone()),
            Json(body(json!({ "email": email, "password": "long-enough-pw" }))),
        )
        .await
        .expect("register");

        let (response_headers, _) = auth::login(
            State(state.clone()),
            Json(body(json!({ "email": email, "password": "long-enough-pw" }))),
        )
        .await
        .expect("login");

        let set_cookie = response_headers
            .get(SET_COOKIE)
            .expect("session cookie")
            .to_str()
            .expect("cookie str")
            .to_string();
        let pair = set_cookie.split(';').next().expect("cookie pair");

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, pair.parse().expect("cookie header"));
        headers
    }

    fn promote_to_admin(state: &AppState, email: &str) {
        let guard = state.db.lock().expect("lock");
        let db = guard.as_ref().expect("db");
        db.conn_ref()
            .execute(
                "UPDATE users SET role = 'admin' WHERE email = ?1",
                [email],
            )
            .expect("promote");
    }

    #[tokio::test]
    async fn test_submit_report_persists_as_new() {
        let state = test_state();
        let Json(report) = reports::submit_report(
            State(state.clone()),
            Json(body(json!({
                "phoneNumber": "+15558675309",
                "scamType": "tech_support"
            }))),
        )
        .await
        .expect("submit");

        assert_eq!(report.status, "new");

        let stored = with_db(&state, |db| Ok(db.get_scam_reports(Some("new"), 10)?))
            .expect("list");
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn test_submit_report_requires_phone() {
        let state = test_state();
        let err = reports::submit_report(
            State(state),
            Json(body(json!({ "phoneNumber": "  " }))),
        )
        .await
        .expect_err("should reject");
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_auth_flow_cookie_roundtrip() {
        let state = test_state();
        let headers = login_headers(&state, "user@example.com").await;

        let Json(me) = auth::me(State(state.clone()), headers.clone())
            .await
            .expect("me");
        assert_eq!(me["user"]["email"], "user@example.com");

        auth::logout(State(state.clone()), headers.clone())
            .await
            .expect("logout");

        let err = auth::me(State(state), headers).await.expect_err("stale session");
        assert!(matches!(err, ApiError::Unauthorized));
    }

    #[tokio::test]
    async fn test_admin_gate_on_report_listing() {
        let state = test_state();
        let headers = login_headers(&state, "mod@example.com").await;

        let err = reports::list_reports(
            State(state.clone()),
            headers.clone(),
            Query(body(json!({}))),
        )
        .await
        .expect_err("plain user is not admin");
        assert!(matches!(err, ApiError::Forbidden));

        promote_to_admin(&state, "mod@example.com");
        let Json(listed) = reports::list_reports(State(state), headers, Query(body(json!({}))))
            .await
            .expect("admin listing");
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn test_forum_question_and_answer_flow() {
        let state = test_state();

        let Json(question) = forum::create_question(
            State(state.clone()),
            HeaderMap::new(),
            Json(body(json!({
                "title": "Is this bank text real?",
                "body": "Says my account is suspended"
            }))),
        )
        .await
        .expect("question");

        forum::create_answer(
            State(state.clone()),
            HeaderMap::new(),
            Path(question.id),
            Json(body(json!({ "body": "Classic smishing, ignore it." }))),
        )
        .await
        .expect("answer");

        let Json(detail) = forum::get_question(State(state), Path(question.id))
            .await
            .expect("detail");
        assert_eq!(detail["question"]["answerCount"], 1);
        assert_eq!(detail["answers"][0]["authorName"], "anonymous");
    }

    #[tokio::test]
    async fn test_chatbot_message_without_provider() {
        let state = test_state();
        let Json(reply) = chatbot::message(
            State(state),
            Json(body(json!({
                "message": "URGENT: pay with a gift card or face a warrant"
            }))),
        )
        .await
        .expect("reply");

        assert_eq!(reply["verdict"]["source"], "keywords");
        assert_eq!(reply["verdict"]["isScam"], true);
    }

    #[tokio::test]
    async fn test_rss_endpoint_returns_xml() {
        let state = test_state();
        with_db(&state, |db| {
            Ok(db.upsert_trend_item(&crate::db::content::TrendItemInput {
                source: "ftc".to_string(),
                guid: "g-1".to_string(),
                title: "Gift card demands spike".to_string(),
                link: None,
                summary: None,
                category: "general".to_string(),
                severity_score: 20,
                published_at: None,
            })?)
        })
        .expect("seed");

        let response = trends::rss_feed(State(state)).await.expect("feed");
        let content_type = response
            .headers()
            .get(axum::http::header::CONTENT_TYPE)
            .expect("content type")
            .to_str()
            .expect("str");
        assert!(content_type.starts_with("application/rss+xml"));
    }
}
