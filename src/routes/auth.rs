use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::auth::{
    clear_session_cookie, hash_password, new_session, new_token, require_user, session_cookie,
    session_id_from_headers, set_cookie_headers, token_digest, verify_password,
};
use crate::error::ApiError;
use crate::state::AppState;

use super::with_db;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterBody {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginBody {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct TokenBody {
    pub token: String,
}

#[derive(Deserialize)]
pub struct ForgotBody {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ResetBody {
    pub token: String,
    pub password: String,
}

const MIN_PASSWORD_LEN: usize = 8;

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Create an account and a verification token. The raw token rides back in
/// the response for out-of-band delivery (email in the hosted product).
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let email = body.email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(ApiError::BadRequest("A valid email is required".to_string()));
    }
    validate_password(&body.password)?;

    let password_hash = hash_password(&body.password);
    let (raw_token, expires) = new_token();
    let digest = token_digest(&raw_token);

    let user = with_db(&state, |db| {
        if db.get_user_by_email(&email)?.is_some() {
            return Err(ApiError::Conflict("Email already registered".to_string()));
        }
        let user = db.insert_user(&email, &password_hash, body.display_name.as_deref())?;
        db.insert_verification_token(&digest, user.id, &expires)?;
        Ok(user)
    })?;

    Ok(Json(json!({
        "user": user,
        "verificationToken": raw_token,
    })))
}

pub async fn verify(
    State(state): State<Arc<AppState>>,
    Json(body): Json<TokenBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let digest = token_digest(body.token.trim());
    with_db(&state, |db| {
        let user_id = db
            .consume_verification_token(&digest)?
            .ok_or_else(|| ApiError::BadRequest("Invalid or expired token".to_string()))?;
        db.mark_user_verified(user_id)?;
        Ok(())
    })?;
    Ok(Json(json!({ "verified": true })))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginBody>,
) -> Result<(HeaderMap, Json<serde_json::Value>), ApiError> {
    let email = body.email.trim();

    let (user, session) = with_db(&state, |db| {
        let user = db
            .get_user_by_email(email)?
            .ok_or(ApiError::Unauthorized)?;
        if !verify_password(&body.password, &user.password_hash) {
            return Err(ApiError::Unauthorized);
        }
        let session = new_session(user.id);
        db.insert_session(&session)?;
        Ok((user, session))
    })?;

    let headers = set_cookie_headers(session_cookie(&session.id));
    Ok((headers, Json(json!({ "user": user }))))
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<(HeaderMap, Json<serde_json::Value>), ApiError> {
    if let Some(session_id) = session_id_from_headers(&headers) {
        with_db(&state, |db| Ok(db.delete_session(&session_id)?))?;
    }
    let headers = set_cookie_headers(clear_session_cookie());
    Ok((headers, Json(json!({ "loggedOut": true }))))
}

pub async fn me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = require_user(&state, &headers)?;
    Ok(Json(json!({ "user": user })))
}

/// Issue a reset token. Responds identically whether or not the email exists,
/// so the endpoint can't be used to probe for accounts.
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ForgotBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (raw_token, expires) = new_token();
    let digest = token_digest(&raw_token);

    let issued = with_db(&state, |db| {
        match db.get_user_by_email(body.email.trim())? {
            Some(user) => {
                db.insert_reset_token(&digest, user.id, &expires)?;
                Ok(true)
            }
            None => Ok(false),
        }
    })?;

    Ok(Json(if issued {
        json!({ "sent": true, "resetToken": raw_token })
    } else {
        json!({ "sent": true })
    }))
}

pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ResetBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    validate_password(&body.password)?;

    let digest = token_digest(body.token.trim());
    let password_hash = hash_password(&body.password);

    with_db(&state, |db| {
        let user_id = db
            .consume_reset_token(&digest)?
            .ok_or_else(|| ApiError::BadRequest("Invalid or expired token".to_string()))?;
        db.set_user_password(user_id, &password_hash)?;
        Ok(())
    })?;

    Ok(Json(json!({ "reset": true })))
}
