//! Session-cookie authentication and credential digests.
//!
//! Passwords are stored as `salt:sha256(salt:password)` hex. Reset and
//! verification tokens store only their sha256 digest; the raw token is
//! returned once at issue time and never persisted.

use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::HeaderMap;
use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};

use crate::db::{DbSession, DbUser};
use crate::error::ApiError;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "ssid";
const SESSION_DAYS: i64 = 7;
pub const TOKEN_TTL_HOURS: i64 = 24;

// ---------------------------------------------------------------------------
// Digests
// ---------------------------------------------------------------------------

fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> String {
    let salt = uuid::Uuid::new_v4().simple().to_string();
    let digest = sha256_hex(&format!("{salt}:{password}"));
    format!("{salt}:{digest}")
}

/// Check a password against a stored `salt:digest` hash.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt, digest)) = stored.split_once(':') else {
        return false;
    };
    sha256_hex(&format!("{salt}:{password}")) == digest
}

/// Digest for one-time tokens (reset / verification).
pub fn token_digest(raw_token: &str) -> String {
    sha256_hex(raw_token)
}

/// Generate a raw one-time token and its expiry.
pub fn new_token() -> (String, String) {
    let raw = uuid::Uuid::new_v4().simple().to_string();
    let expires = (Utc::now() + Duration::hours(TOKEN_TTL_HOURS)).to_rfc3339();
    (raw, expires)
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

pub fn new_session(user_id: i64) -> DbSession {
    let now = Utc::now();
    DbSession {
        id: uuid::Uuid::new_v4().to_string(),
        user_id,
        created_at: now.to_rfc3339(),
        expires_at: (now + Duration::days(SESSION_DAYS)).to_rfc3339(),
    }
}

/// Build the Set-Cookie header value for a new session.
pub fn session_cookie(session_id: &str) -> String {
    format!(
        "{SESSION_COOKIE}={session_id}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_DAYS * 86_400
    )
}

/// Cookie value that clears the session on logout.
pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

pub fn set_cookie_headers(value: String) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(v) = value.parse() {
        headers.insert(SET_COOKIE, v);
    }
    headers
}

/// Pull the session id out of the Cookie header, if any.
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<String> {
    let cookie_header = headers.get(COOKIE)?.to_str().ok()?;
    for pair in cookie_header.split(';') {
        let (name, value) = pair.trim().split_once('=')?;
        if name == SESSION_COOKIE && !value.is_empty() {
            return Some(value.to_string());
        }
    }
    None
}

/// Resolve the request's session cookie to a user, or 401.
pub fn require_user(state: &AppState, headers: &HeaderMap) -> Result<DbUser, ApiError> {
    let session_id = session_id_from_headers(headers).ok_or(ApiError::Unauthorized)?;

    let db_guard = state.db.lock().map_err(|_| ApiError::Unauthorized)?;
    let db = db_guard.as_ref().ok_or(ApiError::Unauthorized)?;
    db.get_session_user(&session_id)?
        .ok_or(ApiError::Unauthorized)
}

/// Like `require_user` but also checks the admin role.
pub fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<DbUser, ApiError> {
    let user = require_user(state, headers)?;
    if user.role != "admin" {
        return Err(ApiError::Forbidden);
    }
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_roundtrip() {
        let hash = hash_password("hunter2");
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        assert_ne!(hash_password("same"), hash_password("same"));
    }

    #[test]
    fn test_verify_rejects_malformed_hash() {
        assert!(!verify_password("x", "no-separator-here"));
    }

    #[test]
    fn test_cookie_parse() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            "theme=dark; ssid=abc-123; other=1".parse().unwrap(),
        );
        assert_eq!(session_id_from_headers(&headers).as_deref(), Some("abc-123"));
    }

    #[test]
    fn test_cookie_parse_missing() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, "theme=dark".parse().unwrap());
        assert!(session_id_from_headers(&headers).is_none());
    }

    #[test]
    fn test_token_digest_stable() {
        assert_eq!(token_digest("abc"), token_digest("abc"));
        assert_ne!(token_digest("abc"), token_digest("abd"));
    }
}
