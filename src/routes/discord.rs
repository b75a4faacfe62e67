use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde_json::{json, Value};

use crate::auth::require_admin;
use crate::discord::{
    handle_interaction, mask_webhook_url, verify_interaction_signature, DiscordService,
};
use crate::error::ApiError;
use crate::state::AppState;

/// Masked webhook URL for the admin settings panel.
pub async fn webhook_url(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    require_admin(&state, &headers)?;

    let config = state.config_snapshot().discord;
    Ok(Json(match config.webhook_url {
        Some(url) => json!({
            "configured": true,
            "enabled": config.enabled,
            "webhookUrl": mask_webhook_url(&url),
        }),
        None => json!({ "configured": false, "enabled": config.enabled }),
    }))
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookBody {
    pub webhook_url: String,
    pub enabled: Option<bool>,
}

/// Point the integration at a new webhook and persist it to config.json.
pub async fn set_webhook_url(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<WebhookBody>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&state, &headers)?;

    let url = body.webhook_url.trim();
    if !url.starts_with("https://discord.com/api/webhooks/")
        && !url.starts_with("https://discordapp.com/api/webhooks/")
    {
        return Err(ApiError::BadRequest(
            "Not a Discord webhook URL".to_string(),
        ));
    }

    let config = crate::state::create_or_update_config(&state, |config| {
        config.discord.webhook_url = Some(url.to_string());
        if let Some(enabled) = body.enabled {
            config.discord.enabled = enabled;
        }
    })
    .map_err(ApiError::Internal)?;

    Ok(Json(json!({
        "configured": true,
        "enabled": config.discord.enabled,
        "webhookUrl": mask_webhook_url(url),
    })))
}

/// Send a test embed and report whether Discord accepted it.
pub async fn send_test(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    require_admin(&state, &headers)?;

    let Some(service) = DiscordService::from_state(&state) else {
        return Err(ApiError::BadRequest(
            "Discord integration is not configured".to_string(),
        ));
    };

    let delivered = service
        .send_message("ScamShield test message: webhook is wired up.")
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(json!({ "delivered": delivered })))
}

/// Inbound interaction endpoint. The signature must verify against the
/// configured application public key before any handling happens; Discord
/// probes this with deliberately bad signatures during setup.
pub async fn interactions(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<Value>, ApiError> {
    let config = state.config_snapshot().discord;
    let public_key = config
        .public_key
        .ok_or_else(|| ApiError::BadRequest("No public key configured".to_string()))?;

    let signature = headers
        .get("X-Signature-Ed25519")
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;
    let timestamp = headers
        .get("X-Signature-Timestamp")
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;

    let valid = verify_interaction_signature(&public_key, signature, timestamp, &body)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    if !valid {
        return Err(ApiError::Unauthorized);
    }

    let interaction: Value = serde_json::from_str(&body)
        .map_err(|e| ApiError::BadRequest(format!("Bad interaction payload: {e}")))?;

    Ok(Json(handle_interaction(&state, &interaction)))
}
