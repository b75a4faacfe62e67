//! Discord integration: outbound webhook notifications and inbound
//! interaction verification.
//!
//! Outbound delivery is best-effort: `send_embed` reports a boolean and
//! never errors on a refused payload. Inbound interactions are verified
//! against the application public key (ed25519 over `timestamp || body`)
//! before any handling happens.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde_json::{json, Value};

use crate::db::DbScamReport;
use crate::state::AppState;

/// Errors from Discord operations.
#[derive(Debug, thiserror::Error)]
pub enum DiscordError {
    #[error("No webhook URL configured")]
    NoWebhookUrl,
    #[error("Request failed: {0}")]
    RequestFailed(String),
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),
    #[error("Invalid signature encoding: {0}")]
    InvalidSignature(String),
}

const EMBED_COLOR_ALERT: u32 = 0xE74C3C;
const EMBED_COLOR_INFO: u32 = 0x2ECC71;

pub struct DiscordService {
    client: reqwest::Client,
    webhook_url: String,
}

impl DiscordService {
    pub fn new(webhook_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url: webhook_url.to_string(),
        }
    }

    /// Build a service from config, or None when the integration is off.
    pub fn from_state(state: &AppState) -> Option<Self> {
        let config = state.config_snapshot();
        if !config.discord.enabled {
            return None;
        }
        config.discord.webhook_url.as_deref().map(Self::new)
    }

    // -----------------------------------------------------------------------
    // Outbound webhook
    // -----------------------------------------------------------------------

    /// POST a plain-text message. Returns Ok(false) when Discord refuses the
    /// payload (non-2xx); Err only on transport failure.
    pub async fn send_message(&self, content: &str) -> Result<bool, DiscordError> {
        self.post_payload(&json!({ "content": content })).await
    }

    /// POST a single embed.
    pub async fn send_embed(&self, embed: Value) -> Result<bool, DiscordError> {
        self.post_payload(&json!({ "embeds": [embed] })).await
    }

    /// New scam report notification for the moderation channel.
    pub async fn notify_scam_report(&self, report: &DbScamReport) -> Result<bool, DiscordError> {
        self.send_embed(build_report_embed(report)).await
    }

    /// Funding milestone announcement.
    pub async fn notify_funding_milestone(
        &self,
        goal_title: &str,
        raised_cents: i64,
        target_cents: i64,
    ) -> Result<bool, DiscordError> {
        let embed = json!({
            "title": "Funding milestone",
            "description": format!(
                "**{}** reached ${:.2} of ${:.2}",
                goal_title,
                raised_cents as f64 / 100.0,
                target_cents as f64 / 100.0
            ),
            "color": EMBED_COLOR_INFO,
        });
        self.send_embed(embed).await
    }

    async fn post_payload(&self, payload: &Value) -> Result<bool, DiscordError> {
        if self.webhook_url.is_empty() {
            return Err(DiscordError::NoWebhookUrl);
        }
        let resp = self
            .client
            .post(&self.webhook_url)
            .json(payload)
            .send()
            .await
            .map_err(|e| DiscordError::RequestFailed(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            log::warn!("Discord webhook refused payload: HTTP {}", status);
        }
        Ok(status.is_success())
    }
}

/// Embed payload for a new scam report.
pub fn build_report_embed(report: &DbScamReport) -> Value {
    json!({
        "title": "New scam report",
        "color": EMBED_COLOR_ALERT,
        "fields": [
            { "name": "Phone number", "value": report.phone_number, "inline": true },
            {
                "name": "Type",
                "value": report.scam_type.as_deref().unwrap_or("unknown"),
                "inline": true
            },
            {
                "name": "Description",
                "value": report.description.as_deref().unwrap_or("(none)"),
                "inline": false
            },
        ],
        "footer": { "text": format!("Report #{}", report.id) },
    })
}

/// Mask the token segment of a webhook URL for display in the admin UI.
/// `https://discord.com/api/webhooks/{id}/{token}` → `.../{id}/…`
pub fn mask_webhook_url(url: &str) -> String {
    match url.rfind('/') {
        Some(pos) if pos + 1 < url.len() => format!("{}/…", &url[..pos]),
        _ => url.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Interaction signature verification
// ---------------------------------------------------------------------------

/// Verify a Discord interaction signature: ed25519 over `timestamp || body`.
pub fn verify_interaction_signature(
    public_key_hex: &str,
    signature_hex: &str,
    timestamp: &str,
    body: &str,
) -> Result<bool, DiscordError> {
    let key_bytes: [u8; 32] = hex::decode(public_key_hex)
        .map_err(|e| DiscordError::InvalidPublicKey(e.to_string()))?
        .try_into()
        .map_err(|_| DiscordError::InvalidPublicKey("expected 32 bytes".to_string()))?;
    let key = VerifyingKey::from_bytes(&key_bytes)
        .map_err(|e| DiscordError::InvalidPublicKey(e.to_string()))?;

    let sig_bytes = hex::decode(signature_hex)
        .map_err(|e| DiscordError::InvalidSignature(e.to_string()))?;
    let signature = Signature::from_slice(&sig_bytes)
        .map_err(|e| DiscordError::InvalidSignature(e.to_string()))?;

    let message = format!("{timestamp}{body}");
    Ok(key.verify(message.as_bytes(), &signature).is_ok())
}

/// Handle a verified interaction payload.
///
/// PING (type 1) answers PONG (type 1). The `report` slash command inserts a
/// scam report and acknowledges with a channel message (type 4). Anything
/// else gets an ephemeral shrug.
pub fn handle_interaction(state: &AppState, interaction: &Value) -> Value {
    match interaction.get("type").and_then(Value::as_u64) {
        Some(1) => json!({ "type": 1 }),
        Some(2) => handle_command(state, interaction),
        _ => json!({
            "type": 4,
            "data": { "content": "Unsupported interaction", "flags": 64 }
        }),
    }
}

fn handle_command(state: &AppState, interaction: &Value) -> Value {
    let data = &interaction["data"];
    let name = data.get("name").and_then(Value::as_str).unwrap_or("");

    if name != "report" {
        log::info!("Discord interaction: unhandled command '{}'", name);
        return json!({
            "type": 4,
            "data": { "content": format!("Unknown command: {name}"), "flags": 64 }
        });
    }

    let mut phone = String::new();
    let mut scam_type: Option<String> = None;
    if let Some(options) = data.get("options").and_then(Value::as_array) {
        for opt in options {
            match opt.get("name").and_then(Value::as_str) {
                Some("phone") => {
                    phone = opt
                        .get("value")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string()
                }
                Some("type") => {
                    scam_type = opt
                        .get("value")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                }
                _ => {}
            }
        }
    }

    if phone.is_empty() {
        return json!({
            "type": 4,
            "data": { "content": "A phone number is required.", "flags": 64 }
        });
    }

    let reporter = interaction
        .pointer("/member/user/username")
        .and_then(Value::as_str);

    let inserted = {
        let db_guard = state.db.lock().ok();
        match db_guard.as_ref().and_then(|g| g.as_ref()) {
            Some(db) => db
                .insert_scam_report(reporter, &phone, scam_type.as_deref(), None)
                .is_ok(),
            None => false,
        }
    };

    if inserted {
        json!({
            "type": 4,
            "data": { "content": format!("Report for {phone} filed. Thank you!") }
        })
    } else {
        json!({
            "type": 4,
            "data": { "content": "Could not file the report, try again later.", "flags": 64 }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    #[test]
    fn test_mask_webhook_url() {
        assert_eq!(
            mask_webhook_url("https://discord.com/api/webhooks/123/secrettoken"),
            "https://discord.com/api/webhooks/123/…"
        );
    }

    #[test]
    fn test_report_embed_fields() {
        let report = DbScamReport {
            id: 42,
            reporter_name: None,
            phone_number: "+15550001111".to_string(),
            scam_type: Some("irs".to_string()),
            description: None,
            status: "new".to_string(),
            created_at: "2026-01-01T00:00:00Z".to_string(),
        };
        let embed = build_report_embed(&report);
        assert_eq!(embed["fields"][0]["value"], "+15550001111");
        assert_eq!(embed["fields"][1]["value"], "irs");
        assert_eq!(embed["footer"]["text"], "Report #42");
    }

    #[test]
    fn test_signature_verification_accepts_valid() {
        let signing = SigningKey::from_bytes(&[7u8; 32]);
        let public_hex = hex::encode(signing.verifying_key().to_bytes());

        let timestamp = "1700000000";
        let body = r#"{"type":1}"#;
        let signature = signing.sign(format!("{timestamp}{body}").as_bytes());
        let signature_hex = hex::encode(signature.to_bytes());

        let ok = verify_interaction_signature(&public_hex, &signature_hex, timestamp, body)
            .expect("verify");
        assert!(ok);
    }

    #[test]
    fn test_signature_verification_rejects_tampered_body() {
        let signing = SigningKey::from_bytes(&[7u8; 32]);
        let public_hex = hex::encode(signing.verifying_key().to_bytes());

        let timestamp = "1700000000";
        let signature = signing.sign(format!("{timestamp}{}", r#"{"type":1}"#).as_bytes());
        let signature_hex = hex::encode(signature.to_bytes());

        let ok = verify_interaction_signature(
            &public_hex,
            &signature_hex,
            timestamp,
            r#"{"type":2}"#,
        )
        .expect("verify");
        assert!(!ok);
    }

    #[test]
    fn test_signature_verification_bad_key() {
        let err = verify_interaction_signature("zz", "00", "0", "{}");
        assert!(err.is_err());
    }

    /// True once `received` holds the full request per its Content-Length.
    fn request_complete(received: &[u8]) -> bool {
        let text = String::from_utf8_lossy(received);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text
            .lines()
            .find_map(|line| {
                line.to_ascii_lowercase()
                    .strip_prefix("content-length:")
                    .map(|v| v.trim().parse::<usize>().unwrap_or(0))
            })
            .unwrap_or(0);
        received.len() >= header_end + 4 + content_length
    }

    /// One-shot HTTP stub that answers every request with the given status line.
    async fn stub_webhook(status_line: &'static str) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub");
        let addr = listener.local_addr().expect("stub addr");
        tokio::spawn(async move {
            use tokio::io::{AsyncReadExt, AsyncWriteExt};
            if let Ok((mut stream, _)) = listener.accept().await {
                // Drain the request (headers + small JSON body) before replying.
                let mut received = Vec::new();
                let mut buf = [0u8; 4096];
                loop {
                    match stream.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            received.extend_from_slice(&buf[..n]);
                            if request_complete(&received) {
                                break;
                            }
                        }
                    }
                }
                let response =
                    format!("{status_line}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
                let _ = stream.write_all(response.as_bytes()).await;
            }
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_refused_webhook_reports_false() {
        let url = stub_webhook("HTTP/1.1 400 Bad Request").await;
        let service = DiscordService::new(&url);
        let delivered = service.send_message("hello").await.expect("send");
        assert!(!delivered, "4xx means not delivered, not an error");
    }

    #[tokio::test]
    async fn test_accepted_webhook_reports_true() {
        let url = stub_webhook("HTTP/1.1 204 No Content").await;
        let service = DiscordService::new(&url);
        let delivered = service.send_message("hello").await.expect("send");
        assert!(delivered);
    }

    #[tokio::test]
    async fn test_empty_webhook_url_errors() {
        let service = DiscordService::new("");
        let err = service.send_message("hello").await.expect_err("no url");
        assert!(matches!(err, DiscordError::NoWebhookUrl));
    }
}
