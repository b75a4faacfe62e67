//! Scam classifier chatbot.
//!
//! A prompt-template wrapper over a chat-completions provider. The model's
//! JSON verdict is parsed and its confidence nudged by a keyword heuristic;
//! with no provider configured (or on any provider failure) the keyword
//! heuristic answers alone, so the endpoint always returns something useful.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::state::AppState;

pub mod prompts;

use prompts::{build_classification_prompt, CLASSIFIER_SYSTEM_PROMPT};

/// Errors from the chat provider.
#[derive(Debug, thiserror::Error)]
pub enum ChatbotError {
    #[error("No API key configured")]
    NoApiKey,
    #[error("Provider request failed: {0}")]
    RequestFailed(String),
    #[error("Provider returned HTTP {0}")]
    BadStatus(u16),
    #[error("Unexpected provider response: {0}")]
    ParseError(String),
}

/// The verdict served to the UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScamVerdict {
    pub is_scam: bool,
    pub confidence: f64,
    pub category: String,
    pub advice: String,
    /// Which path produced the verdict: "model" or "keywords".
    pub source: String,
}

/// Abstraction over the chat-completions call so tests can stub the model.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String, ChatbotError>;
}

// ---------------------------------------------------------------------------
// OpenAI provider
// ---------------------------------------------------------------------------

pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiProvider {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    async fn complete(&self, system: &str, user: &str) -> Result<String, ChatbotError> {
        if self.api_key.is_empty() {
            return Err(ChatbotError::NoApiKey);
        }

        let payload = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "temperature": 0.2,
        });

        let resp = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ChatbotError::RequestFailed(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ChatbotError::BadStatus(resp.status().as_u16()));
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| ChatbotError::ParseError(e.to_string()))?;

        body.pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ChatbotError::ParseError("no message content".to_string()))
    }
}

// ---------------------------------------------------------------------------
// Chatbot
// ---------------------------------------------------------------------------

/// Keywords that raise (or, for the fallback, establish) scam confidence.
const SCAM_KEYWORDS: &[&str] = &[
    "gift card",
    "wire transfer",
    "western union",
    "urgent",
    "act now",
    "social security number",
    "bitcoin",
    "crypto wallet",
    "verify your account",
    "suspended",
    "warrant",
    "remote access",
];

const KEYWORD_CONFIDENCE_STEP: f64 = 0.08;

pub struct ScamChatbot {
    provider: Option<Box<dyn ChatProvider>>,
}

impl ScamChatbot {
    pub fn new(provider: Option<Box<dyn ChatProvider>>) -> Self {
        Self { provider }
    }

    /// Build from config: an OpenAI provider when enabled and keyed,
    /// keyword-only otherwise.
    pub fn from_state(state: &AppState) -> Self {
        let config = state.config_snapshot().openai;
        let provider: Option<Box<dyn ChatProvider>> = match (config.enabled, config.api_key) {
            (true, Some(key)) if !key.is_empty() => {
                Some(Box::new(OpenAiProvider::new(&key, &config.model)))
            }
            _ => None,
        };
        Self::new(provider)
    }

    /// Classify a message. Never fails: provider errors degrade to the
    /// keyword heuristic.
    pub async fn analyze(&self, message: &str) -> ScamVerdict {
        if let Some(provider) = &self.provider {
            let user_prompt = build_classification_prompt(message);
            match provider.complete(CLASSIFIER_SYSTEM_PROMPT, &user_prompt).await {
                Ok(content) => {
                    if let Some(mut verdict) = parse_verdict(&content) {
                        verdict.confidence = adjust_confidence(verdict.confidence, message);
                        verdict.source = "model".to_string();
                        return verdict;
                    }
                    log::warn!("Chatbot: unparseable verdict from provider, using keywords");
                }
                Err(e) => log::warn!("Chatbot: provider failed ({}), using keywords", e),
            }
        }
        keyword_verdict(message)
    }
}

/// Parse the model's JSON verdict, tolerating markdown code fences.
pub fn parse_verdict(content: &str) -> Option<ScamVerdict> {
    let trimmed = content.trim();
    let inner = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    let value: Value = serde_json::from_str(inner).ok()?;
    Some(ScamVerdict {
        is_scam: value.get("isScam").and_then(Value::as_bool)?,
        confidence: value
            .get("confidence")
            .and_then(Value::as_f64)
            .unwrap_or(0.5)
            .clamp(0.0, 1.0),
        category: value
            .get("category")
            .and_then(Value::as_str)
            .unwrap_or("other")
            .to_string(),
        advice: value
            .get("advice")
            .and_then(Value::as_str)
            .unwrap_or("Be cautious and verify through official channels.")
            .to_string(),
        source: "model".to_string(),
    })
}

/// Count scam keywords in a message.
fn keyword_hits(message: &str) -> usize {
    let lower = message.to_lowercase();
    SCAM_KEYWORDS.iter().filter(|k| lower.contains(*k)).count()
}

/// Nudge model confidence up by the keyword evidence, clamped to [0, 1].
pub fn adjust_confidence(base: f64, message: &str) -> f64 {
    let boost = keyword_hits(message) as f64 * KEYWORD_CONFIDENCE_STEP;
    (base + boost).clamp(0.0, 1.0)
}

/// Keyword-only verdict for the no-provider and provider-failure paths.
pub fn keyword_verdict(message: &str) -> ScamVerdict {
    let hits = keyword_hits(message);
    let confidence = (hits as f64 * 2.0 * KEYWORD_CONFIDENCE_STEP).clamp(0.0, 0.9);
    let is_scam = hits >= 2;

    ScamVerdict {
        is_scam,
        confidence,
        category: if is_scam { "other" } else { "none" }.to_string(),
        advice: if is_scam {
            "This message shows common scam pressure tactics. Do not send money or \
             personal details; verify through an official channel you look up yourself."
                .to_string()
        } else {
            "Nothing obviously suspicious, but never share codes, passwords, or \
             payment details with an unverified contact."
                .to_string()
        },
        source: "keywords".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CannedProvider(String);

    #[async_trait]
    impl ChatProvider for CannedProvider {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String, ChatbotError> {
            Ok(self.0.clone())
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl ChatProvider for FailingProvider {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String, ChatbotError> {
            Err(ChatbotError::BadStatus(500))
        }
    }

    #[test]
    fn test_parse_verdict_plain_and_fenced() {
        let plain = r#"{"isScam":true,"confidence":0.8,"category":"phishing","advice":"Delete it."}"#;
        let verdict = parse_verdict(plain).expect("plain");
        assert!(verdict.is_scam);
        assert_eq!(verdict.category, "phishing");

        let fenced = format!("```json\n{plain}\n```");
        assert!(parse_verdict(&fenced).is_some());

        assert!(parse_verdict("I think it's a scam").is_none());
    }

    #[test]
    fn test_adjust_confidence_boosts_and_clamps() {
        let base = 0.5;
        let boosted = adjust_confidence(base, "They want a gift card via wire transfer, act now");
        assert!(boosted > base);

        assert_eq!(
            adjust_confidence(
                0.95,
                "urgent gift card wire transfer bitcoin warrant remote access"
            ),
            1.0
        );
        assert_eq!(adjust_confidence(0.3, "hello there"), 0.3);
    }

    #[test]
    fn test_keyword_verdict_thresholds() {
        let scam = keyword_verdict("URGENT: buy a gift card and act now");
        assert!(scam.is_scam);
        assert_eq!(scam.source, "keywords");

        let safe = keyword_verdict("See you at dinner tomorrow");
        assert!(!safe.is_scam);
        assert_eq!(safe.category, "none");
    }

    #[tokio::test]
    async fn test_analyze_uses_model_and_adjusts() {
        let bot = ScamChatbot::new(Some(Box::new(CannedProvider(
            r#"{"isScam":true,"confidence":0.5,"category":"tech_support","advice":"Hang up."}"#
                .to_string(),
        ))));

        let verdict = bot
            .analyze("Microsoft support needs remote access, urgent")
            .await;
        assert!(verdict.is_scam);
        assert_eq!(verdict.source, "model");
        assert!(verdict.confidence > 0.5, "keywords should boost the model score");
    }

    #[tokio::test]
    async fn test_analyze_falls_back_on_provider_error() {
        let bot = ScamChatbot::new(Some(Box::new(FailingProvider)));
        let verdict = bot.analyze("gift card payment, act now").await;
        assert_eq!(verdict.source, "keywords");
        assert!(verdict.is_scam);
    }

    #[tokio::test]
    async fn test_analyze_without_provider() {
        let bot = ScamChatbot::new(None);
        let verdict = bot.analyze("lunch at noon?").await;
        assert_eq!(verdict.source, "keywords");
        assert!(!verdict.is_scam);
    }
}
