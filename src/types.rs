//! Configuration types.
//!
//! The config file lives at `~/.scamshield/config.json`, camelCase keys,
//! every field defaulted so a partial file (or none at all) still boots the
//! server with the integrations disabled.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub reddit: RedditConfig,
    #[serde(default)]
    pub scam_trends: TrendsConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Origin allowed by the CORS layer; None means same-origin only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cors_origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            cors_origin: None,
        }
    }
}

fn default_port() -> u16 {
    5050
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DiscordConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Outbound webhook for report/funding notifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    /// Hex-encoded application public key for interaction verification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedditConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default = "default_reddit_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_subreddits")]
    pub subreddits: Vec<String>,
    #[serde(default = "default_reddit_poll_minutes")]
    pub poll_interval_minutes: u32,
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            client_id: None,
            client_secret: None,
            user_agent: default_reddit_user_agent(),
            subreddits: default_subreddits(),
            poll_interval_minutes: default_reddit_poll_minutes(),
        }
    }
}

fn default_reddit_user_agent() -> String {
    "scamshield-monitor/0.4".to_string()
}

fn default_subreddits() -> Vec<String> {
    vec!["Scams".to_string(), "phonescams".to_string()]
}

fn default_reddit_poll_minutes() -> u32 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_feeds")]
    pub feeds: Vec<FeedSource>,
    #[serde(default = "default_trends_poll_hours")]
    pub poll_interval_hours: u32,
}

impl Default for TrendsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            feeds: default_feeds(),
            poll_interval_hours: default_trends_poll_hours(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedSource {
    pub name: String,
    pub url: String,
}

fn default_feeds() -> Vec<FeedSource> {
    vec![
        FeedSource {
            name: "ftc".to_string(),
            url: "https://consumer.ftc.gov/blog/rss".to_string(),
        },
        FeedSource {
            name: "fcc".to_string(),
            url: "https://www.fcc.gov/news-events/rss".to_string(),
        },
    ]
}

fn default_trends_poll_hours() -> u32 {
    6
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenAiConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_openai_model")]
    pub model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: None,
            model: default_openai_model(),
        }
    }
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_parses_with_defaults() {
        let config: Config = serde_json::from_str("{}").expect("parse");
        assert_eq!(config.server.port, 5050);
        assert!(!config.discord.enabled);
        assert_eq!(config.reddit.subreddits.len(), 2);
        assert_eq!(config.openai.model, "gpt-4o-mini");
    }

    #[test]
    fn test_partial_config_keeps_other_defaults() {
        let config: Config = serde_json::from_str(
            r#"{"server":{"port":8080},"discord":{"enabled":true,"webhookUrl":"https://discord.com/api/webhooks/1/tok"}}"#,
        )
        .expect("parse");
        assert_eq!(config.server.port, 8080);
        assert!(config.discord.enabled);
        assert_eq!(config.scam_trends.poll_interval_hours, 6);
    }
}
