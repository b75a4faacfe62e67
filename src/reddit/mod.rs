//! Reddit monitor: OAuth2 client-credentials auth plus subreddit listing
//! fetches, and the keyword heuristics applied to what comes back.
//!
//! The monitor never posts. It detects scam-bait posts and logs the reply
//! it would make.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use serde_json::Value;

pub mod poller;

/// Errors from Reddit operations.
#[derive(Debug, thiserror::Error)]
pub enum RedditError {
    #[error("Missing Reddit credentials")]
    MissingCredentials,
    #[error("Token request refused: HTTP {0}")]
    AuthRefused(u16),
    #[error("Access token expired or revoked")]
    Unauthorized,
    #[error("Listing request failed: HTTP {0}")]
    ListingFailed(u16),
    #[error("Request failed: {0}")]
    RequestFailed(String),
    #[error("Unexpected response shape: {0}")]
    ParseError(String),
}

/// A post pulled from a subreddit's /new listing.
#[derive(Debug, Clone, Deserialize)]
pub struct RedditPost {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub permalink: String,
    #[serde(default)]
    pub author: String,
}

pub struct RedditClient {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    user_agent: String,
    access_token: Option<String>,
}

impl RedditClient {
    pub fn new(client_id: &str, client_secret: &str, user_agent: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            user_agent: user_agent.to_string(),
            access_token: None,
        }
    }

    /// Obtain an application-only OAuth token (client_credentials grant).
    pub async fn authenticate(&mut self) -> Result<(), RedditError> {
        if self.client_id.is_empty() || self.client_secret.is_empty() {
            return Err(RedditError::MissingCredentials);
        }

        let basic = BASE64.encode(format!("{}:{}", self.client_id, self.client_secret));
        let resp = self
            .client
            .post("https://www.reddit.com/api/v1/access_token")
            .header("Authorization", format!("Basic {basic}"))
            .header("User-Agent", &self.user_agent)
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| RedditError::RequestFailed(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(RedditError::AuthRefused(resp.status().as_u16()));
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| RedditError::ParseError(e.to_string()))?;
        let token = body["access_token"]
            .as_str()
            .ok_or_else(|| RedditError::ParseError("no access_token in response".to_string()))?;

        self.access_token = Some(token.to_string());
        Ok(())
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    /// Fetch the newest posts from a subreddit.
    ///
    /// Returns `Unauthorized` on 401 so the caller can re-authenticate once.
    pub async fn fetch_new_posts(
        &self,
        subreddit: &str,
        limit: u32,
    ) -> Result<Vec<RedditPost>, RedditError> {
        let token = self
            .access_token
            .as_ref()
            .ok_or(RedditError::Unauthorized)?;

        let url = format!("https://oauth.reddit.com/r/{subreddit}/new?limit={limit}");
        let resp = self
            .client
            .get(&url)
            .bearer_auth(token)
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .map_err(|e| RedditError::RequestFailed(e.to_string()))?;

        if resp.status().as_u16() == 401 {
            return Err(RedditError::Unauthorized);
        }
        if !resp.status().is_success() {
            return Err(RedditError::ListingFailed(resp.status().as_u16()));
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| RedditError::ParseError(e.to_string()))?;

        parse_listing(&body)
    }
}

/// Pull posts out of a Reddit listing document.
pub fn parse_listing(body: &Value) -> Result<Vec<RedditPost>, RedditError> {
    let children = body
        .pointer("/data/children")
        .and_then(Value::as_array)
        .ok_or_else(|| RedditError::ParseError("missing data.children".to_string()))?;

    let mut posts = Vec::with_capacity(children.len());
    for child in children {
        if let Some(data) = child.get("data") {
            match serde_json::from_value::<RedditPost>(data.clone()) {
                Ok(post) => posts.push(post),
                Err(e) => log::warn!("Skipping malformed Reddit post: {}", e),
            }
        }
    }
    Ok(posts)
}

// ---------------------------------------------------------------------------
// Keyword heuristics
// ---------------------------------------------------------------------------

/// Phrases that mark a post as clickbait rather than a genuine report.
const BAIT_PHRASES: &[&str] = &[
    "you won't believe",
    "you wont believe",
    "shocking",
    "gone wrong",
    "must see",
    "exposed!!",
    "this one trick",
    "doctors hate",
    "number will surprise",
];

/// Terms that make a post relevant to the scam-watch channel at all.
const SCAM_TERMS: &[&str] = &[
    "scam",
    "scammer",
    "fraud",
    "phishing",
    "gift card",
    "irs call",
    "tech support",
    "robocall",
];

/// True when the title reads as engagement bait.
///
/// Two signals: a known bait phrase, or shouting (≥60% of letters uppercase
/// in a title long enough for that to mean something).
pub fn is_clickbait(title: &str) -> bool {
    let lower = title.to_lowercase();
    if BAIT_PHRASES.iter().any(|p| lower.contains(p)) {
        return true;
    }

    let letters: Vec<char> = title.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.len() >= 12 {
        let upper = letters.iter().filter(|c| c.is_uppercase()).count();
        if upper * 100 / letters.len() >= 60 {
            return true;
        }
    }
    false
}

/// True when a post mentions scams we track.
pub fn is_scam_relevant(post: &RedditPost) -> bool {
    let haystack = format!("{} {}", post.title, post.selftext).to_lowercase();
    SCAM_TERMS.iter().any(|t| haystack.contains(t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn post(title: &str, body: &str) -> RedditPost {
        RedditPost {
            id: "t3_abc".to_string(),
            title: title.to_string(),
            selftext: body.to_string(),
            permalink: "/r/Scams/comments/abc".to_string(),
            author: "user".to_string(),
        }
    }

    #[test]
    fn test_clickbait_phrase() {
        assert!(is_clickbait("You won't BELIEVE what this scammer did"));
        assert!(is_clickbait("Shocking phone call from the 'IRS'"));
    }

    #[test]
    fn test_clickbait_shouting() {
        assert!(is_clickbait("GRANDMA DESTROYS PHONE SCAMMER LIVE"));
        assert!(!is_clickbait("IRS"), "short titles never count as shouting");
    }

    #[test]
    fn test_neutral_title_passes() {
        assert!(!is_clickbait(
            "Got a call claiming to be my bank, sharing the number"
        ));
    }

    #[test]
    fn test_scam_relevance() {
        assert!(is_scam_relevant(&post(
            "Weird call today",
            "They wanted gift cards for a fee"
        )));
        assert!(!is_scam_relevant(&post("Lost my cat", "Orange tabby, answers to Leo")));
    }

    #[test]
    fn test_parse_listing() {
        let body = json!({
            "kind": "Listing",
            "data": {
                "children": [
                    { "kind": "t3", "data": { "id": "aaa", "title": "Scam warning", "selftext": "", "permalink": "/r/Scams/aaa", "author": "u1" } },
                    { "kind": "t3", "data": { "id": "bbb", "title": "Another", "selftext": "text", "permalink": "/r/Scams/bbb", "author": "u2" } }
                ]
            }
        });
        let posts = parse_listing(&body).expect("parse");
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].id, "aaa");
    }

    #[test]
    fn test_parse_listing_wrong_shape() {
        assert!(parse_listing(&json!({"error": 404})).is_err());
    }
}
