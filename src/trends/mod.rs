//! Scam trends aggregation.
//!
//! Fetches configured RSS feeds, extracts item fields with compile-once
//! regexes, keyword-scores each item for category and severity, and renders
//! the aggregate RSS 2.0 feed the site republishes.

use std::sync::OnceLock;

use regex::Regex;

use crate::db::content::TrendItemInput;
use crate::db::DbTrendItem;
use crate::state::AppState;

pub mod poller;

/// Errors from trend aggregation.
#[derive(Debug, thiserror::Error)]
pub enum TrendsError {
    #[error("Feed request failed: {0}")]
    RequestFailed(String),
    #[error("Feed returned HTTP {0}")]
    BadStatus(u16),
    #[error("Database unavailable")]
    DbUnavailable,
    #[error("Database error: {0}")]
    Db(String),
}

// Compile-once regex patterns via OnceLock.
fn re_item() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<item>(.*?)</item>").unwrap())
}

fn re_title() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<title>(.*?)</title>").unwrap())
}

fn re_link() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<link>(.*?)</link>").unwrap())
}

fn re_guid() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<guid[^>]*>(.*?)</guid>").unwrap())
}

fn re_pub_date() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<pubDate>(.*?)</pubDate>").unwrap())
}

fn re_description() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<description>(.*?)</description>").unwrap())
}

fn re_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").unwrap())
}

/// Keyword groups that drive category assignment and severity weighting.
/// First matching group names the category; every match adds its weight.
const KEYWORD_GROUPS: &[(&str, &[&str], i64)] = &[
    ("impersonation", &["irs", "social security", "government", "police", "warrant"], 30),
    ("crypto", &["crypto", "bitcoin", "investment", "exchange"], 25),
    ("romance", &["romance", "dating", "lonely"], 25),
    ("tech_support", &["tech support", "microsoft", "refund", "remote access"], 25),
    ("phishing", &["phishing", "credentials", "password", "text message", "smishing"], 20),
    ("elder_fraud", &["elderly", "senior", "grandparent"], 20),
];

pub struct ScamTrendsService {
    client: reqwest::Client,
}

impl ScamTrendsService {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Fetch one feed document.
    pub async fn fetch_feed(&self, url: &str) -> Result<String, TrendsError> {
        let resp = self
            .client
            .get(url)
            .header("Accept", "application/rss+xml, application/xml, text/xml")
            .send()
            .await
            .map_err(|e| TrendsError::RequestFailed(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(TrendsError::BadStatus(resp.status().as_u16()));
        }

        resp.text()
            .await
            .map_err(|e| TrendsError::RequestFailed(e.to_string()))
    }

    /// One full aggregation pass over the configured feeds.
    /// Returns (new items, items seen).
    pub async fn sync_once(&self, state: &AppState) -> Result<(usize, usize), TrendsError> {
        let config = state.config_snapshot().scam_trends;

        let mut seen = 0;
        let mut fresh = 0;

        for feed in &config.feeds {
            let xml = match self.fetch_feed(&feed.url).await {
                Ok(xml) => xml,
                Err(e) => {
                    log::warn!("Trends: feed '{}' failed: {}", feed.name, e);
                    continue;
                }
            };

            let items = extract_items(&feed.name, &xml);
            seen += items.len();

            let db_guard = state.db.lock().map_err(|_| TrendsError::DbUnavailable)?;
            let db = db_guard.as_ref().ok_or(TrendsError::DbUnavailable)?;
            for item in &items {
                match db.upsert_trend_item(item) {
                    Ok(true) => fresh += 1,
                    Ok(false) => {}
                    Err(e) => log::warn!("Trends: upsert '{}' failed: {}", item.guid, e),
                }
            }
        }

        Ok((fresh, seen))
    }
}

impl Default for ScamTrendsService {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Extraction & scoring
// ---------------------------------------------------------------------------

/// Regex-extract items from an RSS document and score each one.
/// Items without a title are dropped; a missing guid falls back to the link.
pub fn extract_items(source: &str, xml: &str) -> Vec<TrendItemInput> {
    let mut items = Vec::new();

    for captures in re_item().captures_iter(xml) {
        let block = &captures[1];

        let title = match field(re_title(), block) {
            Some(t) if !t.is_empty() => t,
            _ => continue,
        };
        let link = field(re_link(), block);
        let guid = field(re_guid(), block)
            .or_else(|| link.clone())
            .unwrap_or_else(|| format!("{source}:{title}"));
        let summary = field(re_description(), block);
        let published_at = field(re_pub_date(), block);

        let scored_text = format!("{} {}", title, summary.as_deref().unwrap_or(""));
        let (category, severity_score) = score_text(&scored_text);

        items.push(TrendItemInput {
            source: source.to_string(),
            guid,
            title,
            link,
            summary,
            category: category.to_string(),
            severity_score,
            published_at,
        });
    }

    items
}

fn field(re: &Regex, block: &str) -> Option<String> {
    re.captures(block)
        .map(|c| clean_text(c[1].trim()))
        .filter(|s| !s.is_empty())
}

/// Strip CDATA wrappers and embedded tags, then unescape XML entities.
fn clean_text(raw: &str) -> String {
    let inner = raw
        .trim()
        .strip_prefix("<![CDATA[")
        .and_then(|s| s.strip_suffix("]]>"))
        .unwrap_or(raw.trim());
    let stripped = re_tag().replace_all(inner, "");
    xml_unescape(stripped.trim())
}

/// Category and severity for a block of text.
/// The first matching keyword group names the category; every keyword match
/// adds its group weight, clamped to 100.
pub fn score_text(text: &str) -> (&'static str, i64) {
    let lower = text.to_lowercase();
    let mut category = "general";
    let mut score: i64 = 0;

    for &(name, terms, weight) in KEYWORD_GROUPS {
        let hits = terms.iter().filter(|t| lower.contains(*t)).count() as i64;
        if hits > 0 {
            if category == "general" {
                category = name;
            }
            score += hits * weight;
        }
    }

    (category, score.min(100))
}

// ---------------------------------------------------------------------------
// Feed generation
// ---------------------------------------------------------------------------

pub fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn xml_unescape(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Render stored trend items as an RSS 2.0 document.
pub fn generate_rss_feed(items: &[DbTrendItem]) -> String {
    let mut out = String::with_capacity(1024 + items.len() * 512);
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<rss version=\"2.0\">\n<channel>\n");
    out.push_str("<title>ScamShield Trends</title>\n");
    out.push_str("<link>https://scamshield.example/scam-trends</link>\n");
    out.push_str("<description>Aggregated scam trend reports</description>\n");

    for item in items {
        out.push_str("<item>\n");
        out.push_str(&format!("<title>{}</title>\n", xml_escape(&item.title)));
        if let Some(link) = &item.link {
            out.push_str(&format!("<link>{}</link>\n", xml_escape(link)));
        }
        out.push_str(&format!(
            "<guid isPermaLink=\"false\">{}</guid>\n",
            xml_escape(&item.guid)
        ));
        if let Some(summary) = &item.summary {
            out.push_str(&format!(
                "<description>{}</description>\n",
                xml_escape(summary)
            ));
        }
        out.push_str(&format!(
            "<category>{}</category>\n",
            xml_escape(&item.category)
        ));
        if let Some(published) = &item.published_at {
            out.push_str(&format!("<pubDate>{}</pubDate>\n", xml_escape(published)));
        }
        out.push_str("</item>\n");
    }

    out.push_str("</channel>\n</rss>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
<title>Consumer Alerts</title>
<item>
  <title>New IRS impersonation wave hits seniors</title>
  <link>https://example.org/alerts/irs-wave</link>
  <guid isPermaLink="false">alert-901</guid>
  <pubDate>Mon, 03 Aug 2026 09:00:00 GMT</pubDate>
  <description><![CDATA[Callers demand <b>gift cards</b> to cancel a warrant.]]></description>
</item>
<item>
  <title>Weekly roundup</title>
  <link>https://example.org/alerts/roundup</link>
</item>
<item>
  <description>No title here, should be dropped</description>
</item>
</channel></rss>"#;

    #[test]
    fn test_extract_items_fields() {
        let items = extract_items("ftc", SAMPLE_FEED);
        assert_eq!(items.len(), 2, "titleless items are dropped");

        let first = &items[0];
        assert_eq!(first.guid, "alert-901");
        assert_eq!(first.title, "New IRS impersonation wave hits seniors");
        assert_eq!(first.link.as_deref(), Some("https://example.org/alerts/irs-wave"));
        assert_eq!(
            first.summary.as_deref(),
            Some("Callers demand gift cards to cancel a warrant."),
            "CDATA and embedded tags are stripped"
        );
        assert_eq!(first.published_at.as_deref(), Some("Mon, 03 Aug 2026 09:00:00 GMT"));
    }

    #[test]
    fn test_guid_falls_back_to_link() {
        let items = extract_items("ftc", SAMPLE_FEED);
        assert_eq!(items[1].guid, "https://example.org/alerts/roundup");
    }

    #[test]
    fn test_scoring_category_and_clamp() {
        let (category, score) = score_text("IRS warrant call targeting elderly seniors");
        assert_eq!(category, "impersonation");
        assert!(score > 0);

        let (_, clamped) = score_text(
            "irs social security government police warrant crypto bitcoin \
             investment exchange romance dating tech support phishing elderly",
        );
        assert_eq!(clamped, 100);
    }

    #[test]
    fn test_scoring_neutral_text() {
        let (category, score) = score_text("Community bake sale this weekend");
        assert_eq!(category, "general");
        assert_eq!(score, 0);
    }

    #[test]
    fn test_generate_feed_escapes_entities() {
        let item = DbTrendItem {
            id: 1,
            source: "ftc".to_string(),
            guid: "g<1>".to_string(),
            title: "Scams & how to spot them".to_string(),
            link: None,
            summary: Some("\"Free\" prizes".to_string()),
            category: "general".to_string(),
            severity_score: 10,
            published_at: None,
            fetched_at: "2026-08-01T00:00:00Z".to_string(),
        };

        let feed = generate_rss_feed(&[item]);
        assert!(feed.contains("<title>Scams &amp; how to spot them</title>"));
        assert!(feed.contains("<guid isPermaLink=\"false\">g&lt;1&gt;</guid>"));
        assert!(feed.contains("<description>&quot;Free&quot; prizes</description>"));
        assert!(feed.starts_with("<?xml"));
        assert!(feed.ends_with("</rss>\n"));
    }

    #[test]
    fn test_generated_feed_items_reextract() {
        let item = DbTrendItem {
            id: 1,
            source: "ftc".to_string(),
            guid: "roundtrip-1".to_string(),
            title: "Crypto exchange freeze warning".to_string(),
            link: Some("https://example.org/a".to_string()),
            summary: None,
            category: "crypto".to_string(),
            severity_score: 25,
            published_at: Some("Mon, 03 Aug 2026 09:00:00 GMT".to_string()),
            fetched_at: "2026-08-03T10:00:00Z".to_string(),
        };

        let feed = generate_rss_feed(&[item]);
        let reparsed = extract_items("self", &feed);
        assert_eq!(reparsed.len(), 1);
        assert_eq!(reparsed[0].guid, "roundtrip-1");
        assert_eq!(reparsed[0].title, "Crypto exchange freeze warning");
    }
}
