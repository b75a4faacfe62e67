use chrono::Utc;
use rusqlite::params;

use super::*;

/// A trend item as produced by the RSS aggregator, before it has a row id.
#[derive(Debug, Clone)]
pub struct TrendItemInput {
    pub source: String,
    pub guid: String,
    pub title: String,
    pub link: Option<String>,
    pub summary: Option<String>,
    pub category: String,
    pub severity_score: i64,
    pub published_at: Option<String>,
}

impl AppDb {
    // =========================================================================
    // Generated content, social analyses, scam trends
    // =========================================================================

    pub fn insert_youtube_content(
        &self,
        title: &str,
        description: Option<&str>,
        video_url: Option<&str>,
        call_id: Option<i64>,
    ) -> Result<DbYoutubeContent, DbError> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO youtube_content (title, description, video_url, call_id, status, created_at)
             VALUES (?1, ?2, ?3, ?4, 'draft', ?5)",
            params![title, description, video_url, call_id, now],
        )?;
        let id = self.conn.last_insert_rowid();
        Ok(DbYoutubeContent {
            id,
            title: title.to_string(),
            description: description.map(str::to_string),
            video_url: video_url.map(str::to_string),
            call_id,
            status: "draft".to_string(),
            created_at: now,
        })
    }

    pub fn get_youtube_content(&self, limit: i64) -> Result<Vec<DbYoutubeContent>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, description, video_url, call_id, status, created_at
             FROM youtube_content ORDER BY created_at DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            Ok(DbYoutubeContent {
                id: row.get(0)?,
                title: row.get(1)?,
                description: row.get(2)?,
                video_url: row.get(3)?,
                call_id: row.get(4)?,
                status: row.get(5)?,
                created_at: row.get(6)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn insert_social_analysis(
        &self,
        platform: &str,
        content_url: Option<&str>,
        content_text: &str,
        risk_score: f64,
        verdict: &str,
    ) -> Result<DbSocialAnalysis, DbError> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO social_media_analyses (platform, content_url, content_text, risk_score, verdict, analyzed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![platform, content_url, content_text, risk_score, verdict, now],
        )?;
        let id = self.conn.last_insert_rowid();
        Ok(DbSocialAnalysis {
            id,
            platform: platform.to_string(),
            content_url: content_url.map(str::to_string),
            content_text: content_text.to_string(),
            risk_score,
            verdict: verdict.to_string(),
            analyzed_at: now,
        })
    }

    pub fn get_social_analyses(&self, limit: i64) -> Result<Vec<DbSocialAnalysis>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, platform, content_url, content_text, risk_score, verdict, analyzed_at
             FROM social_media_analyses ORDER BY analyzed_at DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            Ok(DbSocialAnalysis {
                id: row.get(0)?,
                platform: row.get(1)?,
                content_url: row.get(2)?,
                content_text: row.get(3)?,
                risk_score: row.get(4)?,
                verdict: row.get(5)?,
                analyzed_at: row.get(6)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // -------------------------------------------------------------------------
    // Scam trend items
    // -------------------------------------------------------------------------

    /// Upsert by guid. Returns true when the item was new.
    pub fn upsert_trend_item(&self, item: &TrendItemInput) -> Result<bool, DbError> {
        let existed: bool = self
            .conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM scam_trend_items WHERE guid = ?1)",
                params![item.guid],
                |row| row.get(0),
            )
            .unwrap_or(true);

        self.conn.execute(
            "INSERT INTO scam_trend_items
                (source, guid, title, link, summary, category, severity_score, published_at, fetched_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(guid) DO UPDATE SET
                title = excluded.title,
                summary = excluded.summary,
                category = excluded.category,
                severity_score = excluded.severity_score,
                fetched_at = excluded.fetched_at",
            params![
                item.source,
                item.guid,
                item.title,
                item.link,
                item.summary,
                item.category,
                item.severity_score,
                item.published_at,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(!existed)
    }

    pub fn get_trend_items(
        &self,
        category: Option<&str>,
        limit: i64,
    ) -> Result<Vec<DbTrendItem>, DbError> {
        let items = match category {
            Some(cat) => {
                let mut stmt = self.conn.prepare(
                    "SELECT id, source, guid, title, link, summary, category, severity_score,
                            published_at, fetched_at
                     FROM scam_trend_items WHERE category = ?1
                     ORDER BY severity_score DESC, fetched_at DESC LIMIT ?2",
                )?;
                let rows = stmt.query_map(params![cat, limit], Self::map_trend_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = self.conn.prepare(
                    "SELECT id, source, guid, title, link, summary, category, severity_score,
                            published_at, fetched_at
                     FROM scam_trend_items
                     ORDER BY severity_score DESC, fetched_at DESC LIMIT ?1",
                )?;
                let rows = stmt.query_map(params![limit], Self::map_trend_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };
        Ok(items)
    }

    fn map_trend_row(row: &rusqlite::Row) -> rusqlite::Result<DbTrendItem> {
        Ok(DbTrendItem {
            id: row.get(0)?,
            source: row.get(1)?,
            guid: row.get(2)?,
            title: row.get(3)?,
            link: row.get(4)?,
            summary: row.get(5)?,
            category: row.get(6)?,
            severity_score: row.get(7)?,
            published_at: row.get(8)?,
            fetched_at: row.get(9)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::test_db;
    use super::*;

    fn sample_item(guid: &str, category: &str, severity: i64) -> TrendItemInput {
        TrendItemInput {
            source: "ftc".to_string(),
            guid: guid.to_string(),
            title: format!("Trend {guid}"),
            link: Some("https://example.org/post".to_string()),
            summary: None,
            category: category.to_string(),
            severity_score: severity,
            published_at: None,
        }
    }

    #[test]
    fn test_trend_upsert_dedups_by_guid() {
        let db = test_db();
        assert!(db
            .upsert_trend_item(&sample_item("g-1", "crypto", 40))
            .expect("first"));
        assert!(!db
            .upsert_trend_item(&sample_item("g-1", "crypto", 60))
            .expect("second"));

        let items = db.get_trend_items(None, 10).expect("list");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].severity_score, 60, "refetch updates the score");
    }

    #[test]
    fn test_trend_category_filter_and_order() {
        let db = test_db();
        db.upsert_trend_item(&sample_item("g-1", "crypto", 40)).expect("a");
        db.upsert_trend_item(&sample_item("g-2", "romance", 90)).expect("b");
        db.upsert_trend_item(&sample_item("g-3", "crypto", 75)).expect("c");

        let crypto = db.get_trend_items(Some("crypto"), 10).expect("filter");
        assert_eq!(crypto.len(), 2);
        assert_eq!(crypto[0].guid, "g-3", "highest severity first");

        let all = db.get_trend_items(None, 10).expect("all");
        assert_eq!(all[0].guid, "g-2");
    }

    #[test]
    fn test_youtube_content_defaults_draft() {
        let db = test_db();
        let content = db
            .insert_youtube_content("Scammer rages for 40 minutes", None, None, None)
            .expect("insert");
        assert_eq!(content.status, "draft");
    }

    #[test]
    fn test_social_analyses_listing() {
        let db = test_db();
        db.insert_social_analysis("facebook", None, "Free crypto giveaway!!", 0.92, "scam")
            .expect("a");
        db.insert_social_analysis("x", None, "Lunch was good", 0.04, "safe")
            .expect("b");

        let analyses = db.get_social_analyses(10).expect("list");
        assert_eq!(analyses.len(), 2);
    }
}
