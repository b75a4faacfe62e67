use chrono::Utc;
use rusqlite::params;

use super::*;

/// Statuses a scam report can move through after intake.
pub const REPORT_STATUSES: &[&str] = &["new", "reviewing", "confirmed", "dismissed"];

impl AppDb {
    // =========================================================================
    // Scam reports
    // =========================================================================

    /// Persist a user-submitted report. Always lands with status 'new'.
    pub fn insert_scam_report(
        &self,
        reporter_name: Option<&str>,
        phone_number: &str,
        scam_type: Option<&str>,
        description: Option<&str>,
    ) -> Result<DbScamReport, DbError> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO scam_reports (reporter_name, phone_number, scam_type, description, status, created_at)
             VALUES (?1, ?2, ?3, ?4, 'new', ?5)",
            params![reporter_name, phone_number, scam_type, description, now],
        )?;
        let id = self.conn.last_insert_rowid();
        Ok(DbScamReport {
            id,
            reporter_name: reporter_name.map(str::to_string),
            phone_number: phone_number.to_string(),
            scam_type: scam_type.map(str::to_string),
            description: description.map(str::to_string),
            status: "new".to_string(),
            created_at: now,
        })
    }

    pub fn get_scam_reports(
        &self,
        status: Option<&str>,
        limit: i64,
    ) -> Result<Vec<DbScamReport>, DbError> {
        let reports = match status {
            Some(s) => {
                let mut stmt = self.conn.prepare(
                    "SELECT id, reporter_name, phone_number, scam_type, description, status, created_at
                     FROM scam_reports WHERE status = ?1 ORDER BY created_at DESC LIMIT ?2",
                )?;
                let rows = stmt.query_map(params![s, limit], Self::map_report_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = self.conn.prepare(
                    "SELECT id, reporter_name, phone_number, scam_type, description, status, created_at
                     FROM scam_reports ORDER BY created_at DESC LIMIT ?1",
                )?;
                let rows = stmt.query_map(params![limit], Self::map_report_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };
        Ok(reports)
    }

    /// Move a report to a reviewed status. Returns false when the id is unknown.
    pub fn set_scam_report_status(&self, id: i64, status: &str) -> Result<bool, DbError> {
        let changed = self.conn.execute(
            "UPDATE scam_reports SET status = ?2 WHERE id = ?1",
            params![id, status],
        )?;
        Ok(changed > 0)
    }

    /// Delete reviewed reports created before the cutoff.
    pub fn purge_reports_before(&self, cutoff: &str) -> Result<usize, DbError> {
        let purged = self.conn.execute(
            "DELETE FROM scam_reports WHERE status != 'new' AND created_at < ?1",
            params![cutoff],
        )?;
        Ok(purged)
    }

    fn map_report_row(row: &rusqlite::Row) -> rusqlite::Result<DbScamReport> {
        Ok(DbScamReport {
            id: row.get(0)?,
            reporter_name: row.get(1)?,
            phone_number: row.get(2)?,
            scam_type: row.get(3)?,
            description: row.get(4)?,
            status: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::test_db;
    use super::*;

    #[test]
    fn test_submitted_report_lands_as_new() {
        let db = test_db();
        let report = db
            .insert_scam_report(
                Some("Margaret"),
                "+15558675309",
                Some("tech_support"),
                Some("Claimed my router was hacked"),
            )
            .expect("insert");
        assert_eq!(report.status, "new");

        let all = db.get_scam_reports(None, 10).expect("list");
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].phone_number, "+15558675309");
    }

    #[test]
    fn test_status_filter_and_transition() {
        let db = test_db();
        let a = db
            .insert_scam_report(None, "+15550000001", None, None)
            .expect("a");
        db.insert_scam_report(None, "+15550000002", None, None)
            .expect("b");

        assert!(db.set_scam_report_status(a.id, "confirmed").expect("set"));

        let confirmed = db.get_scam_reports(Some("confirmed"), 10).expect("list");
        assert_eq!(confirmed.len(), 1);
        assert_eq!(confirmed[0].id, a.id);

        let new = db.get_scam_reports(Some("new"), 10).expect("list");
        assert_eq!(new.len(), 1);
    }

    #[test]
    fn test_set_status_unknown_id() {
        let db = test_db();
        assert!(!db.set_scam_report_status(404, "confirmed").expect("set"));
    }

    #[test]
    fn test_purge_keeps_new_reports() {
        let db = test_db();
        db.conn_ref()
            .execute(
                "INSERT INTO scam_reports (phone_number, status, created_at)
                 VALUES ('+15550000001', 'dismissed', '2020-01-01T00:00:00Z')",
                [],
            )
            .expect("old dismissed");
        db.conn_ref()
            .execute(
                "INSERT INTO scam_reports (phone_number, status, created_at)
                 VALUES ('+15550000002', 'new', '2020-01-01T00:00:00Z')",
                [],
            )
            .expect("old new");

        let purged = db
            .purge_reports_before("2021-01-01T00:00:00Z")
            .expect("purge");
        assert_eq!(purged, 1, "unreviewed reports are never purged");
    }
}
