use chrono::Utc;
use rusqlite::params;

use super::*;

impl AppDb {
    // =========================================================================
    // Fraud number database
    // =========================================================================

    /// Public intake: record the submission and fold it into the aggregate
    /// `fraud_entries` row for that number, both inside one transaction.
    pub fn insert_fraud_submission(
        &self,
        phone_number: &str,
        category: &str,
        details: Option<&str>,
        submitter_email: Option<&str>,
    ) -> Result<DbFraudSubmission, String> {
        let now = Utc::now().to_rfc3339();
        self.with_transaction(|db| {
            db.conn
                .execute(
                    "INSERT INTO fraud_submissions (phone_number, category, details, submitter_email, status, created_at)
                     VALUES (?1, ?2, ?3, ?4, 'pending', ?5)",
                    params![phone_number, category, details, submitter_email, now],
                )
                .map_err(|e| e.to_string())?;
            let id = db.conn.last_insert_rowid();

            db.conn
                .execute(
                    "INSERT INTO fraud_entries (phone_number, category, report_count, first_reported, last_reported)
                     VALUES (?1, ?2, 1, ?3, ?3)
                     ON CONFLICT(phone_number) DO UPDATE SET
                        report_count = report_count + 1,
                        last_reported = excluded.last_reported,
                        category = excluded.category",
                    params![phone_number, category, now],
                )
                .map_err(|e| e.to_string())?;

            Ok(DbFraudSubmission {
                id,
                phone_number: phone_number.to_string(),
                category: category.to_string(),
                details: details.map(str::to_string),
                submitter_email: submitter_email.map(str::to_string),
                status: "pending".to_string(),
                created_at: now.clone(),
            })
        })
    }

    /// Look a number up in the aggregate database.
    pub fn lookup_fraud_entry(&self, phone_number: &str) -> Result<Option<DbFraudEntry>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, phone_number, category, report_count, first_reported, last_reported, confirmed
             FROM fraud_entries WHERE phone_number = ?1",
        )?;
        let mut rows = stmt.query_map(params![phone_number], Self::map_fraud_entry_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Paged listing of confirmed entries, most-reported first.
    pub fn get_confirmed_fraud_entries(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<DbFraudEntry>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, phone_number, category, report_count, first_reported, last_reported, confirmed
             FROM fraud_entries WHERE confirmed = 1
             ORDER BY report_count DESC, last_reported DESC
             LIMIT ?1 OFFSET ?2",
        )?;
        let rows = stmt.query_map(params![limit, offset], Self::map_fraud_entry_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Mark an aggregate entry as confirmed once a moderator has reviewed it.
    pub fn confirm_fraud_entry(&self, phone_number: &str) -> Result<bool, DbError> {
        let changed = self.conn.execute(
            "UPDATE fraud_entries SET confirmed = 1 WHERE phone_number = ?1",
            params![phone_number],
        )?;
        Ok(changed > 0)
    }

    fn map_fraud_entry_row(row: &rusqlite::Row) -> rusqlite::Result<DbFraudEntry> {
        Ok(DbFraudEntry {
            id: row.get(0)?,
            phone_number: row.get(1)?,
            category: row.get(2)?,
            report_count: row.get(3)?,
            first_reported: row.get(4)?,
            last_reported: row.get(5)?,
            confirmed: row.get::<_, i32>(6)? != 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::test_db;

    #[test]
    fn test_submission_creates_aggregate_entry() {
        let db = test_db();
        db.insert_fraud_submission("+15551112222", "crypto", Some("fake exchange"), None)
            .expect("submit");

        let entry = db
            .lookup_fraud_entry("+15551112222")
            .expect("lookup")
            .expect("entry exists");
        assert_eq!(entry.report_count, 1);
        assert!(!entry.confirmed);
    }

    #[test]
    fn test_repeat_submission_increments_count() {
        let db = test_db();
        db.insert_fraud_submission("+15551112222", "crypto", None, None)
            .expect("first");
        let first = db
            .lookup_fraud_entry("+15551112222")
            .expect("lookup")
            .expect("entry");

        db.insert_fraud_submission("+15551112222", "romance", None, None)
            .expect("second");
        let entry = db
            .lookup_fraud_entry("+15551112222")
            .expect("lookup")
            .expect("entry");

        assert_eq!(entry.report_count, 2);
        assert_eq!(entry.category, "romance", "latest category wins");
        assert_eq!(
            entry.first_reported, first.first_reported,
            "first_reported is preserved"
        );
    }

    #[test]
    fn test_confirmed_listing_excludes_pending() {
        let db = test_db();
        db.insert_fraud_submission("+15551112222", "crypto", None, None)
            .expect("a");
        db.insert_fraud_submission("+15553334444", "irs", None, None)
            .expect("b");
        db.confirm_fraud_entry("+15553334444").expect("confirm");

        let confirmed = db.get_confirmed_fraud_entries(10, 0).expect("list");
        assert_eq!(confirmed.len(), 1);
        assert_eq!(confirmed[0].phone_number, "+15553334444");
    }

    #[test]
    fn test_lookup_unknown_number() {
        let db = test_db();
        assert!(db
            .lookup_fraud_entry("+15559999999")
            .expect("lookup")
            .is_none());
    }
}
