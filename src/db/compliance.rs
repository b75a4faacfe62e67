use chrono::Utc;
use rusqlite::params;

use super::*;

impl AppDb {
    // =========================================================================
    // Legal agreements, compliance audits, data retention
    // =========================================================================

    pub fn insert_legal_agreement(
        &self,
        user_id: Option<i64>,
        agreement_type: &str,
        version: &str,
        ip_address: Option<&str>,
    ) -> Result<DbLegalAgreement, DbError> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO legal_agreements (user_id, agreement_type, version, accepted_at, ip_address)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![user_id, agreement_type, version, now, ip_address],
        )?;
        let id = self.conn.last_insert_rowid();
        Ok(DbLegalAgreement {
            id,
            user_id,
            agreement_type: agreement_type.to_string(),
            version: version.to_string(),
            accepted_at: now,
            ip_address: ip_address.map(str::to_string),
        })
    }

    pub fn get_legal_agreements_for_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<DbLegalAgreement>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, agreement_type, version, accepted_at, ip_address
             FROM legal_agreements WHERE user_id = ?1 ORDER BY accepted_at DESC",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok(DbLegalAgreement {
                id: row.get(0)?,
                user_id: row.get(1)?,
                agreement_type: row.get(2)?,
                version: row.get(3)?,
                accepted_at: row.get(4)?,
                ip_address: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn insert_compliance_audit(
        &self,
        audit_type: &str,
        status: &str,
        findings: Option<&str>,
        auditor: Option<&str>,
    ) -> Result<DbComplianceAudit, DbError> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO compliance_audits (audit_type, status, findings, auditor, performed_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![audit_type, status, findings, auditor, now],
        )?;
        let id = self.conn.last_insert_rowid();
        Ok(DbComplianceAudit {
            id,
            audit_type: audit_type.to_string(),
            status: status.to_string(),
            findings: findings.map(str::to_string),
            auditor: auditor.map(str::to_string),
            performed_at: now,
        })
    }

    pub fn get_compliance_audits(&self, limit: i64) -> Result<Vec<DbComplianceAudit>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, audit_type, status, findings, auditor, performed_at
             FROM compliance_audits ORDER BY performed_at DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            Ok(DbComplianceAudit {
                id: row.get(0)?,
                audit_type: row.get(1)?,
                status: row.get(2)?,
                findings: row.get(3)?,
                auditor: row.get(4)?,
                performed_at: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // -------------------------------------------------------------------------
    // Data retention
    // -------------------------------------------------------------------------

    pub fn get_retention_logs(&self, limit: i64) -> Result<Vec<DbRetentionLog>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, table_name, rows_purged, cutoff, executed_at
             FROM data_retention_logs ORDER BY executed_at DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            Ok(DbRetentionLog {
                id: row.get(0)?,
                table_name: row.get(1)?,
                rows_purged: row.get(2)?,
                cutoff: row.get(3)?,
                executed_at: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Purge closed calls and reviewed reports older than the cutoff, writing
    /// one retention-log row per table in the same transaction as the deletes.
    pub fn run_retention(&self, cutoff: &str) -> Result<Vec<DbRetentionLog>, String> {
        let now = Utc::now().to_rfc3339();
        self.with_transaction(|db| {
            let mut logs = Vec::new();
            let calls_purged = db.purge_calls_before(cutoff).map_err(|e| e.to_string())?;
            let reports_purged = db
                .purge_reports_before(cutoff)
                .map_err(|e| e.to_string())?;

            for (table, purged) in [("calls", calls_purged), ("scam_reports", reports_purged)] {
                db.conn
                    .execute(
                        "INSERT INTO data_retention_logs (table_name, rows_purged, cutoff, executed_at)
                         VALUES (?1, ?2, ?3, ?4)",
                        params![table, purged as i64, cutoff, now],
                    )
                    .map_err(|e| e.to_string())?;
                logs.push(DbRetentionLog {
                    id: db.conn.last_insert_rowid(),
                    table_name: table.to_string(),
                    rows_purged: purged as i64,
                    cutoff: cutoff.to_string(),
                    executed_at: now.clone(),
                });
            }
            Ok(logs)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::test_db;

    #[test]
    fn test_agreements_scoped_to_user() {
        let db = test_db();
        db.insert_legal_agreement(Some(1), "terms", "2.1", Some("203.0.113.9"))
            .expect("a");
        db.insert_legal_agreement(Some(1), "privacy", "1.0", None)
            .expect("b");
        db.insert_legal_agreement(Some(2), "terms", "2.1", None)
            .expect("c");

        let mine = db.get_legal_agreements_for_user(1).expect("list");
        assert_eq!(mine.len(), 2);
    }

    #[test]
    fn test_retention_run_purges_and_logs() {
        let db = test_db();
        db.conn_ref()
            .execute(
                "INSERT INTO calls (caller_number, status, started_at)
                 VALUES ('+15550000001', 'completed', '2020-01-01T00:00:00Z')",
                [],
            )
            .expect("old call");
        db.conn_ref()
            .execute(
                "INSERT INTO scam_reports (phone_number, status, created_at)
                 VALUES ('+15550000002', 'dismissed', '2020-06-01T00:00:00Z')",
                [],
            )
            .expect("old report");

        let logs = db.run_retention("2021-01-01T00:00:00Z").expect("run");
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].table_name, "calls");
        assert_eq!(logs[0].rows_purged, 1);
        assert_eq!(logs[1].table_name, "scam_reports");
        assert_eq!(logs[1].rows_purged, 1);

        let persisted = db.get_retention_logs(10).expect("list");
        assert_eq!(persisted.len(), 2);
    }

    #[test]
    fn test_retention_noop_still_logged() {
        let db = test_db();
        let logs = db.run_retention("2021-01-01T00:00:00Z").expect("run");
        assert!(logs.iter().all(|l| l.rows_purged == 0));
    }
}
