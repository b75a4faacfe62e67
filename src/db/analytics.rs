use chrono::{Duration, Utc};
use rusqlite::params;

use super::*;

impl AppDb {
    // =========================================================================
    // Analytics snapshots, funding, risk regions
    // =========================================================================

    pub fn insert_analytics_snapshot(
        &self,
        total_calls: i64,
        total_minutes_wasted: i64,
        scammers_engaged: i64,
        reports_received: i64,
        top_scam_types: &str,
    ) -> Result<DbAnalyticsSnapshot, DbError> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO analytics_snapshots
                (captured_at, total_calls, total_minutes_wasted, scammers_engaged,
                 reports_received, top_scam_types)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                now,
                total_calls,
                total_minutes_wasted,
                scammers_engaged,
                reports_received,
                top_scam_types
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        Ok(DbAnalyticsSnapshot {
            id,
            captured_at: now,
            total_calls,
            total_minutes_wasted,
            scammers_engaged,
            reports_received,
            top_scam_types: top_scam_types.to_string(),
        })
    }

    /// Most recent snapshot, which feeds the homepage counters.
    pub fn get_latest_snapshot(&self) -> Result<Option<DbAnalyticsSnapshot>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, captured_at, total_calls, total_minutes_wasted, scammers_engaged,
                    reports_received, top_scam_types
             FROM analytics_snapshots ORDER BY captured_at DESC LIMIT 1",
        )?;
        let mut rows = stmt.query_map([], Self::map_snapshot_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    pub fn get_snapshots_since(&self, days: i64) -> Result<Vec<DbAnalyticsSnapshot>, DbError> {
        let since = (Utc::now() - Duration::days(days)).to_rfc3339();
        let mut stmt = self.conn.prepare(
            "SELECT id, captured_at, total_calls, total_minutes_wasted, scammers_engaged,
                    reports_received, top_scam_types
             FROM analytics_snapshots WHERE captured_at >= ?1 ORDER BY captured_at",
        )?;
        let rows = stmt.query_map(params![since], Self::map_snapshot_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // -------------------------------------------------------------------------
    // Funding
    // -------------------------------------------------------------------------

    pub fn insert_funding_goal(
        &self,
        title: &str,
        description: Option<&str>,
        target_cents: i64,
        deadline: Option<&str>,
    ) -> Result<i64, DbError> {
        self.conn.execute(
            "INSERT INTO funding_goals (title, description, target_cents, deadline, active, created_at)
             VALUES (?1, ?2, ?3, ?4, 1, ?5)",
            params![title, description, target_cents, deadline, Utc::now().to_rfc3339()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn insert_funding_progress(
        &self,
        goal_id: i64,
        amount_cents: i64,
        source: Option<&str>,
    ) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO funding_progress (goal_id, amount_cents, source, recorded_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![goal_id, amount_cents, source, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Active goals with their raised totals folded in.
    pub fn get_active_funding_goals(&self) -> Result<Vec<DbFundingGoal>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT g.id, g.title, g.description, g.target_cents, g.deadline, g.active,
                    g.created_at, COALESCE(SUM(p.amount_cents), 0)
             FROM funding_goals g
             LEFT JOIN funding_progress p ON p.goal_id = g.id
             WHERE g.active = 1
             GROUP BY g.id
             ORDER BY g.created_at",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(DbFundingGoal {
                id: row.get(0)?,
                title: row.get(1)?,
                description: row.get(2)?,
                target_cents: row.get(3)?,
                deadline: row.get(4)?,
                active: row.get::<_, i32>(5)? != 0,
                created_at: row.get(6)?,
                raised_cents: row.get(7)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // -------------------------------------------------------------------------
    // Scam-risk regions
    // -------------------------------------------------------------------------

    pub fn upsert_region(
        &self,
        region_code: &str,
        region_name: &str,
        risk_level: &str,
        report_count: i64,
    ) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO scam_risk_regions (region_code, region_name, risk_level, report_count, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(region_code) DO UPDATE SET
                region_name = excluded.region_name,
                risk_level = excluded.risk_level,
                report_count = excluded.report_count,
                updated_at = excluded.updated_at",
            params![region_code, region_name, risk_level, report_count, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn get_regions(&self) -> Result<Vec<DbScamRiskRegion>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT region_code, region_name, risk_level, report_count, updated_at
             FROM scam_risk_regions
             ORDER BY CASE risk_level
                 WHEN 'critical' THEN 0
                 WHEN 'high' THEN 1
                 WHEN 'medium' THEN 2
                 ELSE 3
             END, report_count DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(DbScamRiskRegion {
                region_code: row.get(0)?,
                region_name: row.get(1)?,
                risk_level: row.get(2)?,
                report_count: row.get(3)?,
                updated_at: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn map_snapshot_row(row: &rusqlite::Row) -> rusqlite::Result<DbAnalyticsSnapshot> {
        Ok(DbAnalyticsSnapshot {
            id: row.get(0)?,
            captured_at: row.get(1)?,
            total_calls: row.get(2)?,
            total_minutes_wasted: row.get(3)?,
            scammers_engaged: row.get(4)?,
            reports_received: row.get(5)?,
            top_scam_types: row.get(6)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::test_db;

    #[test]
    fn test_latest_snapshot_wins() {
        let db = test_db();
        assert!(db.get_latest_snapshot().expect("empty").is_none());

        db.insert_analytics_snapshot(10, 120, 8, 3, "[]").expect("first");
        db.insert_analytics_snapshot(25, 400, 19, 7, r#"[{"type":"irs","percentage":40}]"#)
            .expect("second");

        let latest = db.get_latest_snapshot().expect("get").expect("exists");
        assert_eq!(latest.total_calls, 25);
    }

    #[test]
    fn test_funding_goal_totals() {
        let db = test_db();
        let goal = db
            .insert_funding_goal("Server costs", None, 500_000, None)
            .expect("goal");
        db.insert_funding_progress(goal, 100_000, Some("stripe"))
            .expect("p1");
        db.insert_funding_progress(goal, 25_000, Some("paypal"))
            .expect("p2");

        let goals = db.get_active_funding_goals().expect("list");
        assert_eq!(goals.len(), 1);
        assert_eq!(goals[0].raised_cents, 125_000);
        assert_eq!(goals[0].target_cents, 500_000);
    }

    #[test]
    fn test_goal_without_progress_raises_zero() {
        let db = test_db();
        db.insert_funding_goal("New voices", None, 100_000, None)
            .expect("goal");
        let goals = db.get_active_funding_goals().expect("list");
        assert_eq!(goals[0].raised_cents, 0);
    }

    #[test]
    fn test_regions_order_by_risk() {
        let db = test_db();
        db.upsert_region("US-FL", "Florida", "medium", 120).expect("fl");
        db.upsert_region("US-AZ", "Arizona", "critical", 80).expect("az");
        db.upsert_region("US-VT", "Vermont", "low", 5).expect("vt");

        let regions = db.get_regions().expect("list");
        assert_eq!(regions[0].region_code, "US-AZ");
        assert_eq!(regions[2].region_code, "US-VT");
    }

    #[test]
    fn test_region_upsert_updates_in_place() {
        let db = test_db();
        db.upsert_region("US-FL", "Florida", "medium", 120).expect("insert");
        db.upsert_region("US-FL", "Florida", "high", 180).expect("update");

        let regions = db.get_regions().expect("list");
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].risk_level, "high");
        assert_eq!(regions[0].report_count, 180);
    }
}
