use chrono::Utc;
use rusqlite::params;

use super::*;

const CALL_COLUMNS: &str = "c.id, c.persona_id, c.caller_number, c.scam_type, c.status,
     c.started_at, c.ended_at, c.duration_seconds, c.time_wasted_seconds, c.transcript,
     p.name";

impl AppDb {
    // =========================================================================
    // Calls & recordings
    // =========================================================================

    /// Open a call. When a persona is given, the assignment row is written in
    /// the same transaction.
    pub fn insert_call(
        &self,
        persona_id: Option<i64>,
        caller_number: &str,
        scam_type: Option<&str>,
    ) -> Result<DbCall, DbError> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO calls (persona_id, caller_number, scam_type, status, started_at)
             VALUES (?1, ?2, ?3, 'active', ?4)",
            params![persona_id, caller_number, scam_type, now],
        )?;
        let id = self.conn.last_insert_rowid();
        if let Some(pid) = persona_id {
            self.assign_persona(pid, id)?;
        }
        self.get_call(id)?
            .ok_or(DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    pub fn get_call(&self, id: i64) -> Result<Option<DbCall>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CALL_COLUMNS} FROM calls c
             LEFT JOIN personas p ON p.id = c.persona_id
             WHERE c.id = ?1"
        ))?;
        let mut rows = stmt.query_map(params![id], Self::map_call_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Calls currently in progress, for the live dashboard.
    pub fn get_active_calls(&self) -> Result<Vec<DbCall>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CALL_COLUMNS} FROM calls c
             LEFT JOIN personas p ON p.id = c.persona_id
             WHERE c.status = 'active'
             ORDER BY c.started_at DESC"
        ))?;
        let rows = stmt.query_map([], Self::map_call_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn get_recent_calls(&self, limit: i64) -> Result<Vec<DbCall>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CALL_COLUMNS} FROM calls c
             LEFT JOIN personas p ON p.id = c.persona_id
             ORDER BY c.started_at DESC LIMIT ?1"
        ))?;
        let rows = stmt.query_map(params![limit], Self::map_call_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Close out a call. Duration is computed from started_at when the caller
    /// doesn't supply one. Returns false when the call does not exist or is
    /// already closed.
    pub fn complete_call(
        &self,
        id: i64,
        status: &str,
        duration_seconds: Option<i64>,
        transcript: Option<&str>,
    ) -> Result<bool, DbError> {
        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE calls SET
                status = ?2,
                ended_at = ?3,
                duration_seconds = COALESCE(?4,
                    CAST((julianday(?3) - julianday(started_at)) * 86400 AS INTEGER)),
                time_wasted_seconds = COALESCE(?4,
                    CAST((julianday(?3) - julianday(started_at)) * 86400 AS INTEGER)),
                transcript = COALESCE(?5, transcript)
             WHERE id = ?1 AND status = 'active'",
            params![id, status, now, duration_seconds, transcript],
        )?;
        Ok(changed > 0)
    }

    pub fn insert_recording(
        &self,
        call_id: i64,
        audio_url: &str,
        duration_seconds: Option<i64>,
        consent: bool,
    ) -> Result<DbCallRecording, DbError> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO call_recordings (call_id, audio_url, duration_seconds, consent, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![call_id, audio_url, duration_seconds, consent as i32, now],
        )?;
        let id = self.conn.last_insert_rowid();
        Ok(DbCallRecording {
            id,
            call_id,
            audio_url: audio_url.to_string(),
            duration_seconds,
            consent,
            created_at: now,
        })
    }

    pub fn get_recordings_for_call(&self, call_id: i64) -> Result<Vec<DbCallRecording>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, call_id, audio_url, duration_seconds, consent, created_at
             FROM call_recordings WHERE call_id = ?1 ORDER BY created_at",
        )?;
        let rows = stmt.query_map(params![call_id], |row| {
            Ok(DbCallRecording {
                id: row.get(0)?,
                call_id: row.get(1)?,
                audio_url: row.get(2)?,
                duration_seconds: row.get(3)?,
                consent: row.get::<_, i32>(4)? != 0,
                created_at: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Delete calls that ended before the cutoff. Recordings and assignments
    /// go first so FK constraints hold.
    pub fn purge_calls_before(&self, cutoff: &str) -> Result<usize, DbError> {
        self.conn.execute(
            "DELETE FROM call_recordings WHERE call_id IN
                (SELECT id FROM calls WHERE status != 'active' AND started_at < ?1)",
            params![cutoff],
        )?;
        self.conn.execute(
            "DELETE FROM persona_assignments WHERE call_id IN
                (SELECT id FROM calls WHERE status != 'active' AND started_at < ?1)",
            params![cutoff],
        )?;
        let purged = self.conn.execute(
            "DELETE FROM calls WHERE status != 'active' AND started_at < ?1",
            params![cutoff],
        )?;
        Ok(purged)
    }

    fn map_call_row(row: &rusqlite::Row) -> rusqlite::Result<DbCall> {
        Ok(DbCall {
            id: row.get(0)?,
            persona_id: row.get(1)?,
            caller_number: row.get(2)?,
            scam_type: row.get(3)?,
            status: row.get(4)?,
            started_at: row.get(5)?,
            ended_at: row.get(6)?,
            duration_seconds: row.get(7)?,
            time_wasted_seconds: row.get(8)?,
            transcript: row.get(9)?,
            persona_name: row.get(10)?,
        })
    }
}
