use chrono::Utc;
use rusqlite::params;

use super::*;

const USER_COLUMNS: &str =
    "id, email, password_hash, display_name, role, verified, created_at";

impl AppDb {
    // =========================================================================
    // Users, sessions, one-time tokens
    // =========================================================================

    /// Create a user. Email is stored lowercased; the UNIQUE constraint
    /// surfaces duplicates as an error.
    pub fn insert_user(
        &self,
        email: &str,
        password_hash: &str,
        display_name: Option<&str>,
    ) -> Result<DbUser, DbError> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO users (email, password_hash, display_name, role, verified, created_at)
             VALUES (LOWER(?1), ?2, ?3, 'user', 0, ?4)",
            params![email, password_hash, display_name, now],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_user(id)?
            .ok_or(DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    pub fn get_user(&self, id: i64) -> Result<Option<DbUser>, DbError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))?;
        let mut rows = stmt.query_map(params![id], Self::map_user_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<DbUser>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = LOWER(?1)"
        ))?;
        let mut rows = stmt.query_map(params![email], Self::map_user_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    pub fn mark_user_verified(&self, user_id: i64) -> Result<(), DbError> {
        self.conn.execute(
            "UPDATE users SET verified = 1 WHERE id = ?1",
            params![user_id],
        )?;
        Ok(())
    }

    pub fn set_user_password(&self, user_id: i64, password_hash: &str) -> Result<(), DbError> {
        self.conn.execute(
            "UPDATE users SET password_hash = ?2 WHERE id = ?1",
            params![user_id, password_hash],
        )?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Sessions
    // -------------------------------------------------------------------------

    pub fn insert_session(&self, session: &DbSession) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO sessions (id, user_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                session.id,
                session.user_id,
                session.created_at,
                session.expires_at
            ],
        )?;
        Ok(())
    }

    /// Resolve a session cookie to its user. Expired sessions are treated as
    /// absent and removed on sight.
    pub fn get_session_user(&self, session_id: &str) -> Result<Option<DbUser>, DbError> {
        let now = Utc::now().to_rfc3339();
        let user_id: Option<i64> = self
            .conn
            .query_row(
                "SELECT user_id FROM sessions WHERE id = ?1 AND expires_at > ?2",
                params![session_id, now],
                |row| row.get(0),
            )
            .ok();

        match user_id {
            Some(uid) => self.get_user(uid),
            None => {
                self.conn.execute(
                    "DELETE FROM sessions WHERE id = ?1 AND expires_at <= ?2",
                    params![session_id, now],
                )?;
                Ok(None)
            }
        }
    }

    pub fn delete_session(&self, session_id: &str) -> Result<(), DbError> {
        self.conn.execute(
            "DELETE FROM sessions WHERE id = ?1",
            params![session_id],
        )?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // One-time tokens (password reset + email verification)
    // -------------------------------------------------------------------------

    pub fn insert_reset_token(
        &self,
        token_hash: &str,
        user_id: i64,
        expires_at: &str,
    ) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO password_reset_tokens (token_hash, user_id, expires_at, used)
             VALUES (?1, ?2, ?3, 0)",
            params![token_hash, user_id, expires_at],
        )?;
        Ok(())
    }

    pub fn insert_verification_token(
        &self,
        token_hash: &str,
        user_id: i64,
        expires_at: &str,
    ) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO verification_tokens (token_hash, user_id, expires_at, used)
             VALUES (?1, ?2, ?3, 0)",
            params![token_hash, user_id, expires_at],
        )?;
        Ok(())
    }

    /// Consume a reset token: marks it used and returns the user id, or None
    /// when the digest is unknown, expired, or already spent.
    pub fn consume_reset_token(&self, token_hash: &str) -> Result<Option<i64>, DbError> {
        self.consume_token("password_reset_tokens", token_hash)
    }

    /// Consume a verification token, same one-shot semantics as reset tokens.
    pub fn consume_verification_token(&self, token_hash: &str) -> Result<Option<i64>, DbError> {
        self.consume_token("verification_tokens", token_hash)
    }

    fn consume_token(&self, table: &str, token_hash: &str) -> Result<Option<i64>, DbError> {
        let now = Utc::now().to_rfc3339();
        let user_id: Option<i64> = self
            .conn
            .query_row(
                &format!(
                    "SELECT user_id FROM {table}
                     WHERE token_hash = ?1 AND used = 0 AND expires_at > ?2"
                ),
                params![token_hash, now],
                |row| row.get(0),
            )
            .ok();

        if user_id.is_some() {
            self.conn.execute(
                &format!("UPDATE {table} SET used = 1 WHERE token_hash = ?1"),
                params![token_hash],
            )?;
        }
        Ok(user_id)
    }

    fn map_user_row(row: &rusqlite::Row) -> rusqlite::Result<DbUser> {
        Ok(DbUser {
            id: row.get(0)?,
            email: row.get(1)?,
            password_hash: row.get(2)?,
            display_name: row.get(3)?,
            role: row.get(4)?,
            verified: row.get::<_, i32>(5)? != 0,
            created_at: row.get(6)?,
        })
    }
}
