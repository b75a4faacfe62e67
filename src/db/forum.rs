use chrono::Utc;
use rusqlite::params;

use super::*;

impl AppDb {
    // =========================================================================
    // Community forum
    // =========================================================================

    pub fn insert_forum_question(
        &self,
        user_id: Option<i64>,
        author_name: &str,
        title: &str,
        body: &str,
    ) -> Result<DbForumQuestion, DbError> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO forum_questions (user_id, author_name, title, body, answer_count, created_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5)",
            params![user_id, author_name, title, body, now],
        )?;
        let id = self.conn.last_insert_rowid();
        Ok(DbForumQuestion {
            id,
            user_id,
            author_name: author_name.to_string(),
            title: title.to_string(),
            body: body.to_string(),
            answer_count: 0,
            created_at: now,
        })
    }

    pub fn get_forum_questions(&self, limit: i64) -> Result<Vec<DbForumQuestion>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, author_name, title, body, answer_count, created_at
             FROM forum_questions ORDER BY created_at DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], Self::map_question_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn get_forum_question(&self, id: i64) -> Result<Option<DbForumQuestion>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, author_name, title, body, answer_count, created_at
             FROM forum_questions WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id], Self::map_question_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Insert an answer and bump the parent's answer_count in one transaction.
    pub fn insert_forum_answer(
        &self,
        question_id: i64,
        user_id: Option<i64>,
        author_name: &str,
        body: &str,
    ) -> Result<DbForumAnswer, String> {
        let now = Utc::now().to_rfc3339();
        self.with_transaction(|db| {
            let exists: bool = db
                .conn
                .query_row(
                    "SELECT EXISTS(SELECT 1 FROM forum_questions WHERE id = ?1)",
                    params![question_id],
                    |row| row.get(0),
                )
                .map_err(|e| e.to_string())?;
            if !exists {
                return Err(format!("Question {} not found", question_id));
            }

            db.conn
                .execute(
                    "INSERT INTO forum_answers (question_id, user_id, author_name, body, accepted, created_at)
                     VALUES (?1, ?2, ?3, ?4, 0, ?5)",
                    params![question_id, user_id, author_name, body, now],
                )
                .map_err(|e| e.to_string())?;
            let id = db.conn.last_insert_rowid();

            db.conn
                .execute(
                    "UPDATE forum_questions SET answer_count = answer_count + 1 WHERE id = ?1",
                    params![question_id],
                )
                .map_err(|e| e.to_string())?;

            Ok(DbForumAnswer {
                id,
                question_id,
                user_id,
                author_name: author_name.to_string(),
                body: body.to_string(),
                accepted: false,
                created_at: now.clone(),
            })
        })
    }

    pub fn get_forum_answers(&self, question_id: i64) -> Result<Vec<DbForumAnswer>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, question_id, user_id, author_name, body, accepted, created_at
             FROM forum_answers WHERE question_id = ?1
             ORDER BY accepted DESC, created_at",
        )?;
        let rows = stmt.query_map(params![question_id], Self::map_answer_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn get_forum_answer(&self, id: i64) -> Result<Option<DbForumAnswer>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, question_id, user_id, author_name, body, accepted, created_at
             FROM forum_answers WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id], Self::map_answer_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Accept an answer. Only one answer per question holds the flag.
    pub fn accept_forum_answer(&self, answer_id: i64) -> Result<bool, String> {
        self.with_transaction(|db| {
            let question_id: Option<i64> = db
                .conn
                .query_row(
                    "SELECT question_id FROM forum_answers WHERE id = ?1",
                    params![answer_id],
                    |row| row.get(0),
                )
                .ok();
            let Some(question_id) = question_id else {
                return Ok(false);
            };

            db.conn
                .execute(
                    "UPDATE forum_answers SET accepted = 0 WHERE question_id = ?1",
                    params![question_id],
                )
                .map_err(|e| e.to_string())?;
            db.conn
                .execute(
                    "UPDATE forum_answers SET accepted = 1 WHERE id = ?1",
                    params![answer_id],
                )
                .map_err(|e| e.to_string())?;
            Ok(true)
        })
    }

    fn map_question_row(row: &rusqlite::Row) -> rusqlite::Result<DbForumQuestion> {
        Ok(DbForumQuestion {
            id: row.get(0)?,
            user_id: row.get(1)?,
            author_name: row.get(2)?,
            title: row.get(3)?,
            body: row.get(4)?,
            answer_count: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    fn map_answer_row(row: &rusqlite::Row) -> rusqlite::Result<DbForumAnswer> {
        Ok(DbForumAnswer {
            id: row.get(0)?,
            question_id: row.get(1)?,
            user_id: row.get(2)?,
            author_name: row.get(3)?,
            body: row.get(4)?,
            accepted: row.get::<_, i32>(5)? != 0,
            created_at: row.get(6)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::test_db;

    #[test]
    fn test_answer_bumps_count() {
        let db = test_db();
        let q = db
            .insert_forum_question(None, "caller_victim_22", "Is this IRS call real?", "They asked for gift cards")
            .expect("question");
        assert_eq!(q.answer_count, 0);

        db.insert_forum_answer(q.id, None, "helper", "No. The IRS never calls.")
            .expect("answer");

        let fetched = db.get_forum_question(q.id).expect("get").expect("exists");
        assert_eq!(fetched.answer_count, 1);
    }

    #[test]
    fn test_answer_to_missing_question_fails() {
        let db = test_db();
        let err = db
            .insert_forum_answer(999, None, "helper", "hello?")
            .expect_err("should fail");
        assert!(err.contains("not found"));

        // Nothing half-written
        let count: i64 = db
            .conn_ref()
            .query_row("SELECT COUNT(*) FROM forum_answers", [], |row| row.get(0))
            .expect("count");
        assert_eq!(count, 0);
    }

    #[test]
    fn test_accept_is_exclusive() {
        let db = test_db();
        let q = db
            .insert_forum_question(None, "asker", "Gift card demand?", "...")
            .expect("question");
        let a1 = db
            .insert_forum_answer(q.id, None, "helper1", "Scam.")
            .expect("a1");
        let a2 = db
            .insert_forum_answer(q.id, None, "helper2", "Definitely a scam.")
            .expect("a2");

        assert!(db.accept_forum_answer(a1.id).expect("accept a1"));
        assert!(db.accept_forum_answer(a2.id).expect("accept a2"));

        let answers = db.get_forum_answers(q.id).expect("list");
        let accepted: Vec<_> = answers.iter().filter(|a| a.accepted).collect();
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].id, a2.id);
        // Accepted answer sorts first
        assert_eq!(answers[0].id, a2.id);
    }

    #[test]
    fn test_accept_unknown_answer() {
        let db = test_db();
        assert!(!db.accept_forum_answer(404).expect("accept"));
    }
}
