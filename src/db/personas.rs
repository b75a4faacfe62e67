use chrono::Utc;
use rusqlite::params;

use super::*;

/// Fields accepted when creating or updating a persona.
#[derive(Debug, Clone, Default)]
pub struct PersonaInput {
    pub name: String,
    pub age: Option<i64>,
    pub voice_type: Option<String>,
    pub personality: Option<String>,
    pub backstory: Option<String>,
    pub avatar_url: Option<String>,
    pub specialties: Option<String>,
    pub sample_responses: Option<String>,
}

impl AppDb {
    // =========================================================================
    // Personas
    // =========================================================================

    pub fn insert_persona(&self, input: &PersonaInput) -> Result<DbPersona, DbError> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO personas (
                name, age, voice_type, personality, backstory, avatar_url,
                specialties, sample_responses, active, created_at, updated_at
             ) VALUES (?1, ?2, COALESCE(?3, 'elderly_female'), ?4, ?5, ?6,
                       COALESCE(?7, '[]'), COALESCE(?8, '[]'), 1, ?9, ?9)",
            params![
                input.name,
                input.age,
                input.voice_type,
                input.personality,
                input.backstory,
                input.avatar_url,
                input.specialties,
                input.sample_responses,
                now,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_persona(id)?
            .ok_or(DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    pub fn get_persona(&self, id: i64) -> Result<Option<DbPersona>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, age, voice_type, personality, backstory, avatar_url,
                    specialties, sample_responses, active, created_at, updated_at
             FROM personas WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id], Self::map_persona_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Active personas, newest first. The marketing site's persona gallery.
    pub fn get_active_personas(&self) -> Result<Vec<DbPersona>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, age, voice_type, personality, backstory, avatar_url,
                    specialties, sample_responses, active, created_at, updated_at
             FROM personas WHERE active = 1 ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map([], Self::map_persona_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Patch-style update: only provided fields are written.
    /// Returns false when the persona does not exist.
    pub fn update_persona(
        &self,
        id: i64,
        input: &PersonaInput,
        active: Option<bool>,
    ) -> Result<bool, DbError> {
        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE personas SET
                name = CASE WHEN ?2 != '' THEN ?2 ELSE name END,
                age = COALESCE(?3, age),
                voice_type = COALESCE(?4, voice_type),
                personality = COALESCE(?5, personality),
                backstory = COALESCE(?6, backstory),
                avatar_url = COALESCE(?7, avatar_url),
                specialties = COALESCE(?8, specialties),
                sample_responses = COALESCE(?9, sample_responses),
                active = COALESCE(?10, active),
                updated_at = ?11
             WHERE id = ?1",
            params![
                id,
                input.name,
                input.age,
                input.voice_type,
                input.personality,
                input.backstory,
                input.avatar_url,
                input.specialties,
                input.sample_responses,
                active.map(|a| a as i32),
                now,
            ],
        )?;
        Ok(changed > 0)
    }

    /// Record a persona taking a call.
    pub fn assign_persona(&self, persona_id: i64, call_id: i64) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO persona_assignments (persona_id, call_id, assigned_at)
             VALUES (?1, ?2, ?3)",
            params![persona_id, call_id, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn map_persona_row(row: &rusqlite::Row) -> rusqlite::Result<DbPersona> {
        Ok(DbPersona {
            id: row.get(0)?,
            name: row.get(1)?,
            age: row.get(2)?,
            voice_type: row.get(3)?,
            personality: row.get(4)?,
            backstory: row.get(5)?,
            avatar_url: row.get(6)?,
            specialties: row.get(7)?,
            sample_responses: row.get(8)?,
            active: row.get::<_, i32>(9)? != 0,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::test_db;
    use super::*;

    fn sample_persona(name: &str) -> PersonaInput {
        PersonaInput {
            name: name.to_string(),
            age: Some(78),
            personality: Some("rambling, endlessly polite".to_string()),
            specialties: Some(r#"["gift cards","tech support"]"#.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_insert_and_get_persona() {
        let db = test_db();
        let persona = db.insert_persona(&sample_persona("Edna")).expect("insert");
        assert_eq!(persona.name, "Edna");
        assert_eq!(persona.voice_type, "elderly_female");
        assert!(persona.active);

        let fetched = db.get_persona(persona.id).expect("get").expect("exists");
        assert_eq!(fetched.specialties, r#"["gift cards","tech support"]"#);
    }

    #[test]
    fn test_active_personas_excludes_deactivated() {
        let db = test_db();
        let keep = db.insert_persona(&sample_persona("Edna")).expect("insert");
        let drop = db.insert_persona(&sample_persona("Albert")).expect("insert");

        db.update_persona(drop.id, &PersonaInput::default(), Some(false))
            .expect("deactivate");

        let active = db.get_active_personas().expect("list");
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, keep.id);
    }

    #[test]
    fn test_update_persona_partial() {
        let db = test_db();
        let persona = db.insert_persona(&sample_persona("Edna")).expect("insert");

        let patch = PersonaInput {
            backstory: Some("Retired switchboard operator".to_string()),
            ..Default::default()
        };
        assert!(db.update_persona(persona.id, &patch, None).expect("update"));

        let fetched = db.get_persona(persona.id).expect("get").expect("exists");
        assert_eq!(fetched.name, "Edna", "empty name should not overwrite");
        assert_eq!(
            fetched.backstory.as_deref(),
            Some("Retired switchboard operator")
        );
    }

    #[test]
    fn test_update_missing_persona_returns_false() {
        let db = test_db();
        assert!(!db
            .update_persona(999, &PersonaInput::default(), Some(false))
            .expect("update"));
    }
}
