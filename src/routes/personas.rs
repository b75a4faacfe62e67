use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

use crate::auth::require_admin;
use crate::db::personas::PersonaInput;
use crate::db::DbPersona;
use crate::error::ApiError;
use crate::state::AppState;

use super::with_db;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaBody {
    #[serde(default)]
    pub name: String,
    pub age: Option<i64>,
    pub voice_type: Option<String>,
    pub personality: Option<String>,
    pub backstory: Option<String>,
    pub avatar_url: Option<String>,
    pub specialties: Option<Vec<String>>,
    pub sample_responses: Option<Vec<String>>,
    pub active: Option<bool>,
}

impl PersonaBody {
    fn into_input(self) -> Result<(PersonaInput, Option<bool>), ApiError> {
        let specialties = self
            .specialties
            .map(|v| serde_json::to_string(&v))
            .transpose()
            .map_err(|e| ApiError::BadRequest(format!("Bad specialties: {e}")))?;
        let sample_responses = self
            .sample_responses
            .map(|v| serde_json::to_string(&v))
            .transpose()
            .map_err(|e| ApiError::BadRequest(format!("Bad sample responses: {e}")))?;

        Ok((
            PersonaInput {
                name: self.name,
                age: self.age,
                voice_type: self.voice_type,
                personality: self.personality,
                backstory: self.backstory,
                avatar_url: self.avatar_url,
                specialties,
                sample_responses,
            },
            self.active,
        ))
    }
}

pub async fn list_personas(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<DbPersona>>, ApiError> {
    let personas = with_db(&state, |db| Ok(db.get_active_personas()?))?;
    Ok(Json(personas))
}

pub async fn get_persona(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<DbPersona>, ApiError> {
    let persona = with_db(&state, |db| Ok(db.get_persona(id)?))?
        .ok_or(ApiError::NotFound("Persona"))?;
    Ok(Json(persona))
}

pub async fn create_persona(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<PersonaBody>,
) -> Result<Json<DbPersona>, ApiError> {
    require_admin(&state, &headers)?;
    if body.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Persona name is required".to_string()));
    }

    let (input, _) = body.into_input()?;
    let persona = with_db(&state, |db| Ok(db.insert_persona(&input)?))?;
    Ok(Json(persona))
}

pub async fn update_persona(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<PersonaBody>,
) -> Result<Json<DbPersona>, ApiError> {
    require_admin(&state, &headers)?;

    let (input, active) = body.into_input()?;
    let persona = with_db(&state, |db| {
        if !db.update_persona(id, &input, active)? {
            return Err(ApiError::NotFound("Persona"));
        }
        Ok(db.get_persona(id)?.ok_or(ApiError::NotFound("Persona"))?)
    })?;
    Ok(Json(persona))
}
