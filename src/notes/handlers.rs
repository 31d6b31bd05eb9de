use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use time::{Date, OffsetDateTime};
use tracing::{info, instrument};
use uuid::Uuid;

use super::repo_types::Note;
use crate::{
    auth::Session,
    dates,
    error::{AppError, AppResult},
    state::AppState,
    store::{self, Direction, GuardedStore, Stored},
};

pub fn routes() -> Router<AppState> {
    Router::new().route("/notes", get(list_notes).post(add_note))
}

#[derive(Debug, Deserialize)]
pub struct NoteFilter {
    #[serde(default)]
    pub patient_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct AddNoteRequest {
    pub patient_id: Uuid,
    pub note: String,
    #[serde(default, with = "crate::dates::date::option")]
    pub date: Option<Date>,
}

pub async fn add(store: &GuardedStore, req: AddNoteRequest, today: Date) -> AppResult<Stored<Note>> {
    let text = req.note.trim();
    if text.is_empty() {
        return Err(AppError::validation("Note text is required"));
    }
    let patient = store.patient(req.patient_id).await?;
    let note = Note {
        patient_id: patient.id,
        patient_name: patient.full_name,
        note: text.to_string(),
        date: req.date.unwrap_or(today),
        timestamp: OffsetDateTime::now_utc(),
    };
    let stored = store.create(&note).await?;
    info!(note_id = %stored.id, patient_id = %note.patient_id, "clinical note added");
    Ok(stored)
}

#[instrument(skip(session))]
pub async fn list_notes(
    Session(session): Session,
    Query(filter): Query<NoteFilter>,
) -> AppResult<Json<Vec<Stored<Note>>>> {
    let query = store::Query::new().order_by("date", Direction::Desc);
    Ok(Json(session.store.list::<Note>(filter.patient_id, query).await?))
}

#[instrument(skip(state, session, payload))]
pub async fn add_note(
    State(state): State<AppState>,
    Session(session): Session,
    Json(payload): Json<AddNoteRequest>,
) -> AppResult<(StatusCode, Json<Stored<Note>>)> {
    let today = dates::today(state.config.clinic.utc_offset());
    let created = add(&session.store, payload, today).await?;
    Ok((StatusCode::CREATED, Json(created)))
}
