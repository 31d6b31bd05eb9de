use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{AssignExerciseRequest, DailyProgress, ExerciseItem, LogFilter, MarkDoneResponse, PatientFilter},
    repo_types::{Exercise, ExerciseLog},
    services,
};
use crate::{
    auth::Session,
    dates,
    error::AppResult,
    state::AppState,
    store::{self, Stored},
};

// --- public routers ---

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/exercises", get(list_exercises))
        .route("/exercises/progress", get(get_progress))
        .route("/exercise-logs", get(list_logs))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/exercises", post(assign_exercise))
        .route("/exercises/:id", delete(remove_exercise))
        .route("/exercises/:id/done", post(mark_done))
}

// --- handlers ---

#[instrument(skip(session))]
pub async fn list_exercises(
    Session(session): Session,
    Query(filter): Query<PatientFilter>,
) -> AppResult<Json<Vec<ExerciseItem>>> {
    let exercises = session
        .store
        .list::<Exercise>(filter.patient_id, store::Query::new())
        .await?;
    Ok(Json(exercises.into_iter().map(services::to_item).collect()))
}

#[instrument(skip(session, payload))]
pub async fn assign_exercise(
    Session(session): Session,
    Json(payload): Json<AssignExerciseRequest>,
) -> AppResult<(StatusCode, Json<ExerciseItem>)> {
    let created = services::assign(&session.store, payload).await?;
    Ok((StatusCode::CREATED, Json(services::to_item(created))))
}

#[instrument(skip(session))]
pub async fn remove_exercise(Session(session): Session, Path(id): Path<Uuid>) -> AppResult<StatusCode> {
    session.store.delete::<Exercise>(id).await?;
    info!(exercise_id = %id, therapist_id = %session.identity.id, "exercise removed");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, session))]
pub async fn mark_done(
    State(state): State<AppState>,
    Session(session): Session,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MarkDoneResponse>> {
    let today = dates::today(state.config.clinic.utc_offset());
    let (log, already_done) = services::mark_done(&session.store, id, today).await?;
    let progress = services::daily_progress(&session.store, log.record.patient_id, today).await?;
    Ok(Json(MarkDoneResponse {
        log,
        already_done,
        progress,
    }))
}

#[instrument(skip(session))]
pub async fn list_logs(
    Session(session): Session,
    Query(filter): Query<LogFilter>,
) -> AppResult<Json<Vec<Stored<ExerciseLog>>>> {
    let logs = services::logs_on(&session.store, filter.patient_id, filter.date).await?;
    Ok(Json(logs))
}

/// Today's completion for a patient. Therapists pass `patient_id`.
#[instrument(skip(state, session))]
pub async fn get_progress(
    State(state): State<AppState>,
    Session(session): Session,
    Query(filter): Query<PatientFilter>,
) -> AppResult<Json<DailyProgress>> {
    let patient_id = services::progress_subject(session.store.actor(), filter.patient_id)?;
    let today = dates::today(state.config.clinic.utc_offset());
    Ok(Json(services::daily_progress(&session.store, patient_id, today).await?))
}
