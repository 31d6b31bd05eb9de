use axum::{
    extract::{Path, Query},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{AppointmentFilter, BookAppointmentRequest, UpdateAppointmentRequest},
    repo_types::Appointment,
    services,
};
use crate::{auth::Session, error::AppResult, state::AppState, store::Stored};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/appointments", get(list_appointments).post(book_appointment))
        .route("/appointments/:id", patch(update_appointment))
}

#[instrument(skip(session))]
pub async fn list_appointments(
    Session(session): Session,
    Query(filter): Query<AppointmentFilter>,
) -> AppResult<Json<Vec<Stored<Appointment>>>> {
    Ok(Json(services::list(&session.store, filter.patient_id).await?))
}

#[instrument(skip(session))]
pub async fn book_appointment(
    Session(session): Session,
    Json(payload): Json<BookAppointmentRequest>,
) -> AppResult<(StatusCode, Json<Stored<Appointment>>)> {
    let booked = services::book(&session.store, payload).await?;
    Ok((StatusCode::CREATED, Json(booked)))
}

#[instrument(skip(session))]
pub async fn update_appointment(
    Session(session): Session,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAppointmentRequest>,
) -> AppResult<Json<Stored<Appointment>>> {
    Ok(Json(services::set_status(&session.store, id, payload.status).await?))
}
