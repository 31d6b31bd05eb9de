use axum::{
    extract::{Path, Query},
    routing::{get, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{ApprovalRequest, NextSessionRequest, PatientSearch},
    model::ProfileView,
    services,
};
use crate::{auth::Session, error::AppResult, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/patients", get(list_patients))
        .route("/patients/:id", get(get_patient))
        .route("/patients/:id/approval", put(set_approval))
        .route("/patients/:id/next-session", put(set_next_session))
}

#[instrument(skip(session))]
pub async fn list_patients(
    Session(session): Session,
    Query(q): Query<PatientSearch>,
) -> AppResult<Json<Vec<ProfileView>>> {
    let patients = services::directory(&session.store, q.search.as_deref()).await?;
    Ok(Json(patients.iter().map(ProfileView::from).collect()))
}

/// A patient may fetch their own card; therapists any patient's.
#[instrument(skip(session))]
pub async fn get_patient(Session(session): Session, Path(id): Path<Uuid>) -> AppResult<Json<ProfileView>> {
    let profile = session.store.patient(id).await?;
    Ok(Json(ProfileView::from(&profile)))
}

#[instrument(skip(session))]
pub async fn set_approval(
    Session(session): Session,
    Path(id): Path<Uuid>,
    Json(payload): Json<ApprovalRequest>,
) -> AppResult<Json<ProfileView>> {
    let profile = services::set_approval(&session.store, id, payload.approved).await?;
    Ok(Json(ProfileView::from(&profile)))
}

#[instrument(skip(session))]
pub async fn set_next_session(
    Session(session): Session,
    Path(id): Path<Uuid>,
    Json(payload): Json<NextSessionRequest>,
) -> AppResult<Json<ProfileView>> {
    let profile = services::schedule_next_session(&session.store, id, payload).await?;
    Ok(Json(ProfileView::from(&profile)))
}
