use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{
        CreatePaymentRequest, MonthlyIncome, PaymentFilter, PaymentList, PaymentSummary, ReceiptIssued,
        SummaryFilter, UpdatePaymentRequest,
    },
    repo_types::Payment,
    services,
};
use crate::{auth::Session, dates, error::AppResult, state::AppState, store::Stored};

// --- public routers ---

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/payments", get(list_payments))
        .route("/payments/summary", get(get_summary))
        .route("/payments/income", get(get_income))
        .route("/payments/:id/receipt", get(get_receipt))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/payments", post(create_payment))
        .route("/payments/:id", patch(update_status))
        .route("/payments/:id/receipt", post(issue_receipt))
}

// --- handlers ---

#[instrument(skip(session))]
pub async fn list_payments(
    Session(session): Session,
    Query(filter): Query<PaymentFilter>,
) -> AppResult<Json<PaymentList>> {
    Ok(Json(services::list(&session.store, &filter).await?))
}

#[instrument(skip(state, session, payload))]
pub async fn create_payment(
    State(state): State<AppState>,
    Session(session): Session,
    Json(payload): Json<CreatePaymentRequest>,
) -> AppResult<(StatusCode, Json<Stored<Payment>>)> {
    let today = dates::today(state.config.clinic.utc_offset());
    let created = services::create(&session.store, payload, today).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[instrument(skip(session))]
pub async fn update_status(
    Session(session): Session,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePaymentRequest>,
) -> AppResult<Json<Stored<Payment>>> {
    Ok(Json(services::set_status(&session.store, id, payload.status).await?))
}

#[instrument(skip(session))]
pub async fn get_summary(
    Session(session): Session,
    Query(filter): Query<SummaryFilter>,
) -> AppResult<Json<PaymentSummary>> {
    Ok(Json(services::summary(&session.store, filter.patient_id).await?))
}

#[instrument(skip(session))]
pub async fn get_income(Session(session): Session) -> AppResult<Json<Vec<MonthlyIncome>>> {
    Ok(Json(services::monthly_income(&session.store).await?))
}

#[instrument(skip(state, session))]
pub async fn get_receipt(
    State(state): State<AppState>,
    Session(session): Session,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let text = services::render_receipt(&session.store, &state.config.clinic.name, id).await?;
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], text))
}

#[instrument(skip(state, session))]
pub async fn issue_receipt(
    State(state): State<AppState>,
    Session(session): Session,
    Path(id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<ReceiptIssued>)> {
    let clinic = &state.config.clinic;
    let issued = services::issue_receipt(
        &session.store,
        state.receipts.as_ref(),
        &clinic.name,
        id,
        clinic.receipt_url_ttl_secs,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(issued)))
}
