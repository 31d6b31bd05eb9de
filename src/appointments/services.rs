use serde_json::{json, Map};
use time::{OffsetDateTime, PrimitiveDateTime};
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::BookAppointmentRequest,
    repo_types::{Appointment, AppointmentStatus},
};
use crate::{
    dates::SLOT_FORMAT,
    error::{AppError, AppResult},
    store::{Direction, GuardedStore, Query, Stored},
};

fn parse_slot(raw: &str) -> AppResult<PrimitiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AppError::validation("Appointment date is required"));
    }
    PrimitiveDateTime::parse(raw, SLOT_FORMAT).map_err(|e| {
        warn!(error = %e, raw, "bad appointment slot");
        AppError::validation("Appointment date must look like YYYY-MM-DDTHH:MM")
    })
}

pub async fn book(store: &GuardedStore, req: BookAppointmentRequest) -> AppResult<Stored<Appointment>> {
    let date = parse_slot(&req.date)?;
    let patient_id = req.patient_id.unwrap_or(store.actor().id);
    let patient = store.patient(patient_id).await?;

    let appointment = Appointment {
        patient_id: patient.id,
        patient_name: patient.full_name,
        date,
        status: AppointmentStatus::Scheduled,
        timestamp: OffsetDateTime::now_utc(),
    };
    let stored = store.create(&appointment).await?;
    info!(appointment_id = %stored.id, %patient_id, "appointment booked");
    Ok(stored)
}

/// Soonest first.
pub async fn list(store: &GuardedStore, patient_id: Option<Uuid>) -> AppResult<Vec<Stored<Appointment>>> {
    let query = Query::new().order_by("date", Direction::Asc);
    store.list::<Appointment>(patient_id, query).await
}

pub async fn set_status(store: &GuardedStore, id: Uuid, status: AppointmentStatus) -> AppResult<Stored<Appointment>> {
    let mut patch = Map::new();
    patch.insert("status".into(), json!(status));
    let updated = store.update::<Appointment>(id, patch).await?;
    info!(appointment_id = %id, status = status.as_str(), "appointment status changed");
    Ok(updated)
}
