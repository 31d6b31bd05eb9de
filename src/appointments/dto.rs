use serde::Deserialize;
use uuid::Uuid;

use super::repo_types::AppointmentStatus;

/// `patient_id` defaults to the caller, so patients can leave it out.
#[derive(Debug, Deserialize)]
pub struct BookAppointmentRequest {
    #[serde(default)]
    pub patient_id: Option<Uuid>,
    /// `YYYY-MM-DDTHH:MM`
    pub date: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub status: AppointmentStatus,
}

#[derive(Debug, Deserialize)]
pub struct AppointmentFilter {
    #[serde(default)]
    pub patient_id: Option<Uuid>,
}
