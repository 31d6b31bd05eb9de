use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, PrimitiveDateTime};
use uuid::Uuid;

use crate::{
    policy::RecordKind,
    store::{Collection, OwnedRecord},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    #[default]
    Scheduled,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub patient_id: Uuid,
    pub patient_name: String,
    /// Clinic-local slot.
    #[serde(with = "crate::dates::slot")]
    pub date: PrimitiveDateTime,
    #[serde(default)]
    pub status: AppointmentStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl OwnedRecord for Appointment {
    const KIND: RecordKind = RecordKind::Appointment;
    const COLLECTION: Collection = Collection::Appointments;

    fn patient_id(&self) -> Uuid {
        self.patient_id
    }
}
