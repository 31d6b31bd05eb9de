use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::{
    policy::RecordKind,
    store::{Collection, OwnedRecord},
};

fn default_days() -> String {
    "Daily".to_string()
}

/// Exercise assigned by a therapist to one patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Exercise {
    pub patient_id: Uuid,
    pub name: String,
    pub sets: u32,
    pub reps: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(rename = "videoUrl", default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default = "default_days")]
    pub days: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl OwnedRecord for Exercise {
    const KIND: RecordKind = RecordKind::Exercise;
    const COLLECTION: Collection = Collection::Exercises;

    fn patient_id(&self) -> Uuid {
        self.patient_id
    }
}

/// A patient marking an exercise done on a given day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExerciseLog {
    pub patient_id: Uuid,
    pub exercise_id: Uuid,
    #[serde(with = "crate::dates::date")]
    pub date: Date,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl OwnedRecord for ExerciseLog {
    const KIND: RecordKind = RecordKind::ExerciseLog;
    const COLLECTION: Collection = Collection::ExerciseLogs;

    fn patient_id(&self) -> Uuid {
        self.patient_id
    }
}
