use serde::{Deserialize, Serialize};
use time::Date;
use uuid::Uuid;

use super::repo_types::{Exercise, ExerciseLog};
use crate::store::Stored;

#[derive(Debug, Deserialize)]
pub struct AssignExerciseRequest {
    pub patient_id: Uuid,
    pub name: String,
    pub sets: u32,
    pub reps: u32,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default, alias = "videoUrl")]
    pub video_url: Option<String>,
    #[serde(default)]
    pub days: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PatientFilter {
    #[serde(default)]
    pub patient_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct LogFilter {
    #[serde(default)]
    pub patient_id: Option<Uuid>,
    #[serde(default, with = "crate::dates::date::option")]
    pub date: Option<Date>,
}

/// Exercise as listed to clients, with a player-ready video link.
#[derive(Debug, Serialize)]
pub struct ExerciseItem {
    #[serde(flatten)]
    pub exercise: Stored<Exercise>,
    pub embed_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DailyProgress {
    #[serde(with = "crate::dates::date")]
    pub date: Date,
    pub completed: usize,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct MarkDoneResponse {
    pub log: Stored<ExerciseLog>,
    pub already_done: bool,
    pub progress: DailyProgress,
}
