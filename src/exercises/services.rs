use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;
use time::{Date, OffsetDateTime};
use tracing::info;
use uuid::Uuid;

use super::{
    dto::{AssignExerciseRequest, DailyProgress, ExerciseItem},
    repo_types::{Exercise, ExerciseLog},
};
use crate::{
    dates,
    error::{AppError, AppResult},
    policy::Actor,
    store::{GuardedStore, Query, Stored},
};

/// Player link for a YouTube video; other links pass through unchanged.
pub fn embed_url(url: &str) -> String {
    lazy_static! {
        static ref YOUTUBE_RE: Regex = Regex::new(
            r"^(?:https?://)?(?:www\.|m\.)?(?:youtube\.com/(?:watch\?(?:.*&)?v=|embed/|shorts/)|youtu\.be/)([A-Za-z0-9_-]{6,})"
        )
        .unwrap();
    }
    match YOUTUBE_RE.captures(url.trim()) {
        Some(c) => format!("https://www.youtube.com/embed/{}", &c[1]),
        None => url.trim().to_string(),
    }
}

fn validate(req: &AssignExerciseRequest) -> AppResult<()> {
    if req.name.trim().is_empty() {
        return Err(AppError::validation("Exercise name is required"));
    }
    if req.sets == 0 || req.reps == 0 {
        return Err(AppError::validation("Sets and reps must be at least 1"));
    }
    if let Some(url) = req.video_url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(AppError::validation("Video link must be an http(s) URL"));
        }
    }
    Ok(())
}

pub fn to_item(exercise: Stored<Exercise>) -> ExerciseItem {
    let embed = exercise.record.video_url.as_deref().map(embed_url);
    ExerciseItem {
        exercise,
        embed_url: embed,
    }
}

pub async fn assign(store: &GuardedStore, req: AssignExerciseRequest) -> AppResult<Stored<Exercise>> {
    validate(&req)?;
    let exercise = Exercise {
        patient_id: req.patient_id,
        name: req.name.trim().to_string(),
        sets: req.sets,
        reps: req.reps,
        duration: req.duration.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()),
        video_url: req.video_url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty()),
        days: req
            .days
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| "Daily".to_string()),
        created_at: OffsetDateTime::now_utc(),
    };
    let stored = store.create(&exercise).await?;
    info!(exercise_id = %stored.id, patient_id = %exercise.patient_id, "exercise assigned");
    Ok(stored)
}

pub async fn logs_on(store: &GuardedStore, patient_id: Option<Uuid>, date: Option<Date>) -> AppResult<Vec<Stored<ExerciseLog>>> {
    let query = match date {
        Some(d) => Query::new().eq("date", dates::format_date(d)),
        None => Query::new(),
    };
    store.list::<ExerciseLog>(patient_id, query).await
}

/// Distinct exercises done on `date` out of those currently assigned.
pub fn progress(date: Date, exercises: &[Stored<Exercise>], logs: &[Stored<ExerciseLog>]) -> DailyProgress {
    let assigned: HashSet<Uuid> = exercises.iter().map(|e| e.id).collect();
    let done: HashSet<Uuid> = logs
        .iter()
        .filter(|l| l.record.date == date && assigned.contains(&l.record.exercise_id))
        .map(|l| l.record.exercise_id)
        .collect();
    DailyProgress {
        date,
        completed: done.len(),
        total: assigned.len(),
    }
}

/// Whose progress to report: patients always their own, therapists must name one.
pub fn progress_subject(actor: &Actor, patient_id: Option<Uuid>) -> AppResult<Uuid> {
    match (actor.is_therapist(), patient_id) {
        (_, Some(pid)) => Ok(pid),
        (false, None) => Ok(actor.id),
        (true, None) => Err(AppError::validation("patient_id is required")),
    }
}

pub async fn daily_progress(store: &GuardedStore, patient_id: Uuid, date: Date) -> AppResult<DailyProgress> {
    let exercises = store.list::<Exercise>(Some(patient_id), Query::new()).await?;
    let logs = logs_on(store, Some(patient_id), Some(date)).await?;
    Ok(progress(date, &exercises, &logs))
}

/// Log `exercise_id` as done on `today`. Marking it again the same day
/// returns the existing log.
pub async fn mark_done(store: &GuardedStore, exercise_id: Uuid, today: Date) -> AppResult<(Stored<ExerciseLog>, bool)> {
    let exercise = store.get::<Exercise>(exercise_id).await?;
    let patient_id = exercise.record.patient_id;

    let query = Query::new()
        .eq("exercise_id", exercise_id.to_string())
        .eq("date", dates::format_date(today));
    if let Some(existing) = store.list::<ExerciseLog>(Some(patient_id), query).await?.into_iter().next() {
        return Ok((existing, true));
    }

    let log = ExerciseLog {
        patient_id,
        exercise_id,
        date: today,
        timestamp: OffsetDateTime::now_utc(),
    };
    let stored = store.create(&log).await?;
    info!(%exercise_id, %patient_id, "exercise marked done");
    Ok((stored, false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        profiles::model::RoleKind,
        store::{Collection, DocumentStore, MemoryStore},
    };
    use serde_json::json;
    use std::sync::Arc;
    use time::macros::date;

    async fn seed(store: &Arc<dyn DocumentStore>, role: RoleKind) -> Actor {
        let id = Uuid::new_v4();
        store
            .create(
                Collection::Profiles,
                Some(id),
                json!({"role": role.as_str(), "full_name": "n", "is_approved": true}),
            )
            .await
            .unwrap();
        Actor { id, role }
    }

    fn squats(patient_id: Uuid) -> AssignExerciseRequest {
        AssignExerciseRequest {
            patient_id,
            name: "Squats".into(),
            sets: 3,
            reps: 12,
            duration: None,
            video_url: Some("https://www.youtube.com/watch?v=abc123XYZ".into()),
            days: None,
        }
    }

    #[test]
    fn youtube_links_become_embeds() {
        assert_eq!(
            embed_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=10"),
            "https://www.youtube.com/embed/dQw4w9WgXcQ"
        );
        assert_eq!(embed_url("https://youtu.be/dQw4w9WgXcQ"), "https://www.youtube.com/embed/dQw4w9WgXcQ");
        assert_eq!(
            embed_url("https://www.youtube.com/embed/dQw4w9WgXcQ"),
            "https://www.youtube.com/embed/dQw4w9WgXcQ"
        );
        assert_eq!(embed_url("https://vimeo.com/1234"), "https://vimeo.com/1234");
    }

    #[test]
    fn rejects_incomplete_plans() {
        let mut req = squats(Uuid::new_v4());
        req.name = "  ".into();
        assert!(matches!(validate(&req), Err(AppError::Validation(_))));

        let mut req = squats(Uuid::new_v4());
        req.reps = 0;
        assert!(validate(&req).is_err());

        let mut req = squats(Uuid::new_v4());
        req.video_url = Some("javascript:alert(1)".into());
        assert!(validate(&req).is_err());
    }

    #[tokio::test]
    async fn assigned_exercise_is_visible_to_its_patient_only() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let t = seed(&store, RoleKind::Therapist).await;
        let p1 = seed(&store, RoleKind::Patient).await;
        let p2 = seed(&store, RoleKind::Patient).await;

        let created = assign(&GuardedStore::new(store.clone(), t), squats(p1.id)).await.unwrap();
        assert_eq!(created.record.days, "Daily");

        let mine = GuardedStore::new(store.clone(), p1)
            .list::<Exercise>(None, Query::new())
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, created.id);
        assert_eq!((mine[0].record.sets, mine[0].record.reps), (3, 12));

        let theirs = GuardedStore::new(store.clone(), p2)
            .list::<Exercise>(None, Query::new())
            .await
            .unwrap();
        assert!(theirs.is_empty());
    }

    #[tokio::test]
    async fn marking_done_twice_counts_once() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let t = seed(&store, RoleKind::Therapist).await;
        let p1 = seed(&store, RoleKind::Patient).await;
        let as_t = GuardedStore::new(store.clone(), t);
        let e1 = assign(&as_t, squats(p1.id)).await.unwrap();
        assign(&as_t, squats(p1.id)).await.unwrap();

        let as_p1 = GuardedStore::new(store.clone(), p1);
        let today = date!(2025 - 05 - 20);
        let (first, again) = mark_done(&as_p1, e1.id, today).await.unwrap();
        assert!(!again);
        let (second, again) = mark_done(&as_p1, e1.id, today).await.unwrap();
        assert!(again);
        assert_eq!(first.id, second.id);

        let p = daily_progress(&as_p1, p1.id, today).await.unwrap();
        assert_eq!((p.completed, p.total), (1, 2));

        let tomorrow = daily_progress(&as_p1, p1.id, date!(2025 - 05 - 21)).await.unwrap();
        assert_eq!(tomorrow.completed, 0);
    }

    #[tokio::test]
    async fn only_the_owner_logs_completion() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let t = seed(&store, RoleKind::Therapist).await;
        let p1 = seed(&store, RoleKind::Patient).await;
        let p2 = seed(&store, RoleKind::Patient).await;
        let as_t = GuardedStore::new(store.clone(), t);
        let e1 = assign(&as_t, squats(p1.id)).await.unwrap();
        let today = date!(2025 - 05 - 20);

        assert!(matches!(
            mark_done(&as_t, e1.id, today).await.unwrap_err(),
            AppError::Permission(_)
        ));
        assert!(matches!(
            mark_done(&GuardedStore::new(store.clone(), p2), e1.id, today).await.unwrap_err(),
            AppError::Permission(_)
        ));
    }

    #[test]
    fn progress_ignores_logs_of_removed_exercises() {
        let pid = Uuid::new_v4();
        let day = date!(2025 - 01 - 01);
        let now = OffsetDateTime::now_utc();
        let ex = Stored {
            id: Uuid::new_v4(),
            record: Exercise {
                patient_id: pid,
                name: "Bridge".into(),
                sets: 2,
                reps: 10,
                duration: None,
                video_url: None,
                days: "Daily".into(),
                created_at: now,
            },
        };
        let log = |exercise_id| Stored {
            id: Uuid::new_v4(),
            record: ExerciseLog { patient_id: pid, exercise_id, date: day, timestamp: now },
        };
        let logs = vec![log(ex.id), log(ex.id), log(Uuid::new_v4())];
        let p = progress(day, std::slice::from_ref(&ex), &logs);
        assert_eq!((p.completed, p.total), (1, 1));
    }

    #[test]
    fn therapists_must_name_the_patient_for_progress() {
        let therapist = Actor { id: Uuid::new_v4(), role: RoleKind::Therapist };
        let patient = Actor { id: Uuid::new_v4(), role: RoleKind::Patient };
        let other = Uuid::new_v4();

        assert!(matches!(
            progress_subject(&therapist, None).unwrap_err(),
            AppError::Validation(_)
        ));
        assert_eq!(progress_subject(&therapist, Some(patient.id)).unwrap(), patient.id);
        assert_eq!(progress_subject(&patient, None).unwrap(), patient.id);
        // passed through; the guarded store rejects foreign ids
        assert_eq!(progress_subject(&patient, Some(other)).unwrap(), other);
    }
}
