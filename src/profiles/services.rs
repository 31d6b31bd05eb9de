use serde_json::{json, Map};
use tracing::info;
use uuid::Uuid;

use super::model::{NextSession, Profile};
use crate::{error::AppResult, store::GuardedStore};

/// Case-insensitive match on the patient's name or id.
pub fn matches_search(profile: &Profile, needle: &str) -> bool {
    let needle = needle.trim().to_lowercase();
    needle.is_empty()
        || profile.full_name.to_lowercase().contains(&needle)
        || profile.id.to_string().contains(&needle)
}

/// Patient directory, alphabetical, optionally narrowed by `search`.
pub async fn directory(store: &GuardedStore, search: Option<&str>) -> AppResult<Vec<Profile>> {
    let mut patients = store.patients().await?;
    if let Some(needle) = search {
        patients.retain(|p| matches_search(p, needle));
    }
    patients.sort_by(|a, b| a.full_name.to_lowercase().cmp(&b.full_name.to_lowercase()));
    Ok(patients)
}

pub async fn set_approval(store: &GuardedStore, patient_id: Uuid, approved: bool) -> AppResult<Profile> {
    let mut patch = Map::new();
    patch.insert("is_approved".into(), json!(approved));
    let profile = store.update_patient(patient_id, patch).await?;
    info!(%patient_id, approved, by = %store.actor().id, "patient approval changed");
    Ok(profile)
}

pub async fn schedule_next_session(store: &GuardedStore, patient_id: Uuid, next: NextSession) -> AppResult<Profile> {
    let mut patch = Map::new();
    patch.insert(
        "nextSession".into(),
        serde_json::to_value(next).map_err(anyhow::Error::from)?,
    );
    let profile = store.update_patient(patient_id, patch).await?;
    info!(%patient_id, "next session scheduled");
    Ok(profile)
}
