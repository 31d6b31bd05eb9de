//! The policy-enforcing boundary in front of the document store.
//!
//! Every handler reaches the store through a [`GuardedStore`] bound to the
//! acting user. Forbidden requests fail here with [`AppError::Permission`]
//! instead of relying on callers never issuing them.

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{Collection, DocumentStore, Query};
use crate::{
    error::{AppError, AppResult},
    policy::{self, Actor, RecordKind, RecordRef},
    profiles::model::{decode_profile, Profile, ProfileDoc, RoleKind},
};

/// A record that belongs to exactly one patient.
pub trait OwnedRecord: Serialize + DeserializeOwned + Send + Sync {
    const KIND: RecordKind;
    const COLLECTION: Collection;

    fn patient_id(&self) -> Uuid;
}

/// A record together with its document id.
#[derive(Debug, Clone, Serialize)]
pub struct Stored<R> {
    pub id: Uuid,
    #[serde(flatten)]
    pub record: R,
}

/// Fields nobody may patch through an update.
const FROZEN_FIELDS: &[&str] = &["role", "id", "patient_id"];

#[derive(Clone)]
pub struct GuardedStore {
    store: Arc<dyn DocumentStore>,
    actor: Actor,
}

impl GuardedStore {
    pub fn new(store: Arc<dyn DocumentStore>, actor: Actor) -> Self {
        Self { store, actor }
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    fn deny(&self, what: &str) -> AppError {
        warn!(actor = %self.actor.id, role = self.actor.role.as_str(), what, "permission denied");
        AppError::permission(format!("not allowed to {}", what))
    }

    /// Clinic-wide operations with no single owning patient.
    pub fn require_therapist(&self, what: &str) -> AppResult<()> {
        if self.actor.is_therapist() {
            Ok(())
        } else {
            Err(self.deny(what))
        }
    }

    fn ensure_read(&self, record: &RecordRef) -> AppResult<()> {
        let notes_ok = record.kind != RecordKind::Note || policy::can_read_notes(&self.actor);
        if policy::can_read(&self.actor, record) && notes_ok {
            Ok(())
        } else {
            Err(self.deny("read this record"))
        }
    }

    fn ensure_write(&self, record: &RecordRef) -> AppResult<()> {
        if policy::can_write(&self.actor, record) {
            Ok(())
        } else {
            Err(self.deny("modify this record"))
        }
    }

    // ---- profiles ----

    /// Create the actor's own profile right after sign-up.
    pub async fn create_own_profile(&self, doc: ProfileDoc) -> AppResult<Profile> {
        if doc.role != self.actor.role {
            return Err(self.deny("create a profile with another role"));
        }
        if doc.is_approved != policy::approval_on_register(doc.role).is_approved() {
            return Err(self.deny("choose the approval state of a new profile"));
        }
        let fields = serde_json::to_value(&doc).map_err(anyhow::Error::from)?;
        self.store
            .create(Collection::Profiles, Some(self.actor.id), fields)
            .await?;
        Ok(doc.into_profile(self.actor.id))
    }

    /// Any profile the actor may see. `None` when it does not exist.
    pub async fn find_profile(&self, id: Uuid) -> AppResult<Option<Profile>> {
        self.ensure_read(&RecordRef::new(RecordKind::Profile, id))?;
        match self.store.get(Collection::Profiles, id).await? {
            Some(doc) => Ok(Some(decode_profile(doc.id, doc.fields)?)),
            None => Ok(None),
        }
    }

    pub async fn profile(&self, id: Uuid) -> AppResult<Profile> {
        self.find_profile(id)
            .await?
            .ok_or_else(|| AppError::not_found("Profile not found"))
    }

    /// Existing patient profile, used to validate foreign keys.
    pub async fn patient(&self, id: Uuid) -> AppResult<Profile> {
        let profile = self.profile(id).await?;
        if !profile.is_patient() {
            return Err(AppError::not_found("Patient not found"));
        }
        Ok(profile)
    }

    /// Patient directory. Therapists only.
    pub async fn patients(&self) -> AppResult<Vec<Profile>> {
        self.require_therapist("list patients")?;
        let q = Query::new().eq("role", RoleKind::Patient.as_str());
        self.store
            .query(Collection::Profiles, &q)
            .await?
            .into_iter()
            .map(|d| decode_profile(d.id, d.fields))
            .collect()
    }

    /// Patch a patient's approval or scheduling fields.
    pub async fn update_patient(&self, id: Uuid, patch: Map<String, Value>) -> AppResult<Profile> {
        self.ensure_write(&RecordRef::new(RecordKind::Profile, id))?;
        reject_frozen(&patch)?;
        self.patient(id).await?;
        self.store
            .update(Collection::Profiles, id, Value::Object(patch))
            .await?;
        self.patient(id).await
    }

    // ---- patient-owned records ----

    pub async fn create<R: OwnedRecord>(&self, record: &R) -> AppResult<Stored<R>>
    where
        R: Clone,
    {
        let patient_id = record.patient_id();
        self.ensure_write(&RecordRef::new(R::KIND, patient_id))?;
        self.patient(patient_id).await?;
        let fields = serde_json::to_value(record).map_err(anyhow::Error::from)?;
        let id = self.store.create(R::COLLECTION, None, fields).await?;
        debug!(collection = %R::COLLECTION, %id, %patient_id, "record created");
        Ok(Stored {
            id,
            record: record.clone(),
        })
    }

    /// Patients get the same denial for a missing record as for a foreign one.
    pub async fn get<R: OwnedRecord>(&self, id: Uuid) -> AppResult<Stored<R>> {
        let doc = match self.store.get(R::COLLECTION, id).await? {
            Some(doc) => doc,
            None if self.actor.is_therapist() => return Err(AppError::not_found("Record not found")),
            None => return Err(self.deny("read this record")),
        };
        let record: R = decode(R::COLLECTION, id, doc.fields)?;
        self.ensure_read(&RecordRef::new(R::KIND, record.patient_id()))?;
        Ok(Stored { id, record })
    }

    /// Records of one patient, or of everyone when `patient_id` is `None`
    /// and the actor is a therapist. A patient is always scoped to self.
    pub async fn list<R: OwnedRecord>(&self, patient_id: Option<Uuid>, query: Query) -> AppResult<Vec<Stored<R>>> {
        let scope = match (self.actor.role, patient_id) {
            (RoleKind::Patient, None) => Some(self.actor.id),
            (_, Some(pid)) => Some(pid),
            (RoleKind::Therapist, None) => None,
        };
        let probe = RecordRef::new(R::KIND, scope.unwrap_or(self.actor.id));
        self.ensure_read(&probe)?;

        let query = match scope {
            Some(pid) => query.eq("patient_id", pid.to_string()),
            None => query,
        };
        let docs = self.store.query(R::COLLECTION, &query).await?;
        let mut out = Vec::with_capacity(docs.len());
        for d in docs {
            let record: R = decode(R::COLLECTION, d.id, d.fields)?;
            // Never hand a record to someone who may not read it, whatever
            // the backend returned.
            if policy::can_read(&self.actor, &RecordRef::new(R::KIND, record.patient_id())) {
                out.push(Stored { id: d.id, record });
            }
        }
        Ok(out)
    }

    pub async fn update<R: OwnedRecord>(&self, id: Uuid, patch: Map<String, Value>) -> AppResult<Stored<R>> {
        reject_frozen(&patch)?;
        let existing = self.get::<R>(id).await?;
        self.ensure_write(&RecordRef::new(R::KIND, existing.record.patient_id()))?;
        if !self.store.update(R::COLLECTION, id, Value::Object(patch)).await? {
            return Err(AppError::not_found("Record not found"));
        }
        self.get::<R>(id).await
    }

    pub async fn delete<R: OwnedRecord>(&self, id: Uuid) -> AppResult<()> {
        let existing = self.get::<R>(id).await?;
        self.ensure_write(&RecordRef::new(R::KIND, existing.record.patient_id()))?;
        self.store.delete(R::COLLECTION, id).await?;
        Ok(())
    }
}

fn reject_frozen(patch: &Map<String, Value>) -> AppResult<()> {
    match FROZEN_FIELDS.iter().find(|f| patch.contains_key(**f)) {
        Some(f) => Err(AppError::permission(format!("{} cannot be changed", f))),
        None => Ok(()),
    }
}

fn decode<R: DeserializeOwned>(collection: Collection, id: Uuid, fields: Value) -> AppResult<R> {
    serde_json::from_value(fields)
        .map_err(|e| AppError::Store(anyhow::anyhow!("malformed {} document {}: {}", collection, id, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Memo {
        patient_id: Uuid,
        text: String,
    }

    impl OwnedRecord for Memo {
        const KIND: RecordKind = RecordKind::Exercise;
        const COLLECTION: Collection = Collection::Exercises;
        fn patient_id(&self) -> Uuid {
            self.patient_id
        }
    }

    async fn seed(store: &Arc<dyn DocumentStore>, role: RoleKind, approved: bool) -> Actor {
        let id = Uuid::new_v4();
        store
            .create(
                Collection::Profiles,
                Some(id),
                json!({"role": role.as_str(), "full_name": "x", "is_approved": approved}),
            )
            .await
            .unwrap();
        Actor { id, role }
    }

    fn memory() -> Arc<dyn DocumentStore> {
        Arc::new(MemoryStore::new())
    }

    #[tokio::test]
    async fn patient_cannot_create_clinical_records() {
        let store = memory();
        let p = seed(&store, RoleKind::Patient, true).await;
        let guarded = GuardedStore::new(store, p);
        let err = guarded
            .create(&Memo { patient_id: p.id, text: "self-assigned".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Permission(_)));
    }

    #[tokio::test]
    async fn records_must_reference_a_patient() {
        let store = memory();
        let t = seed(&store, RoleKind::Therapist, true).await;
        let other_t = seed(&store, RoleKind::Therapist, true).await;
        let guarded = GuardedStore::new(store, t);

        let missing = guarded
            .create(&Memo { patient_id: Uuid::new_v4(), text: "x".into() })
            .await
            .unwrap_err();
        assert!(matches!(missing, AppError::NotFound(_)));

        let therapist_target = guarded
            .create(&Memo { patient_id: other_t.id, text: "x".into() })
            .await
            .unwrap_err();
        assert!(matches!(therapist_target, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn patients_only_see_their_own_records() {
        let store = memory();
        let t = seed(&store, RoleKind::Therapist, true).await;
        let p1 = seed(&store, RoleKind::Patient, true).await;
        let p2 = seed(&store, RoleKind::Patient, true).await;
        let as_t = GuardedStore::new(store.clone(), t);
        let created = as_t
            .create(&Memo { patient_id: p1.id, text: "Squats".into() })
            .await
            .unwrap();

        let as_p1 = GuardedStore::new(store.clone(), p1);
        assert_eq!(as_p1.list::<Memo>(None, Query::new()).await.unwrap().len(), 1);
        assert!(as_p1.get::<Memo>(created.id).await.is_ok());

        let as_p2 = GuardedStore::new(store.clone(), p2);
        assert!(as_p2.list::<Memo>(None, Query::new()).await.unwrap().is_empty());
        assert!(matches!(
            as_p2.list::<Memo>(Some(p1.id), Query::new()).await.unwrap_err(),
            AppError::Permission(_)
        ));
        assert!(matches!(
            as_p2.get::<Memo>(created.id).await.unwrap_err(),
            AppError::Permission(_)
        ));

        assert_eq!(as_t.list::<Memo>(None, Query::new()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn role_and_owner_fields_are_frozen() {
        let store = memory();
        let t = seed(&store, RoleKind::Therapist, true).await;
        let p = seed(&store, RoleKind::Patient, false).await;
        let as_t = GuardedStore::new(store.clone(), t);

        let mut patch = Map::new();
        patch.insert("role".into(), json!("therapist"));
        let err = as_t.update_patient(p.id, patch).await.unwrap_err();
        assert!(matches!(err, AppError::Permission(_)));
        assert!(as_t.patient(p.id).await.unwrap().is_patient());

        let memo = as_t.create(&Memo { patient_id: p.id, text: "x".into() }).await.unwrap();
        let mut patch = Map::new();
        patch.insert("patient_id".into(), json!(Uuid::new_v4()));
        assert!(as_t.update::<Memo>(memo.id, patch).await.is_err());
    }

    #[tokio::test]
    async fn own_profile_must_match_registration_policy() {
        let store = memory();
        let id = Uuid::new_v4();
        let guarded = GuardedStore::new(store, Actor { id, role: RoleKind::Patient });
        let doc = |approved| ProfileDoc {
            role: RoleKind::Patient,
            full_name: "P".into(),
            is_approved: approved,
            condition: None,
            age: None,
            gender: None,
            next_session: None,
            created_at: None,
        };
        assert!(matches!(
            guarded.create_own_profile(doc(true)).await.unwrap_err(),
            AppError::Permission(_)
        ));
        let p = guarded.create_own_profile(doc(false)).await.unwrap();
        assert_eq!(p.id, id);
        assert!(!p.is_approved());
    }

    #[tokio::test]
    async fn patient_cannot_approve_anyone() {
        let store = memory();
        let p = seed(&store, RoleKind::Patient, false).await;
        let guarded = GuardedStore::new(store, p);
        let mut patch = Map::new();
        patch.insert("is_approved".into(), json!(true));
        assert!(matches!(
            guarded.update_patient(p.id, patch).await.unwrap_err(),
            AppError::Permission(_)
        ));
        assert!(matches!(guarded.patients().await.unwrap_err(), AppError::Permission(_)));
    }

    #[tokio::test]
    async fn patients_cannot_tell_missing_records_from_foreign_ones() {
        let store = memory();
        let t = seed(&store, RoleKind::Therapist, true).await;
        let p1 = seed(&store, RoleKind::Patient, true).await;
        let p2 = seed(&store, RoleKind::Patient, true).await;
        let theirs = GuardedStore::new(store.clone(), t)
            .create(&Memo { patient_id: p1.id, text: "Squats".into() })
            .await
            .unwrap();

        let as_p2 = GuardedStore::new(store.clone(), p2);
        let foreign = as_p2.get::<Memo>(theirs.id).await.unwrap_err();
        let missing = as_p2.get::<Memo>(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(foreign, AppError::Permission(_)));
        assert!(matches!(missing, AppError::Permission(_)));
        assert_eq!(foreign.to_string(), missing.to_string());
        assert!(matches!(
            as_p2.delete::<Memo>(Uuid::new_v4()).await.unwrap_err(),
            AppError::Permission(_)
        ));

        let as_t = GuardedStore::new(store.clone(), t);
        assert!(matches!(
            as_t.get::<Memo>(Uuid::new_v4()).await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }
}
