use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime, Time};
use uuid::Uuid;

use crate::error::AppError;

/// Role tag as stored on the profile document and sent by clients.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RoleKind {
    Patient,
    Therapist,
}

impl RoleKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RoleKind::Patient => "patient",
            RoleKind::Therapist => "therapist",
        }
    }
}

/// Next scheduled session shown on the patient card.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct NextSession {
    #[serde(with = "crate::dates::date")]
    pub date: Date,
    #[serde(with = "crate::dates::time_of_day")]
    pub time: Time,
}

/// Clinical details only a patient carries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatientDetails {
    pub is_approved: bool,
    pub condition: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub next_session: Option<NextSession>,
}

/// A therapist has no approval gate, so there is nothing to carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Patient(PatientDetails),
    Therapist,
}

impl Role {
    pub fn kind(&self) -> RoleKind {
        match self {
            Role::Patient(_) => RoleKind::Patient,
            Role::Therapist => RoleKind::Therapist,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub id: Uuid,
    pub full_name: String,
    pub role: Role,
    pub created_at: Option<OffsetDateTime>,
}

impl Profile {
    pub fn patient(&self) -> Option<&PatientDetails> {
        match &self.role {
            Role::Patient(d) => Some(d),
            Role::Therapist => None,
        }
    }

    pub fn is_patient(&self) -> bool {
        matches!(self.role, Role::Patient(_))
    }

    /// Therapists are implicitly approved.
    pub fn is_approved(&self) -> bool {
        self.patient().map_or(true, |d| d.is_approved)
    }
}

/// Flat shape of a `profiles` document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProfileDoc {
    pub role: RoleKind,
    pub full_name: String,
    #[serde(default)]
    pub is_approved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(rename = "nextSession", default, skip_serializing_if = "Option::is_none")]
    pub next_session: Option<NextSession>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<OffsetDateTime>,
}

impl ProfileDoc {
    pub fn into_profile(self, id: Uuid) -> Profile {
        let role = match self.role {
            RoleKind::Therapist => Role::Therapist,
            RoleKind::Patient => Role::Patient(PatientDetails {
                is_approved: self.is_approved,
                condition: self.condition,
                age: self.age,
                gender: self.gender,
                next_session: self.next_session,
            }),
        };
        Profile {
            id,
            full_name: self.full_name,
            role,
            created_at: self.created_at,
        }
    }
}

impl From<&Profile> for ProfileDoc {
    fn from(p: &Profile) -> Self {
        let mut doc = ProfileDoc {
            role: p.role.kind(),
            full_name: p.full_name.clone(),
            is_approved: true,
            condition: None,
            age: None,
            gender: None,
            next_session: None,
            created_at: p.created_at,
        };
        if let Role::Patient(d) = &p.role {
            doc.is_approved = d.is_approved;
            doc.condition = d.condition.clone();
            doc.age = d.age;
            doc.gender = d.gender.clone();
            doc.next_session = d.next_session;
        }
        doc
    }
}

/// Public view of a profile returned by the API.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub id: Uuid,
    #[serde(flatten)]
    pub doc: ProfileDoc,
}

impl From<&Profile> for ProfileView {
    fn from(p: &Profile) -> Self {
        Self {
            id: p.id,
            doc: ProfileDoc::from(p),
        }
    }
}

pub fn decode_profile(id: Uuid, fields: serde_json::Value) -> Result<Profile, AppError> {
    let doc: ProfileDoc = serde_json::from_value(fields)
        .map_err(|e| AppError::Store(anyhow::anyhow!("malformed profile {id}: {e}")))?;
    Ok(doc.into_profile(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn therapist_document_ignores_approval_flag() {
        let id = Uuid::new_v4();
        let p = decode_profile(
            id,
            json!({"role": "therapist", "full_name": "Dr. Meera", "is_approved": false}),
        )
        .unwrap();
        assert_eq!(p.role, Role::Therapist);
        assert!(p.is_approved());
    }

    #[test]
    fn patient_document_roundtrips_clinical_fields() {
        let id = Uuid::new_v4();
        let fields = json!({
            "role": "patient",
            "full_name": "Asha",
            "is_approved": false,
            "condition": "Frozen shoulder",
            "age": 52,
            "gender": "F",
            "nextSession": {"date": "2025-04-01", "time": "10:30"}
        });
        let p = decode_profile(id, fields).unwrap();
        let d = p.patient().unwrap();
        assert!(!d.is_approved);
        assert_eq!(d.condition.as_deref(), Some("Frozen shoulder"));
        assert_eq!(d.age, Some(52));

        let back = serde_json::to_value(ProfileDoc::from(&p)).unwrap();
        assert_eq!(back["nextSession"]["time"], "10:30");
        assert_eq!(back["role"], "patient");
    }

    #[test]
    fn unknown_role_is_a_store_error() {
        let err = decode_profile(Uuid::new_v4(), json!({"role": "admin", "full_name": "x"})).unwrap_err();
        assert!(matches!(err, AppError::Store(_)));
    }
}
