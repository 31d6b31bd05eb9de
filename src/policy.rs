//! Access and ownership rules.
//!
//! Pure predicates over an authenticated actor and the patient a record
//! belongs to. The guarded store calls these on every operation, so a
//! forbidden request never reaches the document store.

use serde::Serialize;
use uuid::Uuid;

use crate::profiles::model::{Profile, Role, RoleKind};

/// Who is acting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: RoleKind,
}

impl Actor {
    pub fn is_therapist(&self) -> bool {
        self.role == RoleKind::Therapist
    }
}

impl From<&Profile> for Actor {
    fn from(p: &Profile) -> Self {
        Self {
            id: p.id,
            role: p.role.kind(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// Approval toggle and scheduling fields of a patient profile.
    Profile,
    Exercise,
    Payment,
    ExerciseLog,
    Note,
    Appointment,
}

/// The part of a record the rules look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordRef {
    pub kind: RecordKind,
    pub patient_id: Uuid,
}

impl RecordRef {
    pub fn new(kind: RecordKind, patient_id: Uuid) -> Self {
        Self { kind, patient_id }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum DashboardKind {
    TherapistDashboard,
    PatientDashboard,
    PendingApproval,
    Unauthenticated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalState {
    Pending,
    Approved,
}

impl ApprovalState {
    pub fn is_approved(self) -> bool {
        self == ApprovalState::Approved
    }
}

pub fn route_for(profile: Option<&Profile>) -> DashboardKind {
    match profile.map(|p| &p.role) {
        None => DashboardKind::Unauthenticated,
        Some(Role::Therapist) => DashboardKind::TherapistDashboard,
        Some(Role::Patient(d)) if d.is_approved => DashboardKind::PatientDashboard,
        Some(Role::Patient(_)) => DashboardKind::PendingApproval,
    }
}

pub fn can_read(actor: &Actor, record: &RecordRef) -> bool {
    actor.is_therapist() || actor.id == record.patient_id
}

/// Clinical notes stay with the care team.
pub fn can_read_notes(actor: &Actor) -> bool {
    actor.is_therapist()
}

pub fn can_write(actor: &Actor, record: &RecordRef) -> bool {
    match record.kind {
        RecordKind::Exercise | RecordKind::Payment | RecordKind::Note | RecordKind::Profile => {
            actor.is_therapist()
        }
        RecordKind::ExerciseLog => {
            actor.role == RoleKind::Patient && actor.id == record.patient_id
        }
        RecordKind::Appointment => actor.is_therapist() || actor.id == record.patient_id,
    }
}

/// Approval state a freshly registered profile starts in.
pub fn approval_on_register(role: RoleKind) -> ApprovalState {
    match role {
        RoleKind::Patient => ApprovalState::Pending,
        RoleKind::Therapist => ApprovalState::Approved,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::model::PatientDetails;
    use rand::{seq::SliceRandom, Rng};

    const KINDS: [RecordKind; 6] = [
        RecordKind::Profile,
        RecordKind::Exercise,
        RecordKind::Payment,
        RecordKind::ExerciseLog,
        RecordKind::Note,
        RecordKind::Appointment,
    ];

    fn patient(approved: bool) -> Profile {
        Profile {
            id: Uuid::new_v4(),
            full_name: "P1".into(),
            role: Role::Patient(PatientDetails {
                is_approved: approved,
                ..Default::default()
            }),
            created_at: None,
        }
    }

    #[test]
    fn routes_by_role_and_approval() {
        let therapist = Profile {
            id: Uuid::new_v4(),
            full_name: "T1".into(),
            role: Role::Therapist,
            created_at: None,
        };
        assert_eq!(route_for(Some(&therapist)), DashboardKind::TherapistDashboard);
        assert_eq!(route_for(Some(&patient(true))), DashboardKind::PatientDashboard);
        assert_eq!(route_for(Some(&patient(false))), DashboardKind::PendingApproval);
        assert_eq!(route_for(None), DashboardKind::Unauthenticated);
    }

    #[test]
    fn registration_approval_is_asymmetric() {
        assert_eq!(approval_on_register(RoleKind::Patient), ApprovalState::Pending);
        assert_eq!(approval_on_register(RoleKind::Therapist), ApprovalState::Approved);
    }

    #[test]
    fn can_read_matches_owner_or_therapist_for_random_pairs() {
        let mut rng = rand::thread_rng();
        let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        for _ in 0..2_000 {
            let role = if rng.gen_bool(0.5) { RoleKind::Patient } else { RoleKind::Therapist };
            let actor = Actor { id: *ids.choose(&mut rng).unwrap(), role };
            let record = RecordRef::new(*KINDS.choose(&mut rng).unwrap(), *ids.choose(&mut rng).unwrap());
            let expected = role == RoleKind::Therapist || actor.id == record.patient_id;
            assert_eq!(can_read(&actor, &record), expected, "{actor:?} {record:?}");
        }
    }

    #[test]
    fn clinical_writes_need_a_therapist_whoever_owns_the_record() {
        let mut rng = rand::thread_rng();
        for _ in 0..500 {
            let owner = Uuid::new_v4();
            let actor_id = if rng.gen_bool(0.5) { owner } else { Uuid::new_v4() };
            for kind in [RecordKind::Exercise, RecordKind::Payment, RecordKind::Note] {
                let record = RecordRef::new(kind, owner);
                let t = Actor { id: actor_id, role: RoleKind::Therapist };
                let p = Actor { id: actor_id, role: RoleKind::Patient };
                assert!(can_write(&t, &record));
                assert!(!can_write(&p, &record));
            }
        }
    }

    #[test]
    fn exercise_logs_are_written_by_their_patient_only() {
        let owner = Uuid::new_v4();
        let record = RecordRef::new(RecordKind::ExerciseLog, owner);
        assert!(can_write(&Actor { id: owner, role: RoleKind::Patient }, &record));
        assert!(!can_write(&Actor { id: Uuid::new_v4(), role: RoleKind::Patient }, &record));
        assert!(!can_write(&Actor { id: owner, role: RoleKind::Therapist }, &record));
        assert!(!can_write(&Actor { id: Uuid::new_v4(), role: RoleKind::Therapist }, &record));
    }

    #[test]
    fn approval_toggle_is_therapist_only() {
        let pid = Uuid::new_v4();
        let record = RecordRef::new(RecordKind::Profile, pid);
        assert!(!can_write(&Actor { id: pid, role: RoleKind::Patient }, &record));
        assert!(can_write(&Actor { id: Uuid::new_v4(), role: RoleKind::Therapist }, &record));
    }

    #[test]
    fn appointments_are_booked_by_owner_or_therapist() {
        let pid = Uuid::new_v4();
        let record = RecordRef::new(RecordKind::Appointment, pid);
        assert!(can_write(&Actor { id: pid, role: RoleKind::Patient }, &record));
        assert!(!can_write(&Actor { id: Uuid::new_v4(), role: RoleKind::Patient }, &record));
        assert!(can_write(&Actor { id: Uuid::new_v4(), role: RoleKind::Therapist }, &record));
    }

    #[test]
    fn notes_are_hidden_from_patients_even_their_own() {
        let pid = Uuid::new_v4();
        assert!(!can_read_notes(&Actor { id: pid, role: RoleKind::Patient }));
        assert!(can_read_notes(&Actor { id: pid, role: RoleKind::Therapist }));
    }
}
