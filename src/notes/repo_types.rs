use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::{
    policy::RecordKind,
    store::{Collection, OwnedRecord},
};

/// Clinical note. Only the care team reads these.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Note {
    pub patient_id: Uuid,
    pub patient_name: String,
    pub note: String,
    #[serde(with = "crate::dates::date")]
    pub date: Date,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl OwnedRecord for Note {
    const KIND: RecordKind = RecordKind::Note;
    const COLLECTION: Collection = Collection::Notes;

    fn patient_id(&self) -> Uuid {
        self.patient_id
    }
}
