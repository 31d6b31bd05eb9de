use serde::{Deserialize, Serialize};
use time::Date;
use uuid::Uuid;

use crate::{
    policy::RecordKind,
    store::{Collection, OwnedRecord},
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum PaymentStatus {
    Paid,
    #[default]
    Pending,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Paid => "Paid",
            PaymentStatus::Pending => "Pending",
        }
    }
}

/// A bill raised against a patient. Patient details are copied in at
/// write time so receipts stay stable if the profile later changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Payment {
    pub patient_id: Uuid,
    pub patient_name: String,
    /// Whole rupees.
    pub amount: i64,
    pub status: PaymentStatus,
    #[serde(with = "crate::dates::date")]
    pub date: Date,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_condition: Option<String>,
}

impl OwnedRecord for Payment {
    const KIND: RecordKind = RecordKind::Payment;
    const COLLECTION: Collection = Collection::Payments;

    fn patient_id(&self) -> Uuid {
        self.patient_id
    }
}
