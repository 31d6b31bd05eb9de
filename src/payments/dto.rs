use serde::{Deserialize, Serialize};
use time::Date;
use uuid::Uuid;

use super::repo_types::{Payment, PaymentStatus};
use crate::store::Stored;

#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    pub patient_id: Uuid,
    pub amount: i64,
    #[serde(default)]
    pub status: PaymentStatus,
    #[serde(default, with = "crate::dates::date::option")]
    pub date: Option<Date>,
    #[serde(default)]
    pub method: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePaymentRequest {
    pub status: PaymentStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct PaymentFilter {
    #[serde(default)]
    pub patient_id: Option<Uuid>,
    #[serde(default, with = "crate::dates::date::option")]
    pub date: Option<Date>,
    /// Case-insensitive patient name fragment.
    #[serde(default)]
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SummaryFilter {
    #[serde(default)]
    pub patient_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct PaymentList {
    pub records: Vec<Stored<Payment>>,
    pub total: i64,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
pub struct PaymentSummary {
    pub total_paid: i64,
    pub total_pending: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MonthlyIncome {
    /// `YYYY-MM`
    pub month: String,
    pub total: i64,
}

#[derive(Debug, Serialize)]
pub struct ReceiptIssued {
    pub key: String,
    pub url: String,
    pub expires_in: u64,
}
