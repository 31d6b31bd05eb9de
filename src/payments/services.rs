use std::collections::BTreeMap;

use bytes::Bytes;
use serde_json::{json, Map};
use time::Date;
use tracing::info;
use uuid::Uuid;

use super::{
    dto::{CreatePaymentRequest, MonthlyIncome, PaymentFilter, PaymentList, PaymentSummary, ReceiptIssued},
    receipt,
    repo_types::{Payment, PaymentStatus},
};
use crate::{
    dates,
    error::{AppError, AppResult},
    storage::ReceiptStore,
    store::{Direction, GuardedStore, Query, Stored},
};

const DEFAULT_METHOD: &str = "GPay";

/// Raise a bill. Patient details are copied from the profile.
pub async fn create(store: &GuardedStore, req: CreatePaymentRequest, today: Date) -> AppResult<Stored<Payment>> {
    if req.amount <= 0 {
        return Err(AppError::validation("Amount must be a positive number of rupees"));
    }
    let patient = store.patient(req.patient_id).await?;
    let details = patient.patient().cloned().unwrap_or_default();

    let payment = Payment {
        patient_id: patient.id,
        patient_name: patient.full_name,
        amount: req.amount,
        status: req.status,
        date: req.date.unwrap_or(today),
        method: Some(
            req.method
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| DEFAULT_METHOD.to_string()),
        ),
        patient_age: details.age,
        patient_gender: details.gender,
        patient_condition: details.condition,
    };
    let stored = store.create(&payment).await?;
    info!(payment_id = %stored.id, patient_id = %payment.patient_id, amount = payment.amount, "payment recorded");
    Ok(stored)
}

pub async fn set_status(store: &GuardedStore, id: Uuid, status: PaymentStatus) -> AppResult<Stored<Payment>> {
    let mut patch = Map::new();
    patch.insert("status".into(), json!(status));
    let updated = store.update::<Payment>(id, patch).await?;
    info!(payment_id = %id, status = status.as_str(), "payment status changed");
    Ok(updated)
}

/// Newest first, narrowed by exact date and patient name.
pub async fn list(store: &GuardedStore, filter: &PaymentFilter) -> AppResult<PaymentList> {
    let mut query = Query::new().order_by("date", Direction::Desc);
    if let Some(d) = filter.date {
        query = query.eq("date", dates::format_date(d));
    }
    let mut records = store.list::<Payment>(filter.patient_id, query).await?;
    if let Some(needle) = filter.search.as_deref().map(|s| s.trim().to_lowercase()) {
        if !needle.is_empty() {
            records.retain(|r| r.record.patient_name.to_lowercase().contains(&needle));
        }
    }
    let total = records.iter().map(|r| r.record.amount).sum();
    Ok(PaymentList { records, total })
}

pub fn summarize(payments: &[Stored<Payment>]) -> PaymentSummary {
    payments
        .iter()
        .fold(PaymentSummary::default(), |mut acc, p| {
            match p.record.status {
                PaymentStatus::Paid => acc.total_paid += p.record.amount,
                PaymentStatus::Pending => acc.total_pending += p.record.amount,
            }
            acc
        })
}

pub async fn summary(store: &GuardedStore, patient_id: Option<Uuid>) -> AppResult<PaymentSummary> {
    let payments = store.list::<Payment>(patient_id, Query::new()).await?;
    Ok(summarize(&payments))
}

/// Billed amount per calendar month, oldest month first.
pub fn income_by_month(payments: &[Stored<Payment>]) -> Vec<MonthlyIncome> {
    let mut months: BTreeMap<String, i64> = BTreeMap::new();
    for p in payments {
        *months.entry(dates::month_key(p.record.date)).or_default() += p.record.amount;
    }
    months
        .into_iter()
        .map(|(month, total)| MonthlyIncome { month, total })
        .collect()
}

pub async fn monthly_income(store: &GuardedStore) -> AppResult<Vec<MonthlyIncome>> {
    store.require_therapist("view clinic income")?;
    let payments = store.list::<Payment>(None, Query::new()).await?;
    Ok(income_by_month(&payments))
}

pub async fn render_receipt(store: &GuardedStore, clinic_name: &str, id: Uuid) -> AppResult<String> {
    let payment = store.get::<Payment>(id).await?;
    Ok(receipt::render(clinic_name, &payment))
}

/// Archive the receipt and hand back a time-limited download link.
pub async fn issue_receipt(
    store: &GuardedStore,
    receipts: &dyn ReceiptStore,
    clinic_name: &str,
    id: Uuid,
    ttl_secs: u64,
) -> AppResult<ReceiptIssued> {
    store.require_therapist("issue receipts")?;
    let payment = store.get::<Payment>(id).await?;
    let key = receipt::receipt_key(&payment);
    let body = Bytes::from(receipt::render(clinic_name, &payment));
    receipts
        .put_object(&key, body, "text/plain; charset=utf-8")
        .await?;
    let url = receipts.presign_get(&key, ttl_secs).await?;
    info!(payment_id = %id, %key, "receipt issued");
    Ok(ReceiptIssued {
        key,
        url,
        expires_in: ttl_secs,
    })
}
