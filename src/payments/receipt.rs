//! Printable receipts.

use uuid::Uuid;

use super::repo_types::Payment;
use crate::{dates, store::Stored};

const RULE: &str = "----------------------------------------";

/// Short receipt number printed on the slip.
pub fn receipt_number(id: Uuid) -> String {
    id.simple().to_string()[..8].to_uppercase()
}

/// Object key under which an issued receipt is archived.
pub fn receipt_key(payment: &Stored<Payment>) -> String {
    format!("receipts/{}/{}.txt", payment.record.patient_id, payment.id)
}

pub fn render(clinic_name: &str, payment: &Stored<Payment>) -> String {
    let p = &payment.record;
    let mut lines = vec![
        clinic_name.to_uppercase(),
        "Payment Receipt".to_string(),
        RULE.to_string(),
        format!("Receipt No : {}", receipt_number(payment.id)),
        format!("Date       : {}", dates::format_date(p.date)),
        format!("Patient    : {}", p.patient_name),
    ];
    match (p.patient_age, p.patient_gender.as_deref()) {
        (Some(age), Some(g)) => lines.push(format!("Age/Gender : {} / {}", age, g)),
        (Some(age), None) => lines.push(format!("Age        : {}", age)),
        (None, Some(g)) => lines.push(format!("Gender     : {}", g)),
        (None, None) => {}
    }
    if let Some(c) = &p.patient_condition {
        lines.push(format!("Condition  : {}", c));
    }
    if let Some(m) = &p.method {
        lines.push(format!("Method     : {}", m));
    }
    lines.push(format!("Status     : {}", p.status.as_str()));
    lines.push(RULE.to_string());
    lines.push(format!("Amount     : Rs. {}", p.amount));
    lines.push(RULE.to_string());
    lines.push("Thank you. Get well soon!".to_string());
    let mut out = lines.join("\n");
    out.push('\n');
    out
}
