use serde::Deserialize;

use super::model::NextSession;

#[derive(Debug, Deserialize)]
pub struct PatientSearch {
    #[serde(default)]
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApprovalRequest {
    pub approved: bool,
}

/// Body of `PUT /patients/:id/next-session`.
pub type NextSessionRequest = NextSession;
