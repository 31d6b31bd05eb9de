use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    policy::DashboardKind,
    profiles::model::{ProfileView, RoleKind},
};

/// Request body for registration. Clinical fields only apply to patients.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub role: RoleKind,
    pub full_name: String,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Option<String>,
}

/// Request body for login. `portal` is the role the client logs in as.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub portal: Option<RoleKind>,
}

/// Request body for token refresh.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Response returned after login, register or refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: PublicUser,
    pub profile: Option<ProfileView>,
    pub route: DashboardKind,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: PublicUser,
    pub profile: Option<ProfileView>,
    pub route: DashboardKind,
}
