use lazy_static::lazy_static;
use regex::Regex;

use super::{
    dto::{AuthResponse, PublicUser},
    identity::Identity,
    jwt::JwtKeys,
};
use crate::{
    error::AppResult,
    policy,
    profiles::model::{Profile, ProfileView},
};

pub const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Fresh token pair plus where the client should land.
pub(crate) fn auth_response(
    keys: &JwtKeys,
    identity: Identity,
    profile: Option<&Profile>,
) -> AppResult<AuthResponse> {
    let access_token = keys.sign_access(identity.id, identity.session_version)?;
    let refresh_token = keys.sign_refresh(identity.id, identity.session_version)?;
    Ok(AuthResponse {
        access_token,
        refresh_token,
        user: PublicUser {
            id: identity.id,
            email: identity.email,
        },
        profile: profile.map(ProfileView::from),
        route: policy::route_for(profile),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("asha@eshaa.in"));
        assert!(!is_valid_email("asha@eshaa"));
        assert!(!is_valid_email("asha eshaa.in"));
        assert_eq!(normalize_email("  Asha@Eshaa.IN "), "asha@eshaa.in");
    }
}
