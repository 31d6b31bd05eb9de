use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use super::{claims::TokenKind, identity::Identity, jwt::JwtKeys};
use crate::{
    error::AppError,
    policy::{self, Actor, DashboardKind},
    profiles::model::{decode_profile, Profile},
    state::AppState,
    store::{Collection, GuardedStore},
};

/// Bearer access token checked against the identity provider.
pub struct AuthUser(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Auth("Missing Authorization header".into()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .ok_or_else(|| AppError::Auth("Invalid Authorization header".into()))?;

        let claims = keys.verify(token).map_err(|_| {
            warn!("invalid or expired token");
            AppError::Auth("Invalid or expired token".into())
        })?;

        if claims.kind != TokenKind::Access {
            return Err(AppError::Auth("Access token required".into()));
        }

        let identity = state
            .identity
            .current_user(&claims)
            .await?
            .ok_or_else(|| AppError::Auth("Session has ended, please sign in again".into()))?;
        Ok(AuthUser(identity))
    }
}

/// Signed-in user together with their profile and a store bound to them.
/// Pending patients are let through; see [`Session`] for the gated variant.
pub struct AnySession {
    pub identity: Identity,
    pub profile: Profile,
    pub store: GuardedStore,
}

impl AnySession {
    pub fn route(&self) -> DashboardKind {
        policy::route_for(Some(&self.profile))
    }
}

pub(crate) async fn load_profile(state: &AppState, identity: &Identity) -> Result<Option<Profile>, AppError> {
    match state.store.get(Collection::Profiles, identity.id).await? {
        Some(doc) => Ok(Some(decode_profile(doc.id, doc.fields)?)),
        None => Ok(None),
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AnySession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(identity) = AuthUser::from_request_parts(parts, state).await?;
        let profile = load_profile(state, &identity)
            .await?
            .ok_or_else(|| AppError::not_found("Profile not provisioned yet"))?;
        let store = GuardedStore::new(state.store.clone(), Actor::from(&profile));
        Ok(AnySession {
            identity,
            profile,
            store,
        })
    }
}

/// Session with full dashboard access: therapists and approved patients.
pub struct Session(pub AnySession);

impl std::ops::Deref for Session {
    type Target = AnySession;

    fn deref(&self) -> &AnySession {
        &self.0
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Session {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = AnySession::from_request_parts(parts, state).await?;
        if session.route() == DashboardKind::PendingApproval {
            return Err(AppError::permission(
                "Your account is awaiting therapist approval",
            ));
        }
        Ok(Session(session))
    }
}
