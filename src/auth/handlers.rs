use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};

use super::{
    dto::{AuthResponse, LoginRequest, MeResponse, PublicUser, RefreshRequest, RegisterRequest},
    extractors::{load_profile, AuthUser},
    jwt::JwtKeys,
    services::{auth_response, is_valid_email, normalize_email, MIN_PASSWORD_LEN},
};
use crate::{
    error::{AppError, AppResult},
    policy::{self, Actor},
    profiles::model::{ProfileDoc, ProfileView, RoleKind},
    state::AppState,
    store::GuardedStore,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    payload.email = normalize_email(&payload.email);

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::validation("Invalid email"));
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(AppError::validation("Password too short"));
    }
    let full_name = payload.full_name.trim().to_string();
    if full_name.is_empty() {
        return Err(AppError::validation("Full name is required"));
    }
    if payload.role == RoleKind::Therapist && !state.config.clinic.allow_therapist_signup {
        warn!(email = %payload.email, "therapist self-registration disabled");
        return Err(AppError::permission("Therapist registration is closed"));
    }

    let identity = state.identity.sign_up(&payload.email, &payload.password).await?;

    let is_patient = payload.role == RoleKind::Patient;
    let doc = ProfileDoc {
        role: payload.role,
        full_name,
        is_approved: policy::approval_on_register(payload.role).is_approved(),
        condition: payload.condition.filter(|_| is_patient),
        age: payload.age.filter(|_| is_patient),
        gender: payload.gender.filter(|_| is_patient),
        next_session: None,
        created_at: Some(OffsetDateTime::now_utc()),
    };
    let store = GuardedStore::new(
        state.store.clone(),
        Actor {
            id: identity.id,
            role: payload.role,
        },
    );
    let profile = match store.create_own_profile(doc).await {
        Ok(profile) => profile,
        Err(e) => {
            error!(error = %e, user_id = %identity.id, "profile creation failed; removing identity");
            if let Err(rollback) = state.identity.delete_user(identity.id).await {
                error!(error = %rollback, user_id = %identity.id, "identity rollback failed");
            }
            return Err(e);
        }
    };

    info!(user_id = %identity.id, role = payload.role.as_str(), approved = profile.is_approved(), "user registered");
    let keys = JwtKeys::from_ref(&state);
    Ok((StatusCode::CREATED, Json(auth_response(&keys, identity, Some(&profile))?)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    payload.email = normalize_email(&payload.email);

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::validation("Invalid email"));
    }

    let identity = state.identity.sign_in(&payload.email, &payload.password).await?;
    let profile = load_profile(&state, &identity).await?;

    if let Some(portal) = payload.portal {
        let role = profile.as_ref().map(|p| p.role.kind());
        if role != Some(portal) {
            warn!(user_id = %identity.id, portal = portal.as_str(), "login through the wrong portal");
            state.identity.sign_out(identity.id).await?;
            let other = match portal {
                RoleKind::Patient => "Therapist",
                RoleKind::Therapist => "Patient",
            };
            return Err(AppError::permission(format!(
                "Access Denied: Please use the {} Portal.",
                other
            )));
        }
    }

    info!(user_id = %identity.id, "user logged in");
    let keys = JwtKeys::from_ref(&state);
    Ok(Json(auth_response(&keys, identity, profile.as_ref())?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| AppError::Auth(e.to_string()))?;

    let identity = state
        .identity
        .current_user(&claims)
        .await?
        .ok_or_else(|| AppError::Auth("Session has ended, please sign in again".into()))?;
    let profile = load_profile(&state, &identity).await?;
    Ok(Json(auth_response(&keys, identity, profile.as_ref())?))
}

#[instrument(skip(state, identity))]
pub async fn logout(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> AppResult<StatusCode> {
    state.identity.sign_out(identity.id).await?;
    info!(user_id = %identity.id, "user logged out");
    Ok(StatusCode::NO_CONTENT)
}

/// Own profile and the dashboard to land on. A missing profile is not an
/// error: the account is simply not provisioned yet.
#[instrument(skip(state, identity))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> AppResult<Json<MeResponse>> {
    let profile = load_profile(&state, &identity).await?;
    Ok(Json(MeResponse {
        route: policy::route_for(profile.as_ref()),
        profile: profile.as_ref().map(ProfileView::from),
        user: PublicUser {
            id: identity.id,
            email: identity.email,
        },
    }))
}
