use crate::state::AppState;
use axum::Router;

mod claims;
mod dto;
pub mod extractors;
pub mod handlers;
pub mod identity;
pub mod jwt;
mod password;
mod repo;
mod repo_types;
mod services;

pub use extractors::{AnySession, Session};
pub use identity::{IdentityProvider, MemoryIdentity, PgIdentity};

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::auth_routes())
        .merge(handlers::me_routes())
}
