mod app;
mod appointments;
mod auth;
mod config;
mod dashboard;
mod dates;
mod error;
mod exercises;
mod notes;
mod payments;
mod policy;
mod profiles;
mod state;
mod storage;
mod store;

use crate::{app::build_app, auth::identity::watch_sessions, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "eshaa_physio=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let state = AppState::init().await?;
    tokio::spawn(watch_sessions(state.identity.subscribe()));

    let app = build_app(state);
    app::serve(app).await
}
