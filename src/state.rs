use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::auth::{IdentityProvider, MemoryIdentity, PgIdentity};
use crate::config::{AppConfig, ClinicConfig, JwtConfig, StoreBackend};
use crate::storage::{MemoryReceiptStore, ReceiptStore, S3ReceiptStore};
use crate::store::{DocumentStore, MemoryStore, PgDocumentStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn DocumentStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub receipts: Arc<dyn ReceiptStore>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let (store, identity) = match config.backend {
            StoreBackend::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL is not set")?;
                let db = PgPoolOptions::new()
                    .max_connections(10)
                    .connect(url)
                    .await
                    .context("connect to database")?;

                if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
                    tracing::warn!(error = %e, "migration failed; continuing");
                }

                (
                    Arc::new(PgDocumentStore::new(db.clone())) as Arc<dyn DocumentStore>,
                    Arc::new(PgIdentity::new(db)) as Arc<dyn IdentityProvider>,
                )
            }
            StoreBackend::Memory => {
                info!("using in-memory store; data is lost on restart");
                (
                    Arc::new(MemoryStore::new()) as Arc<dyn DocumentStore>,
                    Arc::new(MemoryIdentity::new()) as Arc<dyn IdentityProvider>,
                )
            }
        };

        let receipts = match &config.receipts {
            Some(cfg) => Arc::new(S3ReceiptStore::new(cfg).await?) as Arc<dyn ReceiptStore>,
            None => Arc::new(MemoryReceiptStore::new()) as Arc<dyn ReceiptStore>,
        };

        Ok(Self {
            config,
            store,
            identity,
            receipts,
        })
    }

    /// Fully in-memory state for tests.
    #[cfg(test)]
    pub fn fake() -> Self {
        let config = Arc::new(AppConfig {
            backend: StoreBackend::Memory,
            database_url: None,
            jwt: JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
                refresh_ttl_minutes: 60,
            },
            receipts: None,
            clinic: ClinicConfig {
                name: "Eshaa Physio Care".into(),
                utc_offset_minutes: 330,
                allow_therapist_signup: true,
                receipt_url_ttl_secs: 600,
            },
        });
        Self {
            config,
            store: Arc::new(MemoryStore::new()),
            identity: Arc::new(MemoryIdentity::new()),
            receipts: Arc::new(MemoryReceiptStore::new()),
        }
    }
}
