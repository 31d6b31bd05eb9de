use anyhow::Context;
use serde::Deserialize;
use time::UtcOffset;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    /// Everything in process memory; nothing survives a restart.
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReceiptStorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClinicConfig {
    pub name: String,
    pub utc_offset_minutes: i32,
    pub allow_therapist_signup: bool,
    pub receipt_url_ttl_secs: u64,
}

impl ClinicConfig {
    pub fn utc_offset(&self) -> UtcOffset {
        UtcOffset::from_whole_seconds(self.utc_offset_minutes * 60).unwrap_or(UtcOffset::UTC)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub backend: StoreBackend,
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
    /// `None` keeps issued receipts in memory.
    pub receipts: Option<ReceiptStorageConfig>,
    pub clinic: ClinicConfig,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let backend = match env_or("STORE_BACKEND", "postgres").to_lowercase().as_str() {
            "postgres" => StoreBackend::Postgres,
            "memory" => StoreBackend::Memory,
            other => anyhow::bail!("unknown STORE_BACKEND {:?}", other),
        };
        let database_url = std::env::var("DATABASE_URL").ok();
        if backend == StoreBackend::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL is required for the postgres backend");
        }

        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET")?,
            issuer: env_or("JWT_ISSUER", "eshaa-physio"),
            audience: env_or("JWT_AUDIENCE", "eshaa-physio-users"),
            ttl_minutes: env_parse("JWT_TTL_MINUTES", 60),
            refresh_ttl_minutes: env_parse("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14),
        };

        let receipts = match std::env::var("MINIO_ENDPOINT") {
            Ok(endpoint) => Some(ReceiptStorageConfig {
                endpoint,
                bucket: env_or("MINIO_BUCKET", "receipts"),
                access_key: std::env::var("MINIO_ACCESS_KEY").context("MINIO_ACCESS_KEY")?,
                secret_key: std::env::var("MINIO_SECRET_KEY").context("MINIO_SECRET_KEY")?,
                region: env_or("MINIO_REGION", "us-east-1"),
            }),
            Err(_) => None,
        };

        let clinic = ClinicConfig {
            name: env_or("CLINIC_NAME", "Eshaa Physio Care"),
            utc_offset_minutes: env_parse("CLINIC_UTC_OFFSET_MINUTES", 330),
            allow_therapist_signup: env_parse("ALLOW_THERAPIST_SIGNUP", true),
            receipt_url_ttl_secs: env_parse("RECEIPT_URL_TTL_SECS", 30 * 60),
        };

        Ok(Self {
            backend,
            database_url,
            jwt,
            receipts,
            clinic,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clinic_offset_defaults_to_utc_when_out_of_range() {
        let mut c = ClinicConfig {
            name: "x".into(),
            utc_offset_minutes: 330,
            allow_therapist_signup: true,
            receipt_url_ttl_secs: 60,
        };
        assert_eq!(c.utc_offset().whole_minutes(), 330);
        c.utc_offset_minutes = 60 * 30;
        assert_eq!(c.utc_offset(), UtcOffset::UTC);
    }
}
