use anyhow::{anyhow, Context, Result};
use common_crypto::{ChecksumSigner, SaltKey};
use std::env;
use std::time::Duration;

const DEFAULT_GATEWAY_BASE_URL: &str = "https://api-preprod.phonepe.com/apis/pg-sandbox";

/// Everything the gateway client needs. The salt key only ever lives inside
/// the signer, whose `Debug` output is redacted.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub merchant_id: String,
    pub base_url: String,
    pub signer: ChecksumSigner,
    pub timeout: Duration,
    /// Public origin of this service; the gateway sends the customer back to
    /// `{public_base_url}/status?id=...`.
    pub public_base_url: String,
}

#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub gateway: GatewayConfig,
    pub payment_success_url: String,
    pub payment_failure_url: String,
    pub cors_allowed_origins: Vec<String>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database_url", &"***redacted***")
            .field("db_max_connections", &self.db_max_connections)
            .field("gateway", &self.gateway)
            .field("payment_success_url", &self.payment_success_url)
            .field("payment_failure_url", &self.payment_failure_url)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL must be set")?;
        let merchant_id = lookup("PHONEPE_MERCHANT_ID")
            .filter(|value| !value.trim().is_empty())
            .context("PHONEPE_MERCHANT_ID must be set")?;
        let salt_key = lookup("PHONEPE_SALT_KEY").context("PHONEPE_SALT_KEY must be set")?;
        let salt_key = SaltKey::new(salt_key).map_err(|err| anyhow!("PHONEPE_SALT_KEY: {err}"))?;
        let salt_index = match lookup("PHONEPE_SALT_INDEX") {
            Some(value) => value
                .trim()
                .parse::<u32>()
                .context("PHONEPE_SALT_INDEX must be a non-negative integer")?,
            None => 1,
        };
        let base_url = lookup("PHONEPE_BASE_URL")
            .unwrap_or_else(|| DEFAULT_GATEWAY_BASE_URL.to_string());
        let timeout_secs = lookup("GATEWAY_TIMEOUT_SECS")
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(15)
            .clamp(1, 60);
        let port = match lookup("PORT") {
            Some(value) => value.parse::<u16>().context("PORT must be a valid port number")?,
            None => 5000,
        };
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let db_max_connections = lookup("DATABASE_MAX_CONNECTIONS")
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(5)
            .max(1);
        let public_base_url = lookup("PUBLIC_BASE_URL")
            .unwrap_or_else(|| "http://localhost:5000".to_string());
        let payment_success_url = lookup("PAYMENT_SUCCESS_URL")
            .unwrap_or_else(|| "http://localhost:3000/success".to_string());
        let payment_failure_url = lookup("PAYMENT_FAILURE_URL")
            .unwrap_or_else(|| "http://localhost:3000/failure".to_string());
        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_else(|| {
                vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:5173".to_string(),
                ]
            });

        Ok(Self {
            host,
            port,
            database_url,
            db_max_connections,
            gateway: GatewayConfig {
                merchant_id,
                base_url: trim_trailing_slash(base_url),
                signer: ChecksumSigner::new(salt_key, salt_index),
                timeout: Duration::from_secs(timeout_secs),
                public_base_url: trim_trailing_slash(public_base_url),
            },
            payment_success_url,
            payment_failure_url,
            cors_allowed_origins,
        })
    }
}

fn trim_trailing_slash(value: String) -> String {
    value.trim_end_matches('/').to_string()
}
