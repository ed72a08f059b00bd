use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};

use referral_db::RestConfig;

pub enum StoreBackend {
    Sqlite { path: PathBuf },
    Rest(RestConfig),
    Memory,
}

pub struct Config {
    pub host: String,
    pub port: u16,
    pub store: StoreBackend,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = get("REFERRAL_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = get("REFERRAL_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("REFERRAL_PORT must be a port number")?;

        let backend = get("REFERRAL_STORE").unwrap_or_else(|| "sqlite".into());
        let store = match backend.as_str() {
            "sqlite" => StoreBackend::Sqlite {
                path: PathBuf::from(get("REFERRAL_DB_PATH").unwrap_or_else(|| "referral.db".into())),
            },
            "rest" => {
                let base_url = get("REFERRAL_STORE_URL")
                    .ok_or_else(|| anyhow!("REFERRAL_STORE_URL is required for the rest store"))?;
                let api_key = get("REFERRAL_STORE_KEY")
                    .ok_or_else(|| anyhow!("REFERRAL_STORE_KEY is required for the rest store"))?;
                let timeout_secs: u64 = get("REFERRAL_STORE_TIMEOUT_SECS")
                    .unwrap_or_else(|| "10".into())
                    .parse()
                    .context("REFERRAL_STORE_TIMEOUT_SECS must be a whole number")?;

                StoreBackend::Rest(RestConfig {
                    base_url,
                    api_key,
                    bearer: get("REFERRAL_STORE_TOKEN"),
                    timeout: Duration::from_secs(timeout_secs),
                })
            }
            "memory" => StoreBackend::Memory,
            other => bail!("unknown REFERRAL_STORE '{}' (expected sqlite, rest, or memory)", other),
        };

        Ok(Self { host, port, store })
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}
