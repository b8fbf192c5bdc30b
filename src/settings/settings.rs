use anyhow::{Result, anyhow};
use config::{Config, File};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize)]
pub struct Settings {
    pub auth: Auth,
    pub lock: Lock,
    pub log: Log,
    pub request: Request,
    pub sequence: Sequence,
    pub store: Store,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Auth {
    pub codec: String, // only "fake" for now
    pub access_ttl_secs: u64,
    pub refresh_ttl_secs: u64,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Lock {
    pub lease_ms: u64,
    pub acquire_timeout_ms: u64,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Request {
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Sequence {
    pub lock_name: String,
    pub counter_prefix: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Store {
    pub backend: String, // "memory" or "redis"
    pub redis_dsn: String,
    pub key_prefix: String,
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}
