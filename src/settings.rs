use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::Result;

pub const DEFAULT_CONFIG_FILE: &str = "recordkeeper";
pub const ENVIRONMENT_PREFIX: &str = "RECORDKEEPER";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Path of the SQLite database; in-memory when unset.
    pub database: Option<String>,
    /// Busy timeout handed to SQLite for every statement.
    pub query_timeout_ms: u64,
    pub auto_commit: bool,
    /// An `EnvFilter` directive, e.g. `recordkeeper=debug`.
    pub log: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: None,
            query_timeout_ms: 30_000,
            auto_commit: true,
            log: "info".to_owned(),
        }
    }
}

impl Settings {
    /// Reads `<file>.{toml,json,yaml,...}` when present, then lets
    /// `RECORDKEEPER__<KEY>` environment variables override it.
    pub fn load(file: &str) -> Result<Settings> {
        let config = Config::builder()
            .add_source(File::with_name(file).required(false))
            .add_source(Environment::with_prefix(ENVIRONMENT_PREFIX).separator("__"))
            .build()?;
        Ok(config.try_deserialize()?)
    }
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}
