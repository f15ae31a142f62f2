use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

pub const CONFIG_FILE_ENV_VAR: &str = "PANEL_CONFIG";
pub const HOST_ENV_VAR: &str = "PANEL_AUTHORITY_HOST";
pub const PORT_ENV_VAR: &str = "PANEL_AUTHORITY_PORT";
pub const CONNECT_TIMEOUT_ENV_VAR: &str = "PANEL_CONNECT_TIMEOUT_MS";
pub const RETRY_ENV_VAR: &str = "PANEL_RETRY_MS";

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 46101;
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_RETRY_MS: u64 = 100;
pub(crate) const MAX_RETRY_BACKOFF_MS: u64 = 1_000;

/// Where the authority listens and how long to keep trying to reach it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub connect_timeout_ms: u64,
    pub retry_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            retry_ms: DEFAULT_RETRY_MS,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ClientConfigFile {
    host: Option<String>,
    port: Option<u16>,
    connect_timeout_ms: Option<u64>,
    retry_ms: Option<u64>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

impl ClientConfig {
    /// Defaults, then the file named by `PANEL_CONFIG`, then `PANEL_*` overrides.
    pub fn resolve() -> Result<Self, ConfigError> {
        let mut config = match env::var_os(CONFIG_FILE_ENV_VAR) {
            Some(path) => Self::load_file(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_overrides(|name| env::var(name).ok());
        Ok(config)
    }

    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let file = parse_config_file_json(&raw).map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })?;

        let defaults = Self::default();
        Ok(Self {
            host: file.host.unwrap_or(defaults.host),
            port: file.port.unwrap_or(defaults.port),
            connect_timeout_ms: file.connect_timeout_ms.unwrap_or(defaults.connect_timeout_ms),
            retry_ms: file.retry_ms.unwrap_or(defaults.retry_ms),
        })
    }

    /// Applies `PANEL_*` values from `lookup`. Values that fail to parse are
    /// logged and the current setting is kept.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(HOST_ENV_VAR) {
            let host = host.trim();
            if host.is_empty() {
                warn!(var = HOST_ENV_VAR, "config_empty_host_ignored");
            } else {
                self.host = host.to_string();
            }
        }
        self.port = parse_override(PORT_ENV_VAR, lookup(PORT_ENV_VAR), self.port);
        self.connect_timeout_ms = parse_override(
            CONNECT_TIMEOUT_ENV_VAR,
            lookup(CONNECT_TIMEOUT_ENV_VAR),
            self.connect_timeout_ms,
        );
        self.retry_ms = parse_override(RETRY_ENV_VAR, lookup(RETRY_ENV_VAR), self.retry_ms);
    }

    pub fn authority_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn retry_base(&self) -> Duration {
        Duration::from_millis(self.retry_ms.max(1))
    }
}

fn parse_override<T>(var: &'static str, raw: Option<String>, current: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match raw.as_deref().map(str::trim) {
        Some(value) => match value.parse::<T>() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(var, value, fallback = %current, "config_invalid_override_ignored");
                current
            }
        },
        None => current,
    }
}

fn parse_config_file_json(raw: &str) -> Result<ClientConfigFile, String> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    match serde_path_to_error::deserialize::<_, ClientConfigFile>(&mut deserializer) {
        Ok(file) => Ok(file),
        Err(error) => {
            let path = error.path().to_string();
            let source = error.into_inner();
            if path.is_empty() || path == "." {
                Err(format!("parse config json: {source}"))
            } else {
                Err(format!("parse config json at {path}: {source}"))
            }
        }
    }
}
