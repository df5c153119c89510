//! Gate configuration: endpoint locations, timeouts and where the session is persisted.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::TransportError;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GateConfig {
    pub api: ApiConfig,
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_login_path")]
    pub login_path: String,
    #[serde(default = "default_logout_path")]
    pub logout_path: String,
    #[serde(default = "default_permissions_path")]
    pub permissions_path: String,
    /// humantime string, e.g. "10s"
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: String,
    /// humantime string, e.g. "30s"
    #[serde(default = "default_request_timeout")]
    pub request_timeout: String,
    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_state_path() -> PathBuf {
    PathBuf::from("rolegate-session.json")
}

fn default_login_path() -> String {
    "auth/login".to_string()
}

fn default_logout_path() -> String {
    "auth/logout".to_string()
}

fn default_permissions_path() -> String {
    "permissions/user".to_string()
}

fn default_connect_timeout() -> String {
    "10s".to_string()
}

fn default_request_timeout() -> String {
    "30s".to_string()
}

impl ApiConfig {
    pub fn new(base_url: &str) -> Self {
        ApiConfig {
            base_url: base_url.to_string(),
            login_path: default_login_path(),
            logout_path: default_logout_path(),
            permissions_path: default_permissions_path(),
            connect_timeout: default_connect_timeout(),
            request_timeout: default_request_timeout(),
            user_agent: None,
        }
    }

    /// Base url with a trailing slash, so relative endpoint paths join below it
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let mut raw = self.base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        Url::parse(&raw).map_err(|err| ConfigError::InvalidUrl(format!("{raw}: {err}")))
    }

    pub fn connect_timeout(&self) -> Result<Duration, ConfigError> {
        parse_duration("connect_timeout", &self.connect_timeout)
    }

    pub fn request_timeout(&self) -> Result<Duration, ConfigError> {
        parse_duration("request_timeout", &self.request_timeout)
    }

    pub fn user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(|| format!("rolegate/{}", env!("CARGO_PKG_VERSION")))
    }
}

fn parse_duration(field: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(raw.trim()).map_err(|_| ConfigError::InvalidDuration {
        field,
        value: raw.to_string(),
    })
}

/// Errors surfaced while loading configuration or building clients from it.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to deserialize config: {0}")]
    Deserialize(String),
    #[error("invalid duration for {field}: {value:?}")]
    InvalidDuration { field: &'static str, value: String },
    #[error("invalid base url {0}")]
    InvalidUrl(String),
    #[error(transparent)]
    Client(#[from] TransportError),
}

pub fn load_config_from_reader<R: Read>(mut reader: R) -> Result<GateConfig, ConfigError> {
    let mut buf = String::new();
    reader.read_to_string(&mut buf)?;
    parse_config_str(&buf)
}

pub fn load_config_from_path(path: impl AsRef<Path>) -> Result<GateConfig, ConfigError> {
    let file = File::open(path.as_ref())?;
    load_config_from_reader(file)
}

/// JSON first, then YAML
pub fn parse_config_str(raw: &str) -> Result<GateConfig, ConfigError> {
    match serde_json::from_str(raw) {
        Ok(config) => Ok(config),
        Err(json_err) => serde_yaml::from_str(raw).map_err(|yaml_err| {
            ConfigError::Deserialize(format!(
                "json error: {}; yaml error: {}",
                json_err, yaml_err
            ))
        }),
    }
}
