use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_AUTO_REFRESH_INTERVAL: u64 = 30;

fn default_auto_refresh_interval() -> u64 {
    DEFAULT_AUTO_REFRESH_INTERVAL
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    /// Password that grants the admin session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_password: Option<String>,
    /// Seconds between automatic ranking refreshes
    #[serde(default = "default_auto_refresh_interval")]
    pub auto_refresh_interval: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Hosted PostgREST-style database
    Rest,
    /// Local JSON store
    #[default]
    File,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub kind: BackendKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}
