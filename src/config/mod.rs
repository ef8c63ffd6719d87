pub mod init;
mod schema;

pub use schema::{BackendConfig, BackendKind, Config, DEFAULT_AUTO_REFRESH_INTERVAL};

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// Get the config directory path (~/.config/challenge-hub/)
pub fn get_config_dir() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".config").join("challenge-hub")
}

/// Get the default config file path (~/.config/challenge-hub/config.yaml)
pub fn get_config_path() -> PathBuf {
    get_config_dir().join("config.yaml")
}

/// Load configuration from a YAML file
///
/// # Arguments
///
/// * `path` - Optional path to config file. If None, uses default path (~/.config/challenge-hub/config.yaml)
///
/// # Errors
///
/// Returns an error if:
/// - The config file does not exist
/// - The config file cannot be read
/// - The YAML cannot be parsed
pub fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let config_path = path.unwrap_or_else(get_config_path);

    if !config_path.exists() {
        anyhow::bail!(
            "Config file not found at {}. Run `challenge-hub init` to create one",
            config_path.display()
        );
    }

    let config_content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;

    parse_config(&config_content)
        .with_context(|| format!("Failed to parse config: invalid YAML in {}", config_path.display()))
}

fn parse_config(content: &str) -> Result<Config> {
    serde_saphyr::from_str(content).map_err(|e| anyhow::anyhow!("{}", e))
}

/// Validate a loaded config.
/// Returns all validation errors at once (not just the first).
pub fn validate_config(config: &Config) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if config.auto_refresh_interval == 0 {
        errors.push("auto_refresh_interval: must be greater than 0".to_string());
    }

    match config.backend.kind {
        BackendKind::Rest => match config.backend.url.as_deref().map(str::trim) {
            None | Some("") => errors.push("backend.url: required for the rest backend".to_string()),
            Some(url) if !(url.starts_with("http://") || url.starts_with("https://")) => {
                errors.push(format!("backend.url: '{}' must start with http:// or https://", url));
            }
            Some(_) => {}
        },
        BackendKind::File => {
            if config.backend.url.is_some() {
                errors.push("backend.url: only used by the rest backend".to_string());
            }
        }
    }

    if let Some(password) = &config.admin_password {
        if password.is_empty() {
            errors.push("admin_password: cannot be empty".to_string());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
