use anyhow::{Context, Result};
use std::io::{BufRead, Write};

use super::{get_api_key_from_env, ENV_API_KEY_VAR};
use crate::config::{BackendConfig, BackendKind};

/// Prompts user to enter the backend API key
pub fn prompt_for_api_key() -> Result<String> {
    eprintln!("Backend API key required.");
    eprintln!("Set {} to skip this prompt.", ENV_API_KEY_VAR);
    eprintln!();

    let key = rpassword::prompt_password("Enter API key: ")
        .context("Failed to read API key from stdin")?;

    let key = key.trim();

    if key.is_empty() {
        anyhow::bail!("API key cannot be empty");
    }

    Ok(key.to_string())
}

/// Prompts for a login password (hidden input)
pub fn prompt_for_password(username: &str) -> Result<String> {
    rpassword::prompt_password(format!("Password for {}: ", username))
        .context("Failed to read password from stdin")
}

/// Prompts for a login name on the terminal
pub fn prompt_for_username() -> Result<String> {
    eprint!("Name: ");
    std::io::stderr().flush().context("Failed to flush stderr")?;

    let mut input = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut input)
        .context("Failed to read name from stdin")?;

    let name = input.trim();
    if name.is_empty() {
        anyhow::bail!("Name cannot be empty");
    }
    Ok(name.to_string())
}

/// Resolve the API key for the configured backend.
///
/// Order: environment variable, config file, interactive prompt. The file
/// backend needs no key and returns None.
pub fn resolve_api_key(backend: &BackendConfig) -> Result<Option<String>> {
    if backend.kind != BackendKind::Rest {
        return Ok(None);
    }

    if let Some(key) = get_api_key_from_env() {
        tracing::debug!("API key taken from {}", ENV_API_KEY_VAR);
        return Ok(Some(key));
    }

    if let Some(key) = backend.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
        tracing::debug!("API key taken from config");
        return Ok(Some(key.to_string()));
    }

    prompt_for_api_key().map(Some)
}
