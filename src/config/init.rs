use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use std::path::PathBuf;

use crate::config::{
    get_config_path, validate_config, BackendConfig, BackendKind, Config, DEFAULT_AUTO_REFRESH_INTERVAL,
};
use crate::credentials::ENV_API_KEY_VAR;
use crate::provider::file::get_store_path;

/// Prompt user with a message and return their trimmed input.
fn prompt(message: &str) -> Result<String> {
    print!("{}", message);
    std::io::stdout()
        .flush()
        .context("Failed to flush stdout")?;
    let mut input = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut input)
        .context("Failed to read input")?;
    Ok(input.trim().to_string())
}

/// Prompt user with a message and a default value. Returns default if input is empty.
fn prompt_with_default(message: &str, default: &str) -> Result<String> {
    let input = prompt(&format!("{} [{}]: ", message, default))?;
    if input.is_empty() {
        Ok(default.to_string())
    } else {
        Ok(input)
    }
}

/// Prompt user with a yes/no question. Returns bool based on input and default.
fn prompt_yes_no(message: &str, default_yes: bool) -> Result<bool> {
    let hint = if default_yes { "Y/n" } else { "y/N" };
    let input = prompt(&format!("{} [{}]: ", message, hint))?;
    let input = input.to_lowercase();
    if input.is_empty() {
        Ok(default_yes)
    } else {
        Ok(input == "y" || input == "yes")
    }
}

/// Print text with a typewriter effect, one character at a time.
fn typewriter(text: &str) {
    use std::thread;
    use std::time::Duration;
    for c in text.chars() {
        print!("{}", c);
        std::io::stdout().flush().ok();
        thread::sleep(Duration::from_millis(18));
    }
    println!();
}

fn parse_backend_kind(input: &str) -> Option<BackendKind> {
    match input.trim().to_lowercase().as_str() {
        "rest" | "r" => Some(BackendKind::Rest),
        "file" | "f" => Some(BackendKind::File),
        _ => None,
    }
}

fn parse_interval(input: &str) -> Result<u64, String> {
    match input.trim().parse::<u64>() {
        Ok(0) => Err("must be greater than 0".to_string()),
        Ok(v) => Ok(v),
        Err(_) => Err("must be a whole number of seconds".to_string()),
    }
}

/// Run the interactive init wizard to create a config file.
///
/// If `default_path` is Some, uses that as the config file path.
/// Otherwise, prompts the user with the default config path.
pub fn run_init_wizard(default_path: Option<PathBuf>) -> Result<()> {
    println!();
    typewriter("Challenge Hub Configuration Wizard");
    println!("==================================");
    println!();

    // 1. Backend
    typewriter("Scores can live in a hosted database (rest) or in a local JSON file (file).");
    typewriter("Pick 'file' to try things out on a single machine.");
    let kind = loop {
        let input = prompt_with_default("Backend (rest/file)", "file")?;
        match parse_backend_kind(&input) {
            Some(kind) => break kind,
            None => println!("  Invalid: answer 'rest' or 'file'. Try again."),
        }
    };

    let backend = match kind {
        BackendKind::Rest => {
            println!();
            let url = loop {
                let u = prompt("Backend URL (e.g., https://xyz.supabase.co): ")?;
                if u.starts_with("http://") || u.starts_with("https://") {
                    break u;
                }
                println!("  Invalid: must start with http:// or https://. Try again.");
            };
            typewriter(&format!(
                "The API key can be stored in the config file or provided via {} at run time.",
                ENV_API_KEY_VAR
            ));
            let api_key = if prompt_yes_no("Store the API key in the config file?", false)? {
                let key = rpassword::prompt_password("API key: ")
                    .context("Failed to read API key from stdin")?;
                let key = key.trim().to_string();
                if key.is_empty() { None } else { Some(key) }
            } else {
                None
            };
            BackendConfig {
                kind,
                url: Some(url),
                api_key,
                path: None,
            }
        }
        BackendKind::File => {
            println!();
            let default_store = get_store_path();
            let path = prompt_with_default("Where should scores be stored?", &default_store.display().to_string())?;
            let path = PathBuf::from(path);
            BackendConfig {
                kind,
                url: None,
                api_key: None,
                path: if path == default_store { None } else { Some(path) },
            }
        }
    };

    // 2. Admin password
    println!();
    typewriter("The admin manages judges, projects and criteria. Leave empty to disable admin login.");
    let admin_password = rpassword::prompt_password("Admin password: ")
        .context("Failed to read password from stdin")?;
    let admin_password = if admin_password.is_empty() {
        None
    } else {
        Some(admin_password)
    };

    // 3. Refresh interval
    println!();
    typewriter("The live ranking refreshes itself on a timer while it is open.");
    let auto_refresh_interval = loop {
        let input = prompt_with_default(
            "Auto-refresh interval in seconds",
            &DEFAULT_AUTO_REFRESH_INTERVAL.to_string(),
        )?;
        match parse_interval(&input) {
            Ok(v) => break v,
            Err(e) => println!("  Invalid: {}. Try again.", e),
        }
    };

    // 4. Config path
    let default_config_path = default_path.unwrap_or_else(get_config_path);
    println!();
    let path_str = prompt_with_default(
        "Where should the config be saved?",
        &default_config_path.display().to_string(),
    )?;
    let config_path = PathBuf::from(&path_str);

    // Check if file already exists
    if config_path.exists() {
        let overwrite = prompt_yes_no(
            &format!(
                "Config already exists at {}. Overwrite?",
                config_path.display()
            ),
            false,
        )?;
        if !overwrite {
            println!("Aborted.");
            return Ok(());
        }
    }

    // 5. Write config
    let config = Config {
        backend,
        admin_password,
        auto_refresh_interval,
    };

    if let Err(errors) = validate_config(&config) {
        anyhow::bail!("Generated config is invalid: {}", errors.join("; "));
    }

    let yaml = serde_saphyr::to_string(&config)
        .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;

    // Create parent directories
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    std::fs::write(&config_path, &yaml)
        .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

    println!();
    println!("Config written to {}", config_path.display());
    typewriter("Next: log in as admin and add judges, projects and criteria (or run `challenge-hub admin seed`).");
    println!("Run `challenge-hub` to open the live ranking.");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backend_kind() {
        assert_eq!(parse_backend_kind("REST"), Some(BackendKind::Rest));
        assert_eq!(parse_backend_kind(" f "), Some(BackendKind::File));
        assert_eq!(parse_backend_kind("sqlite"), None);
    }

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval("45"), Ok(45));
        assert!(parse_interval("0").is_err());
        assert!(parse_interval("1.5").is_err());
    }
}
