pub mod prompt;

use crate::model::Judge;
use crate::session::{Identity, Session};
use thiserror::Error;

/// Environment variable name for providing the backend API key without storing it in config
pub const ENV_API_KEY_VAR: &str = "CHALLENGE_HUB_API_KEY";

// Re-export prompt functions for convenience
pub use prompt::{prompt_for_api_key, prompt_for_password, prompt_for_username, resolve_api_key};

/// Check for an API key in the CHALLENGE_HUB_API_KEY environment variable.
/// Returns Some(key) if the env var is set and non-empty, None otherwise.
pub fn get_api_key_from_env() -> Option<String> {
    match std::env::var(ENV_API_KEY_VAR) {
        Ok(val) => {
            let trimmed = val.trim().to_string();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed)
            }
        }
        Err(_) => None,
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Not logged in. Run `challenge-hub login` first")]
    NotLoggedIn,

    #[error("This command needs an admin session")]
    AdminRequired,

    #[error("This view needs a judge session")]
    JudgeRequired,
}

/// Check a login attempt.
///
/// The admin password wins regardless of username. Judges match by
/// case-insensitive name and exact password.
pub fn authenticate(
    judges: &[Judge],
    username: &str,
    password: &str,
    admin_password: Option<&str>,
) -> Result<Identity, AuthError> {
    if password.is_empty() {
        return Err(AuthError::InvalidCredentials);
    }

    if admin_password == Some(password) {
        return Ok(Identity::Admin);
    }

    let username = username.trim();
    judges
        .iter()
        .find(|j| j.name.to_lowercase() == username.to_lowercase() && j.password_hash == password)
        .map(|j| Identity::Judge {
            id: j.id.clone(),
            name: j.name.clone(),
        })
        .ok_or(AuthError::InvalidCredentials)
}

pub fn require_admin(session: &Session) -> Result<(), AuthError> {
    match &session.identity {
        Some(Identity::Admin) => Ok(()),
        Some(_) => Err(AuthError::AdminRequired),
        None => Err(AuthError::NotLoggedIn),
    }
}

/// Returns the judge's (id, name)
pub fn require_judge(session: &Session) -> Result<(&str, &str), AuthError> {
    match &session.identity {
        Some(Identity::Judge { id, name }) => Ok((id, name)),
        Some(Identity::Admin) => Err(AuthError::JudgeRequired),
        None => Err(AuthError::NotLoggedIn),
    }
}
