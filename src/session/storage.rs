use super::types::Session;
use anyhow::{Context, Result};
use atomic_write_file::AtomicWriteFile;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Get the default session file path (~/.config/challenge-hub/session.json)
pub fn get_session_path() -> PathBuf {
    crate::config::get_config_dir().join("session.json")
}

/// Load the session from a JSON file
///
/// If the file doesn't exist, returns a logged-out session.
/// If the file exists but has an unsupported version, returns an error.
pub fn load_session(path: &Path) -> Result<Session> {
    if !path.exists() {
        return Ok(Session::new());
    }

    let file = File::open(path)
        .with_context(|| format!("Failed to open session file at {}", path.display()))?;

    let session: Session = serde_json::from_reader(file).context("Failed to load session")?;

    if session.version != 1 {
        anyhow::bail!("Unsupported session version: {}", session.version);
    }

    Ok(session)
}

/// Save the session to a JSON file atomically
///
/// Creates the parent directory if it doesn't exist.
pub fn save_session(path: &Path, session: &Session) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let mut file = AtomicWriteFile::open(path)
        .with_context(|| format!("Failed to open atomic write file at {}", path.display()))?;

    serde_json::to_writer_pretty(&mut file, session).context("Failed to serialize session")?;

    file.commit().context("Failed to save session")?;

    Ok(())
}
