use crate::model::{Comment, Criterion, Project, Rating, Snapshot};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Configuration for the last-good snapshot cache
#[derive(Clone, Debug)]
pub struct CacheConfig {
    pub enabled: bool, // false when --no-cache
}

/// Get the platform-appropriate cache directory for challenge-hub
pub fn get_cache_path() -> PathBuf {
    dirs::cache_dir()
        .map(|p| p.join("challenge-hub/snapshots"))
        .unwrap_or_else(|| {
            PathBuf::from(format!(
                "{}/.cache/challenge-hub/snapshots",
                std::env::var("HOME").unwrap_or_default()
            ))
        })
}

/// Clear the snapshot cache directory
pub fn clear_cache() -> Result<()> {
    let cache_path = get_cache_path();
    match std::fs::remove_dir_all(&cache_path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).context("Failed to remove cache directory"),
    }
}

fn snapshot_key(backend: &str) -> String {
    format!("snapshot:{}", backend)
}

/// Read the last snapshot fetched from `backend`, if any
pub fn read_cached_snapshot(cache_path: &Path, backend: &str) -> Option<Snapshot> {
    let bytes = cacache::read_sync(cache_path, snapshot_key(backend)).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// What goes to disk: the snapshot without judge credentials
#[derive(Serialize)]
struct CachedSnapshot<'a> {
    projects: &'a [Project],
    criteria: &'a [Criterion],
    judges: Vec<CachedJudge<'a>>,
    ratings: &'a [Rating],
    comments: &'a [Comment],
    fetched_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct CachedJudge<'a> {
    id: &'a str,
    name: &'a str,
}

impl<'a> From<&'a Snapshot> for CachedSnapshot<'a> {
    fn from(snapshot: &'a Snapshot) -> Self {
        Self {
            projects: &snapshot.projects,
            criteria: &snapshot.criteria,
            judges: snapshot
                .judges
                .iter()
                .map(|j| CachedJudge {
                    id: &j.id,
                    name: &j.name,
                })
                .collect(),
            ratings: &snapshot.ratings,
            comments: &snapshot.comments,
            fetched_at: snapshot.fetched_at,
        }
    }
}

/// Remember a successfully fetched snapshot
pub fn write_cached_snapshot(cache_path: &Path, backend: &str, snapshot: &Snapshot) -> Result<()> {
    let json = serde_json::to_vec(&CachedSnapshot::from(snapshot))?;
    cacache::write_sync(cache_path, snapshot_key(backend), &json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Judge;

    #[test]
    fn test_snapshot_roundtrip_per_backend() {
        let dir = std::env::temp_dir().join("challenge_hub_test_snapshot_cache");
        let _ = std::fs::remove_dir_all(&dir);

        let snapshot = Snapshot {
            projects: vec![Project {
                id: "p-1".to_string(),
                name: "Solar Dryer".to_string(),
            }],
            criteria: Vec::new(),
            judges: Vec::new(),
            ratings: Vec::new(),
            comments: Vec::new(),
            fetched_at: Utc::now(),
        };

        write_cached_snapshot(&dir, "https://a.example/", &snapshot).unwrap();

        let cached = read_cached_snapshot(&dir, "https://a.example/").unwrap();
        assert_eq!(cached, snapshot);
        assert!(read_cached_snapshot(&dir, "https://b.example/").is_none());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_cached_snapshot_drops_judge_passwords() {
        let dir = std::env::temp_dir().join("challenge_hub_test_snapshot_cache_credentials");
        let _ = std::fs::remove_dir_all(&dir);

        let snapshot = Snapshot {
            projects: Vec::new(),
            criteria: Vec::new(),
            judges: vec![Judge {
                id: "j-1".to_string(),
                name: "Dr. Smith".to_string(),
                password_hash: "s3cret-pass".to_string(),
            }],
            ratings: Vec::new(),
            comments: Vec::new(),
            fetched_at: Utc::now(),
        };

        write_cached_snapshot(&dir, "file", &snapshot).unwrap();

        let raw = cacache::read_sync(&dir, snapshot_key("file")).unwrap();
        let raw = String::from_utf8(raw).unwrap();
        assert!(!raw.contains("s3cret-pass"));
        assert!(!raw.contains("password_hash"));

        let cached = read_cached_snapshot(&dir, "file").unwrap();
        assert_eq!(cached.judges[0].name, "Dr. Smith");
        assert_eq!(cached.judges[0].password_hash, "");
        assert_eq!(cached.judge_name("j-1"), Some("Dr. Smith"));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
