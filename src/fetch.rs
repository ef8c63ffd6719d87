use crate::model::Snapshot;
use crate::provider::cache::{read_cached_snapshot, write_cached_snapshot, CacheConfig};
use crate::provider::{DataProvider, ProviderError, Tables};
use crate::scoring::{compute_ranking, RankingRow};
use chrono::Utc;
use std::path::Path;
use std::time::Instant;

/// Read every table once. All-or-nothing: if any list call fails the whole
/// snapshot fails, so a ranking is never computed from a partial read.
pub async fn fetch_snapshot<P: DataProvider>(provider: &P) -> Result<Snapshot, ProviderError> {
    let start = Instant::now();

    let Tables {
        projects,
        criteria,
        judges,
        ratings,
        comments,
    } = provider.read_all().await?;

    tracing::debug!(
        projects = projects.len(),
        criteria = criteria.len(),
        judges = judges.len(),
        ratings = ratings.len(),
        comments = comments.len(),
        elapsed = ?start.elapsed(),
        "fetched snapshot"
    );

    Ok(Snapshot {
        projects,
        criteria,
        judges,
        ratings,
        comments,
        fetched_at: Utc::now(),
    })
}

/// Rank the projects of a snapshot. Recomputed from scratch on every refresh.
pub fn rank_snapshot(snapshot: &Snapshot) -> Vec<RankingRow> {
    compute_ranking(&snapshot.projects, &snapshot.criteria, &snapshot.ratings)
}

/// Where a snapshot came from
#[derive(Debug)]
pub enum Loaded {
    Fresh(Snapshot),
    /// The backend failed; this is the last good snapshot from the cache
    Stale(Snapshot, ProviderError),
}

/// Fetch a snapshot, falling back to the last good one on failure.
///
/// Successful fetches are written to the cache. With caching disabled, or
/// with nothing cached yet, the provider error is returned.
pub async fn fetch_or_cached<P: DataProvider>(
    provider: &P,
    backend_key: &str,
    cache_config: &CacheConfig,
    cache_path: &Path,
) -> Result<Loaded, ProviderError> {
    match fetch_snapshot(provider).await {
        Ok(snapshot) => {
            if cache_config.enabled {
                if let Err(e) = write_cached_snapshot(cache_path, backend_key, &snapshot) {
                    tracing::warn!("Failed to cache snapshot: {}", e);
                }
            }
            Ok(Loaded::Fresh(snapshot))
        }
        Err(e) => {
            if !cache_config.enabled {
                return Err(e);
            }
            match read_cached_snapshot(cache_path, backend_key) {
                Some(snapshot) => {
                    tracing::warn!("Refresh failed, using snapshot from {}: {}", snapshot.fetched_at, e);
                    Ok(Loaded::Stale(snapshot, e))
                }
                None => Err(e),
            }
        }
    }
}
