use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Judge {
    pub id: String,
    pub name: String,
    /// Stored credential, compared verbatim at login. Empty when read back
    /// from the snapshot cache.
    #[serde(default)]
    pub password_hash: String,
}

/// One judge's score for one project on one criterion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub project_id: String,
    pub judge_id: String,
    pub criterion_id: String,
    pub score: f64, // 1-10, step 0.5
}

impl Rating {
    /// Unique key: at most one rating per (project, judge, criterion)
    pub fn key(&self) -> (String, String, String) {
        (
            self.project_id.clone(),
            self.judge_id.clone(),
            self.criterion_id.clone(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub project_id: String,
    pub judge_id: String,
    pub text: String,
}

impl Comment {
    /// Unique key: at most one comment per (project, judge)
    pub fn key(&self) -> (String, String) {
        (self.project_id.clone(), self.judge_id.clone())
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// One consistent read of everything the provider holds.
///
/// Treated as immutable for the duration of a ranking computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub projects: Vec<Project>,
    pub criteria: Vec<Criterion>,
    pub judges: Vec<Judge>,
    pub ratings: Vec<Rating>,
    pub comments: Vec<Comment>,
    pub fetched_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn judge_name(&self, judge_id: &str) -> Option<&str> {
        self.judges
            .iter()
            .find(|j| j.id == judge_id)
            .map(|j| j.name.as_str())
    }

    /// Existing ratings of one judge for one project
    pub fn ratings_by(&self, judge_id: &str, project_id: &str) -> Vec<&Rating> {
        self.ratings
            .iter()
            .filter(|r| r.judge_id == judge_id && r.project_id == project_id)
            .collect()
    }

    pub fn comment_by(&self, judge_id: &str, project_id: &str) -> Option<&Comment> {
        self.comments
            .iter()
            .find(|c| c.judge_id == judge_id && c.project_id == project_id)
    }
}
