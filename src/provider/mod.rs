pub mod cache;
pub mod file;
pub mod rest;

pub use file::FileProvider;
pub use rest::RestProvider;

use crate::config::{BackendKind, Config};
use crate::model::{Comment, Criterion, Judge, Project, Rating};
use std::future::Future;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Backend rejected the API key ({0}). Check credentials")]
    Unauthorized(String),

    #[error("Request to '{table}' failed with HTTP {status}: {message}")]
    Status {
        table: String,
        status: u16,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("No {kind} with id '{id}'")]
    NotFound { kind: &'static str, id: String },

    #[error("A {kind} named '{name}' already exists")]
    Duplicate { kind: &'static str, name: String },

    #[error("Invalid input: {0}")]
    Invalid(String),

    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed data: {0}")]
    Json(#[from] serde_json::Error),
}

/// Every table of the backend, read together
#[derive(Debug, Clone, PartialEq)]
pub struct Tables {
    pub projects: Vec<Project>,
    pub criteria: Vec<Criterion>,
    pub judges: Vec<Judge>,
    pub ratings: Vec<Rating>,
    pub comments: Vec<Comment>,
}

/// The external data provider.
///
/// List calls return a best-effort current snapshot. Upserts keep exactly one
/// current rating per (project, judge, criterion) and one comment per
/// (project, judge).
pub trait DataProvider: Send + Sync {
    fn list_projects(&self) -> impl Future<Output = Result<Vec<Project>, ProviderError>> + Send;
    fn list_criteria(&self) -> impl Future<Output = Result<Vec<Criterion>, ProviderError>> + Send;
    fn list_judges(&self) -> impl Future<Output = Result<Vec<Judge>, ProviderError>> + Send;
    fn list_ratings(&self) -> impl Future<Output = Result<Vec<Rating>, ProviderError>> + Send;
    fn list_comments(&self) -> impl Future<Output = Result<Vec<Comment>, ProviderError>> + Send;

    /// Read all five tables. Fails as a whole if any list call fails.
    ///
    /// Backends that can read everything under one lock or transaction
    /// override this so no write lands between the tables.
    fn read_all(&self) -> impl Future<Output = Result<Tables, ProviderError>> + Send {
        async move {
            let (projects, criteria, judges, ratings, comments) = tokio::try_join!(
                self.list_projects(),
                self.list_criteria(),
                self.list_judges(),
                self.list_ratings(),
                self.list_comments(),
            )?;
            Ok(Tables {
                projects,
                criteria,
                judges,
                ratings,
                comments,
            })
        }
    }

    fn add_project(&self, name: &str) -> impl Future<Output = Result<(), ProviderError>> + Send;
    fn add_criterion(&self, name: &str) -> impl Future<Output = Result<(), ProviderError>> + Send;
    fn add_judge(
        &self,
        name: &str,
        password: &str,
    ) -> impl Future<Output = Result<(), ProviderError>> + Send;

    fn delete_project(&self, id: &str) -> impl Future<Output = Result<(), ProviderError>> + Send;
    fn delete_criterion(&self, id: &str) -> impl Future<Output = Result<(), ProviderError>> + Send;
    fn delete_judge(&self, id: &str) -> impl Future<Output = Result<(), ProviderError>> + Send;

    fn upsert_rating(&self, rating: &Rating) -> impl Future<Output = Result<(), ProviderError>> + Send;
    fn upsert_comment(
        &self,
        comment: &Comment,
    ) -> impl Future<Output = Result<(), ProviderError>> + Send;

    /// Delete every rating and comment
    fn reset_evaluations(&self) -> impl Future<Output = Result<(), ProviderError>> + Send;
}

/// Trim a new catalog name and reject it if empty or already taken,
/// ignoring case
pub(crate) fn require_unique_name<'a>(
    kind: &'static str,
    name: &str,
    mut existing: impl Iterator<Item = &'a str>,
) -> Result<String, ProviderError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ProviderError::Invalid(format!("{} name cannot be empty", kind)));
    }
    if existing.any(|n| n.eq_ignore_ascii_case(name)) {
        return Err(ProviderError::Duplicate {
            kind,
            name: name.to_string(),
        });
    }
    Ok(name.to_string())
}

/// The configured backend
#[derive(Clone, Debug)]
pub enum Backend {
    Rest(RestProvider),
    File(FileProvider),
}

/// Build the provider selected in config.
///
/// `api_key` is only used by the hosted backend.
pub fn create_provider(config: &Config, api_key: Option<&str>) -> anyhow::Result<Backend> {
    let backend = &config.backend;
    match backend.kind {
        BackendKind::Rest => {
            let url = backend
                .url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("backend.url is required for the rest backend"))?;
            let key = api_key.ok_or_else(|| anyhow::anyhow!("No API key for {}", url))?;
            Ok(Backend::Rest(RestProvider::new(url, key)?))
        }
        BackendKind::File => {
            let path = backend.path.clone().unwrap_or_else(file::get_store_path);
            Ok(Backend::File(FileProvider::new(path)))
        }
    }
}

macro_rules! dispatch {
    ($self:ident, $p:ident => $call:expr) => {
        match $self {
            Backend::Rest($p) => $call.await,
            Backend::File($p) => $call.await,
        }
    };
}

impl DataProvider for Backend {
    async fn list_projects(&self) -> Result<Vec<Project>, ProviderError> {
        dispatch!(self, p => p.list_projects())
    }

    async fn list_criteria(&self) -> Result<Vec<Criterion>, ProviderError> {
        dispatch!(self, p => p.list_criteria())
    }

    async fn list_judges(&self) -> Result<Vec<Judge>, ProviderError> {
        dispatch!(self, p => p.list_judges())
    }

    async fn list_ratings(&self) -> Result<Vec<Rating>, ProviderError> {
        dispatch!(self, p => p.list_ratings())
    }

    async fn list_comments(&self) -> Result<Vec<Comment>, ProviderError> {
        dispatch!(self, p => p.list_comments())
    }

    async fn read_all(&self) -> Result<Tables, ProviderError> {
        dispatch!(self, p => p.read_all())
    }

    async fn add_project(&self, name: &str) -> Result<(), ProviderError> {
        dispatch!(self, p => p.add_project(name))
    }

    async fn add_criterion(&self, name: &str) -> Result<(), ProviderError> {
        dispatch!(self, p => p.add_criterion(name))
    }

    async fn add_judge(&self, name: &str, password: &str) -> Result<(), ProviderError> {
        dispatch!(self, p => p.add_judge(name, password))
    }

    async fn delete_project(&self, id: &str) -> Result<(), ProviderError> {
        dispatch!(self, p => p.delete_project(id))
    }

    async fn delete_criterion(&self, id: &str) -> Result<(), ProviderError> {
        dispatch!(self, p => p.delete_criterion(id))
    }

    async fn delete_judge(&self, id: &str) -> Result<(), ProviderError> {
        dispatch!(self, p => p.delete_judge(id))
    }

    async fn upsert_rating(&self, rating: &Rating) -> Result<(), ProviderError> {
        dispatch!(self, p => p.upsert_rating(rating))
    }

    async fn upsert_comment(&self, comment: &Comment) -> Result<(), ProviderError> {
        dispatch!(self, p => p.upsert_comment(comment))
    }

    async fn reset_evaluations(&self) -> Result<(), ProviderError> {
        dispatch!(self, p => p.reset_evaluations())
    }
}

impl Backend {
    /// Short description for logs and the title bar
    pub fn describe(&self) -> String {
        match self {
            Backend::Rest(p) => p.base_url().to_string(),
            Backend::File(p) => p.path().display().to_string(),
        }
    }
}
