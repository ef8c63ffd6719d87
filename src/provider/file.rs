use super::{require_unique_name, DataProvider, ProviderError, Tables};
use crate::model::{Comment, Criterion, Judge, Project, Rating};
use atomic_write_file::AtomicWriteFile;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

const STORE_VERSION: u32 = 1;

/// Get the default local store path (~/.config/challenge-hub/store.json)
pub fn get_store_path() -> PathBuf {
    crate::config::get_config_dir().join("store.json")
}

/// Local JSON-file backend.
///
/// Ratings and comments live in maps keyed by their unique (project, judge,
/// criterion) / (project, judge) keys, so an upsert replaces the previous
/// entry in place. Every mutation rewrites the file atomically.
#[derive(Clone, Debug)]
pub struct FileProvider {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

trait Keyed {
    type Key: Ord;
    fn store_key(&self) -> Self::Key;
}

impl Keyed for Rating {
    type Key = (String, String, String);
    fn store_key(&self) -> Self::Key {
        self.key()
    }
}

impl Keyed for Comment {
    type Key = (String, String);
    fn store_key(&self) -> Self::Key {
        self.key()
    }
}

/// Serialize keyed maps as plain arrays; on load a later duplicate wins
mod keyed {
    use super::Keyed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S, T>(map: &BTreeMap<T::Key, T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Keyed + Serialize,
    {
        serializer.collect_seq(map.values())
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<BTreeMap<T::Key, T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Keyed + Deserialize<'de>,
    {
        let rows = Vec::<T>::deserialize(deserializer)?;
        Ok(rows.into_iter().map(|row| (row.store_key(), row)).collect())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Store {
    version: u32,
    #[serde(default)]
    next_id: u64,
    #[serde(default)]
    projects: Vec<Project>,
    #[serde(default)]
    criteria: Vec<Criterion>,
    #[serde(default)]
    judges: Vec<Judge>,
    #[serde(default, with = "keyed")]
    ratings: BTreeMap<(String, String, String), Rating>,
    #[serde(default, with = "keyed")]
    comments: BTreeMap<(String, String), Comment>,
}

impl Store {
    fn new() -> Self {
        Self {
            version: STORE_VERSION,
            next_id: 0,
            projects: Vec::new(),
            criteria: Vec::new(),
            judges: Vec::new(),
            ratings: BTreeMap::new(),
            comments: BTreeMap::new(),
        }
    }

    fn allocate_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }
}

fn load_store(path: &Path) -> Result<Store, ProviderError> {
    if !path.exists() {
        return Ok(Store::new());
    }

    let file = File::open(path)?;
    let store: Store = serde_json::from_reader(file)?;

    if store.version != STORE_VERSION {
        return Err(ProviderError::Invalid(format!(
            "unsupported store version {} in {}",
            store.version,
            path.display()
        )));
    }

    Ok(store)
}

fn save_store(path: &Path, store: &Store) -> Result<(), ProviderError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = AtomicWriteFile::open(path)?;
    serde_json::to_writer_pretty(&mut file, store)?;
    file.commit()?;

    Ok(())
}

fn sorted_by_name<T: Clone>(items: &[T], name: impl Fn(&T) -> &str) -> Vec<T> {
    let mut items = items.to_vec();
    items.sort_by(|a, b| name(a).cmp(name(b)));
    items
}

impl FileProvider {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read<T>(&self, f: impl FnOnce(&Store) -> T) -> Result<T, ProviderError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let store = load_store(&self.path)?;
        Ok(f(&store))
    }

    /// Load, mutate and atomically rewrite the store under the lock
    fn mutate(&self, f: impl FnOnce(&mut Store) -> Result<(), ProviderError>) -> Result<(), ProviderError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut store = load_store(&self.path)?;
        f(&mut store)?;
        save_store(&self.path, &store)
    }
}

impl DataProvider for FileProvider {
    async fn list_projects(&self) -> Result<Vec<Project>, ProviderError> {
        self.read(|s| sorted_by_name(&s.projects, |p| &p.name))
    }

    async fn list_criteria(&self) -> Result<Vec<Criterion>, ProviderError> {
        self.read(|s| sorted_by_name(&s.criteria, |c| &c.name))
    }

    async fn list_judges(&self) -> Result<Vec<Judge>, ProviderError> {
        self.read(|s| sorted_by_name(&s.judges, |j| &j.name))
    }

    async fn list_ratings(&self) -> Result<Vec<Rating>, ProviderError> {
        self.read(|s| s.ratings.values().cloned().collect())
    }

    async fn list_comments(&self) -> Result<Vec<Comment>, ProviderError> {
        self.read(|s| s.comments.values().cloned().collect())
    }

    async fn read_all(&self) -> Result<Tables, ProviderError> {
        self.read(|s| Tables {
            projects: sorted_by_name(&s.projects, |p| &p.name),
            criteria: sorted_by_name(&s.criteria, |c| &c.name),
            judges: sorted_by_name(&s.judges, |j| &j.name),
            ratings: s.ratings.values().cloned().collect(),
            comments: s.comments.values().cloned().collect(),
        })
    }

    async fn add_project(&self, name: &str) -> Result<(), ProviderError> {
        self.mutate(|store| {
            let name = require_unique_name("project", name, store.projects.iter().map(|p| p.name.as_str()))?;
            let id = store.allocate_id("p");
            store.projects.push(Project { id, name });
            Ok(())
        })
    }

    async fn add_criterion(&self, name: &str) -> Result<(), ProviderError> {
        self.mutate(|store| {
            let name = require_unique_name("criterion", name, store.criteria.iter().map(|c| c.name.as_str()))?;
            let id = store.allocate_id("c");
            store.criteria.push(Criterion { id, name });
            Ok(())
        })
    }

    async fn add_judge(&self, name: &str, password: &str) -> Result<(), ProviderError> {
        if password.is_empty() {
            return Err(ProviderError::Invalid("judge password cannot be empty".to_string()));
        }
        self.mutate(|store| {
            let name = require_unique_name("judge", name, store.judges.iter().map(|j| j.name.as_str()))?;
            let id = store.allocate_id("j");
            store.judges.push(Judge {
                id,
                name,
                password_hash: password.to_string(),
            });
            Ok(())
        })
    }

    async fn delete_project(&self, id: &str) -> Result<(), ProviderError> {
        self.mutate(|store| {
            let before = store.projects.len();
            store.projects.retain(|p| p.id != id);
            if store.projects.len() == before {
                return Err(ProviderError::NotFound { kind: "project", id: id.to_string() });
            }
            store.ratings.retain(|_, r| r.project_id != id);
            store.comments.retain(|_, c| c.project_id != id);
            Ok(())
        })
    }

    async fn delete_criterion(&self, id: &str) -> Result<(), ProviderError> {
        self.mutate(|store| {
            let before = store.criteria.len();
            store.criteria.retain(|c| c.id != id);
            if store.criteria.len() == before {
                return Err(ProviderError::NotFound { kind: "criterion", id: id.to_string() });
            }
            store.ratings.retain(|_, r| r.criterion_id != id);
            Ok(())
        })
    }

    async fn delete_judge(&self, id: &str) -> Result<(), ProviderError> {
        self.mutate(|store| {
            let before = store.judges.len();
            store.judges.retain(|j| j.id != id);
            if store.judges.len() == before {
                return Err(ProviderError::NotFound { kind: "judge", id: id.to_string() });
            }
            store.ratings.retain(|_, r| r.judge_id != id);
            store.comments.retain(|_, c| c.judge_id != id);
            Ok(())
        })
    }

    async fn upsert_rating(&self, rating: &Rating) -> Result<(), ProviderError> {
        crate::scoring::validate_score(rating.score).map_err(ProviderError::Invalid)?;
        self.mutate(|store| {
            if !store.projects.iter().any(|p| p.id == rating.project_id) {
                return Err(ProviderError::NotFound { kind: "project", id: rating.project_id.clone() });
            }
            if !store.judges.iter().any(|j| j.id == rating.judge_id) {
                return Err(ProviderError::NotFound { kind: "judge", id: rating.judge_id.clone() });
            }
            if !store.criteria.iter().any(|c| c.id == rating.criterion_id) {
                return Err(ProviderError::NotFound { kind: "criterion", id: rating.criterion_id.clone() });
            }
            store.ratings.insert(rating.key(), rating.clone());
            Ok(())
        })
    }

    async fn upsert_comment(&self, comment: &Comment) -> Result<(), ProviderError> {
        self.mutate(|store| {
            if !store.projects.iter().any(|p| p.id == comment.project_id) {
                return Err(ProviderError::NotFound { kind: "project", id: comment.project_id.clone() });
            }
            if !store.judges.iter().any(|j| j.id == comment.judge_id) {
                return Err(ProviderError::NotFound { kind: "judge", id: comment.judge_id.clone() });
            }
            store.comments.insert(comment.key(), comment.clone());
            Ok(())
        })
    }

    async fn reset_evaluations(&self) -> Result<(), ProviderError> {
        self.mutate(|store| {
            store.ratings.clear();
            store.comments.clear();
            Ok(())
        })
    }
}
