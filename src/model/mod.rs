pub mod types;

pub use types::{Comment, Criterion, Judge, Project, Rating, Snapshot};
