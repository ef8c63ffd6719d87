pub mod storage;
pub mod types;

pub use storage::{get_session_path, load_session, save_session};
pub use types::{Identity, Session};
