//! In-process storage backend. Selected with `storage.backend = "memory"` and used by
//! the test suites; it honours the same uniqueness and cascade rules as the MySQL schema.

mod auth_repo_memory;
mod follow_repo_memory;
mod mate_repo_memory;
mod memory_db;
mod user_repo_memory;

pub use auth_repo_memory::*;
pub use follow_repo_memory::*;
pub use mate_repo_memory::*;
pub use memory_db::*;
pub use user_repo_memory::*;
