mod auth_repo;
mod follow_repo;
mod mate_repo;
mod user_repo;

mod repo_tx;
mod write_outcome;

pub use auth_repo::*;
pub use follow_repo::*;
pub use mate_repo::*;
pub use user_repo::*;

pub use repo_tx::*;
pub use write_outcome::*;
