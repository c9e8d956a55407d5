mod auth_repo_mysql;
mod follow_repo_mysql;
mod mate_repo_mysql;
mod user_repo_mysql;

pub use auth_repo_mysql::*;
pub use follow_repo_mysql::*;
pub use mate_repo_mysql::*;
pub use user_repo_mysql::*;

mod repo_tx_mysql;

pub use repo_tx_mysql::*;

mod util;

/// Schema migrations embedded from `migrations/`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
