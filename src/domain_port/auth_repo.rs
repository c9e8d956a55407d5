use crate::domain_model::*;
use crate::domain_port::repo_tx::StorageTx;

#[derive(Debug, Clone)]
pub struct AuthCredentialsRecord {
    pub user_id: UserId,
    pub username: String,
    pub password_hash: String,
}

#[async_trait::async_trait]
pub trait AuthRepo: Send + Sync {
    /// Insert a row. The `user_id` row must already exist (FK).
    async fn create_credentials_in_tx(
        &self,
        tx: &mut dyn StorageTx,
        user_id: UserId,
        password_hash: &str,
    ) -> anyhow::Result<()>;

    /// Fetch credentials by username (for login).
    async fn get_by_username(&self, username: &str)
    -> anyhow::Result<Option<AuthCredentialsRecord>>;
}
