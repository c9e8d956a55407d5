use super::memory_db::{MemoryDb, downcast};
use crate::domain_model::*;
use crate::domain_port::*;
use anyhow::bail;

pub struct MemoryAuthRepo {
    db: MemoryDb,
}

impl MemoryAuthRepo {
    pub fn new(db: MemoryDb) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl AuthRepo for MemoryAuthRepo {
    async fn create_credentials_in_tx(
        &self,
        tx: &mut dyn StorageTx,
        user_id: UserId,
        password_hash: &str,
    ) -> anyhow::Result<()> {
        let state = downcast(tx)?.state();
        if !state.user_exists(user_id) {
            bail!("insert credentials: user {user_id} does not exist");
        }
        if state.credentials.contains_key(&user_id) {
            bail!("insert credentials: duplicate entry for {user_id}");
        }
        state.credentials.insert(user_id, password_hash.to_string());
        Ok(())
    }

    async fn get_by_username(
        &self,
        username: &str,
    ) -> anyhow::Result<Option<AuthCredentialsRecord>> {
        let state = self.db.lock().await;
        let record = state
            .users
            .values()
            .find(|row| row.record.username == username)
            .and_then(|row| {
                let user_id = row.record.user_id;
                state
                    .credentials
                    .get(&user_id)
                    .map(|password_hash| AuthCredentialsRecord {
                        user_id,
                        username: row.record.username.clone(),
                        password_hash: password_hash.clone(),
                    })
            });
        Ok(record)
    }
}
