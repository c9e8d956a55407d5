use crate::domain_model::*;
use crate::domain_port::*;
use anyhow::anyhow;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, OwnedMutexGuard};

#[derive(Debug, Clone)]
pub(super) struct UserRow {
    pub seq: u64,
    pub record: UserRecord,
}

#[derive(Debug, Clone, Copy)]
pub(super) struct FollowRow {
    pub seq: u64,
    pub state: EdgeState,
}

#[derive(Debug, Clone, Copy)]
pub(super) struct MateRow {
    pub seq: u64,
    pub requested_by: UserId,
    pub state: EdgeState,
}

#[derive(Debug, Clone, Default)]
pub(super) struct MemoryState {
    seq: u64,
    pub users: HashMap<UserId, UserRow>,
    pub credentials: HashMap<UserId, String>,
    pub follows: HashMap<(UserId, UserId), FollowRow>,
    pub mates: HashMap<UserPair, MateRow>,
}

impl MemoryState {
    pub fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    pub fn user_exists(&self, user_id: UserId) -> bool {
        self.users.contains_key(&user_id)
    }

    /// Records of `entries` ordered by `(seq, user id)` and windowed by `offset`.
    pub fn page_of_users(
        &self,
        mut entries: Vec<(u64, UserId)>,
        offset: PageOffset,
    ) -> Vec<UserRecord> {
        entries.sort();
        offset
            .window(entries)
            .into_iter()
            .filter_map(|(_, user_id)| self.users.get(&user_id))
            .map(|row| row.record.clone())
            .collect()
    }

    pub fn bump_following(&mut self, user_id: UserId, delta: i32) {
        if let Some(row) = self.users.get_mut(&user_id) {
            row.record.following_count = row.record.following_count.saturating_add_signed(delta);
        }
    }

    pub fn bump_followers(&mut self, user_id: UserId, delta: i32) {
        if let Some(row) = self.users.get_mut(&user_id) {
            row.record.followers_count = row.record.followers_count.saturating_add_signed(delta);
        }
    }
}

/// Shared handle to the in-memory tables.
#[derive(Clone, Default)]
pub struct MemoryDb {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub(super) async fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().await
    }
}

pub struct MemoryTxManager {
    db: MemoryDb,
}

impl MemoryTxManager {
    pub fn new(db: MemoryDb) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl TxManager for MemoryTxManager {
    async fn begin(&self) -> anyhow::Result<Box<dyn StorageTx>> {
        let guard = self.db.state.clone().lock_owned().await;
        let snapshot = guard.clone();
        Ok(Box::new(MemoryTx {
            guard,
            snapshot: Some(snapshot),
        }))
    }
}

/// Holds the table lock for its whole life; restores the snapshot unless committed.
pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    snapshot: Option<MemoryState>,
}

impl MemoryTx {
    pub(super) fn state(&mut self) -> &mut MemoryState {
        &mut *self.guard
    }
}

impl Drop for MemoryTx {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            *self.guard = snapshot;
        }
    }
}

#[async_trait::async_trait]
impl StorageTx for MemoryTx {
    fn as_any_mut(&mut self) -> &mut (dyn Any + Send) {
        self
    }

    async fn commit(mut self: Box<Self>) -> anyhow::Result<()> {
        self.snapshot = None;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> anyhow::Result<()> {
        Ok(())
    }
}

pub(super) fn downcast(tx: &mut dyn StorageTx) -> anyhow::Result<&mut MemoryTx> {
    tx.as_any_mut()
        .downcast_mut::<MemoryTx>()
        .ok_or_else(|| anyhow!("transaction was not opened by the memory backend"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra_memory::MemoryUserRepo;

    fn new_user(username: &str) -> NewUserRecord {
        NewUserRecord {
            user_id: UserId::new_v4(),
            full_name: username.to_string(),
            username: username.to_string(),
            account_type: "personal".to_string(),
            dob: None,
            avatar: DEFAULT_AVATAR.to_string(),
        }
    }

    #[tokio::test]
    async fn uncommitted_writes_are_discarded() {
        let db = MemoryDb::new();
        let tx_manager = MemoryTxManager::new(db.clone());
        let repo = MemoryUserRepo::new(db.clone());

        let dropped = new_user("dropped");
        {
            let mut tx = tx_manager.begin().await.unwrap();
            repo.create_in_tx(&mut *tx, &dropped).await.unwrap();
        }
        let rolled_back = new_user("rolled_back");
        let mut tx = tx_manager.begin().await.unwrap();
        repo.create_in_tx(&mut *tx, &rolled_back).await.unwrap();
        tx.rollback().await.unwrap();

        assert!(!repo.id_exists(dropped.user_id).await.unwrap());
        assert!(!repo.id_exists(rolled_back.user_id).await.unwrap());
    }

    #[tokio::test]
    async fn committed_writes_are_visible() {
        let db = MemoryDb::new();
        let tx_manager = MemoryTxManager::new(db.clone());
        let repo = MemoryUserRepo::new(db.clone());

        let kept = new_user("kept");
        let mut tx = tx_manager.begin().await.unwrap();
        assert_eq!(
            repo.create_in_tx(&mut *tx, &kept).await.unwrap(),
            InsertOutcome::Inserted
        );
        tx.commit().await.unwrap();

        assert!(repo.id_exists(kept.user_id).await.unwrap());
    }
}
