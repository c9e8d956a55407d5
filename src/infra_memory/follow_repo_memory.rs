use super::memory_db::{FollowRow, MemoryDb, downcast};
use crate::domain_model::*;
use crate::domain_port::*;
use std::collections::hash_map::Entry;

pub struct MemoryFollowRepo {
    db: MemoryDb,
}

impl MemoryFollowRepo {
    pub fn new(db: MemoryDb) -> Self {
        Self { db }
    }

    async fn page(
        &self,
        offset: PageOffset,
        select: impl Fn(&(UserId, UserId), &FollowRow) -> Option<UserId>,
    ) -> Vec<UserRecord> {
        let state = self.db.lock().await;
        let entries = state
            .follows
            .iter()
            .filter_map(|(key, row)| select(key, row).map(|user_id| (row.seq, user_id)))
            .collect();
        state.page_of_users(entries, offset)
    }
}

#[async_trait::async_trait]
impl FollowRepo for MemoryFollowRepo {
    async fn insert_pending(
        &self,
        follower: UserId,
        followee: UserId,
    ) -> anyhow::Result<InsertOutcome> {
        let mut state = self.db.lock().await;
        if !state.user_exists(follower) || !state.user_exists(followee) {
            return Ok(InsertOutcome::MissingReference);
        }

        let seq = state.next_seq();
        match state.follows.entry((follower, followee)) {
            Entry::Occupied(_) => Ok(InsertOutcome::Duplicate),
            Entry::Vacant(slot) => {
                slot.insert(FollowRow {
                    seq,
                    state: EdgeState::Pending,
                });
                Ok(InsertOutcome::Inserted)
            }
        }
    }

    async fn confirm_pending_in_tx(
        &self,
        tx: &mut dyn StorageTx,
        follower: UserId,
        followee: UserId,
    ) -> anyhow::Result<bool> {
        let state = downcast(tx)?.state();
        match state.follows.get_mut(&(follower, followee)) {
            Some(row) if row.state == EdgeState::Pending => {
                row.state = EdgeState::Confirmed;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_pending(&self, follower: UserId, followee: UserId) -> anyhow::Result<bool> {
        let mut state = self.db.lock().await;
        let key = (follower, followee);
        if state.follows.get(&key).map(|row| row.state) == Some(EdgeState::Pending) {
            state.follows.remove(&key);
            return Ok(true);
        }
        Ok(false)
    }

    async fn delete_in_tx(
        &self,
        tx: &mut dyn StorageTx,
        follower: UserId,
        followee: UserId,
    ) -> anyhow::Result<Option<EdgeState>> {
        let state = downcast(tx)?.state();
        Ok(state
            .follows
            .remove(&(follower, followee))
            .map(|row| row.state))
    }

    async fn state(
        &self,
        follower: UserId,
        followee: UserId,
    ) -> anyhow::Result<Option<EdgeState>> {
        let state = self.db.lock().await;
        Ok(state.follows.get(&(follower, followee)).map(|row| row.state))
    }

    async fn list_followers(
        &self,
        followee: UserId,
        offset: PageOffset,
    ) -> anyhow::Result<Vec<UserRecord>> {
        Ok(self
            .page(offset, |&(from, to), row| {
                (to == followee && row.state.is_confirmed()).then_some(from)
            })
            .await)
    }

    async fn list_following(
        &self,
        follower: UserId,
        offset: PageOffset,
    ) -> anyhow::Result<Vec<UserRecord>> {
        Ok(self
            .page(offset, |&(from, to), row| {
                (from == follower && row.state.is_confirmed()).then_some(to)
            })
            .await)
    }

    async fn list_pending(
        &self,
        followee: UserId,
        offset: PageOffset,
    ) -> anyhow::Result<Vec<UserRecord>> {
        Ok(self
            .page(offset, |&(from, to), row| {
                (to == followee && row.state == EdgeState::Pending).then_some(from)
            })
            .await)
    }
}
