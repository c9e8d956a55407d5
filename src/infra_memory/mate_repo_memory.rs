use super::memory_db::{MateRow, MemoryDb};
use crate::domain_model::*;
use crate::domain_port::*;
use std::collections::hash_map::Entry;

pub struct MemoryMateRepo {
    db: MemoryDb,
}

impl MemoryMateRepo {
    pub fn new(db: MemoryDb) -> Self {
        Self { db }
    }

    async fn page(
        &self,
        offset: PageOffset,
        select: impl Fn(&UserPair, &MateRow) -> Option<UserId>,
    ) -> Vec<UserRecord> {
        let state = self.db.lock().await;
        let entries = state
            .mates
            .iter()
            .filter_map(|(pair, row)| select(pair, row).map(|user_id| (row.seq, user_id)))
            .collect();
        state.page_of_users(entries, offset)
    }
}

#[async_trait::async_trait]
impl MateRepo for MemoryMateRepo {
    async fn insert_pending(
        &self,
        pair: UserPair,
        requested_by: UserId,
    ) -> anyhow::Result<InsertOutcome> {
        let mut state = self.db.lock().await;
        if !state.user_exists(pair.min()) || !state.user_exists(pair.max()) {
            return Ok(InsertOutcome::MissingReference);
        }

        let seq = state.next_seq();
        match state.mates.entry(pair) {
            Entry::Occupied(_) => Ok(InsertOutcome::Duplicate),
            Entry::Vacant(slot) => {
                slot.insert(MateRow {
                    seq,
                    requested_by,
                    state: EdgeState::Pending,
                });
                Ok(InsertOutcome::Inserted)
            }
        }
    }

    async fn confirm_pending(&self, pair: UserPair, requested_by: UserId) -> anyhow::Result<bool> {
        let mut state = self.db.lock().await;
        match state.mates.get_mut(&pair) {
            Some(row) if row.requested_by == requested_by && row.state == EdgeState::Pending => {
                row.state = EdgeState::Confirmed;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_pending(&self, pair: UserPair, requested_by: UserId) -> anyhow::Result<bool> {
        let mut state = self.db.lock().await;
        let matches = state
            .mates
            .get(&pair)
            .is_some_and(|row| row.requested_by == requested_by && row.state == EdgeState::Pending);
        if matches {
            state.mates.remove(&pair);
        }
        Ok(matches)
    }

    async fn delete(&self, pair: UserPair) -> anyhow::Result<bool> {
        Ok(self.db.lock().await.mates.remove(&pair).is_some())
    }

    async fn state(&self, pair: UserPair) -> anyhow::Result<Option<EdgeState>> {
        Ok(self.db.lock().await.mates.get(&pair).map(|row| row.state))
    }

    async fn list_mates(
        &self,
        user: UserId,
        offset: PageOffset,
    ) -> anyhow::Result<Vec<UserRecord>> {
        Ok(self
            .page(offset, |pair, row| {
                (pair.contains(user) && row.state.is_confirmed()).then(|| pair.other(user))
            })
            .await)
    }

    async fn list_pending(
        &self,
        user: UserId,
        offset: PageOffset,
    ) -> anyhow::Result<Vec<UserRecord>> {
        Ok(self
            .page(offset, |pair, row| {
                (pair.contains(user) && row.requested_by != user && row.state == EdgeState::Pending)
                    .then_some(row.requested_by)
            })
            .await)
    }
}
