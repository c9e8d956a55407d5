use super::memory_db::{MemoryDb, MemoryState, UserRow, downcast};
use crate::application_port::UserUpdate;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::Utc;

pub struct MemoryUserRepo {
    db: MemoryDb,
}

impl MemoryUserRepo {
    pub fn new(db: MemoryDb) -> Self {
        Self { db }
    }
}

fn apply_update(record: &mut UserRecord, update: &UserUpdate) {
    if let Some(v) = &update.full_name {
        record.full_name = v.clone();
    }
    if let Some(v) = &update.account_type {
        record.account_type = v.clone();
    }
    if let Some(v) = update.dob {
        record.dob = Some(v);
    }
    if let Some(v) = &update.gender {
        record.gender = Some(v.clone());
    }
    if let Some(v) = &update.profession {
        record.profession = Some(v.clone());
    }
    if let Some(v) = &update.bio {
        record.bio = Some(v.clone());
    }
    if let Some(v) = &update.avatar {
        record.avatar = v.clone();
    }
    if let Some(v) = &update.banner {
        record.banner = Some(v.clone());
    }
}

/// Removes `user_id` and everything that references it, keeping counters consistent.
fn cascade_delete(state: &mut MemoryState, user_id: UserId) -> bool {
    if state.users.remove(&user_id).is_none() {
        return false;
    }
    state.credentials.remove(&user_id);

    let edges: Vec<((UserId, UserId), EdgeState)> = state
        .follows
        .iter()
        .filter(|((follower, followee), _)| *follower == user_id || *followee == user_id)
        .map(|(key, row)| (*key, row.state))
        .collect();
    for ((follower, followee), edge_state) in edges {
        state.follows.remove(&(follower, followee));
        if edge_state.is_confirmed() {
            state.bump_following(follower, -1);
            state.bump_followers(followee, -1);
        }
    }

    state.mates.retain(|pair, _| !pair.contains(user_id));
    true
}

#[async_trait::async_trait]
impl UserRepo for MemoryUserRepo {
    async fn create_in_tx(
        &self,
        tx: &mut dyn StorageTx,
        user: &NewUserRecord,
    ) -> anyhow::Result<InsertOutcome> {
        let state = downcast(tx)?.state();

        let taken = state.users.contains_key(&user.user_id)
            || state
                .users
                .values()
                .any(|row| row.record.username == user.username);
        if taken {
            return Ok(InsertOutcome::Duplicate);
        }

        let seq = state.next_seq();
        let record = UserRecord {
            user_id: user.user_id,
            full_name: user.full_name.clone(),
            username: user.username.clone(),
            account_type: user.account_type.clone(),
            dob: user.dob,
            gender: None,
            profession: None,
            bio: None,
            avatar: user.avatar.clone(),
            banner: None,
            posts_count: 0,
            followers_count: 0,
            following_count: 0,
            created_at: Utc::now(),
        };
        state.users.insert(user.user_id, UserRow { seq, record });

        Ok(InsertOutcome::Inserted)
    }

    async fn get_by_id(&self, user_id: UserId) -> anyhow::Result<Option<UserRecord>> {
        let state = self.db.lock().await;
        Ok(state.users.get(&user_id).map(|row| row.record.clone()))
    }

    async fn get_by_username(&self, username: &str) -> anyhow::Result<Option<UserRecord>> {
        let state = self.db.lock().await;
        Ok(state
            .users
            .values()
            .find(|row| row.record.username == username)
            .map(|row| row.record.clone()))
    }

    async fn list_by_ids(&self, user_ids: &[UserId]) -> anyhow::Result<Vec<UserRecord>> {
        let state = self.db.lock().await;
        let mut rows: Vec<&UserRow> = user_ids
            .iter()
            .filter_map(|user_id| state.users.get(user_id))
            .collect();
        rows.sort_by_key(|row| (row.seq, row.record.user_id));
        rows.dedup_by_key(|row| row.record.user_id);

        Ok(rows.into_iter().map(|row| row.record.clone()).collect())
    }

    async fn list_page(&self, offset: PageOffset) -> anyhow::Result<Vec<UserRecord>> {
        let state = self.db.lock().await;
        let entries = state
            .users
            .values()
            .map(|row| (row.seq, row.record.user_id))
            .collect();

        Ok(state.page_of_users(entries, offset))
    }

    async fn search_prefix(
        &self,
        prefix: &str,
        offset: PageOffset,
    ) -> anyhow::Result<Vec<UserRecord>> {
        let prefix = prefix.to_lowercase();
        let state = self.db.lock().await;

        let mut matches: Vec<&UserRecord> = state
            .users
            .values()
            .map(|row| &row.record)
            .filter(|record| {
                record.full_name.to_lowercase().starts_with(&prefix)
                    || record.username.to_lowercase().starts_with(&prefix)
            })
            .collect();
        matches.sort_by_cached_key(|record| (record.username.to_lowercase(), record.user_id));

        Ok(offset.window(matches).into_iter().cloned().collect())
    }

    async fn update_in_tx(
        &self,
        tx: &mut dyn StorageTx,
        user_id: UserId,
        update: &UserUpdate,
    ) -> anyhow::Result<Option<UserRecord>> {
        let state = downcast(tx)?.state();

        Ok(state.users.get_mut(&user_id).map(|row| {
            apply_update(&mut row.record, update);
            row.record.clone()
        }))
    }

    async fn delete_in_tx(&self, tx: &mut dyn StorageTx, user_id: UserId) -> anyhow::Result<bool> {
        let state = downcast(tx)?.state();
        Ok(cascade_delete(state, user_id))
    }

    async fn adjust_follow_counts_in_tx(
        &self,
        tx: &mut dyn StorageTx,
        follower: UserId,
        followee: UserId,
        delta: i32,
    ) -> anyhow::Result<()> {
        let state = downcast(tx)?.state();
        state.bump_following(follower, delta);
        state.bump_followers(followee, delta);
        Ok(())
    }

    async fn id_exists(&self, user_id: UserId) -> anyhow::Result<bool> {
        Ok(self.db.lock().await.user_exists(user_id))
    }
}
