use crate::domain_model::*;
use crate::domain_port::repo_tx::StorageTx;
use crate::domain_port::{InsertOutcome, UserRecord};

/// Directed follow edges, keyed by `(follower, followee)`.
///
/// Every write is a single conditional statement so that concurrent requests for the
/// same pair cannot produce duplicates or lost transitions.
#[async_trait::async_trait]
pub trait FollowRepo: Send + Sync {
    /// Insert a pending edge if the ordered pair has none.
    async fn insert_pending(
        &self,
        follower: UserId,
        followee: UserId,
    ) -> anyhow::Result<InsertOutcome>;

    /// Pending -> confirmed. `false` when no pending edge matched.
    async fn confirm_pending_in_tx(
        &self,
        tx: &mut dyn StorageTx,
        follower: UserId,
        followee: UserId,
    ) -> anyhow::Result<bool>;

    /// Delete the edge only while pending. `false` when nothing matched.
    async fn delete_pending(&self, follower: UserId, followee: UserId) -> anyhow::Result<bool>;

    /// Delete the edge in any state, returning the state it had.
    async fn delete_in_tx(
        &self,
        tx: &mut dyn StorageTx,
        follower: UserId,
        followee: UserId,
    ) -> anyhow::Result<Option<EdgeState>>;

    async fn state(&self, follower: UserId, followee: UserId)
    -> anyhow::Result<Option<EdgeState>>;

    /// Users with a confirmed edge towards `followee`.
    async fn list_followers(
        &self,
        followee: UserId,
        offset: PageOffset,
    ) -> anyhow::Result<Vec<UserRecord>>;

    /// Users `follower` has a confirmed edge towards.
    async fn list_following(
        &self,
        follower: UserId,
        offset: PageOffset,
    ) -> anyhow::Result<Vec<UserRecord>>;

    /// Users with a pending edge towards `followee`.
    async fn list_pending(
        &self,
        followee: UserId,
        offset: PageOffset,
    ) -> anyhow::Result<Vec<UserRecord>>;
}
