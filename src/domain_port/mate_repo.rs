use crate::domain_model::*;
use crate::domain_port::{InsertOutcome, UserRecord};

/// Undirected mate edges, keyed by the canonical [`UserPair`] and carrying the
/// requesting side.
#[async_trait::async_trait]
pub trait MateRepo: Send + Sync {
    /// Insert a pending edge if the unordered pair has none.
    async fn insert_pending(
        &self,
        pair: UserPair,
        requested_by: UserId,
    ) -> anyhow::Result<InsertOutcome>;

    /// Pending -> confirmed, only for an edge requested by `requested_by`.
    async fn confirm_pending(&self, pair: UserPair, requested_by: UserId) -> anyhow::Result<bool>;

    /// Delete a pending edge requested by `requested_by`.
    async fn delete_pending(&self, pair: UserPair, requested_by: UserId) -> anyhow::Result<bool>;

    /// Delete the pair's edge in any state and orientation.
    async fn delete(&self, pair: UserPair) -> anyhow::Result<bool>;

    async fn state(&self, pair: UserPair) -> anyhow::Result<Option<EdgeState>>;

    /// The other side of every confirmed edge involving `user`.
    async fn list_mates(&self, user: UserId, offset: PageOffset)
    -> anyhow::Result<Vec<UserRecord>>;

    /// Requesters of pending edges addressed to `user`.
    async fn list_pending(
        &self,
        user: UserId,
        offset: PageOffset,
    ) -> anyhow::Result<Vec<UserRecord>>;
}
