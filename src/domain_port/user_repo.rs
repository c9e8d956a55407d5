use crate::application_port::UserUpdate;
use crate::domain_model::*;
use crate::domain_port::repo_tx::StorageTx;
use crate::domain_port::InsertOutcome;
use chrono::{DateTime, NaiveDate, Utc};

pub const DEFAULT_AVATAR: &str = "https://cdnfiyo.github.io/img/user/avatars/default-avatar.jpg";

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub user_id: UserId,
    pub full_name: String,
    pub username: String,
    pub account_type: String,
    pub dob: Option<NaiveDate>,
    pub gender: Option<String>,
    pub profession: Option<String>,
    pub bio: Option<String>,
    pub avatar: String,
    pub banner: Option<String>,
    pub posts_count: u32,
    pub followers_count: u32,
    pub following_count: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUserRecord {
    pub user_id: UserId,
    pub full_name: String,
    pub username: String,
    pub account_type: String,
    pub dob: Option<NaiveDate>,
    pub avatar: String,
}

#[async_trait::async_trait]
pub trait UserRepo: Send + Sync {
    /// `Duplicate` when the username is taken.
    async fn create_in_tx(
        &self,
        tx: &mut dyn StorageTx,
        user: &NewUserRecord,
    ) -> anyhow::Result<InsertOutcome>;

    async fn get_by_id(&self, user_id: UserId) -> anyhow::Result<Option<UserRecord>>;

    async fn get_by_username(&self, username: &str) -> anyhow::Result<Option<UserRecord>>;

    async fn list_by_ids(&self, user_ids: &[UserId]) -> anyhow::Result<Vec<UserRecord>>;

    async fn list_page(&self, offset: PageOffset) -> anyhow::Result<Vec<UserRecord>>;

    /// Case-insensitive prefix match on full name or username.
    async fn search_prefix(
        &self,
        prefix: &str,
        offset: PageOffset,
    ) -> anyhow::Result<Vec<UserRecord>>;

    /// Applies every `Some` attribute of `update`. `None` when the user does not exist.
    async fn update_in_tx(
        &self,
        tx: &mut dyn StorageTx,
        user_id: UserId,
        update: &UserUpdate,
    ) -> anyhow::Result<Option<UserRecord>>;

    /// Deletes the user with every edge referencing it, fixing the counters of
    /// users that had a confirmed follow with it. `false` when absent.
    async fn delete_in_tx(&self, tx: &mut dyn StorageTx, user_id: UserId) -> anyhow::Result<bool>;

    /// Moves `following_count` of `follower` and `followers_count` of `followee` by `delta`.
    async fn adjust_follow_counts_in_tx(
        &self,
        tx: &mut dyn StorageTx,
        follower: UserId,
        followee: UserId,
        delta: i32,
    ) -> anyhow::Result<()>;

    async fn id_exists(&self, user_id: UserId) -> anyhow::Result<bool>;
}
