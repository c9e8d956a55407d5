use crate::domain_model::*;
use crate::domain_port::UserRecord;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("user not found")]
    NotFound,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("store error: {0}")]
    Store(String),
}

/// Profile attributes a user may change on their own record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserUpdate {
    pub full_name: Option<String>,
    pub account_type: Option<String>,
    pub dob: Option<NaiveDate>,
    pub gender: Option<String>,
    pub profession: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub banner: Option<String>,
}

impl UserUpdate {
    /// The attributes this update writes.
    pub fn touched_fields(&self) -> FieldSelection {
        let touched = [
            (self.full_name.is_some(), UserField::FullName),
            (self.account_type.is_some(), UserField::AccountType),
            (self.dob.is_some(), UserField::Dob),
            (self.gender.is_some(), UserField::Gender),
            (self.profession.is_some(), UserField::Profession),
            (self.bio.is_some(), UserField::Bio),
            (self.avatar.is_some(), UserField::Avatar),
            (self.banner.is_some(), UserField::Banner),
        ];
        FieldSelection::exact(
            touched
                .into_iter()
                .filter_map(|(set, field)| set.then_some(field)),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.touched_fields().is_empty()
    }
}

/// A user as returned to callers: only the selected attributes are present.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dob: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profession: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posts_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub followers_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub following_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relation: Option<RelationSummary>,
}

impl UserView {
    /// Copies the selected attributes of `record`. `relation` is attached separately.
    pub fn project(record: &UserRecord, selection: &FieldSelection) -> Self {
        let pick = |field: UserField| selection.contains(field);
        UserView {
            id: pick(UserField::Id).then_some(record.user_id),
            full_name: pick(UserField::FullName).then(|| record.full_name.clone()),
            username: pick(UserField::Username).then(|| record.username.clone()),
            account_type: pick(UserField::AccountType).then(|| record.account_type.clone()),
            dob: pick(UserField::Dob).then_some(record.dob).flatten(),
            gender: pick(UserField::Gender).then(|| record.gender.clone()).flatten(),
            profession: pick(UserField::Profession)
                .then(|| record.profession.clone())
                .flatten(),
            bio: pick(UserField::Bio).then(|| record.bio.clone()).flatten(),
            avatar: pick(UserField::Avatar).then(|| record.avatar.clone()),
            banner: pick(UserField::Banner).then(|| record.banner.clone()).flatten(),
            posts_count: pick(UserField::PostsCount).then_some(record.posts_count),
            followers_count: pick(UserField::FollowersCount).then_some(record.followers_count),
            following_count: pick(UserField::FollowingCount).then_some(record.following_count),
            relation: None,
        }
    }
}

#[async_trait::async_trait]
pub trait UserService: Send + Sync {
    /// Looks a user up by username; the caller's relation is always attached.
    async fn get_user(
        &self,
        caller: Option<UserId>,
        username: &str,
        selection: &FieldSelection,
    ) -> Result<UserView, UserError>;

    /// The users in `user_ids`, or a page of all users when `user_ids` is empty.
    async fn get_users(
        &self,
        caller: Option<UserId>,
        user_ids: &[UserId],
        offset: PageOffset,
        selection: &FieldSelection,
    ) -> Result<Vec<UserView>, UserError>;

    async fn search_users(
        &self,
        caller: Option<UserId>,
        query: &str,
        offset: PageOffset,
        selection: &FieldSelection,
    ) -> Result<Vec<UserView>, UserError>;

    /// Returns only the attributes that were written.
    async fn update_user(&self, caller: UserId, update: UserUpdate)
    -> Result<UserView, UserError>;

    async fn delete_user(&self, caller: UserId) -> Result<(), UserError>;
}
