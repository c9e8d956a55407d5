use crate::application_port::UserView;
use crate::domain_model::*;

#[derive(Debug, thiserror::Error)]
pub enum RelationError {
    #[error("no matching request found")]
    NotFound,
    #[error("request already exists")]
    Duplicate,
    #[error("cannot relate a user to themselves")]
    SelfRelation,
    #[error("user not found")]
    UserNotFound,
    #[error("store error: {0}")]
    Store(String),
}

/// Follow and mate request state machines plus their listings.
///
/// Mutations take the acting user first. Listings take the caller separately so that
/// each listed user can be annotated with the caller's relation.
#[async_trait::async_trait]
pub trait RelationshipService: Send + Sync {
    async fn send_follow_request(
        &self,
        follower: UserId,
        followee: UserId,
    ) -> Result<(), RelationError>;
    async fn unsend_follow_request(
        &self,
        follower: UserId,
        followee: UserId,
    ) -> Result<(), RelationError>;
    async fn accept_follow_request(
        &self,
        accepter: UserId,
        requester: UserId,
    ) -> Result<(), RelationError>;
    async fn reject_follow_request(
        &self,
        rejecter: UserId,
        requester: UserId,
    ) -> Result<(), RelationError>;

    async fn list_followers(
        &self,
        caller: Option<UserId>,
        target: UserId,
        offset: PageOffset,
        selection: &FieldSelection,
    ) -> Result<Vec<UserView>, RelationError>;
    async fn list_following(
        &self,
        caller: Option<UserId>,
        target: UserId,
        offset: PageOffset,
        selection: &FieldSelection,
    ) -> Result<Vec<UserView>, RelationError>;
    async fn list_pending_follow_requests(
        &self,
        target: UserId,
        offset: PageOffset,
        selection: &FieldSelection,
    ) -> Result<Vec<UserView>, RelationError>;

    async fn send_mate_request(
        &self,
        requester: UserId,
        target: UserId,
    ) -> Result<(), RelationError>;
    async fn unsend_mate_request(
        &self,
        requester: UserId,
        target: UserId,
    ) -> Result<(), RelationError>;
    async fn accept_mate_request(
        &self,
        accepter: UserId,
        requester: UserId,
    ) -> Result<(), RelationError>;
    async fn reject_mate_request(
        &self,
        rejecter: UserId,
        requester: UserId,
    ) -> Result<(), RelationError>;

    async fn list_mates(
        &self,
        caller: Option<UserId>,
        target: UserId,
        offset: PageOffset,
        selection: &FieldSelection,
    ) -> Result<Vec<UserView>, RelationError>;
    async fn list_pending_mate_requests(
        &self,
        target: UserId,
        offset: PageOffset,
        selection: &FieldSelection,
    ) -> Result<Vec<UserView>, RelationError>;
}
