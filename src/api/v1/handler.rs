use super::error::*;
use crate::application_port::*;
use crate::domain_model::*;
use crate::logger::*;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::reject;

/// Every call answers with this envelope; the payload keys sit next to `status`.
#[derive(Debug, Serialize)]
pub struct RpcResponse<T> {
    pub status: RpcStatus,
    #[serde(flatten)]
    pub payload: Option<T>,
}

#[derive(Debug, Serialize)]
pub struct RpcStatus {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<ApiErrorCode>,
}

impl<T: Serialize> RpcResponse<T> {
    pub fn ok(message: impl Into<String>, payload: T) -> Self {
        RpcResponse {
            status: RpcStatus {
                success: true,
                message: message.into(),
                code: None,
            },
            payload: Some(payload),
        }
    }

    pub fn err(error: &ApiError) -> Self {
        RpcResponse {
            status: RpcStatus {
                success: false,
                message: error.message.clone(),
                code: Some(error.code),
            },
            payload: None,
        }
    }
}

impl RpcResponse<()> {
    pub fn done(message: impl Into<String>) -> Self {
        RpcResponse {
            status: RpcStatus {
                success: true,
                message: message.into(),
                code: None,
            },
            payload: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct UserPayload {
    user: UserView,
}

#[derive(Debug, Serialize)]
struct UsersPayload {
    users: Vec<UserView>,
}

#[derive(Debug, Serialize)]
struct UpdatedPayload {
    updated_fields: UserView,
}

#[derive(Debug, Serialize)]
struct LoginPayload {
    user: UserView,
    access_token: AccessToken,
    expires_at: DateTime<Utc>,
}

fn rejection(error: ApiError) -> warp::Rejection {
    reject::custom(error)
}

fn require_caller(caller: Option<UserId>) -> Result<UserId, warp::Rejection> {
    caller.ok_or_else(|| rejection(ApiError::unauthorized()))
}

fn selection(req_fields: &[String]) -> Result<FieldSelection, warp::Rejection> {
    FieldSelection::parse(req_fields).map_err(|e| rejection(ApiError::from(e)))
}

fn users_reply(message: &'static str, users: Vec<UserView>) -> warp::reply::Json {
    let message = if users.is_empty() {
        NO_USERS_FOUND
    } else {
        message
    };
    warp::reply::json(&RpcResponse::ok(message, UsersPayload { users }))
}

// region AuthService

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub full_name: String,
    pub username: String,
    pub account_type: String,
    #[serde(default)]
    pub dob: Option<NaiveDate>,
    pub password: String,
    #[serde(default)]
    pub req_fields: Vec<String>,
}

pub async fn register_user(
    body: RegisterRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<warp::reply::Json, warp::Rejection> {
    const OP: &str = "RegisterUser";
    let selection = selection(&body.req_fields)?;

    let input = RegisterInput {
        full_name: body.full_name,
        username: body.username,
        account_type: body.account_type,
        dob: body.dob,
        password: body.password,
    };
    let user = auth_service
        .register(input)
        .await
        .map_err(|e| rejection(ApiError::from_auth(OP, e)))?;

    let payload = UserPayload {
        user: UserView::project(&user, &selection),
    };
    Ok(warp::reply::json(&RpcResponse::ok(
        "User registered successfully.",
        payload,
    )))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub req_fields: Vec<String>,
}

pub async fn login_user(
    body: LoginRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<warp::reply::Json, warp::Rejection> {
    const OP: &str = "LoginUser";
    let selection = selection(&body.req_fields)?;

    let login_input = LoginInput {
        username: body.username,
        password: body.password,
    };
    let login_result = auth_service
        .login(login_input)
        .await
        .map_err(|e| rejection(ApiError::from_auth(OP, e)))?;

    debug!(user_id = %login_result.user.user_id, "login");
    let payload = LoginPayload {
        user: UserView::project(&login_result.user, &selection),
        access_token: login_result.access_token,
        expires_at: login_result.expires_at,
    };
    Ok(warp::reply::json(&RpcResponse::ok(
        "User logged in successfully.",
        payload,
    )))
}

// endregion

// region UserService

#[derive(Debug, Deserialize)]
pub struct GetUserRequest {
    pub username: String,
    #[serde(default)]
    pub req_fields: Vec<String>,
}

pub async fn get_user(
    body: GetUserRequest,
    caller: Option<UserId>,
    user_service: Arc<dyn UserService>,
) -> Result<warp::reply::Json, warp::Rejection> {
    const OP: &str = "GetUser";
    let selection = selection(&body.req_fields)?;

    let user = user_service
        .get_user(caller, &body.username, &selection)
        .await
        .map_err(|e| {
            let not_found = format!("User '{}' not found.", body.username);
            rejection(ApiError::from_user(OP, e, not_found))
        })?;

    Ok(warp::reply::json(&RpcResponse::ok(
        "User found.",
        UserPayload { user },
    )))
}

#[derive(Debug, Deserialize)]
pub struct GetUsersRequest {
    #[serde(default)]
    pub user_ids: Vec<UserId>,
    #[serde(default)]
    pub offset: PageOffset,
    #[serde(default)]
    pub req_fields: Vec<String>,
}

pub async fn get_users(
    body: GetUsersRequest,
    caller: Option<UserId>,
    user_service: Arc<dyn UserService>,
) -> Result<warp::reply::Json, warp::Rejection> {
    const OP: &str = "GetUsers";
    let selection = selection(&body.req_fields)?;

    let users = user_service
        .get_users(caller, &body.user_ids, body.offset, &selection)
        .await
        .map_err(|e| rejection(ApiError::from_user(OP, e, NO_USERS_FOUND)))?;

    Ok(users_reply("Users found.", users))
}

#[derive(Debug, Deserialize)]
pub struct SearchUsersRequest {
    pub query: String,
    #[serde(default)]
    pub offset: PageOffset,
    #[serde(default)]
    pub req_fields: Vec<String>,
}

pub async fn search_users(
    body: SearchUsersRequest,
    caller: Option<UserId>,
    user_service: Arc<dyn UserService>,
) -> Result<warp::reply::Json, warp::Rejection> {
    const OP: &str = "SearchUsers";
    let selection = selection(&body.req_fields)?;

    let users = user_service
        .search_users(caller, &body.query, body.offset, &selection)
        .await
        .map_err(|e| rejection(ApiError::from_user(OP, e, NO_USERS_FOUND)))?;

    Ok(users_reply("Users found.", users))
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub updated_fields: UserUpdate,
}

pub async fn update_user(
    body: UpdateUserRequest,
    caller: Option<UserId>,
    user_service: Arc<dyn UserService>,
) -> Result<warp::reply::Json, warp::Rejection> {
    const OP: &str = "UpdateUser";
    let caller = require_caller(caller)?;

    let updated_fields = user_service
        .update_user(caller, body.updated_fields)
        .await
        .map_err(|e| rejection(ApiError::from_user(OP, e, "User not updated.")))?;

    Ok(warp::reply::json(&RpcResponse::ok(
        "User updated.",
        UpdatedPayload { updated_fields },
    )))
}

pub async fn delete_user(
    caller: Option<UserId>,
    user_service: Arc<dyn UserService>,
) -> Result<warp::reply::Json, warp::Rejection> {
    const OP: &str = "DeleteUser";
    let caller = require_caller(caller)?;

    user_service.delete_user(caller).await.map_err(|e| {
        rejection(ApiError::from_user(
            OP,
            e,
            "User not found or already deleted.",
        ))
    })?;

    Ok(warp::reply::json(&RpcResponse::done("User deleted.")))
}

// endregion

// region ConnectionService

pub const GET_USER_FOLLOWERS: Outcomes = Outcomes::listing("GetUserFollowers", "Followers found.");
pub const GET_USER_FOLLOWING: Outcomes =
    Outcomes::listing("GetUserFollowing", "Following users found.");
pub const GET_PENDING_FOLLOW_REQUESTS: Outcomes =
    Outcomes::listing("GetPendingFollowRequests", "Follow requests found.");
pub const GET_USER_MATES: Outcomes = Outcomes::listing("GetUserMates", "Mates found.");
pub const GET_PENDING_MATE_REQUESTS: Outcomes =
    Outcomes::listing("GetPendingMateRequests", "Mate requests found.");

pub const SEND_FOLLOW_REQUEST: Outcomes = Outcomes {
    op: "SendFollowRequest",
    ok: "Follow request sent.",
    not_found: "User not found.",
    duplicate: "Already following or requested this user.",
};
pub const UNSEND_FOLLOW_REQUEST: Outcomes = Outcomes {
    op: "UnsendFollowRequest",
    ok: "Follow request unsent.",
    not_found: "No follow request found.",
    duplicate: "No follow request found.",
};
pub const ACCEPT_FOLLOW_REQUEST: Outcomes = Outcomes {
    op: "AcceptFollowRequest",
    ok: "Follow request accepted.",
    not_found: "No follow request found.",
    duplicate: "No follow request found.",
};
pub const REJECT_FOLLOW_REQUEST: Outcomes = Outcomes {
    op: "RejectFollowRequest",
    ok: "Follow request rejected.",
    not_found: "No pending request found.",
    duplicate: "No pending request found.",
};
pub const SEND_MATE_REQUEST: Outcomes = Outcomes {
    op: "SendMateRequest",
    ok: "Mate request sent.",
    not_found: "User not found.",
    duplicate: "Already mates or request pending.",
};
pub const UNSEND_MATE_REQUEST: Outcomes = Outcomes {
    op: "UnsendMateRequest",
    ok: "Mate request unsent.",
    not_found: "No mate request found.",
    duplicate: "No mate request found.",
};
pub const ACCEPT_MATE_REQUEST: Outcomes = Outcomes {
    op: "AcceptMateRequest",
    ok: "Mate request accepted.",
    not_found: "No mate request found.",
    duplicate: "No mate request found.",
};
pub const REJECT_MATE_REQUEST: Outcomes = Outcomes {
    op: "RejectMateRequest",
    ok: "Mate request rejected.",
    not_found: "No pending request found.",
    duplicate: "No pending request found.",
};

/// Listing of some user's connections; `user_id` falls back to the caller.
#[derive(Debug, Deserialize)]
pub struct ConnectionsRequest {
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub offset: PageOffset,
    #[serde(default)]
    pub req_fields: Vec<String>,
}

/// Listing of the caller's own inbox.
#[derive(Debug, Deserialize)]
pub struct InboxRequest {
    #[serde(default)]
    pub offset: PageOffset,
    #[serde(default)]
    pub req_fields: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct TargetRequest {
    pub user_id: UserId,
}

/// Which side of the graph a connection listing reads.
#[derive(Debug, Clone, Copy)]
pub enum Connections {
    Followers,
    Following,
    Mates,
}

impl Connections {
    fn outcomes(self) -> &'static Outcomes {
        match self {
            Connections::Followers => &GET_USER_FOLLOWERS,
            Connections::Following => &GET_USER_FOLLOWING,
            Connections::Mates => &GET_USER_MATES,
        }
    }
}

pub async fn list_connections(
    kind: Connections,
    body: ConnectionsRequest,
    caller: Option<UserId>,
    relationship_service: Arc<dyn RelationshipService>,
) -> Result<warp::reply::Json, warp::Rejection> {
    let outcomes = kind.outcomes();
    let selection = selection(&body.req_fields)?;
    let target = match body.user_id {
        Some(target) => target,
        None => require_caller(caller)?,
    };

    let listed = match kind {
        Connections::Followers => {
            relationship_service
                .list_followers(caller, target, body.offset, &selection)
                .await
        }
        Connections::Following => {
            relationship_service
                .list_following(caller, target, body.offset, &selection)
                .await
        }
        Connections::Mates => {
            relationship_service
                .list_mates(caller, target, body.offset, &selection)
                .await
        }
    };
    let users = listed.map_err(|e| rejection(ApiError::from_relation(e, outcomes)))?;

    Ok(users_reply(outcomes.ok, users))
}

/// Inbound requests waiting on the caller.
#[derive(Debug, Clone, Copy)]
pub enum Inbox {
    Follow,
    Mate,
}

pub async fn list_inbox(
    kind: Inbox,
    body: InboxRequest,
    caller: Option<UserId>,
    relationship_service: Arc<dyn RelationshipService>,
) -> Result<warp::reply::Json, warp::Rejection> {
    let caller = require_caller(caller)?;
    let selection = selection(&body.req_fields)?;

    let (outcomes, listed) = match kind {
        Inbox::Follow => (
            &GET_PENDING_FOLLOW_REQUESTS,
            relationship_service
                .list_pending_follow_requests(caller, body.offset, &selection)
                .await,
        ),
        Inbox::Mate => (
            &GET_PENDING_MATE_REQUESTS,
            relationship_service
                .list_pending_mate_requests(caller, body.offset, &selection)
                .await,
        ),
    };
    let users = listed.map_err(|e| rejection(ApiError::from_relation(e, outcomes)))?;

    Ok(users_reply(outcomes.ok, users))
}

/// A relationship mutation issued by the caller against `user_id`.
#[derive(Debug, Clone, Copy)]
pub enum Mutation {
    SendFollow,
    UnsendFollow,
    AcceptFollow,
    RejectFollow,
    SendMate,
    UnsendMate,
    AcceptMate,
    RejectMate,
}

impl Mutation {
    fn outcomes(self) -> &'static Outcomes {
        match self {
            Mutation::SendFollow => &SEND_FOLLOW_REQUEST,
            Mutation::UnsendFollow => &UNSEND_FOLLOW_REQUEST,
            Mutation::AcceptFollow => &ACCEPT_FOLLOW_REQUEST,
            Mutation::RejectFollow => &REJECT_FOLLOW_REQUEST,
            Mutation::SendMate => &SEND_MATE_REQUEST,
            Mutation::UnsendMate => &UNSEND_MATE_REQUEST,
            Mutation::AcceptMate => &ACCEPT_MATE_REQUEST,
            Mutation::RejectMate => &REJECT_MATE_REQUEST,
        }
    }
}

pub async fn mutate_relation(
    kind: Mutation,
    body: TargetRequest,
    caller: Option<UserId>,
    relationship_service: Arc<dyn RelationshipService>,
) -> Result<warp::reply::Json, warp::Rejection> {
    let actor = require_caller(caller)?;
    let other = body.user_id;
    let svc = relationship_service.as_ref();

    let result = match kind {
        Mutation::SendFollow => svc.send_follow_request(actor, other).await,
        Mutation::UnsendFollow => svc.unsend_follow_request(actor, other).await,
        Mutation::AcceptFollow => svc.accept_follow_request(actor, other).await,
        Mutation::RejectFollow => svc.reject_follow_request(actor, other).await,
        Mutation::SendMate => svc.send_mate_request(actor, other).await,
        Mutation::UnsendMate => svc.unsend_mate_request(actor, other).await,
        Mutation::AcceptMate => svc.accept_mate_request(actor, other).await,
        Mutation::RejectMate => svc.reject_mate_request(actor, other).await,
    };

    let outcomes = kind.outcomes();
    result.map_err(|e| rejection(ApiError::from_relation(e, outcomes)))?;

    Ok(warp::reply::json(&RpcResponse::done(outcomes.ok)))
}

// endregion

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_is_flattened_next_to_status() {
        let response = RpcResponse::ok(
            "Users found.",
            UsersPayload { users: Vec::new() },
        );
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            serde_json::json!({
                "status": {"success": true, "message": "Users found."},
                "users": [],
            })
        );
    }

    #[test]
    fn failures_carry_no_payload() {
        let error = ApiError::new(ApiErrorCode::Duplicate, "Already mates or request pending.");
        assert_eq!(
            serde_json::to_value(RpcResponse::<()>::err(&error)).unwrap(),
            serde_json::json!({
                "status": {
                    "success": false,
                    "message": "Already mates or request pending.",
                    "code": "Duplicate",
                },
            })
        );
    }
}
