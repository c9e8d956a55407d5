use super::handler::RpcResponse;
use crate::application_port::*;
use crate::domain_model::UnknownField;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use tracing::warn;
use warp::filters::body::BodyDeserializeError;
use warp::http::StatusCode;
use warp::{Rejection, reject};

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    if let Some(err) = err.find::<ApiError>() {
        let json = warp::reply::json(&RpcResponse::<()>::err(err));
        Ok(warp::reply::with_status(json, StatusCode::OK))
    } else if let Some(e) = err.find::<BodyDeserializeError>() {
        let err = ApiError::new(ApiErrorCode::InvalidInput, format!("Malformed request: {e}"));
        let json = warp::reply::json(&RpcResponse::<()>::err(&err));
        Ok(warp::reply::with_status(json, StatusCode::OK))
    } else if err.is_not_found() {
        let err = ApiError::new(ApiErrorCode::UnknownMethod, "Unknown method.");
        let json = warp::reply::json(&RpcResponse::<()>::err(&err));
        Ok(warp::reply::with_status(json, StatusCode::NOT_FOUND))
    } else if err.find::<reject::MethodNotAllowed>().is_some() {
        let err = ApiError::new(ApiErrorCode::UnknownMethod, "Unknown method.");
        let json = warp::reply::json(&RpcResponse::<()>::err(&err));
        Ok(warp::reply::with_status(json, StatusCode::METHOD_NOT_ALLOWED))
    } else {
        warn!(rejection = ?err, "unhandled rejection");
        let err = ApiError::new(ApiErrorCode::InternalError, "Internal error");
        let json = warp::reply::json(&RpcResponse::<()>::err(&err));
        Ok(warp::reply::with_status(
            json,
            StatusCode::INTERNAL_SERVER_ERROR,
        ))
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Error, Serialize)]
pub enum ApiErrorCode {
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Username already taken")]
    UsernameTaken,
    #[error("Token is not valid")]
    InvalidToken,
    #[error("Caller identity required")]
    Unauthorized,
    #[error("Invalid input")]
    InvalidInput,
    #[error("Unknown field")]
    UnknownField,
    #[error("User not found")]
    UserNotFound,
    #[error("No matching request")]
    NotFound,
    #[error("Already exists")]
    Duplicate,
    #[error("Cannot relate to yourself")]
    SelfRelation,
    #[error("Unknown method")]
    UnknownMethod,
    #[error("Internal error")]
    InternalError,
}

/// A failed call: the code for clients that branch on it and the envelope message.
#[derive(Debug, Clone, Error)]
#[error("{code}: {message}")]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

impl reject::Reject for ApiError {}

impl ApiError {
    pub fn new(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Logs `error` and hides it behind the operation-tagged message.
    pub fn internal<E: std::fmt::Display>(op: &'static str, error: E) -> Self {
        warn!(op, %error, "internal error");
        ApiError::new(ApiErrorCode::InternalError, format!("Error in {op}"))
    }

    pub fn unauthorized() -> Self {
        ApiError::new(ApiErrorCode::Unauthorized, "Authentication required.")
    }

    pub fn invalid_token() -> Self {
        ApiError::new(ApiErrorCode::InvalidToken, "Invalid or expired token.")
    }

    pub fn from_auth(op: &'static str, error: AuthError) -> Self {
        match error {
            AuthError::InvalidCredentials => {
                ApiError::new(ApiErrorCode::InvalidCredentials, "Invalid username or password.")
            }
            AuthError::UserExists => {
                ApiError::new(ApiErrorCode::UsernameTaken, "Username is already taken.")
            }
            AuthError::InvalidInput(reason) => ApiError::new(ApiErrorCode::InvalidInput, reason),
            AuthError::TokenInvalid | AuthError::TokenExpired | AuthError::UserNotFound => {
                ApiError::invalid_token()
            }
            AuthError::Store(e) | AuthError::InternalError(e) => ApiError::internal(op, e),
        }
    }

    pub fn from_user(op: &'static str, error: UserError, not_found: impl Into<String>) -> Self {
        match error {
            UserError::NotFound => ApiError::new(ApiErrorCode::UserNotFound, not_found),
            UserError::InvalidInput(reason) => ApiError::new(ApiErrorCode::InvalidInput, reason),
            UserError::Store(e) => ApiError::internal(op, e),
        }
    }

    pub fn from_relation(error: RelationError, outcomes: &Outcomes) -> Self {
        match error {
            RelationError::NotFound => ApiError::new(ApiErrorCode::NotFound, outcomes.not_found),
            RelationError::Duplicate => ApiError::new(ApiErrorCode::Duplicate, outcomes.duplicate),
            RelationError::SelfRelation => {
                ApiError::new(ApiErrorCode::SelfRelation, "Cannot relate to yourself.")
            }
            RelationError::UserNotFound => ApiError::new(ApiErrorCode::UserNotFound, "User not found."),
            RelationError::Store(e) => ApiError::internal(outcomes.op, e),
        }
    }
}

impl From<UnknownField> for ApiError {
    fn from(error: UnknownField) -> Self {
        ApiError::new(ApiErrorCode::UnknownField, format!("Unknown field '{}'.", error.0))
    }
}

/// Envelope messages of one relationship operation.
#[derive(Debug, Clone, Copy)]
pub struct Outcomes {
    pub op: &'static str,
    pub ok: &'static str,
    pub not_found: &'static str,
    pub duplicate: &'static str,
}

impl Outcomes {
    /// Listings only fail on store errors; `ok` is used for non-empty pages.
    pub const fn listing(op: &'static str, ok: &'static str) -> Self {
        Outcomes {
            op,
            ok,
            not_found: NO_USERS_FOUND,
            duplicate: NO_USERS_FOUND,
        }
    }
}

pub const NO_USERS_FOUND: &str = "No users found.";
