use super::error::*;
use super::handler::{self, Connections, Inbox, Mutation};
use crate::application_port::{AuthService, RelationshipService};
use crate::domain_model::UserId;
use crate::server::*;
use std::convert::Infallible;
use std::sync::Arc;
use warp::filters::BoxedFilter;
use warp::reply::Json;
use warp::{Filter, reject};

/// All `POST /<Service>/<Method>` routes.
pub fn routes(server: Arc<Server>) -> BoxedFilter<(Json,)> {
    let auth = server.auth_service.clone();
    let users = server.user_service.clone();

    let register = rpc("AuthService", "RegisterUser")
        .and(warp::body::json())
        .and(with(auth.clone()))
        .and_then(handler::register_user)
        .boxed();

    let login = rpc("AuthService", "LoginUser")
        .and(warp::body::json())
        .and(with(auth.clone()))
        .and_then(handler::login_user)
        .boxed();

    let get_user = rpc("UserService", "GetUser")
        .and(warp::body::json())
        .and(with_optional_caller(auth.clone()))
        .and(with(users.clone()))
        .and_then(handler::get_user)
        .boxed();

    let get_users = rpc("UserService", "GetUsers")
        .and(warp::body::json())
        .and(with_optional_caller(auth.clone()))
        .and(with(users.clone()))
        .and_then(handler::get_users)
        .boxed();

    let search_users = rpc("UserService", "SearchUsers")
        .and(warp::body::json())
        .and(with_optional_caller(auth.clone()))
        .and(with(users.clone()))
        .and_then(handler::search_users)
        .boxed();

    let update_user = rpc("UserService", "UpdateUser")
        .and(warp::body::json())
        .and(with_optional_caller(auth.clone()))
        .and(with(users.clone()))
        .and_then(handler::update_user)
        .boxed();

    let delete_user = rpc("UserService", "DeleteUser")
        .and(with_optional_caller(auth.clone()))
        .and(with(users.clone()))
        .and_then(handler::delete_user)
        .boxed();

    let mut rest = vec![login, get_user, get_users, search_users, update_user, delete_user];

    for (kind, method) in [
        (Connections::Followers, "GetUserFollowers"),
        (Connections::Following, "GetUserFollowing"),
        (Connections::Mates, "GetUserMates"),
    ] {
        rest.push(connections(kind, method, &server));
    }
    for (kind, method) in [
        (Inbox::Follow, "GetPendingFollowRequests"),
        (Inbox::Mate, "GetPendingMateRequests"),
    ] {
        rest.push(inbox(kind, method, &server));
    }
    for (kind, method) in [
        (Mutation::SendFollow, "SendFollowRequest"),
        (Mutation::UnsendFollow, "UnsendFollowRequest"),
        (Mutation::AcceptFollow, "AcceptFollowRequest"),
        (Mutation::RejectFollow, "RejectFollowRequest"),
        (Mutation::SendMate, "SendMateRequest"),
        (Mutation::UnsendMate, "UnsendMateRequest"),
        (Mutation::AcceptMate, "AcceptMateRequest"),
        (Mutation::RejectMate, "RejectMateRequest"),
    ] {
        rest.push(mutation(kind, method, &server));
    }

    rest.into_iter()
        .fold(register, |routes, route| routes.or(route).unify().boxed())
}

fn rpc(
    service: &'static str,
    method: &'static str,
) -> impl Filter<Extract = (), Error = warp::Rejection> + Clone {
    // method last: a known path with the wrong method is 405, anything else 404
    warp::path(service)
        .and(warp::path(method))
        .and(warp::path::end())
        .and(warp::post())
}

fn connections(
    kind: Connections,
    method: &'static str,
    server: &Arc<Server>,
) -> BoxedFilter<(Json,)> {
    rpc("ConnectionService", method)
        .and(warp::body::json())
        .and(with_optional_caller(server.auth_service.clone()))
        .and(with(server.relationship_service.clone()))
        .and_then(
            move |body: handler::ConnectionsRequest,
                  caller: Option<UserId>,
                  svc: Arc<dyn RelationshipService>| {
                handler::list_connections(kind, body, caller, svc)
            },
        )
        .boxed()
}

fn inbox(kind: Inbox, method: &'static str, server: &Arc<Server>) -> BoxedFilter<(Json,)> {
    rpc("ConnectionService", method)
        .and(warp::body::json())
        .and(with_optional_caller(server.auth_service.clone()))
        .and(with(server.relationship_service.clone()))
        .and_then(
            move |body: handler::InboxRequest,
                  caller: Option<UserId>,
                  svc: Arc<dyn RelationshipService>| {
                handler::list_inbox(kind, body, caller, svc)
            },
        )
        .boxed()
}

fn mutation(
    kind: Mutation,
    method: &'static str,
    server: &Arc<Server>,
) -> BoxedFilter<(Json,)> {
    rpc("ConnectionService", method)
        .and(warp::body::json())
        .and(with_optional_caller(server.auth_service.clone()))
        .and(with(server.relationship_service.clone()))
        .and_then(
            move |body: handler::TargetRequest,
                  caller: Option<UserId>,
                  svc: Arc<dyn RelationshipService>| {
                handler::mutate_relation(kind, body, caller, svc)
            },
        )
        .boxed()
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

/// Resolves the bearer token when one is sent. A malformed or invalid token rejects the
/// call instead of degrading to an anonymous caller.
fn with_optional_caller(
    auth_service: Arc<dyn AuthService>,
) -> impl Filter<Extract = (Option<UserId>,), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let auth_service = auth_service.clone();
        async move {
            let Some(header) = header else {
                return Ok(None);
            };
            let Some(token) = header.strip_prefix("Bearer ") else {
                return Err(reject::custom(ApiError::invalid_token()));
            };
            let user_id = auth_service
                .verify_token(token.trim())
                .await
                .map_err(|e| reject::custom(ApiError::from_auth("VerifyToken", e)))?;
            Ok::<_, warp::Rejection>(Some(user_id))
        }
    })
}
