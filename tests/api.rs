use matecircle::api;
use matecircle::server::Server;
use matecircle::settings::{Auth, Http, Log, Settings, Storage};
use serde_json::{Value, json};
use std::sync::Arc;
use warp::Filter;
use warp::http::StatusCode;

fn memory_settings() -> Settings {
    Settings {
        auth: Auth {
            issuer: "matecircle-test".to_string(),
            audience: "matecircle-test".to_string(),
            access_ttl_secs: 600,
            signing_key: Some("api-test-signing-key".to_string()),
        },
        http: Http {
            address: "127.0.0.1:0".to_string(),
            tls: None,
        },
        log: Log {
            filter: "warn".to_string(),
        },
        storage: Storage {
            backend: "memory".to_string(),
            dsn: None,
            max_connections: 1,
            run_migrations: false,
        },
    }
}

async fn app() -> impl Filter<Extract = (impl warp::Reply,), Error = std::convert::Infallible> + Clone
{
    let server = Server::try_new(&memory_settings()).await.unwrap();
    api::routes(Arc::new(server))
}

async fn call<F>(filter: &F, method: &str, token: Option<&str>, body: Value) -> Value
where
    F: Filter + 'static,
    F::Extract: warp::Reply + Send,
{
    let mut request = warp::test::request()
        .method("POST")
        .path(&format!("/api/v1/{method}"))
        .json(&body);
    if let Some(token) = token {
        request = request.header("authorization", format!("Bearer {token}"));
    }

    let response = request.reply(filter).await;
    assert_eq!(response.status(), StatusCode::OK, "{method}");
    serde_json::from_slice(response.body()).unwrap()
}

fn success(response: &Value) -> bool {
    response["status"]["success"].as_bool().unwrap()
}

fn message(response: &Value) -> &str {
    response["status"]["message"].as_str().unwrap()
}

/// Registers and logs in `username`, returning (user id, access token).
async fn sign_up<F>(filter: &F, username: &str) -> (String, String)
where
    F: Filter + 'static,
    F::Extract: warp::Reply + Send,
{
    let registered = call(
        filter,
        "AuthService/RegisterUser",
        None,
        json!({
            "full_name": format!("{username} example"),
            "username": username,
            "account_type": "personal",
            "password": "correct-horse",
        }),
    )
    .await;
    assert!(success(&registered), "{registered}");

    let login = call(
        filter,
        "AuthService/LoginUser",
        None,
        json!({"username": username, "password": "correct-horse"}),
    )
    .await;
    assert!(success(&login), "{login}");

    (
        login["user"]["id"].as_str().unwrap().to_string(),
        login["access_token"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn health_check_answers() {
    let filter = app().await;

    let response = warp::test::request().method("GET").path("/").reply(&filter).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body().as_ref(), b"matecircle is online!");
}

#[tokio::test]
async fn taken_username_is_reported_in_the_envelope() {
    let filter = app().await;
    sign_up(&filter, "grace").await;

    let again = call(
        &filter,
        "AuthService/RegisterUser",
        None,
        json!({
            "full_name": "Grace Again",
            "username": "grace",
            "account_type": "personal",
            "password": "correct-horse",
        }),
    )
    .await;

    assert!(!success(&again));
    assert_eq!(message(&again), "Username is already taken.");
    assert!(again.get("user").is_none());
}

#[tokio::test]
async fn follow_flow_over_http() {
    let filter = app().await;
    let (alice_id, alice_token) = sign_up(&filter, "alice").await;
    let (bob_id, bob_token) = sign_up(&filter, "bob").await;

    let sent = call(
        &filter,
        "ConnectionService/SendFollowRequest",
        Some(&alice_token),
        json!({"user_id": bob_id}),
    )
    .await;
    assert_eq!(message(&sent), "Follow request sent.");

    let twice = call(
        &filter,
        "ConnectionService/SendFollowRequest",
        Some(&alice_token),
        json!({"user_id": bob_id}),
    )
    .await;
    assert!(!success(&twice));
    assert_eq!(twice["status"]["code"], "Duplicate");

    let inbox = call(
        &filter,
        "ConnectionService/GetPendingFollowRequests",
        Some(&bob_token),
        json!({}),
    )
    .await;
    assert_eq!(inbox["users"][0]["id"], alice_id.as_str());

    let accepted = call(
        &filter,
        "ConnectionService/AcceptFollowRequest",
        Some(&bob_token),
        json!({"user_id": alice_id}),
    )
    .await;
    assert!(success(&accepted), "{accepted}");

    let followers = call(
        &filter,
        "ConnectionService/GetUserFollowers",
        Some(&alice_token),
        json!({"user_id": bob_id, "req_fields": ["relation", "followers_count"]}),
    )
    .await;
    assert_eq!(message(&followers), "Followers found.");
    let listed = &followers["users"][0];
    assert_eq!(listed["id"], alice_id.as_str());
    assert_eq!(listed["followers_count"], 0);
    // alice looking at herself
    assert_eq!(listed["relation"]["is_following"], false);

    let profile = call(
        &filter,
        "UserService/GetUser",
        Some(&alice_token),
        json!({"username": "bob", "req_fields": ["followers_count"]}),
    )
    .await;
    assert_eq!(profile["user"]["followers_count"], 1);
    assert_eq!(profile["user"]["relation"]["is_following"], true);
    assert_eq!(profile["user"]["relation"]["is_followed"], false);
}

#[tokio::test]
async fn mutations_need_a_caller_and_a_valid_token() {
    let filter = app().await;
    let (bob_id, _) = sign_up(&filter, "bob").await;

    let anonymous = call(
        &filter,
        "ConnectionService/SendMateRequest",
        None,
        json!({"user_id": bob_id}),
    )
    .await;
    assert!(!success(&anonymous));
    assert_eq!(anonymous["status"]["code"], "Unauthorized");

    let forged = call(
        &filter,
        "ConnectionService/SendMateRequest",
        Some("not-a-token"),
        json!({"user_id": bob_id}),
    )
    .await;
    assert_eq!(forged["status"]["code"], "InvalidToken");
}

#[tokio::test]
async fn anonymous_profile_lookup_has_unknown_relation() {
    let filter = app().await;
    sign_up(&filter, "bob").await;

    let profile = call(&filter, "UserService/GetUser", None, json!({"username": "bob"})).await;

    assert!(success(&profile));
    let relation = &profile["user"]["relation"];
    assert!(relation["is_following"].is_null());
    assert!(relation["are_mates"].is_null());
}

#[tokio::test]
async fn unknown_fields_reject_the_request() {
    let filter = app().await;
    sign_up(&filter, "bob").await;

    let response = call(
        &filter,
        "UserService/GetUser",
        None,
        json!({"username": "bob", "req_fields": ["password"]}),
    )
    .await;

    assert!(!success(&response));
    assert_eq!(response["status"]["code"], "UnknownField");
    assert!(response.get("user").is_none());
}

#[tokio::test]
async fn empty_pages_still_succeed() {
    let filter = app().await;
    let (_, token) = sign_up(&filter, "loner").await;

    let mates = call(&filter, "ConnectionService/GetUserMates", Some(&token), json!({})).await;

    assert!(success(&mates));
    assert_eq!(message(&mates), "No users found.");
    assert_eq!(mates["users"], json!([]));
}

#[tokio::test]
async fn update_returns_only_the_written_fields() {
    let filter = app().await;
    let (_, token) = sign_up(&filter, "ada").await;

    let updated = call(
        &filter,
        "UserService/UpdateUser",
        Some(&token),
        json!({"updated_fields": {"bio": "first programmer"}}),
    )
    .await;
    assert_eq!(message(&updated), "User updated.");
    assert_eq!(updated["updated_fields"], json!({"bio": "first programmer"}));

    let forbidden = call(
        &filter,
        "UserService/UpdateUser",
        Some(&token),
        json!({"updated_fields": {"followers_count": 1000000}}),
    )
    .await;
    assert!(!success(&forbidden));
    assert_eq!(forbidden["status"]["code"], "InvalidInput");
}

#[tokio::test]
async fn deleted_users_lose_their_session() {
    let filter = app().await;
    let (_, token) = sign_up(&filter, "ephemeral").await;

    let deleted = call(&filter, "UserService/DeleteUser", Some(&token), json!({})).await;
    assert_eq!(message(&deleted), "User deleted.");

    let after = call(&filter, "UserService/GetUsers", Some(&token), json!({})).await;
    assert_eq!(after["status"]["code"], "InvalidToken");
}

#[tokio::test]
async fn wrong_http_method_gets_a_plain_envelope() {
    let filter = app().await;

    let response = warp::test::request()
        .method("GET")
        .path("/api/v1/UserService/GetUser")
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let body: Value = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(body["status"]["success"], false);
    assert_eq!(body["status"]["code"], "UnknownMethod");
    assert_eq!(body["status"]["message"], "Unknown method.");
}

#[tokio::test]
async fn unknown_rpc_is_not_found() {
    let filter = app().await;

    let response = warp::test::request()
        .method("POST")
        .path("/api/v1/UserService/RenameUser")
        .json(&json!({}))
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(body["status"]["code"], "UnknownMethod");
}
