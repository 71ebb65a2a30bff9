//! Shared test utilities

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use secrecy::SecretString;
use tower::ServiceExt;

use rolo::api::{self, ApiState};
use rolo::auth::JwtKeys;
use rolo::db::{self, ContactRepo, DbPool, UserRepo};

/// Set up an in-memory test database
#[must_use]
pub fn setup_test_db() -> DbPool {
    db::init_memory().expect("failed to init test db")
}

/// Build API state over the given database, without mail or rate limiting
pub fn test_state(db: DbPool, avatar_dir: PathBuf) -> Arc<ApiState> {
    Arc::new(ApiState {
        user_repo: UserRepo::new(db.clone()),
        contact_repo: ContactRepo::new(db.clone()),
        db,
        jwt: JwtKeys::new(&SecretString::from("test-secret".to_string()), 3600, 86400),
        mailer: None,
        base_url: "http://127.0.0.1:8000".to_string(),
        avatar_dir,
        rate_limiter: None,
    })
}

/// Build a test router with the full API surface
pub fn build_test_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .nest("/api/auth", api::auth::router(state.clone()))
        .nest("/api/users", api::users::router(state.clone()))
        .nest("/api/contacts/", api::contacts::router(state.clone()))
        .merge(api::health::router())
        .merge(api::health::ready_router(state))
}

/// Send a JSON request, returning status and parsed body
pub async fn send_json(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<&serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }

    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };

    (status, json)
}

/// Register an account, mark it verified directly in the database, and log
/// in; returns the access token
pub async fn register_verified_user(
    app: &Router,
    state: &ApiState,
    username: &str,
) -> String {
    let email = format!("{username}@example.com");

    let (status, _) = send_json(
        app,
        "POST",
        "/api/auth/register",
        None,
        Some(&serde_json::json!({
            "username": username,
            "email": email,
            "password": "hunter22",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    state
        .user_repo
        .mark_verified(&email)
        .expect("failed to verify test user");

    login(app, username, "hunter22").await
}

/// Log in with the form endpoint and return the access token
pub async fn login(app: &Router, username: &str, password: &str) -> String {
    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(format!(
            "username={username}&password={password}"
        )))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    json["access_token"]
        .as_str()
        .expect("login response missing access_token")
        .to_string()
}
