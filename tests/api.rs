//! API endpoint integration tests: health, registration, login, verification

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

mod common;
use common::{build_test_router, login, register_verified_user, send_json, setup_test_db, test_state};

fn test_app() -> (axum::Router, std::sync::Arc<rolo::api::ApiState>, tempfile::TempDir) {
    let db = setup_test_db();
    let avatar_dir = tempfile::tempdir().unwrap();
    let state = test_state(db, avatar_dir.path().to_path_buf());
    (build_test_router(state.clone()), state, avatar_dir)
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _, _guard) = test_app();

    let (status, json) = send_json(&app, "GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_ready_endpoint() {
    let (app, _, _guard) = test_app();

    let (status, json) = send_json(&app, "GET", "/ready", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["checks"]["database"]["status"], "ok");
}

#[tokio::test]
async fn test_register_creates_unverified_user() {
    let (app, _, _guard) = test_app();

    let (status, json) = send_json(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(&serde_json::json!({
            "username": "ada",
            "email": "ada@example.com",
            "password": "hunter22",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["username"], "ada");
    assert_eq!(json["email"], "ada@example.com");
    assert_eq!(json["verified"], false);
    // The password hash must never leak into responses
    assert!(json.get("password_hash").is_none());
    assert!(json.get("password").is_none());
}

#[tokio::test]
async fn test_register_duplicate_email_conflict() {
    let (app, _, _guard) = test_app();

    let payload = serde_json::json!({
        "username": "ada",
        "email": "ada@example.com",
        "password": "hunter22",
    });
    let (status, _) = send_json(&app, "POST", "/api/auth/register", None, Some(&payload)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, json) = send_json(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(&serde_json::json!({
            "username": "grace",
            "email": "ada@example.com",
            "password": "hunter22",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["code"], "conflict");
}

#[tokio::test]
async fn test_register_duplicate_username_conflict() {
    let (app, _, _guard) = test_app();

    let (status, _) = send_json(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(&serde_json::json!({
            "username": "ada",
            "email": "ada@example.com",
            "password": "hunter22",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send_json(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(&serde_json::json!({
            "username": "ada",
            "email": "other@example.com",
            "password": "hunter22",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_register_validation() {
    let (app, _, _guard) = test_app();

    for payload in [
        serde_json::json!({"username": "ab", "email": "a@example.com", "password": "hunter22"}),
        serde_json::json!({"username": "ada", "email": "not-an-email", "password": "hunter22"}),
        serde_json::json!({"username": "ada", "email": "a@example.com", "password": "short"}),
    ] {
        let (status, json) =
            send_json(&app, "POST", "/api/auth/register", None, Some(&payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "payload={payload}");
        assert_eq!(json["error"]["code"], "invalid_argument");
    }
}

#[tokio::test]
async fn test_login_unverified_rejected() {
    let (app, _, _guard) = test_app();

    let (status, _) = send_json(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(&serde_json::json!({
            "username": "ada",
            "email": "ada@example.com",
            "password": "hunter22",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from("username=ada&password=hunter22"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_bad_credentials() {
    let (app, state, _guard) = test_app();
    register_verified_user(&app, &state, "ada").await;

    for (username, password) in [("ada", "wrong-password"), ("nobody", "hunter22")] {
        let request = Request::builder()
            .method("POST")
            .uri("/api/auth/login")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(format!("username={username}&password={password}")))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{username}");
    }
}

#[tokio::test]
async fn test_login_and_me() {
    let (app, state, _guard) = test_app();

    let token = register_verified_user(&app, &state, "ada").await;

    let (status, json) = send_json(&app, "GET", "/api/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["username"], "ada");
    assert_eq!(json["verified"], true);
}

#[tokio::test]
async fn test_me_requires_token() {
    let (app, _, _guard) = test_app();

    let (status, _) = send_json(&app, "GET", "/api/users/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send_json(&app, "GET", "/api/users/me", Some("garbage-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_email_verification_flow() {
    let (app, state, _guard) = test_app();

    let (status, _) = send_json(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(&serde_json::json!({
            "username": "ada",
            "email": "ada@example.com",
            "password": "hunter22",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // The same token kind the mailed link carries
    let token = state.jwt.issue_verification("ada@example.com").unwrap();

    let (status, json) =
        send_json(&app, "GET", &format!("/api/auth/verify/{token}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "email verified");

    // Verification unlocks login
    let access = login(&app, "ada", "hunter22").await;
    assert!(!access.is_empty());

    // Re-verifying is a no-op, not an error
    let (status, json) =
        send_json(&app, "GET", &format!("/api/auth/verify/{token}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "email already verified");
}

#[tokio::test]
async fn test_verify_rejects_bad_tokens() {
    let (app, state, _guard) = test_app();

    // Garbage token
    let (status, _) = send_json(&app, "GET", "/api/auth/verify/garbage", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // An access token must not pass as a verification token
    let token = state.jwt.issue_access("some-user").unwrap();
    let (status, _) =
        send_json(&app, "GET", &format!("/api/auth/verify/{token}"), None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_request_verification_is_neutral() {
    let (app, _, _guard) = test_app();

    // Unknown address gets the same neutral answer as a known one
    let (status, json) = send_json(
        &app,
        "POST",
        "/api/auth/request-verification",
        None,
        Some(&serde_json::json!({"email": "nobody@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "check your email for a verification link");
}

#[tokio::test]
async fn test_avatar_upload() {
    let (app, state, _guard) = test_app();

    let token = register_verified_user(&app, &state, "ada").await;

    let boundary = "test-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"avatar.png\"\r\n\
         Content-Type: image/png\r\n\r\n\
         fake-png-bytes\r\n\
         --{boundary}--\r\n"
    );

    let request = Request::builder()
        .method("PUT")
        .uri("/api/users/avatar")
        .header("authorization", format!("Bearer {token}"))
        .header(
            "content-type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    let avatar_url = json["avatar_url"].as_str().unwrap();
    assert!(avatar_url.starts_with("/static/avatars/"));

    // The file actually landed in the avatar directory
    let filename = avatar_url.rsplit('/').next().unwrap();
    let stored = state.avatar_dir.join(filename);
    assert_eq!(std::fs::read(stored).unwrap(), b"fake-png-bytes");
}

#[tokio::test]
async fn test_avatar_upload_rejects_unknown_extension() {
    let (app, state, _guard) = test_app();

    let token = register_verified_user(&app, &state, "ada").await;

    let boundary = "test-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"avatar.exe\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n\
         bad\r\n\
         --{boundary}--\r\n"
    );

    let request = Request::builder()
        .method("PUT")
        .uri("/api/users/avatar")
        .header("authorization", format!("Bearer {token}"))
        .header(
            "content-type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
