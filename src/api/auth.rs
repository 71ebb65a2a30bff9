//! Registration, login, and email verification endpoints
//!
//! Also home of the bearer-token middleware that protects the user and
//! contact routes.

use std::sync::Arc;

use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::{Deserialize, Serialize};

use super::users::UserResponse;
use super::{error_response, map_error, ApiError, ApiState, EMAIL_RE};
use crate::auth::{hash_password, verify_password};
use crate::db::{NewUser, User};

// --- Request/Response types ---

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// OAuth2 password-grant style login form
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct RequestVerificationRequest {
    pub email: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

fn message(text: &str) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: text.to_string(),
    })
}

fn invalid_argument(msg: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, error_response("invalid_argument", msg))
}

fn validate_registration(req: &RegisterRequest) -> Result<(), ApiError> {
    let username_len = req.username.chars().count();
    if !(3..=50).contains(&username_len) {
        return Err(invalid_argument("username must be 3-50 characters"));
    }
    if req.email.chars().count() > 100 || !EMAIL_RE.is_match(&req.email) {
        return Err(invalid_argument("email address is not valid"));
    }
    if req.password.chars().count() < 6 {
        return Err(invalid_argument("password must be at least 6 characters"));
    }
    Ok(())
}

// --- Handlers ---

/// Register a new account and kick off email verification
async fn register(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    validate_registration(&req)?;

    if state
        .user_repo
        .find_by_email(&req.email)
        .map_err(|e| map_error(&e))?
        .is_some()
    {
        return Err((
            StatusCode::CONFLICT,
            error_response("conflict", "email already registered"),
        ));
    }

    if state
        .user_repo
        .find_by_username(&req.username)
        .map_err(|e| map_error(&e))?
        .is_some()
    {
        return Err((
            StatusCode::CONFLICT,
            error_response("conflict", "username already taken"),
        ));
    }

    let password_hash = hash_password(&req.password).map_err(|e| map_error(&e))?;

    let user = state
        .user_repo
        .create(&NewUser {
            username: req.username,
            email: req.email,
            password_hash,
        })
        .map_err(|e| map_error(&e))?;

    tracing::info!(user_id = %user.id, "user registered");
    send_verification_mail(&state, &user);

    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

/// Log in with username and password, returning a bearer token
async fn login(
    State(state): State<Arc<ApiState>>,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>, ApiError> {
    let invalid_credentials = || {
        (
            StatusCode::UNAUTHORIZED,
            error_response("unauthorized", "incorrect username or password"),
        )
    };

    let Some(user) = state
        .user_repo
        .find_by_username(&form.username)
        .map_err(|e| map_error(&e))?
    else {
        return Err(invalid_credentials());
    };

    if !verify_password(&form.password, &user.password_hash).map_err(|e| map_error(&e))? {
        return Err(invalid_credentials());
    }

    if !user.verified {
        return Err((
            StatusCode::UNAUTHORIZED,
            error_response("unverified", "email not verified"),
        ));
    }

    let access_token = state.jwt.issue_access(&user.id).map_err(|e| map_error(&e))?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
    }))
}

/// Confirm an email address from a verification link
async fn verify_email(
    State(state): State<Arc<ApiState>>,
    Path(token): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let verification_failed = || {
        (
            StatusCode::BAD_REQUEST,
            error_response("invalid_token", "verification failed"),
        )
    };

    let claims = state
        .jwt
        .decode_verification(&token)
        .map_err(|_| verification_failed())?;

    let user = state
        .user_repo
        .find_by_email(&claims.sub)
        .map_err(|e| map_error(&e))?
        .ok_or_else(verification_failed)?;

    if user.verified {
        return Ok(message("email already verified"));
    }

    state
        .user_repo
        .mark_verified(&user.email)
        .map_err(|e| map_error(&e))?;

    tracing::info!(user_id = %user.id, "email verified");
    Ok(message("email verified"))
}

/// Re-send the verification email
///
/// Always answers with the same neutral message so the endpoint cannot be
/// used to probe which addresses have accounts.
async fn request_verification(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<RequestVerificationRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let user = state
        .user_repo
        .find_by_email(&req.email)
        .map_err(|e| map_error(&e))?;

    match user {
        Some(user) if user.verified => {
            return Ok(message("email already verified"));
        }
        Some(user) => send_verification_mail(&state, &user),
        None => {}
    }

    Ok(message("check your email for a verification link"))
}

/// Issue a verification token and mail the link in the background
fn send_verification_mail(state: &Arc<ApiState>, user: &User) {
    let Some(mailer) = state.mailer.clone() else {
        tracing::warn!(email = %user.email, "mail not configured - skipping verification email");
        return;
    };

    let token = match state.jwt.issue_verification(&user.email) {
        Ok(token) => token,
        Err(e) => {
            tracing::error!(error = %e, "failed to issue verification token");
            return;
        }
    };

    let verify_url = format!("{}/api/auth/verify/{token}", state.base_url);
    let email = user.email.clone();
    let username = user.username.clone();

    tokio::spawn(async move {
        if let Err(e) = mailer.send_verification(&email, &username, &verify_url).await {
            tracing::warn!(error = %e, email, "verification email failed");
        }
    });
}

// --- Bearer middleware ---

/// The authenticated user, injected into request extensions
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Extract bearer token from the Authorization header
fn extract_bearer(req: &Request) -> Option<&str> {
    req.headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Middleware requiring a valid access token; loads the user into extensions
pub async fn require_user(
    State(state): State<Arc<ApiState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let unauthorized =
        |msg: &str| (StatusCode::UNAUTHORIZED, error_response("unauthorized", msg));

    let token = extract_bearer(&req)
        .ok_or_else(|| unauthorized("missing bearer token"))?
        .to_string();

    let claims = state
        .jwt
        .decode_access(&token)
        .map_err(|_| unauthorized("invalid or expired token"))?;

    let user = state
        .user_repo
        .find(&claims.sub)
        .map_err(|e| map_error(&e))?
        .ok_or_else(|| unauthorized("unknown user"))?;

    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}

/// Build the auth router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/verify/{token}", get(verify_email))
        .route("/request-verification", post(request_verification))
        .with_state(state)
}
