//! HTTP API server for the Rolo service

pub mod auth;
pub mod contacts;
pub mod health;
pub mod rate_limit;
pub mod users;

use std::path::PathBuf;
use std::sync::{Arc, LazyLock};

use axum::http::{HeaderValue, StatusCode};
use axum::{Json, Router};
use regex::Regex;
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::auth::JwtKeys;
use crate::db::{ContactRepo, DbPool, UserRepo};
use crate::mail::Mailer;
use crate::{Config, Error, Result};

/// Loose email shape check; real validation happens when the verification
/// mail arrives
pub(crate) static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid regex"));

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub db: DbPool,
    pub user_repo: UserRepo,
    pub contact_repo: ContactRepo,
    pub jwt: JwtKeys,
    /// None when mail is not configured; registration then skips the email
    pub mailer: Option<Arc<Mailer>>,
    /// Public base URL used when building verification links
    pub base_url: String,
    /// Directory where uploaded avatars land
    pub avatar_dir: PathBuf,
    pub rate_limiter: Option<rate_limit::SharedLimiter>,
}

/// Error payload returned by every failing endpoint
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// Status + body pair handlers return on failure
pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub(crate) fn error_response(code: &str, message: &str) -> Json<ErrorResponse> {
    Json(ErrorResponse {
        error: ErrorDetail {
            code: code.to_string(),
            message: message.to_string(),
        },
    })
}

/// Map a crate error onto an HTTP status and body
pub(crate) fn map_error(err: &Error) -> ApiError {
    match err {
        Error::Conflict(m) => (StatusCode::CONFLICT, error_response("conflict", m)),
        Error::NotFound(m) => (StatusCode::NOT_FOUND, error_response("not_found", m)),
        Error::InvalidArgument(m) => (
            StatusCode::BAD_REQUEST,
            error_response("invalid_argument", m),
        ),
        Error::Auth(m) => (StatusCode::UNAUTHORIZED, error_response("unauthorized", m)),
        other => (
            StatusCode::INTERNAL_SERVER_ERROR,
            error_response("internal_error", &other.to_string()),
        ),
    }
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
    cors_origin: Option<String>,
}

impl ApiServer {
    /// Build the server from config and an initialized pool
    ///
    /// # Errors
    ///
    /// Returns error if the avatar directory cannot be created or the mail
    /// config is invalid
    pub fn new(config: &Config, db: DbPool) -> Result<Self> {
        std::fs::create_dir_all(&config.avatar_dir)?;

        let mailer = config
            .mail
            .as_ref()
            .map(Mailer::new)
            .transpose()?
            .map(Arc::new);

        let rate_limiter = (config.server.rate_limit_rpm > 0)
            .then(|| rate_limit::create_limiter(config.server.rate_limit_rpm));

        let state = Arc::new(ApiState {
            user_repo: UserRepo::new(db.clone()),
            contact_repo: ContactRepo::new(db.clone()),
            db,
            jwt: JwtKeys::new(
                &config.jwt.secret,
                config.jwt.access_ttl_secs,
                config.jwt.verify_ttl_secs,
            ),
            mailer,
            base_url: config.server.base_url.trim_end_matches('/').to_string(),
            avatar_dir: config.avatar_dir.clone(),
            rate_limiter,
        });

        Ok(Self {
            state,
            port: config.server.port,
            cors_origin: config.server.cors_origin.clone(),
        })
    }

    /// Build the router with all routes
    ///
    /// # Errors
    ///
    /// Returns error if the configured CORS origin is not a valid header value
    pub fn router(&self) -> Result<Router> {
        let router = Router::new()
            .nest("/api/auth", auth::router(self.state.clone()))
            .nest("/api/users", users::router(self.state.clone()))
            .nest("/api/contacts/", contacts::router(self.state.clone()))
            .merge(health::router())
            .merge(health::ready_router(self.state.clone()))
            .nest_service("/static/avatars", ServeDir::new(&self.state.avatar_dir));

        // Rate limiting (no-op when no limiter is configured)
        let router = router.layer(axum::middleware::from_fn_with_state(
            self.state.clone(),
            rate_limit::rate_limit_middleware,
        ));

        // CORS: a configured origin restricts, otherwise open
        let cors = match &self.cors_origin {
            Some(origin) => {
                let origin = origin
                    .parse::<HeaderValue>()
                    .map_err(|e| Error::Config(format!("invalid CORS origin: {e}")))?;
                CorsLayer::new()
                    .allow_origin(origin)
                    .allow_methods(Any)
                    .allow_headers(Any)
            }
            None => CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        };

        Ok(router.layer(cors).layer(TraceLayer::new_for_http()))
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let router = self.router()?;

        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(port = self.port, "API server listening");

        axum::serve(listener, router)
            .await
            .map_err(|e| Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }

    /// Run the API server in a background task
    #[must_use]
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}
