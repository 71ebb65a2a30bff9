//! Current-user endpoints: profile and avatar upload

use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{middleware, Extension, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::auth::{require_user, CurrentUser};
use super::{error_response, map_error, ApiError, ApiState};
use crate::db::User;

/// Image extensions accepted for avatar upload
const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// User data safe for client responses (no password hash)
#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            verified: user.verified,
            avatar_url: user.avatar_path.clone(),
            created_at: user.created_at,
        }
    }
}

/// Get the authenticated user's profile
async fn me(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Json<UserResponse> {
    Json(UserResponse::from(&user))
}

/// Upload a new avatar image (multipart field "file")
///
/// The file is stored under the avatar directory as `<user id>.<ext>` and
/// served back at `/static/avatars/`.
async fn upload_avatar(
    State(state): State<Arc<ApiState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    mut multipart: Multipart,
) -> Result<Json<UserResponse>, ApiError> {
    let bad_request = |msg: &str| {
        (
            StatusCode::BAD_REQUEST,
            error_response("invalid_upload", msg),
        )
    };

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(&e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let extension = field
            .file_name()
            .map(extract_extension)
            .unwrap_or_default();
        let data = field
            .bytes()
            .await
            .map_err(|e| bad_request(&e.to_string()))?;
        upload = Some((extension, data));
        break;
    }

    let Some((extension, data)) = upload else {
        return Err(bad_request("missing 'file' field"));
    };

    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(bad_request(
            "unsupported image type (use png, jpg, jpeg, gif, or webp)",
        ));
    }

    if data.is_empty() {
        return Err(bad_request("uploaded file is empty"));
    }

    let filename = format!("{}.{extension}", user.id);
    let path = state.avatar_dir.join(&filename);
    tokio::fs::write(&path, &data).await.map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            error_response("io_error", &e.to_string()),
        )
    })?;

    let avatar_url = format!("/static/avatars/{filename}");
    state
        .user_repo
        .set_avatar_path(&user.id, &avatar_url)
        .map_err(|e| map_error(&e))?;

    tracing::info!(user_id = %user.id, bytes = data.len(), "avatar uploaded");

    let user = state
        .user_repo
        .find(&user.id)
        .map_err(|e| map_error(&e))?
        .ok_or_else(|| map_error(&crate::Error::NotFound("user".to_string())))?;

    Ok(Json(UserResponse::from(&user)))
}

/// Lowercased file extension, empty when absent
fn extract_extension(filename: &str) -> String {
    std::path::Path::new(filename)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

/// Build the users router (bearer-token protected)
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/me", get(me))
        .route("/avatar", put(upload_avatar))
        .layer(middleware::from_fn_with_state(state.clone(), require_user))
        .with_state(state)
}
