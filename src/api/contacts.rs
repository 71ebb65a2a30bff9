//! Contact CRUD, search, and upcoming-birthday endpoints
//!
//! Every route sits behind the bearer middleware and operates only on the
//! authenticated user's contacts.

use std::sync::{Arc, LazyLock};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{middleware, Extension, Json, Router};
use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::auth::{require_user, CurrentUser};
use super::{error_response, map_error, ApiError, ApiState, EMAIL_RE};
use crate::birthdays::find_upcoming_birthdays;
use crate::db::{Contact, ContactDraft, ContactFilter};

/// International phone format, e.g. "+380501234567"
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[1-9]\d{6,14}$").expect("valid regex"));

// --- Request/Response types ---

#[derive(Debug, Deserialize)]
pub struct ContactPayload {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub phone: String,
    pub birthday: NaiveDate,
    #[serde(default)]
    pub note: Option<String>,
}

impl ContactPayload {
    /// Validate the payload and turn it into a draft for the repository
    fn into_draft(self) -> Result<ContactDraft, ApiError> {
        let invalid = |msg: &str| {
            (
                StatusCode::BAD_REQUEST,
                error_response("invalid_argument", msg),
            )
        };

        if !(2..=50).contains(&self.name.chars().count()) {
            return Err(invalid("name must be 2-50 characters"));
        }
        if !(2..=50).contains(&self.surname.chars().count()) {
            return Err(invalid("surname must be 2-50 characters"));
        }
        if self.email.chars().count() > 100 || !EMAIL_RE.is_match(&self.email) {
            return Err(invalid("email address is not valid"));
        }
        if !PHONE_RE.is_match(&self.phone) {
            return Err(invalid(
                "phone must be in international format (e.g. +380501234567)",
            ));
        }
        if self.birthday > Utc::now().date_naive() {
            return Err(invalid("birthday cannot be in the future"));
        }
        if self
            .note
            .as_ref()
            .is_some_and(|note| note.chars().count() > 500)
        {
            return Err(invalid("note must be at most 500 characters"));
        }

        Ok(ContactDraft {
            name: self.name,
            surname: self.surname,
            email: self.email,
            phone: self.phone,
            birthday: self.birthday,
            note: self.note,
        })
    }
}

#[derive(Serialize)]
pub struct ContactResponse {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub phone: String,
    pub birthday: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Contact> for ContactResponse {
    fn from(contact: &Contact) -> Self {
        Self {
            id: contact.id.clone(),
            user_id: contact.user_id.clone(),
            name: contact.name.clone(),
            surname: contact.surname.clone(),
            email: contact.email.clone(),
            phone: contact.phone.clone(),
            birthday: contact.birthday,
            note: contact.note.clone(),
            created_at: contact.created_at,
            updated_at: contact.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub name: Option<String>,
    pub surname: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

const fn default_limit() -> i64 {
    10
}

#[derive(Debug, Deserialize)]
pub struct BirthdaysQuery {
    #[serde(default = "default_days")]
    pub days: i64,
}

const fn default_days() -> i64 {
    7
}

// --- Handlers ---

/// Create a contact for the current user
async fn create_contact(
    State(state): State<Arc<ApiState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<ContactPayload>,
) -> Result<(StatusCode, Json<ContactResponse>), ApiError> {
    let draft = payload.into_draft()?;

    let contact = state
        .contact_repo
        .create(&user.id, &draft)
        .map_err(|e| map_error(&e))?;

    Ok((StatusCode::CREATED, Json(ContactResponse::from(&contact))))
}

/// List the current user's contacts with optional filters
async fn list_contacts(
    State(state): State<Arc<ApiState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ContactResponse>>, ApiError> {
    let filter = ContactFilter {
        name: query.name,
        surname: query.surname,
        email: query.email,
        skip: query.skip.max(0),
        limit: query.limit.clamp(1, 100),
    };

    let contacts = state
        .contact_repo
        .list(&user.id, &filter)
        .map_err(|e| map_error(&e))?;

    Ok(Json(contacts.iter().map(ContactResponse::from).collect()))
}

/// Get one contact by id
async fn get_contact(
    State(state): State<Arc<ApiState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(contact_id): Path<String>,
) -> Result<Json<ContactResponse>, ApiError> {
    let contact = state
        .contact_repo
        .find(&user.id, &contact_id)
        .map_err(|e| map_error(&e))?
        .ok_or_else(contact_not_found)?;

    Ok(Json(ContactResponse::from(&contact)))
}

/// Fully update a contact
async fn update_contact(
    State(state): State<Arc<ApiState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(contact_id): Path<String>,
    Json(payload): Json<ContactPayload>,
) -> Result<Json<ContactResponse>, ApiError> {
    let draft = payload.into_draft()?;

    let contact = state
        .contact_repo
        .update(&user.id, &contact_id, &draft)
        .map_err(|e| map_error(&e))?
        .ok_or_else(contact_not_found)?;

    Ok(Json(ContactResponse::from(&contact)))
}

/// Delete a contact, returning the deleted record
async fn delete_contact(
    State(state): State<Arc<ApiState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(contact_id): Path<String>,
) -> Result<Json<ContactResponse>, ApiError> {
    let contact = state
        .contact_repo
        .delete(&user.id, &contact_id)
        .map_err(|e| map_error(&e))?
        .ok_or_else(contact_not_found)?;

    Ok(Json(ContactResponse::from(&contact)))
}

/// Contacts whose birthday falls within the next `days` days
async fn upcoming_birthdays(
    State(state): State<Arc<ApiState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(query): Query<BirthdaysQuery>,
) -> Result<Json<Vec<ContactResponse>>, ApiError> {
    let contacts = state
        .contact_repo
        .list_all(&user.id)
        .map_err(|e| map_error(&e))?;

    let upcoming = find_upcoming_birthdays(contacts, Utc::now().date_naive(), query.days)
        .map_err(|e| map_error(&e))?;

    Ok(Json(upcoming.iter().map(ContactResponse::from).collect()))
}

fn contact_not_found() -> ApiError {
    (
        StatusCode::NOT_FOUND,
        error_response("not_found", "contact not found"),
    )
}

/// Build the contacts router (bearer-token protected)
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/", post(create_contact).get(list_contacts))
        .route("/birthdays", get(upcoming_birthdays))
        .route(
            "/{contact_id}",
            get(get_contact).put(update_contact).delete(delete_contact),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_user))
        .with_state(state)
}
