//! Contact repository for per-user CRUD and search
//!
//! Every query is scoped to the owning user id; a contact is never visible
//! outside its owner. Email and phone are unique per owner, enforced both by
//! schema constraints and by an explicit pre-write check so callers get a
//! `Conflict` instead of a raw constraint failure.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use super::DbPool;
use crate::{Error, Result};

/// A contact owned by a user
#[derive(Debug, Clone)]
pub struct Contact {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub phone: String,
    pub birthday: NaiveDate,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Field values for creating or fully updating a contact
#[derive(Debug, Clone)]
pub struct ContactDraft {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub phone: String,
    pub birthday: NaiveDate,
    pub note: Option<String>,
}

/// Search filters and pagination for contact listing
#[derive(Debug, Default)]
pub struct ContactFilter {
    pub name: Option<String>,
    pub surname: Option<String>,
    pub email: Option<String>,
    pub skip: i64,
    pub limit: i64,
}

/// Contact repository
#[derive(Clone)]
pub struct ContactRepo {
    pool: DbPool,
}

const CONTACT_COLUMNS: &str =
    "id, user_id, name, surname, email, phone, birthday, note, created_at, updated_at";

impl ContactRepo {
    /// Create a new contact repository
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a contact for a user
    ///
    /// # Errors
    ///
    /// Returns `Error::Conflict` when the user already has a contact with the
    /// same email or phone, or `Error::Database` if the operation fails
    pub fn create(&self, user_id: &str, draft: &ContactDraft) -> Result<Contact> {
        if self.exists_with_email_or_phone(user_id, &draft.email, &draft.phone, None)? {
            return Err(Error::Conflict(format!(
                "contact with email '{}' or phone '{}' already exists",
                draft.email, draft.phone
            )));
        }

        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO contacts (id, user_id, name, surname, email, phone, birthday, note, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
            rusqlite::params![
                id,
                user_id,
                draft.name,
                draft.surname,
                draft.email,
                draft.phone,
                draft.birthday.to_string(),
                draft.note,
                now,
            ],
        )
        .map_err(|e| Error::Database(e.to_string()))?;

        drop(conn);
        self.find(user_id, &id)?
            .ok_or_else(|| Error::Database("created contact not found".to_string()))
    }

    /// Find a contact by ID, scoped to its owner (returns None if not found)
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn find(&self, user_id: &str, id: &str) -> Result<Option<Contact>> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let contact = conn
            .query_row(
                &format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = ?1 AND user_id = ?2"),
                [id, user_id],
                row_to_contact,
            )
            .ok();

        Ok(contact)
    }

    /// List a user's contacts with optional substring filters and pagination
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn list(&self, user_id: &str, filter: &ContactFilter) -> Result<Vec<Contact>> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {CONTACT_COLUMNS} FROM contacts
                 WHERE user_id = ?1
                   AND (?2 IS NULL OR name LIKE '%' || ?2 || '%')
                   AND (?3 IS NULL OR surname LIKE '%' || ?3 || '%')
                   AND (?4 IS NULL OR email LIKE '%' || ?4 || '%')
                 ORDER BY created_at DESC, id
                 LIMIT ?5 OFFSET ?6"
            ))
            .map_err(|e| Error::Database(e.to_string()))?;

        let contacts = stmt
            .query_map(
                rusqlite::params![
                    user_id,
                    filter.name,
                    filter.surname,
                    filter.email,
                    filter.limit,
                    filter.skip,
                ],
                row_to_contact,
            )
            .map_err(|e| Error::Database(e.to_string()))?
            .filter_map(std::result::Result::ok)
            .collect();

        Ok(contacts)
    }

    /// List all of a user's contacts (no filters, no pagination)
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn list_all(&self, user_id: &str) -> Result<Vec<Contact>> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {CONTACT_COLUMNS} FROM contacts WHERE user_id = ?1 ORDER BY created_at DESC, id"
            ))
            .map_err(|e| Error::Database(e.to_string()))?;

        let contacts = stmt
            .query_map([user_id], row_to_contact)
            .map_err(|e| Error::Database(e.to_string()))?
            .filter_map(std::result::Result::ok)
            .collect();

        Ok(contacts)
    }

    /// Fully update a contact, scoped to its owner
    ///
    /// Returns None when the contact does not exist or belongs to another user
    ///
    /// # Errors
    ///
    /// Returns `Error::Conflict` when the new email or phone collides with
    /// another of the user's contacts, or `Error::Database` on failure
    pub fn update(
        &self,
        user_id: &str,
        id: &str,
        draft: &ContactDraft,
    ) -> Result<Option<Contact>> {
        if self.find(user_id, id)?.is_none() {
            return Ok(None);
        }

        if self.exists_with_email_or_phone(user_id, &draft.email, &draft.phone, Some(id))? {
            return Err(Error::Conflict(format!(
                "contact with email '{}' or phone '{}' already exists",
                draft.email, draft.phone
            )));
        }

        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "UPDATE contacts
             SET name = ?1, surname = ?2, email = ?3, phone = ?4, birthday = ?5, note = ?6, updated_at = ?7
             WHERE id = ?8 AND user_id = ?9",
            rusqlite::params![
                draft.name,
                draft.surname,
                draft.email,
                draft.phone,
                draft.birthday.to_string(),
                draft.note,
                now,
                id,
                user_id,
            ],
        )
        .map_err(|e| Error::Database(e.to_string()))?;

        drop(conn);
        self.find(user_id, id)
    }

    /// Delete a contact, scoped to its owner
    ///
    /// Returns the deleted contact, or None when it does not exist or belongs
    /// to another user
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn delete(&self, user_id: &str, id: &str) -> Result<Option<Contact>> {
        let Some(contact) = self.find(user_id, id)? else {
            return Ok(None);
        };

        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        conn.execute(
            "DELETE FROM contacts WHERE id = ?1 AND user_id = ?2",
            [id, user_id],
        )
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(Some(contact))
    }

    /// Check whether the user already has a contact with the email or phone,
    /// optionally excluding one contact id (for updates)
    fn exists_with_email_or_phone(
        &self,
        user_id: &str,
        email: &str,
        phone: &str,
        exclude_id: Option<&str>,
    ) -> Result<bool> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let exists: bool = conn
            .query_row(
                "SELECT 1 FROM contacts
                 WHERE user_id = ?1 AND (email = ?2 OR phone = ?3)
                   AND (?4 IS NULL OR id != ?4)
                 LIMIT 1",
                rusqlite::params![user_id, email, phone, exclude_id],
                |_| Ok(true),
            )
            .unwrap_or(false);

        Ok(exists)
    }
}

fn row_to_contact(row: &rusqlite::Row<'_>) -> rusqlite::Result<Contact> {
    Ok(Contact {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        surname: row.get(3)?,
        email: row.get(4)?,
        phone: row.get(5)?,
        birthday: parse_date(&row.get::<_, String>(6)?),
        note: row.get(7)?,
        created_at: parse_datetime(&row.get::<_, String>(8)?),
        updated_at: parse_datetime(&row.get::<_, String>(9)?),
    })
}

fn parse_date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap_or_default()
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
