//! User repository for account storage and verification state

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::DbPool;
use crate::{Error, Result};

/// A registered account
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub verified: bool,
    pub avatar_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data required to create an account
#[derive(Debug)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// User repository
#[derive(Clone)]
pub struct UserRepo {
    pool: DbPool,
}

const USER_COLUMNS: &str =
    "id, username, email, password_hash, verified, avatar_path, created_at, updated_at";

impl UserRepo {
    /// Create a new user repository
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create an account
    ///
    /// # Errors
    ///
    /// Returns `Error::Conflict` if the username or email is already taken,
    /// or `Error::Database` if the operation fails
    pub fn create(&self, new_user: &NewUser) -> Result<User> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO users (id, username, email, password_hash, verified, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5, ?5)",
            rusqlite::params![id, new_user.username, new_user.email, new_user.password_hash, now],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Error::Conflict("username or email already registered".to_string())
            }
            other => Error::Database(other.to_string()),
        })?;

        drop(conn);
        self.find(&id)?
            .ok_or_else(|| Error::Database("created user not found".to_string()))
    }

    /// Find a user by ID (returns None if not found)
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn find(&self, id: &str) -> Result<Option<User>> {
        self.find_by("id", id)
    }

    /// Find a user by email
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.find_by("email", email)
    }

    /// Find a user by username
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        self.find_by("username", username)
    }

    fn find_by(&self, column: &str, value: &str) -> Result<Option<User>> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        // `column` is always one of our own literals, never caller input
        let user = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1"),
                [value],
                row_to_user,
            )
            .ok();

        Ok(user)
    }

    /// Mark a user's email address as verified
    ///
    /// Returns false when no account exists for the email
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn mark_verified(&self, email: &str) -> Result<bool> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;
        let now = Utc::now().to_rfc3339();

        let changed = conn
            .execute(
                "UPDATE users SET verified = 1, updated_at = ?1 WHERE email = ?2",
                rusqlite::params![now, email],
            )
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(changed > 0)
    }

    /// Set a user's avatar path
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn set_avatar_path(&self, user_id: &str, path: &str) -> Result<()> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "UPDATE users SET avatar_path = ?1, updated_at = ?2 WHERE id = ?3",
            rusqlite::params![path, now, user_id],
        )
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(())
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        verified: row.get(4)?,
        avatar_path: row.get(5)?,
        created_at: parse_datetime(&row.get::<_, String>(6)?),
        updated_at: parse_datetime(&row.get::<_, String>(7)?),
    })
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory;

    fn setup() -> UserRepo {
        let pool = init_memory().unwrap();
        UserRepo::new(pool)
    }

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "$argon2id$stub".to_string(),
        }
    }

    #[test]
    fn test_create_and_find() {
        let repo = setup();

        let user = repo.create(&new_user("ada", "ada@example.com")).unwrap();
        assert_eq!(user.username, "ada");
        assert!(!user.verified);
        assert!(user.avatar_path.is_none());

        let found = repo.find(&user.id).unwrap().unwrap();
        assert_eq!(found.email, "ada@example.com");

        let by_email = repo.find_by_email("ada@example.com").unwrap().unwrap();
        assert_eq!(by_email.id, user.id);

        let by_username = repo.find_by_username("ada").unwrap().unwrap();
        assert_eq!(by_username.id, user.id);

        assert!(repo.find("missing").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_email_conflicts() {
        let repo = setup();

        repo.create(&new_user("ada", "ada@example.com")).unwrap();
        let err = repo.create(&new_user("grace", "ada@example.com")).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        let err = repo.create(&new_user("ada", "other@example.com")).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn test_mark_verified() {
        let repo = setup();

        let user = repo.create(&new_user("ada", "ada@example.com")).unwrap();
        assert!(!user.verified);

        assert!(repo.mark_verified("ada@example.com").unwrap());
        let user = repo.find(&user.id).unwrap().unwrap();
        assert!(user.verified);

        assert!(!repo.mark_verified("missing@example.com").unwrap());
    }

    #[test]
    fn test_set_avatar_path() {
        let repo = setup();

        let user = repo.create(&new_user("ada", "ada@example.com")).unwrap();
        repo.set_avatar_path(&user.id, "/static/avatars/ada.png")
            .unwrap();

        let user = repo.find(&user.id).unwrap().unwrap();
        assert_eq!(user.avatar_path.as_deref(), Some("/static/avatars/ada.png"));
    }
}
