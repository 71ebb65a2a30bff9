//! Rolo - Contacts API with JWT authentication and birthday reminders
//!
//! This library provides the core functionality for the Rolo service:
//! - User registration, email verification, and JWT login
//! - Per-user contact CRUD with search and pagination
//! - Upcoming-birthday matching with calendar wraparound
//! - Avatar upload served back as static files
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    HTTP API (axum)                   │
//! │   /api/auth  │  /api/users  │  /api/contacts        │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │        Auth (argon2 + JWT)  │  Birthday matcher      │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │          SQLite (rusqlite + r2d2 pool)               │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod auth;
pub mod birthdays;
pub mod config;
pub mod db;
pub mod error;
pub mod mail;

pub use birthdays::find_upcoming_birthdays;
pub use config::Config;
pub use db::{DbConn, DbPool};
pub use error::{Error, Result};
