//! Authentication primitives
//!
//! Password hashing (argon2) and JWT issuance/validation for access and
//! email-verification tokens. HTTP-facing auth (bearer extraction, the
//! current-user middleware) lives in `api::auth`.

pub mod jwt;
pub mod password;

pub use jwt::{Claims, JwtKeys, TokenScope};
pub use password::{hash_password, verify_password};
