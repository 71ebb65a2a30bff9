//! JWT issuance and validation
//!
//! Two token kinds share one HS256 secret but carry a `scope` claim so they
//! can never stand in for each other: `access` tokens authenticate API
//! requests (subject = user id), `verify` tokens confirm email addresses
//! (subject = email) and ride inside the verification link.

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// What a token is allowed to be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenScope {
    /// Authenticates API requests; subject is the user id
    Access,
    /// Confirms an email address; subject is the email
    Verify,
}

/// Claims carried by every Rolo token
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub scope: TokenScope,
    pub iat: i64,
    pub exp: i64,
}

/// Keys and lifetimes for issuing and validating tokens
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl_secs: i64,
    verify_ttl_secs: i64,
}

impl JwtKeys {
    /// Create keys from the shared secret
    #[must_use]
    pub fn new(secret: &SecretString, access_ttl_secs: i64, verify_ttl_secs: i64) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            access_ttl_secs,
            verify_ttl_secs,
        }
    }

    /// Issue an access token for a user id
    ///
    /// # Errors
    ///
    /// Returns error if signing fails
    pub fn issue_access(&self, user_id: &str) -> Result<String> {
        self.issue(user_id, TokenScope::Access, self.access_ttl_secs)
    }

    /// Issue an email-verification token for an email address
    ///
    /// # Errors
    ///
    /// Returns error if signing fails
    pub fn issue_verification(&self, email: &str) -> Result<String> {
        self.issue(email, TokenScope::Verify, self.verify_ttl_secs)
    }

    fn issue(&self, subject: &str, scope: TokenScope, ttl_secs: i64) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: subject.to_string(),
            scope,
            iat: now,
            exp: now + ttl_secs,
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| Error::Auth(format!("token signing failed: {e}")))
    }

    /// Validate an access token and return its claims
    ///
    /// # Errors
    ///
    /// Returns `Error::Auth` if the token is invalid, expired, or carries
    /// the wrong scope
    pub fn decode_access(&self, token: &str) -> Result<Claims> {
        self.decode_scoped(token, TokenScope::Access)
    }

    /// Validate an email-verification token and return its claims
    ///
    /// # Errors
    ///
    /// Returns `Error::Auth` if the token is invalid, expired, or carries
    /// the wrong scope
    pub fn decode_verification(&self, token: &str) -> Result<Claims> {
        self.decode_scoped(token, TokenScope::Verify)
    }

    fn decode_scoped(&self, token: &str, scope: TokenScope) -> Result<Claims> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())
            .map_err(|e| Error::Auth(format!("invalid token: {e}")))?;

        if data.claims.scope != scope {
            return Err(Error::Auth("token scope mismatch".to_string()));
        }

        Ok(data.claims)
    }
}
