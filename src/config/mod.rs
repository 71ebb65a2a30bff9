//! Configuration management for the Rolo service
//!
//! Resolution order for every setting: environment variable, then the TOML
//! config file, then the built-in default. The JWT secret has no default and
//! must be configured to serve.

pub mod file;

use std::path::PathBuf;

use secrecy::SecretString;

use crate::{Error, Result};
use file::RoloConfigFile;

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 8000;

/// Default access token lifetime (1 hour)
const DEFAULT_ACCESS_TTL_SECS: i64 = 3600;

/// Default verification token lifetime (24 hours)
const DEFAULT_VERIFY_TTL_SECS: i64 = 86400;

/// Default global rate limit in requests per minute
const DEFAULT_RATE_LIMIT_RPM: u32 = 120;

/// Rolo service configuration
#[derive(Debug)]
pub struct Config {
    /// Path to data directory (database, avatars)
    pub data_dir: PathBuf,

    /// Path to the `SQLite` database file
    pub database_path: PathBuf,

    /// Directory where uploaded avatars are stored
    pub avatar_dir: PathBuf,

    /// HTTP server configuration
    pub server: ServerConfig,

    /// JWT configuration
    pub jwt: JwtConfig,

    /// Outbound mail configuration; None runs the service without mail
    pub mail: Option<MailConfig>,
}

/// HTTP server configuration
#[derive(Debug)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,

    /// Public base URL used when building verification links
    pub base_url: String,

    /// Allowed CORS origin; None allows any origin
    pub cors_origin: Option<String>,

    /// Global rate limit in requests per minute; 0 disables limiting
    pub rate_limit_rpm: u32,
}

/// JWT configuration
#[derive(Debug)]
pub struct JwtConfig {
    /// HS256 signing secret
    pub secret: SecretString,

    /// Access token lifetime in seconds
    pub access_ttl_secs: i64,

    /// Email-verification token lifetime in seconds
    pub verify_ttl_secs: i64,
}

/// SMTP configuration for verification mail
#[derive(Debug)]
pub struct MailConfig {
    /// SMTP server hostname
    pub server: String,

    /// SMTP port
    pub port: u16,

    /// SMTP credentials; None sends unauthenticated
    pub username: Option<String>,
    pub password: Option<SecretString>,

    /// From address and display name
    pub from: String,
    pub from_name: String,
}

impl Config {
    /// Load configuration (env > config file > default)
    ///
    /// # Errors
    ///
    /// Returns error if the config file is malformed or the JWT secret is
    /// not configured
    pub fn load(data_dir_override: Option<PathBuf>) -> Result<Self> {
        let config_path = std::env::var("ROLO_CONFIG").map_or_else(
            |_| default_config_path(),
            PathBuf::from,
        );
        let fc = RoloConfigFile::load(&config_path)?;

        let mail = load_mail_config(&fc);
        if mail.is_none() {
            tracing::warn!("mail not configured - verification emails will not be sent");
        }

        let data_dir = data_dir_override
            .or_else(|| std::env::var("ROLO_DATA_DIR").ok().map(PathBuf::from))
            .or(fc.data_dir)
            .unwrap_or_else(default_data_dir);

        let database_path = std::env::var("ROLO_DATABASE")
            .ok()
            .map_or_else(|| data_dir.join("rolo.db"), PathBuf::from);

        let avatar_dir = std::env::var("ROLO_AVATAR_DIR")
            .ok()
            .map_or_else(|| data_dir.join("avatars"), PathBuf::from);

        let port = std::env::var("ROLO_PORT")
            .or_else(|_| std::env::var("PORT"))
            .ok()
            .and_then(|p| p.parse().ok())
            .or(fc.server.port)
            .unwrap_or(DEFAULT_PORT);

        let server = ServerConfig {
            port,
            base_url: std::env::var("ROLO_BASE_URL")
                .ok()
                .or(fc.server.base_url)
                .unwrap_or_else(|| format!("http://127.0.0.1:{port}")),
            cors_origin: std::env::var("ROLO_CORS_ORIGIN")
                .ok()
                .or(fc.server.cors_origin),
            rate_limit_rpm: std::env::var("ROLO_RATE_LIMIT_RPM")
                .ok()
                .and_then(|v| v.parse().ok())
                .or(fc.server.rate_limit_rpm)
                .unwrap_or(DEFAULT_RATE_LIMIT_RPM),
        };

        let secret = std::env::var("ROLO_JWT_SECRET")
            .ok()
            .or(fc.jwt.secret)
            .ok_or_else(|| {
                Error::Config(
                    "JWT secret not configured (set ROLO_JWT_SECRET or [jwt].secret)".to_string(),
                )
            })?;

        let jwt = JwtConfig {
            secret: SecretString::from(secret),
            access_ttl_secs: std::env::var("ROLO_JWT_ACCESS_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .or(fc.jwt.access_ttl_secs)
                .unwrap_or(DEFAULT_ACCESS_TTL_SECS),
            verify_ttl_secs: std::env::var("ROLO_JWT_VERIFY_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .or(fc.jwt.verify_ttl_secs)
                .unwrap_or(DEFAULT_VERIFY_TTL_SECS),
        };

        Ok(Self {
            data_dir,
            database_path,
            avatar_dir,
            server,
            jwt,
            mail,
        })
    }
}

/// Build mail config when a server and from address are present (env > file)
fn load_mail_config(fc: &RoloConfigFile) -> Option<MailConfig> {
    let server = std::env::var("MAIL_SERVER")
        .ok()
        .or_else(|| fc.mail.server.clone())?;
    let from = std::env::var("MAIL_FROM")
        .ok()
        .or_else(|| fc.mail.from.clone())?;

    Some(MailConfig {
        server,
        port: std::env::var("MAIL_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .or(fc.mail.port)
            .unwrap_or(465),
        username: std::env::var("MAIL_USERNAME")
            .ok()
            .or_else(|| fc.mail.username.clone()),
        password: std::env::var("MAIL_PASSWORD")
            .ok()
            .or_else(|| fc.mail.password.clone())
            .map(SecretString::from),
        from,
        from_name: std::env::var("MAIL_FROM_NAME")
            .ok()
            .or_else(|| fc.mail.from_name.clone())
            .unwrap_or_else(|| "Rolo".to_string()),
    })
}

fn default_config_path() -> PathBuf {
    directories::ProjectDirs::from("dev", "omni", "rolo").map_or_else(
        || PathBuf::from("rolo-config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("dev", "omni", "rolo")
        .map_or_else(|| PathBuf::from(".rolo"), |dirs| dirs.data_dir().to_path_buf())
}
