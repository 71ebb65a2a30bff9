//! TOML configuration file loading
//!
//! Supports `~/.config/rolo/config.toml` as a persistent config source.
//! All fields are optional — the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct RoloConfigFile {
    /// Data directory (database, avatars)
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerFileConfig,

    /// JWT configuration
    #[serde(default)]
    pub jwt: JwtFileConfig,

    /// Outbound mail (SMTP) configuration
    #[serde(default)]
    pub mail: MailFileConfig,
}

/// HTTP server configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// Port to listen on
    pub port: Option<u16>,

    /// Public base URL used in verification links (e.g. "https://api.example.com")
    pub base_url: Option<String>,

    /// Allowed CORS origin; unset means any origin
    pub cors_origin: Option<String>,

    /// Global rate limit in requests per minute; 0 disables limiting
    pub rate_limit_rpm: Option<u32>,
}

/// JWT configuration
#[derive(Debug, Default, Deserialize)]
pub struct JwtFileConfig {
    /// HS256 signing secret
    pub secret: Option<String>,

    /// Access token lifetime in seconds
    pub access_ttl_secs: Option<i64>,

    /// Email-verification token lifetime in seconds
    pub verify_ttl_secs: Option<i64>,
}

/// SMTP configuration for verification mail
#[derive(Debug, Default, Deserialize)]
pub struct MailFileConfig {
    pub server: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: Option<String>,
    pub from_name: Option<String>,
}

impl RoloConfigFile {
    /// Load the config file, tolerating absence
    ///
    /// A missing file yields defaults; a malformed file is an error so typos
    /// do not silently fall back.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &Path) -> crate::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let parsed = toml::from_str(&content)?;

        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(parsed)
    }
}
