//! Configuration loading and validation for the user-fields service.
//!
//! All values are read from environment variables at startup. The process will
//! exit with a clear error message if any required variable is missing or invalid.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::crypto::FieldKey;

/// A configuration string that must never be printed.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret([REDACTED])")
    }
}

/// Validated service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// ASCII-safe field encryption key. **Required.**
    pub person_encrypt_key: Secret,

    /// Group whose members may see and edit the encrypted fields.
    #[serde(default = "default_active_group")]
    pub active_group: String,

    /// JSON membership document. Without it nobody is a member.
    #[serde(default)]
    pub membership_path: Option<PathBuf>,

    /// How often (seconds) to reload the membership document.
    #[serde(default = "default_membership_refresh_interval")]
    pub membership_refresh_interval_secs: u64,

    /// JSON file backing the field store. In-memory storage when unset.
    #[serde(default)]
    pub storage_path: Option<PathBuf>,

    /// Port the HTTP server listens on.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Header carrying the authenticated actor's user id.
    #[serde(default = "default_actor_header")]
    pub actor_header_name: String,

    /// OTLP endpoint for span export. Logs only when unset.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_active_group() -> String {
    "Sektionsaktiva".into()
}
fn default_membership_refresh_interval() -> u64 {
    300
}
fn default_listen_port() -> u16 {
    8080
}
fn default_actor_header() -> String {
    "X-Actor-Id".into()
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any required variable is absent or cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Parse the configured key.
    ///
    /// # Errors
    ///
    /// Returns an error naming the variable if the key is malformed.
    pub fn field_key(&self) -> Result<FieldKey> {
        FieldKey::from_ascii_safe(self.person_encrypt_key.expose())
            .context("PERSON_ENCRYPT_KEY is not a valid key")
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        ensure_non_empty(self.person_encrypt_key.expose(), "PERSON_ENCRYPT_KEY")?;
        ensure_non_empty(&self.active_group, "ACTIVE_GROUP")?;
        ensure_non_empty(&self.actor_header_name, "ACTOR_HEADER_NAME")?;
        self.field_key()?;

        if self.membership_refresh_interval_secs == 0 {
            anyhow::bail!("MEMBERSHIP_REFRESH_INTERVAL_SECS must be > 0");
        }
        if axum::http::HeaderName::from_bytes(self.actor_header_name.as_bytes()).is_err() {
            anyhow::bail!("ACTOR_HEADER_NAME is not a valid HTTP header name");
        }
        Ok(())
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} is required and must not be empty");
    }
    Ok(())
}
