//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to deserialize environment variables into a type-safe struct.

use std::time::Duration;

use serde::Deserialize;

use crate::crypto::{CryptoError, EncryptionKey};

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `ENCRYPTION_KEY` (required): 64 hex characters, the AES-256 key for API keys
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `AUTH_REALM` (optional): realm echoed in `WWW-Authenticate`, defaults to "tenant-api"
/// - `GOOGLE_TOKENINFO_URL` / `GOOGLE_USERINFO_URL` (optional): Google endpoints
/// - `PROVIDER_TIMEOUT_SECS` (optional): per-call timeout for provider exchange, defaults to 10
/// - `AUTH_TIMEOUT_SECS` (optional): deadline for the whole auth flow of one request, defaults to 15
/// - `DB_MAX_CONNECTIONS` (optional): pool size, defaults to 5
/// - `DB_ACQUIRE_TIMEOUT_SECS` (optional): wait for a pooled connection, defaults to 5
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    pub encryption_key: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_realm")]
    pub auth_realm: String,

    #[serde(default = "default_google_tokeninfo_url")]
    pub google_tokeninfo_url: String,

    #[serde(default = "default_google_userinfo_url")]
    pub google_userinfo_url: String,

    #[serde(default = "default_provider_timeout_secs")]
    pub provider_timeout_secs: u64,

    #[serde(default = "default_auth_timeout_secs")]
    pub auth_timeout_secs: u64,

    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,
}

fn default_port() -> u16 {
    3000
}

fn default_realm() -> String {
    "tenant-api".to_string()
}

fn default_google_tokeninfo_url() -> String {
    "https://oauth2.googleapis.com/tokeninfo".to_string()
}

fn default_google_userinfo_url() -> String {
    "https://openidconnect.googleapis.com/v1/userinfo".to_string()
}

fn default_provider_timeout_secs() -> u64 {
    10
}

fn default_auth_timeout_secs() -> u64 {
    15
}

fn default_db_max_connections() -> u32 {
    5
}

fn default_db_acquire_timeout_secs() -> u64 {
    5
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file is read first if one exists.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or cannot be parsed.
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();

        envy::from_env::<Config>()
    }

    /// Parse the configured encryption key.
    pub fn encryption_key(&self) -> Result<EncryptionKey, CryptoError> {
        EncryptionKey::from_hex(&self.encryption_key)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    pub fn auth_timeout(&self) -> Duration {
        Duration::from_secs(self.auth_timeout_secs)
    }

    pub fn db_acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.db_acquire_timeout_secs)
    }
}

/// Settings the authentication flow needs on every request.
///
/// Built once at startup from [`Config`] and shared read-only.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub realm: String,

    pub encryption_key: EncryptionKey,

    /// Deadline for the whole auth flow of one request
    pub timeout: Duration,
}

impl AuthSettings {
    pub fn from_config(config: &Config) -> Result<Self, CryptoError> {
        Ok(Self {
            realm: config.auth_realm.clone(),
            encryption_key: config.encryption_key()?,
            timeout: config.auth_timeout(),
        })
    }
}
