//! OAuth2 provider linkage for users.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::user::User;

/// Supported external OAuth2 providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Google,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Google => "google",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider name did not match any supported provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported auth provider: {0}")]
pub struct UnsupportedProvider(pub String);

impl std::str::FromStr for Provider {
    type Err = UnsupportedProvider;

    /// Case-insensitive, so `Google`, `google` and `GOOGLE` all resolve.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(Provider::Google),
            _ => Err(UnsupportedProvider(value.to_string())),
        }
    }
}

/// Persisted link between a user and one external provider identity.
///
/// # Database Table
///
/// Maps to the `auth` table. `(user_id, auth_provider)` is unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRecord {
    pub id: Uuid,

    pub user_id: Uuid,

    pub provider: Provider,

    /// OAuth2 client id the token was issued to.
    ///
    /// Used to find the calling application when no app key was sent.
    pub provider_client_id: Option<String>,

    /// Stable person id assigned by the provider (Google `sub`)
    pub provider_person_id: String,

    pub access_token: String,

    pub access_token_expiry: DateTime<Utc>,

    pub refresh_token: Option<String>,
}

impl AuthRecord {
    /// Whether the stored access token is still usable at `now`.
    pub fn is_token_current(&self, now: DateTime<Utc>) -> bool {
        self.access_token_expiry > now
    }

    /// Replace token fields after a successful provider exchange.
    ///
    /// An absent refresh token or client id keeps the stored value.
    pub fn refresh_tokens(
        &mut self,
        access_token: &str,
        expiry: DateTime<Utc>,
        refresh_token: Option<String>,
        client_id: Option<String>,
    ) {
        self.access_token = access_token.to_string();
        self.access_token_expiry = expiry;
        if refresh_token.is_some() {
            self.refresh_token = refresh_token;
        }
        if client_id.is_some() {
            self.provider_client_id = client_id;
        }
    }
}

/// An auth record together with the user it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAuth {
    pub auth: AuthRecord,
    pub user: User,
}
