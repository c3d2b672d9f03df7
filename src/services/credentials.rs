//! Credentials carried in request headers.
//!
//! # Headers
//!
//! ```text
//! X-APP-ID: <application external id>
//! X-API-KEY: <application key>
//! X-AUTH-PROVIDER: google
//! Authorization: Bearer <token>
//! ```

use axum::http::{HeaderMap, header};

use crate::error::{AppError, AuthFailure};
use crate::models::auth::Provider;

pub const APP_ID_HEADER: &str = "x-app-id";
pub const API_KEY_HEADER: &str = "x-api-key";
pub const AUTH_PROVIDER_HEADER: &str = "x-auth-provider";

/// Application id and key presented by the caller.
pub struct AppCredentials {
    pub app_extl_id: String,
    pub api_key: String,
}

impl AppCredentials {
    /// Read `X-APP-ID` / `X-API-KEY`.
    ///
    /// Neither header present means the caller did not attempt app
    /// authentication and yields `None`. Presence is decided by the header
    /// name alone: a header sent with an empty or unreadable value, or only
    /// one of the pair, is a presented-but-invalid credential.
    pub fn from_headers(headers: &HeaderMap, realm: &str) -> Result<Option<Self>, AppError> {
        let has_app_id = headers.contains_key(APP_ID_HEADER);
        let has_api_key = headers.contains_key(API_KEY_HEADER);

        match (has_app_id, has_api_key) {
            (false, false) => Ok(None),
            (false, true) => Err(AppError::unauthenticated(
                realm,
                AuthFailure::MissingHeader("X-APP-ID"),
            )),
            (true, false) => Err(AppError::unauthenticated(
                realm,
                AuthFailure::MissingHeader("X-API-KEY"),
            )),
            (true, true) => {
                let invalid = || AppError::unauthenticated(realm, AuthFailure::InvalidApiKey);
                let app_extl_id = header_str(headers, APP_ID_HEADER).ok_or_else(invalid)?;
                let api_key = header_str(headers, API_KEY_HEADER).ok_or_else(invalid)?;

                Ok(Some(Self {
                    app_extl_id: app_extl_id.to_string(),
                    api_key: api_key.to_string(),
                }))
            }
        }
    }
}

impl std::fmt::Debug for AppCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppCredentials")
            .field("app_extl_id", &self.app_extl_id)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// OAuth2 bearer token and the provider that issued it.
pub struct BearerCredentials {
    pub provider: Provider,
    token: String,
}

impl BearerCredentials {
    pub fn new(provider: Provider, token: impl Into<String>) -> Self {
        Self {
            provider,
            token: token.into(),
        }
    }

    /// Read `X-AUTH-PROVIDER` and `Authorization: Bearer <token>`.
    ///
    /// The provider name and the `Bearer` scheme are matched case-insensitively.
    pub fn from_headers(headers: &HeaderMap, realm: &str) -> Result<Self, AppError> {
        let provider = header_str(headers, AUTH_PROVIDER_HEADER)
            .ok_or_else(|| {
                AppError::unauthenticated(realm, AuthFailure::MissingHeader("X-AUTH-PROVIDER"))
            })?
            .parse::<Provider>()
            .map_err(|e| AppError::unauthenticated(realm, e.into()))?;

        let authorization = header_str(headers, header::AUTHORIZATION.as_str()).ok_or_else(|| {
            AppError::unauthenticated(realm, AuthFailure::MissingHeader("Authorization"))
        })?;

        let token = parse_bearer(authorization)
            .ok_or_else(|| AppError::unauthenticated(realm, AuthFailure::MalformedAuthorization))?;

        Ok(Self::new(provider, token))
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl std::fmt::Debug for BearerCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerCredentials")
            .field("provider", &self.provider)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Non-empty header value, trimmed. `None` for an absent, blank or non-ASCII value.
fn header_str<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn parse_bearer(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() || token.contains(' ') {
        return None;
    }
    Some(token)
}
