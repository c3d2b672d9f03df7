//! OAuth2 provider token exchange.
//!
//! A bearer token is verified by asking the provider that issued it who it
//! belongs to. Each [`Provider`] variant has one arm in
//! [`ProviderClient::exchange`]; adding a provider means adding a variant and
//! its arm.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::config::Config;
use crate::models::auth::Provider;

/// What a provider tells us about the owner of a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderUserInfo {
    /// Stable provider-assigned person id
    pub person_id: String,

    /// OAuth2 client the token was issued to
    pub client_id: Option<String>,

    pub email: Option<String>,

    pub email_verified: bool,

    pub given_name: Option<String>,

    pub family_name: Option<String>,

    pub full_name: Option<String>,

    /// When the presented access token stops being valid
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    #[error("provider request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("provider returned status {0}")]
    Status(u16),

    #[error("provider response missing {0}")]
    MissingField(&'static str),

    #[error("provider userinfo subject does not match token subject")]
    SubjectMismatch,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderSetupError {
    #[error("invalid provider endpoint: {0}")]
    Endpoint(#[from] url::ParseError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Verifies a bearer token with the provider that issued it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenExchange: Send + Sync {
    async fn exchange(
        &self,
        provider: Provider,
        token: &str,
    ) -> Result<ProviderUserInfo, ExchangeError>;
}

#[derive(Debug, Clone)]
pub struct GoogleEndpoints {
    pub tokeninfo: Url,
    pub userinfo: Url,
}

/// HTTP implementation of [`TokenExchange`].
#[derive(Debug, Clone)]
pub struct ProviderClient {
    http: reqwest::Client,
    google: GoogleEndpoints,
}

impl ProviderClient {
    pub fn new(config: &Config) -> Result<Self, ProviderSetupError> {
        let google = GoogleEndpoints {
            tokeninfo: Url::parse(&config.google_tokeninfo_url)?,
            userinfo: Url::parse(&config.google_userinfo_url)?,
        };
        Self::with_endpoints(google, config.provider_timeout())
    }

    pub fn with_endpoints(
        google: GoogleEndpoints,
        timeout: Duration,
    ) -> Result<Self, ProviderSetupError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, google })
    }

    /// Google: token-info for subject, audience and expiry, then userinfo for profile.
    async fn exchange_google(&self, token: &str) -> Result<ProviderUserInfo, ExchangeError> {
        let response = self
            .http
            .get(self.google.tokeninfo.clone())
            .query(&[("access_token", token)])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::warn!(provider = "google", status = %status, "token info rejected token");
            return Err(ExchangeError::Status(status.as_u16()));
        }

        let info: GoogleTokenInfo = response.json().await?;
        let person_id = info.sub.ok_or(ExchangeError::MissingField("sub"))?;

        let response = self
            .http
            .get(self.google.userinfo.clone())
            .bearer_auth(token)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::warn!(provider = "google", status = %status, "userinfo request failed");
            return Err(ExchangeError::Status(status.as_u16()));
        }

        let profile: GoogleUserInfo = response.json().await?;
        if profile.sub.as_deref().is_some_and(|sub| sub != person_id) {
            return Err(ExchangeError::SubjectMismatch);
        }

        let expires_at = info
            .expires_in
            .as_ref()
            .and_then(value_as_i64)
            .map(|secs| Utc::now() + chrono::Duration::seconds(secs));

        let email_verified = profile
            .email_verified
            .as_ref()
            .or(info.email_verified.as_ref())
            .and_then(value_as_bool)
            .unwrap_or(false);

        Ok(ProviderUserInfo {
            person_id,
            client_id: info.azp.or(info.aud),
            email: profile.email.or(info.email),
            email_verified,
            given_name: profile.given_name,
            family_name: profile.family_name,
            full_name: profile.name,
            expires_at,
        })
    }
}

#[async_trait]
impl TokenExchange for ProviderClient {
    async fn exchange(
        &self,
        provider: Provider,
        token: &str,
    ) -> Result<ProviderUserInfo, ExchangeError> {
        match provider {
            Provider::Google => self.exchange_google(token).await,
        }
    }
}

/// Google token-info response. Numeric and boolean fields arrive as strings.
#[derive(Debug, Deserialize)]
struct GoogleTokenInfo {
    sub: Option<String>,
    aud: Option<String>,
    azp: Option<String>,
    email: Option<String>,
    email_verified: Option<Value>,
    expires_in: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    sub: Option<String>,
    name: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
    email: Option<String>,
    email_verified: Option<Value>,
}

fn value_as_i64(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

fn value_as_bool(value: &Value) -> Option<bool> {
    value
        .as_bool()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}
