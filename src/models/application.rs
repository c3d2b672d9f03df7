//! Application aggregate.
//!
//! An application is a registered API client within an organization. It
//! authenticates with one of its API keys, or implicitly through the OAuth2
//! client id its users' tokens were issued to.

use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, AuthFailure};
use crate::models::api_key::{ApiKey, ApiKeyError};
use crate::models::auth::Provider;
use crate::models::organization::Organization;

/// Application data without its keys.
///
/// This is what gets bound to a request and stamped onto writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppSummary {
    pub id: Uuid,

    pub external_id: String,

    pub org: Organization,

    pub name: String,

    pub description: String,

    pub provider: Option<Provider>,

    pub provider_client_id: Option<String>,
}

/// Application together with its API keys, in stored order.
#[derive(Debug, Clone)]
pub struct Application {
    summary: AppSummary,
    api_keys: Vec<ApiKey>,
}

impl Application {
    pub fn new(summary: AppSummary) -> Self {
        Self {
            summary,
            api_keys: Vec::new(),
        }
    }

    /// Rebuild an application from storage.
    ///
    /// Stored keys are taken as-is; an expired key is still loaded so that
    /// matching it fails the same way a wrong key does.
    pub fn from_stored(summary: AppSummary, api_keys: Vec<ApiKey>) -> Self {
        Self { summary, api_keys }
    }

    pub fn summary(&self) -> &AppSummary {
        &self.summary
    }

    pub fn into_summary(self) -> AppSummary {
        self.summary
    }

    pub fn api_keys(&self) -> &[ApiKey] {
        &self.api_keys
    }

    /// Attach a newly provisioned key.
    ///
    /// Rejects keys that would fail validation: an application never holds a
    /// dead-on-arrival key.
    pub fn add_key(&mut self, key: ApiKey) -> Result<(), ApiKeyError> {
        key.validate()?;
        self.api_keys.push(key);
        Ok(())
    }

    /// Check a submitted key against this application's keys.
    ///
    /// Matching and validity are separate checks, but both failures surface as
    /// the same `Unauthenticated` error so callers cannot tell which occurred.
    pub fn validate_key(&self, realm: &str, candidate: &str) -> Result<(), AppError> {
        let matched = self.api_keys.iter().find(|key| key.matches(candidate));

        match matched {
            Some(key) => key.validate().map_err(|e| {
                tracing::debug!(
                    app_extl_id = %self.summary.external_id,
                    reason = %e,
                    "matched API key failed validation"
                );
                AppError::unauthenticated(realm, AuthFailure::InvalidApiKey)
            }),
            None => Err(AppError::unauthenticated(realm, AuthFailure::InvalidApiKey)),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::crypto::{EncryptionKey, KEY_SIZE};
    use crate::models::organization::OrgKind;
    use chrono::{Duration, Utc};
    use rand::rngs::OsRng;

    pub(crate) fn summary(extl_id: &str) -> AppSummary {
        AppSummary {
            id: Uuid::new_v4(),
            external_id: extl_id.to_string(),
            org: Organization {
                id: Uuid::new_v4(),
                external_id: "org-extl".to_string(),
                name: "Test Org".to_string(),
                description: "Test organization".to_string(),
                kind: OrgKind::Test,
            },
            name: "Test App".to_string(),
            description: "Test application".to_string(),
            provider: Some(Provider::Google),
            provider_client_id: Some("client-1".to_string()),
        }
    }

    fn ek() -> EncryptionKey {
        EncryptionKey::from_bytes([9u8; KEY_SIZE])
    }

    #[test]
    fn test_add_key_rejects_expired() {
        let mut app = Application::new(summary("app123"));
        let expired = ApiKey::generate(&mut OsRng, &ek(), Utc::now() - Duration::days(1)).unwrap();

        assert!(matches!(app.add_key(expired), Err(ApiKeyError::Expired(_))));
        assert!(app.api_keys().is_empty());
    }

    #[test]
    fn test_validate_key_exact_match() {
        let mut app = Application::new(summary("app123"));
        let key = ApiKey::generate(&mut OsRng, &ek(), Utc::now() + Duration::days(30)).unwrap();
        let plaintext = key.key().to_string();
        app.add_key(key).unwrap();

        assert!(app.validate_key("realm", &plaintext).is_ok());

        let err = app.validate_key("realm", "wrongvalue").unwrap_err();
        assert!(matches!(
            err,
            AppError::Unauthenticated {
                reason: AuthFailure::InvalidApiKey,
                ..
            }
        ));
    }

    #[test]
    fn test_expired_match_fails_like_mismatch() {
        let key = ApiKey::generate(&mut OsRng, &ek(), Utc::now() - Duration::minutes(1)).unwrap();
        let plaintext = key.key().to_string();
        let app = Application::from_stored(summary("app123"), vec![key]);

        let expired = app.validate_key("realm", &plaintext).unwrap_err();
        let wrong = app.validate_key("realm", "wrongvalue").unwrap_err();

        assert_eq!(expired.status(), wrong.status());
        assert_eq!(expired.to_string(), wrong.to_string());
    }

    #[test]
    fn test_scan_finds_key_among_several() {
        let keys: Vec<ApiKey> = (0..3)
            .map(|_| ApiKey::generate(&mut OsRng, &ek(), Utc::now() + Duration::days(1)).unwrap())
            .collect();
        let last = keys[2].key().to_string();
        let app = Application::from_stored(summary("app123"), keys);

        assert!(app.validate_key("realm", &last).is_ok());
    }
}
