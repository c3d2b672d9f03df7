#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use uuid::Uuid;

use tenant_api_server::AppState;
use tenant_api_server::config::AuthSettings;
use tenant_api_server::crypto::{EncryptionKey, KEY_SIZE};
use tenant_api_server::models::api_key::ApiKey;
use tenant_api_server::models::application::AppSummary;
use tenant_api_server::models::auth::{AuthRecord, Provider, ResolvedAuth};
use tenant_api_server::models::organization::{OrgKind, Organization};
use tenant_api_server::models::user::User;
use tenant_api_server::services::provider::{ExchangeError, ProviderUserInfo, TokenExchange};
use tenant_api_server::store::{AuthStore, EncryptedAppKey};

/// Role row with its permission rows, as the RBAC tables hold them.
#[derive(Debug, Clone)]
pub struct Role {
    pub code: String,
    pub active: bool,
    /// (resource, operation, active)
    pub permissions: Vec<(String, String, bool)>,
}

impl Role {
    /// Same filter as the store's permission query: active role, active permission.
    pub fn grants(&self, resource: &str, operation: &str) -> bool {
        self.active
            && self
                .permissions
                .iter()
                .any(|(r, o, active)| *active && r == resource && o == operation)
    }
}

/// In-memory [`AuthStore`] with the same semantics as the PostgreSQL one.
#[derive(Default)]
pub struct FakeStore {
    pub keys: Vec<EncryptedAppKey>,
    pub apps: Vec<AppSummary>,
    pub auths: Mutex<Vec<ResolvedAuth>>,
    /// (user id, org id, role)
    pub assignments: Vec<(Uuid, Uuid, Role)>,
}

#[async_trait]
impl AuthStore for FakeStore {
    async fn find_encrypted_keys_by_app_external_id(
        &self,
        app_extl_id: &str,
    ) -> Result<Vec<EncryptedAppKey>, sqlx::Error> {
        Ok(self
            .keys
            .iter()
            .filter(|k| k.app.external_id == app_extl_id)
            .cloned()
            .collect())
    }

    async fn find_auth_by_access_token(
        &self,
        access_token: &str,
    ) -> Result<Option<ResolvedAuth>, sqlx::Error> {
        let auths = self.auths.lock().unwrap();
        Ok(auths
            .iter()
            .find(|r| r.auth.access_token == access_token)
            .cloned())
    }

    async fn find_auth_by_provider_person_id(
        &self,
        provider: Provider,
        person_id: &str,
    ) -> Result<Option<ResolvedAuth>, sqlx::Error> {
        let auths = self.auths.lock().unwrap();
        Ok(auths
            .iter()
            .find(|r| r.auth.provider == provider && r.auth.provider_person_id == person_id)
            .cloned())
    }

    async fn find_application_by_provider_client_id(
        &self,
        provider: Provider,
        client_id: &str,
    ) -> Result<Option<AppSummary>, sqlx::Error> {
        Ok(self
            .apps
            .iter()
            .find(|a| {
                a.provider == Some(provider) && a.provider_client_id.as_deref() == Some(client_id)
            })
            .cloned())
    }

    async fn is_authorized(
        &self,
        resource: &str,
        operation: &str,
        user_id: Uuid,
        org_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        Ok(self
            .assignments
            .iter()
            .any(|(u, o, role)| *u == user_id && *o == org_id && role.grants(resource, operation)))
    }

    async fn update_auth_tokens(&self, auth: &AuthRecord) -> Result<(), sqlx::Error> {
        let mut auths = self.auths.lock().unwrap();
        if let Some(existing) = auths.iter_mut().find(|r| r.auth.id == auth.id) {
            existing.auth = auth.clone();
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), sqlx::Error> {
        Ok(())
    }
}

/// Provider that knows a fixed set of tokens.
#[derive(Default)]
pub struct FakeExchange {
    pub tokens: HashMap<String, ProviderUserInfo>,
    pub calls: Mutex<u32>,
}

#[async_trait]
impl TokenExchange for FakeExchange {
    async fn exchange(
        &self,
        _provider: Provider,
        token: &str,
    ) -> Result<ProviderUserInfo, ExchangeError> {
        *self.calls.lock().unwrap() += 1;
        self.tokens
            .get(token)
            .cloned()
            .ok_or(ExchangeError::Status(401))
    }
}

pub fn encryption_key() -> EncryptionKey {
    EncryptionKey::from_bytes([7u8; KEY_SIZE])
}

pub fn settings() -> AuthSettings {
    AuthSettings {
        realm: "tenant-api".to_string(),
        encryption_key: encryption_key(),
        timeout: StdDuration::from_secs(5),
    }
}

pub fn organization(extl_id: &str) -> Organization {
    Organization {
        id: Uuid::new_v4(),
        external_id: extl_id.to_string(),
        name: format!("{} org", extl_id),
        description: String::new(),
        kind: OrgKind::Standard,
    }
}

pub fn app(extl_id: &str, org: &Organization, client_id: Option<&str>) -> AppSummary {
    AppSummary {
        id: Uuid::new_v4(),
        external_id: extl_id.to_string(),
        org: org.clone(),
        name: extl_id.to_string(),
        description: String::new(),
        provider: client_id.map(|_| Provider::Google),
        provider_client_id: client_id.map(str::to_string),
    }
}

/// Provision a key for `app`, returning the plaintext and the stored row.
pub fn api_key(app: &AppSummary, deactivation: DateTime<Utc>) -> (String, EncryptedAppKey) {
    let key = ApiKey::generate(&mut OsRng, &encryption_key(), deactivation).unwrap();
    let row = EncryptedAppKey {
        ciphertext: key.ciphertext().to_string(),
        deactivation,
        app: app.clone(),
    };
    (key.key().to_string(), row)
}

pub fn user(extl_id: &str, org: &Organization) -> User {
    User {
        id: Uuid::new_v4(),
        external_id: extl_id.to_string(),
        org_id: org.id,
        first_name: None,
        last_name: None,
        full_name: Some(format!("{} full name", extl_id)),
        email: None,
    }
}

pub fn auth(user: &User, person_id: &str, token: &str, client_id: Option<&str>) -> ResolvedAuth {
    ResolvedAuth {
        auth: AuthRecord {
            id: Uuid::new_v4(),
            user_id: user.id,
            provider: Provider::Google,
            provider_client_id: client_id.map(str::to_string),
            provider_person_id: person_id.to_string(),
            access_token: token.to_string(),
            access_token_expiry: Utc::now() + Duration::hours(1),
            refresh_token: None,
        },
        user: user.clone(),
    }
}

pub fn role(code: &str, grants: &[(&str, &str)]) -> Role {
    Role {
        code: code.to_string(),
        active: true,
        permissions: grants
            .iter()
            .map(|(resource, operation)| (resource.to_string(), operation.to_string(), true))
            .collect(),
    }
}

pub fn user_info(person_id: &str, client_id: Option<&str>) -> ProviderUserInfo {
    ProviderUserInfo {
        person_id: person_id.to_string(),
        client_id: client_id.map(str::to_string),
        email: None,
        email_verified: true,
        given_name: None,
        family_name: None,
        full_name: None,
        expires_at: Some(Utc::now() + Duration::hours(1)),
    }
}

pub fn state(store: Arc<FakeStore>, exchange: Arc<FakeExchange>) -> AppState {
    AppState::new(store, exchange, settings())
}

pub fn request(method: &str, uri: &str, headers: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
