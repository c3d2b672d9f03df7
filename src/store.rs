//! Storage queries consumed by the authentication core.
//!
//! The trait is the seam between the auth flow and the relational store:
//! [`crate::db::PgAuthStore`] implements it against PostgreSQL, tests mock it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::application::AppSummary;
use crate::models::auth::{AuthRecord, Provider, ResolvedAuth};

/// One stored API key row joined with its owning application.
#[derive(Debug, Clone)]
pub struct EncryptedAppKey {
    /// Hex-encoded AES-GCM output
    pub ciphertext: String,

    pub deactivation: DateTime<Utc>,

    pub app: AppSummary,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthStore: Send + Sync {
    /// All keys of the application with the given external id, in insertion order.
    ///
    /// An unknown application yields an empty list.
    async fn find_encrypted_keys_by_app_external_id(
        &self,
        app_extl_id: &str,
    ) -> Result<Vec<EncryptedAppKey>, sqlx::Error>;

    /// The auth record holding exactly this access token, with its user.
    async fn find_auth_by_access_token(
        &self,
        access_token: &str,
    ) -> Result<Option<ResolvedAuth>, sqlx::Error>;

    async fn find_auth_by_provider_person_id(
        &self,
        provider: Provider,
        person_id: &str,
    ) -> Result<Option<ResolvedAuth>, sqlx::Error>;

    /// The application registered with this OAuth2 client id.
    async fn find_application_by_provider_client_id(
        &self,
        provider: Provider,
        client_id: &str,
    ) -> Result<Option<AppSummary>, sqlx::Error>;

    /// Whether an active role assigned to the user within `org_id` holds an
    /// active permission for (resource, operation).
    async fn is_authorized(
        &self,
        resource: &str,
        operation: &str,
        user_id: Uuid,
        org_id: Uuid,
    ) -> Result<bool, sqlx::Error>;

    /// Persist refreshed token fields of an existing auth record.
    async fn update_auth_tokens(&self, auth: &AuthRecord) -> Result<(), sqlx::Error>;

    /// Connectivity check for health endpoints.
    async fn ping(&self) -> Result<(), sqlx::Error>;
}
