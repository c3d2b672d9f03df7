//! Database connection pool, migrations, and the PostgreSQL auth store.
//!
//! This module provides utilities for:
//! - Creating and managing a PostgreSQL connection pool
//! - Running database migrations automatically
//! - Answering the authentication core's queries ([`PgAuthStore`])

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::models::application::AppSummary;
use crate::models::auth::{AuthRecord, Provider, ResolvedAuth};
use crate::models::organization::{OrgKind, Organization};
use crate::models::user::User;
use crate::store::{AuthStore, EncryptedAppKey};

/// Type alias for PostgreSQL connection pool.
pub type DbPool = Pool<Postgres>;

/// Create a new PostgreSQL connection pool.
///
/// # Configuration
///
/// - `max_connections`: upper bound on pooled connections
/// - `acquire_timeout`: how long a request waits for a free connection
///   before failing instead of queueing indefinitely
///
/// # Errors
///
/// Returns an error if the connection string is invalid or the server
/// cannot be reached.
pub async fn create_pool(
    database_url: &str,
    max_connections: u32,
    acquire_timeout: Duration,
) -> Result<DbPool, sqlx::Error> {
    sqlx::postgres::PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(acquire_timeout)
        .connect(database_url)
        .await
}

/// Run database migrations from the `migrations/` directory.
///
/// Migrations are tracked in `_sqlx_migrations`, so each one runs only once.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

const APP_COLUMNS: &str = r#"
    a.app_id, a.app_extl_id, a.app_name, a.app_description,
    a.auth_provider, a.auth_provider_client_id,
    o.org_id, o.org_extl_id, o.org_name, o.org_description, o.org_kind
"#;

const AUTH_USER_COLUMNS: &str = r#"
    au.auth_id, au.auth_provider, au.auth_provider_cid, au.auth_provider_person_id,
    au.auth_provider_access_token, au.auth_provider_refresh_token,
    au.auth_provider_access_token_expiry,
    u.user_id, u.user_extl_id, u.org_id, u.first_name, u.last_name, u.full_name, u.email
"#;

/// Application row joined with its organization.
#[derive(Debug, sqlx::FromRow)]
struct AppRow {
    app_id: Uuid,
    app_extl_id: String,
    app_name: String,
    app_description: String,
    auth_provider: Option<String>,
    auth_provider_client_id: Option<String>,
    org_id: Uuid,
    org_extl_id: String,
    org_name: String,
    org_description: String,
    org_kind: String,
}

impl TryFrom<AppRow> for AppSummary {
    type Error = sqlx::Error;

    fn try_from(row: AppRow) -> Result<Self, Self::Error> {
        let provider = row
            .auth_provider
            .as_deref()
            .map(str::parse::<Provider>)
            .transpose()
            .map_err(|e| sqlx::Error::Decode(e.into()))?;
        let kind = row
            .org_kind
            .parse::<OrgKind>()
            .map_err(|e| sqlx::Error::Decode(e.into()))?;

        Ok(AppSummary {
            id: row.app_id,
            external_id: row.app_extl_id,
            org: Organization {
                id: row.org_id,
                external_id: row.org_extl_id,
                name: row.org_name,
                description: row.org_description,
                kind,
            },
            name: row.app_name,
            description: row.app_description,
            provider,
            provider_client_id: row.auth_provider_client_id,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AppKeyRow {
    #[sqlx(flatten)]
    app: AppRow,
    api_key: String,
    deactv_date: DateTime<Utc>,
}

/// Auth record row joined with its user.
#[derive(Debug, sqlx::FromRow)]
struct AuthUserRow {
    auth_id: Uuid,
    auth_provider: String,
    auth_provider_cid: Option<String>,
    auth_provider_person_id: String,
    auth_provider_access_token: String,
    auth_provider_refresh_token: Option<String>,
    auth_provider_access_token_expiry: DateTime<Utc>,
    user_id: Uuid,
    user_extl_id: String,
    org_id: Uuid,
    first_name: Option<String>,
    last_name: Option<String>,
    full_name: Option<String>,
    email: Option<String>,
}

impl TryFrom<AuthUserRow> for ResolvedAuth {
    type Error = sqlx::Error;

    fn try_from(row: AuthUserRow) -> Result<Self, Self::Error> {
        let provider = row
            .auth_provider
            .parse::<Provider>()
            .map_err(|e| sqlx::Error::Decode(e.into()))?;

        Ok(ResolvedAuth {
            auth: AuthRecord {
                id: row.auth_id,
                user_id: row.user_id,
                provider,
                provider_client_id: row.auth_provider_cid,
                provider_person_id: row.auth_provider_person_id,
                access_token: row.auth_provider_access_token,
                access_token_expiry: row.auth_provider_access_token_expiry,
                refresh_token: row.auth_provider_refresh_token,
            },
            user: User {
                id: row.user_id,
                external_id: row.user_extl_id,
                org_id: row.org_id,
                first_name: row.first_name,
                last_name: row.last_name,
                full_name: row.full_name,
                email: row.email,
            },
        })
    }
}

/// [`AuthStore`] backed by PostgreSQL.
///
/// Every call goes to the database; nothing is cached, so a deactivated key
/// or revoked role takes effect on the next request.
#[derive(Debug, Clone)]
pub struct PgAuthStore {
    pool: DbPool,
}

impl PgAuthStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthStore for PgAuthStore {
    async fn find_encrypted_keys_by_app_external_id(
        &self,
        app_extl_id: &str,
    ) -> Result<Vec<EncryptedAppKey>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {APP_COLUMNS}, k.api_key, k.deactv_date
            FROM app a
            INNER JOIN org o ON o.org_id = a.org_id
            INNER JOIN app_api_key k ON k.app_id = a.app_id
            WHERE a.app_extl_id = $1
            ORDER BY k.create_timestamp
            "#
        );

        let rows = sqlx::query_as::<_, AppKeyRow>(&sql)
            .bind(app_extl_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| -> Result<EncryptedAppKey, sqlx::Error> {
                Ok(EncryptedAppKey {
                    ciphertext: row.api_key,
                    deactivation: row.deactv_date,
                    app: row.app.try_into()?,
                })
            })
            .collect()
    }

    async fn find_auth_by_access_token(
        &self,
        access_token: &str,
    ) -> Result<Option<ResolvedAuth>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {AUTH_USER_COLUMNS}
            FROM auth au
            INNER JOIN users u ON u.user_id = au.user_id
            WHERE au.auth_provider_access_token = $1
            "#
        );

        sqlx::query_as::<_, AuthUserRow>(&sql)
            .bind(access_token)
            .fetch_optional(&self.pool)
            .await?
            .map(ResolvedAuth::try_from)
            .transpose()
    }

    async fn find_auth_by_provider_person_id(
        &self,
        provider: Provider,
        person_id: &str,
    ) -> Result<Option<ResolvedAuth>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {AUTH_USER_COLUMNS}
            FROM auth au
            INNER JOIN users u ON u.user_id = au.user_id
            WHERE au.auth_provider = $1
              AND au.auth_provider_person_id = $2
            "#
        );

        sqlx::query_as::<_, AuthUserRow>(&sql)
            .bind(provider.as_str())
            .bind(person_id)
            .fetch_optional(&self.pool)
            .await?
            .map(ResolvedAuth::try_from)
            .transpose()
    }

    async fn find_application_by_provider_client_id(
        &self,
        provider: Provider,
        client_id: &str,
    ) -> Result<Option<AppSummary>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {APP_COLUMNS}
            FROM app a
            INNER JOIN org o ON o.org_id = a.org_id
            WHERE a.auth_provider = $1
              AND a.auth_provider_client_id = $2
            "#
        );

        sqlx::query_as::<_, AppRow>(&sql)
            .bind(provider.as_str())
            .bind(client_id)
            .fetch_optional(&self.pool)
            .await?
            .map(AppSummary::try_from)
            .transpose()
    }

    async fn is_authorized(
        &self,
        resource: &str,
        operation: &str,
        user_id: Uuid,
        org_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1
                FROM users_role ur
                INNER JOIN role r ON r.role_id = ur.role_id
                INNER JOIN role_permission rp ON rp.role_id = ur.role_id
                INNER JOIN permission p ON p.permission_id = rp.permission_id
                WHERE r.active = true
                  AND p.active = true
                  AND p.resource = $1
                  AND p.operation = $2
                  AND ur.user_id = $3
                  AND ur.org_id = $4
            )
            "#,
        )
        .bind(resource)
        .bind(operation)
        .bind(user_id)
        .bind(org_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_auth_tokens(&self, auth: &AuthRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE auth
            SET auth_provider_access_token = $1,
                auth_provider_access_token_expiry = $2,
                auth_provider_refresh_token = $3,
                auth_provider_cid = $4,
                update_timestamp = NOW()
            WHERE auth_id = $5
            "#,
        )
        .bind(&auth.access_token)
        .bind(auth.access_token_expiry)
        .bind(&auth.refresh_token)
        .bind(&auth.provider_client_id)
        .bind(auth.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
