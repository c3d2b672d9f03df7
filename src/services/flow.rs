//! The per-request authentication and authorization flow.
//!
//! Each stage consumes the state produced by the previous one, so a stage
//! can only run once everything before it has succeeded:
//!
//! ```text
//! Unauthenticated -> AppKeyChecked -> UserIdentified -> AppContextBound -> Audit
//! ```
//!
//! The first failing stage ends the flow with its error.

use axum::http::HeaderMap;
use chrono::Utc;

use crate::config::AuthSettings;
use crate::error::AppError;
use crate::models::application::Application;
use crate::models::audit::Audit;
use crate::models::auth::ResolvedAuth;
use crate::models::rbac::AccessRequest;
use crate::services::credentials::{AppCredentials, BearerCredentials};
use crate::services::provider::TokenExchange;
use crate::services::{app_auth, authorizer, identity, tenancy};
use crate::store::AuthStore;

/// Collaborators shared by every stage.
#[derive(Clone, Copy)]
pub struct AuthFlow<'a> {
    pub store: &'a dyn AuthStore,
    pub exchanger: &'a dyn TokenExchange,
    pub settings: &'a AuthSettings,
}

/// Nothing verified yet.
pub struct Unauthenticated<'h> {
    headers: &'h HeaderMap,
}

/// The app key, if one was sent, is valid.
pub struct AppKeyChecked<'h> {
    headers: &'h HeaderMap,
    app: Option<Application>,
}

/// The bearer token resolved to a provisioned user.
pub struct UserIdentified {
    app: Option<Application>,
    auth: ResolvedAuth,
}

/// The request is tied to an application and a user.
pub struct AppContextBound {
    audit: Audit,
}

impl<'a> AuthFlow<'a> {
    pub fn new(
        store: &'a dyn AuthStore,
        exchanger: &'a dyn TokenExchange,
        settings: &'a AuthSettings,
    ) -> Self {
        Self {
            store,
            exchanger,
            settings,
        }
    }

    /// Run every stage against `headers`.
    ///
    /// With `access` absent there is no route to check permissions for and
    /// the request is denied after authentication.
    pub async fn run(
        &self,
        headers: &HeaderMap,
        access: Option<&AccessRequest>,
    ) -> Result<Audit, AppError> {
        let checked = Unauthenticated::new(headers).check_app_key(self).await?;
        let identified = checked.identify_user(self).await?;
        let bound = identified.bind_app_context(self).await?;
        bound.authorize(self, access).await
    }
}

impl<'h> Unauthenticated<'h> {
    pub fn new(headers: &'h HeaderMap) -> Self {
        Self { headers }
    }

    /// Authenticate the application if app headers were sent.
    ///
    /// Absent headers skip this stage. Present but invalid ones end the flow.
    pub async fn check_app_key(self, flow: &AuthFlow<'_>) -> Result<AppKeyChecked<'h>, AppError> {
        let app = match AppCredentials::from_headers(self.headers, &flow.settings.realm)? {
            Some(credentials) => Some(
                app_auth::authenticate_application(flow.store, flow.settings, &credentials).await?,
            ),
            None => None,
        };

        Ok(AppKeyChecked {
            headers: self.headers,
            app,
        })
    }
}

impl AppKeyChecked<'_> {
    pub async fn identify_user(self, flow: &AuthFlow<'_>) -> Result<UserIdentified, AppError> {
        let credentials = BearerCredentials::from_headers(self.headers, &flow.settings.realm)?;
        let auth = identity::resolve_identity(
            flow.store,
            flow.exchanger,
            &flow.settings.realm,
            &credentials,
        )
        .await?;

        Ok(UserIdentified {
            app: self.app,
            auth,
        })
    }
}

impl UserIdentified {
    pub async fn bind_app_context(self, flow: &AuthFlow<'_>) -> Result<AppContextBound, AppError> {
        let app =
            tenancy::determine_app_context(flow.store, &flow.settings.realm, self.app, &self.auth)
                .await?;

        Ok(AppContextBound {
            audit: Audit {
                app,
                user: self.auth.user,
                moment: Utc::now(),
            },
        })
    }
}

impl AppContextBound {
    pub async fn authorize(
        self,
        flow: &AuthFlow<'_>,
        access: Option<&AccessRequest>,
    ) -> Result<Audit, AppError> {
        let Some(access) = access else {
            tracing::warn!("no route template for request, denying");
            return Err(AppError::Unauthorized);
        };

        authorizer::authorize(flow.store, &self.audit, access).await?;
        Ok(self.audit)
    }
}
