//! Binding a request to the application it runs under.

use crate::error::{AppError, AuthFailure};
use crate::models::application::{AppSummary, Application};
use crate::models::auth::ResolvedAuth;
use crate::store::AuthStore;

/// Decide which application a request belongs to.
///
/// An application that authenticated by API key is authoritative and no
/// lookup happens. Otherwise the application is the one registered with the
/// OAuth2 client id the user's token was issued to.
///
/// # Errors
///
/// - `Unauthenticated(NoApplication)`: no app key was sent and the client id
///   is unknown or absent
/// - `Database`: the client id lookup failed
pub async fn determine_app_context(
    store: &dyn AuthStore,
    realm: &str,
    app: Option<Application>,
    resolved: &ResolvedAuth,
) -> Result<AppSummary, AppError> {
    if let Some(app) = app {
        return Ok(app.into_summary());
    }

    let Some(client_id) = resolved.auth.provider_client_id.as_deref() else {
        tracing::warn!(
            user_extl_id = %resolved.user.external_id,
            "no app key and no provider client id on record"
        );
        return Err(AppError::unauthenticated(realm, AuthFailure::NoApplication));
    };

    store
        .find_application_by_provider_client_id(resolved.auth.provider, client_id)
        .await?
        .ok_or_else(|| {
            tracing::warn!(client_id = %client_id, "no application registered for client id");
            AppError::unauthenticated(realm, AuthFailure::NoApplication)
        })
}
