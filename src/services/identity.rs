//! User identification from an OAuth2 bearer token.
//!
//! A token already stored for the declared provider and not yet expired is
//! trusted without contacting the provider. Any other token is exchanged
//! with the provider, and the person it belongs to must already have an
//! auth record: this path never creates users.

use chrono::Utc;

use crate::error::{AppError, AuthFailure};
use crate::models::auth::ResolvedAuth;
use crate::services::credentials::BearerCredentials;
use crate::services::provider::TokenExchange;
use crate::store::AuthStore;

/// Resolve the user who owns the presented bearer token.
///
/// # Errors
///
/// - `Unauthenticated(ProviderExchange)`: the provider rejected the token or was unreachable
/// - `Unauthenticated(NotProvisioned)`: the provider identity has no auth record here
/// - `Database`: a lookup or the token update failed
pub async fn resolve_identity(
    store: &dyn AuthStore,
    exchanger: &dyn TokenExchange,
    realm: &str,
    credentials: &BearerCredentials,
) -> Result<ResolvedAuth, AppError> {
    let now = Utc::now();
    let provider = credentials.provider;

    if let Some(resolved) = store.find_auth_by_access_token(credentials.token()).await? {
        if resolved.auth.provider == provider && resolved.auth.is_token_current(now) {
            tracing::debug!(
                user_extl_id = %resolved.user.external_id,
                "user resolved from stored access token"
            );
            return Ok(resolved);
        }
    }

    let info = exchanger
        .exchange(provider, credentials.token())
        .await
        .map_err(|e| {
            tracing::warn!(provider = %provider, error = %e, "token exchange failed");
            AppError::unauthenticated(realm, AuthFailure::ProviderExchange)
        })?;

    let mut resolved = store
        .find_auth_by_provider_person_id(provider, &info.person_id)
        .await?
        .ok_or_else(|| {
            tracing::warn!(
                provider = %provider,
                person_id = %info.person_id,
                "valid token for an identity that is not provisioned"
            );
            AppError::unauthenticated(realm, AuthFailure::NotProvisioned)
        })?;

    // A provider that reports no lifetime gets an already-stale expiry, so
    // the next request exchanges again.
    resolved.auth.refresh_tokens(
        credentials.token(),
        info.expires_at.unwrap_or(now),
        None,
        info.client_id,
    );
    store.update_auth_tokens(&resolved.auth).await?;

    tracing::debug!(
        user_extl_id = %resolved.user.external_id,
        "user resolved by provider exchange"
    );

    Ok(resolved)
}
