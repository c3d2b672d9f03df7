//! Application authentication by API key.
//!
//! # Process
//!
//! 1. Load every stored key of the application named by `X-APP-ID`
//! 2. Decrypt each key with the configured encryption key
//! 3. Scan for an exact match of `X-API-KEY`
//! 4. Require the matched key to be before its deactivation date
//!
//! Unknown application, undecryptable key, wrong key and expired key all
//! fail the same way.

use crate::config::AuthSettings;
use crate::crypto::EncryptionKey;
use crate::error::{AppError, AuthFailure};
use crate::models::api_key::ApiKey;
use crate::models::application::Application;
use crate::services::credentials::AppCredentials;
use crate::store::{AuthStore, EncryptedAppKey};

/// Authenticate the calling application from its id and key.
///
/// # Errors
///
/// - `Unauthenticated(InvalidApiKey)`: no such application, or no valid matching key
/// - `Database`: the key lookup failed
pub async fn authenticate_application(
    store: &dyn AuthStore,
    settings: &AuthSettings,
    credentials: &AppCredentials,
) -> Result<Application, AppError> {
    let rows = store
        .find_encrypted_keys_by_app_external_id(&credentials.app_extl_id)
        .await?;

    let app = load_application(rows, &settings.encryption_key, &settings.realm)?;
    app.validate_key(&settings.realm, &credentials.api_key)?;

    tracing::debug!(
        app_extl_id = %app.summary().external_id,
        "application authenticated by API key"
    );

    Ok(app)
}

fn load_application(
    rows: Vec<EncryptedAppKey>,
    encryption_key: &EncryptionKey,
    realm: &str,
) -> Result<Application, AppError> {
    let Some(summary) = rows.first().map(|row| row.app.clone()) else {
        tracing::debug!("API key presented for unknown application");
        return Err(AppError::unauthenticated(realm, AuthFailure::InvalidApiKey));
    };

    let keys = rows
        .into_iter()
        .map(|row| {
            ApiKey::from_ciphertext(&row.ciphertext, encryption_key, row.deactivation).map_err(
                |e| {
                    tracing::warn!(
                        app_extl_id = %summary.external_id,
                        error = %e,
                        "stored API key could not be decrypted"
                    );
                    AppError::unauthenticated(realm, AuthFailure::InvalidApiKey)
                },
            )
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Application::from_stored(summary, keys))
}
