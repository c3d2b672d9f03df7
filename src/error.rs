//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::crypto::CryptoError;
use crate::models::api_key::ApiKeyError;
use crate::models::auth::UnsupportedProvider;

/// Why a request failed authentication.
///
/// Each reason is a distinct kind so callers can tell a bad token apart from
/// a valid token whose user was never provisioned. The API key reasons are
/// deliberately collapsed into one: a wrong key and an expired key look the same.
#[derive(Debug, thiserror::Error)]
pub enum AuthFailure {
    #[error("missing {0} header")]
    MissingHeader(&'static str),

    #[error("malformed Authorization header")]
    MalformedAuthorization,

    #[error("invalid API key")]
    InvalidApiKey,

    #[error(transparent)]
    UnsupportedProvider(#[from] UnsupportedProvider),

    #[error("token could not be verified with the auth provider")]
    ProviderExchange,

    #[error("authenticated user is not provisioned")]
    NotProvisioned,

    #[error("no application could be determined for the request")]
    NoApplication,
}

impl AuthFailure {
    /// Stable machine-readable code for the response body.
    pub fn code(&self) -> &'static str {
        match self {
            AuthFailure::MissingHeader(_) => "missing_credentials",
            AuthFailure::MalformedAuthorization => "malformed_authorization",
            AuthFailure::InvalidApiKey => "invalid_api_key",
            AuthFailure::UnsupportedProvider(_) => "unsupported_provider",
            AuthFailure::ProviderExchange => "invalid_token",
            AuthFailure::NotProvisioned => "user_not_provisioned",
            AuthFailure::NoApplication => "unknown_application",
        }
    }
}

/// Application-wide error type.
///
/// # Error Categories
///
/// - **Unauthenticated**: the caller's identity could not be established (401)
/// - **Unauthorized**: the identity is known but lacks a permission grant (403)
/// - **Validation**: malformed input from a caller, not an attacker signal (400)
/// - **Database / Internal**: storage or primitive failures (500)
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Authentication failed.
    ///
    /// Returns HTTP 401 with a `WWW-Authenticate: Bearer realm="..."` challenge.
    #[error("Unauthenticated: {reason}")]
    Unauthenticated { realm: String, reason: AuthFailure },

    /// Authenticated, but no active role grants the requested permission.
    ///
    /// Returns HTTP 403 Forbidden.
    #[error("Unauthorized")]
    Unauthorized,

    /// Returns HTTP 400 Bad Request.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Database operation failed (e.g., connection error, query error).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn unauthenticated(realm: impl Into<String>, reason: AuthFailure) -> Self {
        AppError::Unauthenticated {
            realm: realm.into(),
            reason,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            AppError::Unauthorized => StatusCode::FORBIDDEN,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CryptoError> for AppError {
    fn from(err: CryptoError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<ApiKeyError> for AppError {
    fn from(err: ApiKeyError) -> Self {
        match err {
            ApiKeyError::Crypto(e) => e.into(),
            other => AppError::Validation(other.to_string()),
        }
    }
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// Database and internal failures hide their details from the client.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (code, message, challenge) = match &self {
            AppError::Unauthenticated { realm, reason } => (
                reason.code(),
                reason.to_string(),
                Some(format!("Bearer realm=\"{}\"", realm)),
            ),
            AppError::Unauthorized => ("forbidden", "Forbidden".to_string(), None),
            AppError::Validation(msg) => ("invalid_request", msg.clone(), None),
            AppError::Database(e) => {
                tracing::error!(error = %e, "database error");
                (
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            AppError::Internal(e) => {
                tracing::error!(error = %e, "internal error");
                (
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        let mut response = (status, body).into_response();
        if let Some(value) = challenge.and_then(|c| HeaderValue::from_str(&c).ok()) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, value);
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthenticated_sets_challenge() {
        let response =
            AppError::unauthenticated("tenant-api", AuthFailure::InvalidApiKey).into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers()[header::WWW_AUTHENTICATE],
            "Bearer realm=\"tenant-api\""
        );
    }

    #[test]
    fn test_unauthorized_is_forbidden_without_challenge() {
        let response = AppError::Unauthorized.into_response();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::Validation("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Internal("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Database(sqlx::Error::RowNotFound).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_api_key_errors_classified() {
        let err: AppError = ApiKeyError::InvalidDeactivation("soon".into()).into();
        assert!(matches!(err, AppError::Validation(_)));

        let err: AppError = ApiKeyError::Crypto(CryptoError::EncryptionFailed).into();
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[test]
    fn test_failure_codes_are_distinct() {
        let codes = [
            AuthFailure::MissingHeader("Authorization").code(),
            AuthFailure::MalformedAuthorization.code(),
            AuthFailure::InvalidApiKey.code(),
            AuthFailure::UnsupportedProvider(UnsupportedProvider("x".into())).code(),
            AuthFailure::ProviderExchange.code(),
            AuthFailure::NotProvisioned.code(),
            AuthFailure::NoApplication.code(),
        ];
        let unique: std::collections::HashSet<_> = codes.iter().collect();
        assert_eq!(unique.len(), codes.len());
    }
}
