//! Identity echo endpoint.

use axum::{Extension, Json};

use crate::models::audit::Audit;

/// Return the audit context the auth middleware resolved for this request.
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "app": { "external_id": "app123", "org": { ... }, ... },
///   "user": { "external_id": "u1", ... },
///   "moment": "2025-12-21T19:00:00Z"
/// }
/// ```
pub async fn whoami(Extension(audit): Extension<Audit>) -> Json<Audit> {
    Json(audit)
}
