//! Authentication and authorization middleware.
//!
//! This middleware intercepts every protected request to:
//! 1. Determine the route template and method the request needs a grant for
//! 2. Run the auth flow against the request headers, under a deadline
//! 3. Inject the resulting [`Audit`] into the request
//! 4. Reject the request with 401 or 403 when any stage fails

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};

use crate::{AppState, error::AppError, models::audit::Audit, models::rbac::AccessRequest};

/// Auth middleware function.
///
/// # Headers
///
/// ```text
/// X-APP-ID: app123            (optional, together with X-API-KEY)
/// X-API-KEY: <key>            (optional, together with X-APP-ID)
/// X-AUTH-PROVIDER: google
/// Authorization: Bearer <token>
/// ```
///
/// # Returns
///
/// - `Ok(Response)` from the next handler, with `Extension<Audit>` available
/// - `Err(AppError::Unauthenticated)` (401) or `Err(AppError::Unauthorized)` (403)
/// - `Err(AppError::Internal)` (500) if the flow overran its deadline
///
/// The permission resource is the matched route template, e.g.
/// `/v1/orgs/{extlID}`, never the literal request path.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let access = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| AccessRequest::new(path.as_str(), request.method()));

    let flow = state.auth_flow();
    let audit: Audit = tokio::time::timeout(
        state.settings.timeout,
        flow.run(request.headers(), access.as_ref()),
    )
    .await
    .map_err(|_| {
        tracing::warn!(
            timeout_ms = state.settings.timeout.as_millis() as u64,
            "auth flow timed out"
        );
        AppError::Internal("authentication timed out".to_string())
    })??;

    tracing::debug!(
        app_extl_id = %audit.app.external_id,
        user_extl_id = %audit.user.external_id,
        "request authorized"
    );

    request.extensions_mut().insert(audit);

    Ok(next.run(request).await)
}
