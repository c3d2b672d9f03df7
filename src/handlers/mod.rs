//! HTTP request handlers (route handlers).
//!
//! Protected handlers read the request's [`crate::models::audit::Audit`]
//! through `Extension<Audit>`; the auth middleware guarantees it is present.

/// Liveness and database connectivity
pub mod health;
/// Resolved identity of the caller
pub mod whoami;
