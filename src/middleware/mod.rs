//! HTTP middleware components.
//!
//! Middleware run before route handlers and can short-circuit a request
//! before the handler is reached.

/// App key, bearer token and permission checks
pub mod auth;
