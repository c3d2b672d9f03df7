//! Authentication and authorization services.
//!
//! Services contain the core logic separated from HTTP handlers and
//! middleware. Each stage of the per-request flow lives in its own module and
//! talks to storage only through [`crate::store::AuthStore`].

/// API key authentication of the calling application
pub mod app_auth;
/// Role-based permission check
pub mod authorizer;
/// Header parsing
pub mod credentials;
/// Type-state chaining of the stages
pub mod flow;
/// Bearer token to user resolution
pub mod identity;
/// OAuth2 provider token exchange
pub mod provider;
/// Application context binding
pub mod tenancy;
