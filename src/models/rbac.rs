//! Role-based access control request.
//!
//! A permission is a (resource, operation) pair where the resource is a route
//! template such as `/v1/orgs/{extlID}` and the operation is an HTTP method.
//! Roles and their permissions live only in storage; the grant is decided by
//! the store's query, see [`crate::store::AuthStore::is_authorized`].

use axum::http::Method;

/// The (resource, operation) pair a request needs a grant for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRequest {
    pub resource: String,
    pub operation: String,
}

impl AccessRequest {
    pub fn new(route_template: &str, method: &Method) -> Self {
        Self {
            resource: route_template.to_string(),
            operation: method.as_str().to_string(),
        }
    }
}
