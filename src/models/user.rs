//! User model.

use serde::Serialize;
use uuid::Uuid;

/// Identity record scoped to an organization.
///
/// Users are only ever resolved during authentication. Registration is a
/// separate, explicit flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    /// Internal unique identifier
    pub id: Uuid,

    /// Identifier exposed to API clients
    pub external_id: String,

    /// Organization the user belongs to
    pub org_id: Uuid,

    pub first_name: Option<String>,

    pub last_name: Option<String>,

    pub full_name: Option<String>,

    pub email: Option<String>,
}
