//! Organization (tenant) model.

use serde::Serialize;
use uuid::Uuid;

/// Classification of an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrgKind {
    /// The bootstrap organization that owns the service itself
    Genesis,
    Test,
    Standard,
}

impl OrgKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrgKind::Genesis => "genesis",
            OrgKind::Test => "test",
            OrgKind::Standard => "standard",
        }
    }
}

impl std::str::FromStr for OrgKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "genesis" => Ok(OrgKind::Genesis),
            "test" => Ok(OrgKind::Test),
            "standard" => Ok(OrgKind::Standard),
            other => Err(format!("unknown organization kind: {}", other)),
        }
    }
}

/// Tenant boundary.
///
/// Every application, user and RBAC grant belongs to exactly one organization.
/// Isolation is enforced by the queries that load them, not by in-memory checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Organization {
    pub id: Uuid,

    pub external_id: String,

    pub name: String,

    pub description: String,

    pub kind: OrgKind,
}
