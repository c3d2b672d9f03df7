//! Per-request audit context.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::application::AppSummary;
use crate::models::user::User;

/// The resolved application, user and moment of a request.
///
/// Built once authentication finishes and inserted into request extensions,
/// where handlers pick it up to stamp create/update provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Audit {
    pub app: AppSummary,

    pub user: User,

    pub moment: DateTime<Utc>,
}
