//! Role-based authorization of an authenticated request.

use crate::error::AppError;
use crate::models::audit::Audit;
use crate::models::rbac::AccessRequest;
use crate::store::AuthStore;

/// Require an active role of the user, within the user's organization, to
/// grant `access`.
///
/// A failed permission query denies the request rather than surfacing as an
/// internal error.
pub async fn authorize(
    store: &dyn AuthStore,
    audit: &Audit,
    access: &AccessRequest,
) -> Result<(), AppError> {
    let granted = store
        .is_authorized(
            &access.resource,
            &access.operation,
            audit.user.id,
            audit.user.org_id,
        )
        .await;

    match granted {
        Ok(true) => Ok(()),
        Ok(false) => {
            tracing::warn!(
                user_extl_id = %audit.user.external_id,
                resource = %access.resource,
                operation = %access.operation,
                "no role grants the requested permission"
            );
            Err(AppError::Unauthorized)
        }
        Err(e) => {
            tracing::error!(
                error = %e,
                resource = %access.resource,
                "permission query failed, denying"
            );
            Err(AppError::Unauthorized)
        }
    }
}
