/// Self-or-admin authorization
use crate::account::Role;
use crate::error::AuthError;

/// True iff the caller owns the target resource or is an admin
pub fn is_self_or_admin(caller_id: &str, target_id: &str, caller_role: Role) -> bool {
    caller_id == target_id || caller_role.is_admin()
}

pub fn require_self_or_admin(
    caller_id: &str,
    target_id: &str,
    caller_role: Role,
) -> Result<(), AuthError> {
    if is_self_or_admin(caller_id, target_id, caller_role) {
        Ok(())
    } else {
        tracing::warn!(caller_id = %caller_id, target_id = %target_id, "Forbidden cross-account access");
        Err(AuthError::Forbidden(
            "You are forbidden to perform this action".to_string(),
        ))
    }
}
