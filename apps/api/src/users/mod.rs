pub mod handlers;

use uuid::Uuid;

use crate::errors::AppError;
use crate::models::user::Role;

pub fn parse_role(value: &str) -> Result<Role, AppError> {
    Role::parse(value.trim()).ok_or_else(|| AppError::Validation(format!("Unknown role '{value}'")))
}

/// Admins cannot change their own role, and the last admin cannot be demoted.
/// `admin_count` is the number of admins before the change.
pub fn check_role_change(
    actor_id: Uuid,
    target_id: Uuid,
    current: Role,
    requested: Role,
    admin_count: i64,
) -> Result<(), AppError> {
    if current == requested {
        return Ok(());
    }
    if actor_id == target_id {
        return Err(AppError::Validation(
            "You cannot change your own role".to_string(),
        ));
    }
    if current == Role::Admin && admin_count <= 1 {
        return Err(AppError::Conflict(
            "At least one admin account must remain".to_string(),
        ));
    }
    Ok(())
}
