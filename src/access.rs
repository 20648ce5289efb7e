//! Role-scoped data-access resolution.
//!
//! Which school(s) a caller may see or modify is derived from their role in
//! exactly one place, instead of per-handler role branching. Both checks
//! read the database per call; nothing is cached, so an admin reassignment
//! takes effect on the very next request.

use sqlx::SqlitePool;

use crate::error::AppError;
use crate::middleware::auth::Caller;
use crate::queries::menu::MenuRow;
use crate::queries::school::{school_for_admin, schools_for_parent};
use crate::types::Role;

/// The set of schools a caller may act upon.
#[derive(Debug, Clone, PartialEq)]
pub enum SchoolScope {
    /// Top-level administrators bypass school filtering entirely.
    Unrestricted,
    Schools(Vec<String>),
}

impl SchoolScope {
    pub fn allows(&self, school_id: &str) -> bool {
        match self {
            SchoolScope::Unrestricted => true,
            SchoolScope::Schools(ids) => ids.iter().any(|id| id == school_id),
        }
    }

    /// Authorization error unless the given school is in scope.
    pub fn ensure(&self, school_id: &str) -> Result<(), AppError> {
        if self.allows(school_id) {
            Ok(())
        } else {
            Err(AppError::Authorization(
                "You do not have access to this school".to_string(),
            ))
        }
    }
}

pub async fn resolve_school_scope(
    pool: &SqlitePool,
    caller: &Caller,
) -> Result<SchoolScope, AppError> {
    let scope = match caller.role {
        Role::Admin => SchoolScope::Unrestricted,
        Role::SchoolAdmin => {
            SchoolScope::Schools(school_for_admin(pool, &caller.id).await?.into_iter().collect())
        }
        Role::CanteenStaff => {
            SchoolScope::Schools(caller.school_id.iter().cloned().collect())
        }
        Role::Parent => SchoolScope::Schools(schools_for_parent(pool, &caller.id).await?),
    };

    tracing::debug!(
        caller_id = %caller.id,
        role = %caller.role,
        scope = ?scope,
        "Resolved school scope"
    );

    Ok(scope)
}

/// Write access to a specific menu: unrestricted callers, the school-admin
/// of the menu's school, or canteen staff whose own school matches.
pub async fn can_write_menu(
    pool: &SqlitePool,
    menu: &MenuRow,
    caller: &Caller,
) -> Result<bool, AppError> {
    let allowed = match caller.role {
        Role::Admin => true,
        Role::SchoolAdmin => {
            let school = school_for_admin(pool, &caller.id).await?;
            school.as_deref() == Some(menu.school_id.as_str())
        }
        Role::CanteenStaff => caller.school_id.as_deref() == Some(menu.school_id.as_str()),
        Role::Parent => false,
    };
    Ok(allowed)
}

pub async fn ensure_can_write_menu(
    pool: &SqlitePool,
    menu: &MenuRow,
    caller: &Caller,
) -> Result<(), AppError> {
    if can_write_menu(pool, menu, caller).await? {
        Ok(())
    } else {
        tracing::warn!(
            caller_id = %caller.id,
            role = %caller.role,
            menu_id = %menu.id,
            "Menu write access denied"
        );
        Err(AppError::Authorization(
            "You do not have write access to this menu".to_string(),
        ))
    }
}
