//! Authenticated request context and role checks

use std::fmt;
use std::str::FromStr;

use crate::api::types::ApiError;
use crate::core::constants::{ROLE_ADMIN, ROLE_EDITOR, ROLE_MEMBER};

/// User role, ordered by privilege
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Role {
    Member,
    Editor,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Member => ROLE_MEMBER,
            Self::Editor => ROLE_EDITOR,
            Self::Admin => ROLE_ADMIN,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ROLE_MEMBER => Ok(Self::Member),
            ROLE_EDITOR => Ok(Self::Editor),
            ROLE_ADMIN => Ok(Self::Admin),
            _ => Err(()),
        }
    }
}

/// Authentication context for a request
///
/// Inserted into request extensions by the auth middleware. When auth is
/// disabled a synthetic admin context stands in for every request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: String,
    pub role: Role,
}

impl AuthContext {
    /// Check role, returning 403 when the caller's role is below `required`
    pub fn require_role(&self, required: Role) -> Result<(), ApiError> {
        if self.role >= required {
            Ok(())
        } else {
            Err(ApiError::forbidden(
                "INSUFFICIENT_ROLE",
                format!("This operation requires the '{}' role", required),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_are_ordered_by_privilege() {
        assert!(Role::Admin > Role::Editor);
        assert!(Role::Editor > Role::Member);
        assert_eq!("editor".parse::<Role>(), Ok(Role::Editor));
        assert!("owner".parse::<Role>().is_err());
    }

    #[test]
    fn require_role_allows_equal_or_higher() {
        let editor = AuthContext {
            user_id: "u1".to_string(),
            role: Role::Editor,
        };
        assert!(editor.require_role(Role::Member).is_ok());
        assert!(editor.require_role(Role::Editor).is_ok());
        assert!(editor.require_role(Role::Admin).is_err());
    }
}
