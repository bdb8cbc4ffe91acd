//! User API types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::api::types::double_option;
use crate::data::types::UserRow;

/// User DTO for API responses
#[derive(Debug, Serialize, ToSchema)]
pub struct UserDto {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserRow> for UserDto {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            display_name: row.display_name,
            role: row.role,
            created_at: DateTime::from_timestamp(row.created_at, 0).unwrap_or_else(Utc::now),
            updated_at: DateTime::from_timestamp(row.updated_at, 0).unwrap_or_else(Utc::now),
        }
    }
}

/// Request body for updating the caller's own profile; explicit `null`
/// clears the display name, an absent key leaves it untouched
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileRequest {
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub display_name: Option<Option<String>>,
}

/// Request body for an admin changing another user's role
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRoleRequest {
    #[validate(length(min = 1, message = "Role cannot be empty"))]
    pub role: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_request_distinguishes_null_from_absent() {
        let req: UpdateProfileRequest = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(req.display_name, None);

        let req: UpdateProfileRequest =
            serde_json::from_str(r#"{"display_name": null}"#).unwrap();
        assert_eq!(req.display_name, Some(None));

        let req: UpdateProfileRequest =
            serde_json::from_str(r#"{"display_name": "Charles Wesley"}"#).unwrap();
        assert_eq!(req.display_name, Some(Some("Charles Wesley".to_string())));
    }
}
