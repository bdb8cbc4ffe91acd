//! Category API types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::api::types::double_option;
use crate::data::types::{CategoryRow, CategoryWithCountRow};

/// Category DTO for API responses
#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryDto {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    /// Count of live hymns; present on listing responses only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hymn_count: Option<i64>,
}

impl From<CategoryRow> for CategoryDto {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            created_at: DateTime::from_timestamp(row.created_at, 0).unwrap_or_else(Utc::now),
            updated_at: DateTime::from_timestamp(row.updated_at, 0).unwrap_or_else(Utc::now),
            deleted_at: row.deleted_at.and_then(|ts| DateTime::from_timestamp(ts, 0)),
            hymn_count: None,
        }
    }
}

impl From<CategoryWithCountRow> for CategoryDto {
    fn from(row: CategoryWithCountRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            created_at: DateTime::from_timestamp(row.created_at, 0).unwrap_or_else(Utc::now),
            updated_at: DateTime::from_timestamp(row.updated_at, 0).unwrap_or_else(Utc::now),
            deleted_at: row.deleted_at.and_then(|ts| DateTime::from_timestamp(ts, 0)),
            hymn_count: Some(row.hymn_count),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
}

/// Partial update; explicit `null` clears the description
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
}
