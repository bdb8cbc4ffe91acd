//! Chorus API types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::api::routes::hymns::types::validate_musical_key;
use crate::api::types::double_option;
use crate::data::types::ChorusRow;

/// Chorus DTO for API responses
#[derive(Debug, Serialize, ToSchema)]
pub struct ChorusDto {
    pub id: String,
    pub title: String,
    pub content: String,
    pub musical_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<ChorusRow> for ChorusDto {
    fn from(row: ChorusRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            content: row.content,
            musical_key: row.musical_key,
            created_at: DateTime::from_timestamp(row.created_at, 0).unwrap_or_else(Utc::now),
            updated_at: DateTime::from_timestamp(row.updated_at, 0).unwrap_or_else(Utc::now),
            deleted_at: row.deleted_at.and_then(|ts| DateTime::from_timestamp(ts, 0)),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateChorusRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,
    #[validate(length(min = 1, message = "Content cannot be empty"))]
    pub content: String,
    #[validate(custom(function = "validate_musical_key"))]
    pub musical_key: Option<String>,
}

/// Partial update; explicit `null` clears the musical key
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateChorusRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "Content cannot be empty"))]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub musical_key: Option<Option<String>>,
}
