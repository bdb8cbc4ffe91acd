//! Hymn and verse API types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::api::types::double_option;
use crate::data::sqlite::repositories::hymn::MUSICAL_KEYS;
use crate::data::types::{HymnRow, VerseRow};

/// Hymn DTO for API responses
#[derive(Debug, Serialize, ToSchema)]
pub struct HymnDto {
    pub id: String,
    pub number: i64,
    pub title: String,
    pub author: Option<String>,
    pub musical_key: Option<String>,
    pub category_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<HymnRow> for HymnDto {
    fn from(row: HymnRow) -> Self {
        Self {
            id: row.id,
            number: row.number,
            title: row.title,
            author: row.author,
            musical_key: row.musical_key,
            category_id: row.category_id,
            created_at: DateTime::from_timestamp(row.created_at, 0).unwrap_or_else(Utc::now),
            updated_at: DateTime::from_timestamp(row.updated_at, 0).unwrap_or_else(Utc::now),
            deleted_at: row.deleted_at.and_then(|ts| DateTime::from_timestamp(ts, 0)),
        }
    }
}

/// Verse DTO for API responses
#[derive(Debug, Serialize, ToSchema)]
pub struct VerseDto {
    pub id: String,
    pub hymn_id: String,
    pub number: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<VerseRow> for VerseDto {
    fn from(row: VerseRow) -> Self {
        Self {
            id: row.id,
            hymn_id: row.hymn_id,
            number: row.number,
            content: row.content,
            created_at: DateTime::from_timestamp(row.created_at, 0).unwrap_or_else(Utc::now),
            updated_at: DateTime::from_timestamp(row.updated_at, 0).unwrap_or_else(Utc::now),
        }
    }
}

/// A hymn together with its verses, ordered by verse number
#[derive(Debug, Serialize, ToSchema)]
pub struct HymnDetailResponse {
    pub hymn: HymnDto,
    pub verses: Vec<VerseDto>,
}

pub fn validate_musical_key(key: &str) -> Result<(), ValidationError> {
    if MUSICAL_KEYS.contains(&key) {
        Ok(())
    } else {
        Err(ValidationError::new("musical_key")
            .with_message(format!("Unknown musical key: {}", key).into()))
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateHymnRequest {
    #[validate(range(min = 1, message = "Hymn number must be >= 1"))]
    pub number: i64,
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,
    #[validate(length(max = 200, message = "Author must be at most 200 characters"))]
    pub author: Option<String>,
    #[validate(custom(function = "validate_musical_key"))]
    pub musical_key: Option<String>,
    pub category_id: Option<String>,
}

/// Partial update; explicit `null` clears a nullable field
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateHymnRequest {
    #[validate(range(min = 1, message = "Hymn number must be >= 1"))]
    pub number: Option<i64>,
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub author: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub musical_key: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub category_id: Option<Option<String>>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateVerseRequest {
    #[validate(range(min = 1, message = "Verse number must be >= 1"))]
    pub number: i64,
    #[validate(length(min = 1, message = "Content cannot be empty"))]
    pub content: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateVerseRequest {
    #[validate(range(min = 1, message = "Verse number must be >= 1"))]
    pub number: Option<i64>,
    #[validate(length(min = 1, message = "Content cannot be empty"))]
    pub content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_request_distinguishes_null_from_absent() {
        let req: UpdateHymnRequest = serde_json::from_str(r#"{"author": null}"#).unwrap();
        assert_eq!(req.author, Some(None));
        assert_eq!(req.musical_key, None);

        let req: UpdateHymnRequest = serde_json::from_str(r#"{"author": "Watts"}"#).unwrap();
        assert_eq!(req.author, Some(Some("Watts".to_string())));
    }

    #[test]
    fn musical_key_validation() {
        assert!(validate_musical_key("Eb").is_ok());
        assert!(validate_musical_key("H").is_err());
    }
}
