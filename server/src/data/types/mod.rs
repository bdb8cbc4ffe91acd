//! Shared data types for database rows

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::data::query::HasId;

/// User account row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub display_name: Option<String>,
    pub role: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Category row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CategoryRow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

/// Category row joined with its hymn count, from the raw listing query
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CategoryWithCountRow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
    pub hymn_count: i64,
}

/// Hymn row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct HymnRow {
    pub id: String,
    pub number: i64,
    pub title: String,
    pub author: Option<String>,
    pub musical_key: Option<String>,
    pub category_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

/// Verse row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct VerseRow {
    pub id: String,
    pub hymn_id: String,
    pub number: i64,
    pub content: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Chorus row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ChorusRow {
    pub id: String,
    pub title: String,
    pub content: String,
    pub musical_key: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

/// Audit log row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AuditLogRow {
    pub id: String,
    pub actor_id: Option<String>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    /// JSON payload describing the change
    pub detail: Option<String>,
    pub created_at: i64,
}

macro_rules! has_id {
    ($($row:ty),+ $(,)?) => {
        $(impl HasId for $row {
            fn id(&self) -> &str {
                &self.id
            }
        })+
    };
}

has_id!(
    UserRow,
    CategoryRow,
    CategoryWithCountRow,
    HymnRow,
    VerseRow,
    ChorusRow,
    AuditLogRow,
);
