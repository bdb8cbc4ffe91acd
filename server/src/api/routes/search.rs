//! Cross-entity search
//!
//! Runs the same filter set against hymns and choruses, then merges the
//! results in memory into one ordered page.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::auth::Auth;
use crate::api::types::{ApiError, ListQuery};
use crate::data::query::{
    Boolish, ListParams, Paginated, SortDirection, SortValue, merge_and_paginate,
};
use crate::data::sqlite::SqliteService;
use crate::data::sqlite::repositories::{chorus, hymn};
use crate::data::types::{ChorusRow, HymnRow};

/// One search result from either catalog
#[derive(Debug, Serialize, ToSchema)]
pub struct SearchHitDto {
    pub id: String,
    /// "hymn" or "chorus"
    pub kind: &'static str,
    pub title: String,
    /// Hymn number; absent for choruses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<i64>,
    pub musical_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<HymnRow> for SearchHitDto {
    fn from(row: HymnRow) -> Self {
        Self {
            id: row.id,
            kind: "hymn",
            title: row.title,
            number: Some(row.number),
            musical_key: row.musical_key,
            created_at: DateTime::from_timestamp(row.created_at, 0).unwrap_or_else(Utc::now),
        }
    }
}

impl From<ChorusRow> for SearchHitDto {
    fn from(row: ChorusRow) -> Self {
        Self {
            id: row.id,
            kind: "chorus",
            title: row.title,
            number: None,
            musical_key: row.musical_key,
            created_at: DateTime::from_timestamp(row.created_at, 0).unwrap_or_else(Utc::now),
        }
    }
}

/// Shared state for the Search API endpoint
#[derive(Clone)]
pub struct SearchApiState {
    pub database: Arc<SqliteService>,
}

/// Build Search API routes
pub fn routes(database: Arc<SqliteService>) -> Router<()> {
    let state = SearchApiState { database };

    Router::new().route("/", get(search)).with_state(state)
}

fn sort_value(hit: &SearchHitDto, column: &str) -> SortValue {
    match column {
        "title" => SortValue::Text(hit.title.to_lowercase()),
        "kind" => SortValue::Text(hit.kind.to_string()),
        "number" => hit.number.map_or(SortValue::Null, |n| SortValue::Number(n as f64)),
        "created_at" => SortValue::Number(hit.created_at.timestamp() as f64),
        _ => SortValue::Null,
    }
}

/// Search hymns and choruses together
///
/// Keyed filters that only one entity understands (for example `number`)
/// narrow that entity alone; the `term` filter fans out across both.
#[utoipa::path(
    get,
    path = "/api/v1/search",
    tag = "search",
    responses(
        (status = 200, description = "Merged, paginated search hits")
    )
)]
pub async fn search(
    State(state): State<SearchApiState>,
    _auth: Auth,
    query: ListQuery,
) -> Result<Json<Paginated<SearchHitDto>>, ApiError> {
    let pool = state.database.pool();

    // Fetch both catalogs in full, then window after the merge
    let fetch_all = ListParams {
        is_paginated: Some(Boolish::Bool(false)),
        ..Default::default()
    };

    let (hymns, choruses) = tokio::try_join!(
        hymn::list_hymns(pool, &query.filters, &fetch_all),
        chorus::list_choruses(pool, &query.filters, &fetch_all),
    )
    .map_err(ApiError::from_paginate)?;

    let hymns: Vec<SearchHitDto> = hymns.into_items().into_iter().map(Into::into).collect();
    let choruses: Vec<SearchHitDto> = choruses.into_items().into_iter().map(Into::into).collect();

    let params = if query.params.order_by.is_empty() {
        ListParams {
            order_by: vec!["title".to_string()],
            direction: SortDirection::Asc,
            ..query.params.clone()
        }
    } else {
        query.params.clone()
    };

    Ok(Json(merge_and_paginate(
        vec![hymns, choruses],
        &params,
        sort_value,
    )))
}
