//! Hymn API endpoints, including nested verse management

pub mod types;

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::auth::{Auth, Role};
use crate::api::extractors::ValidatedJson;
use crate::api::types::{ApiError, ListQuery};
use crate::data::query::Paginated;
use crate::data::sqlite::SqliteService;
use crate::data::sqlite::repositories::{audit, hymn, verse};

use types::{
    CreateHymnRequest, CreateVerseRequest, HymnDetailResponse, HymnDto, UpdateHymnRequest,
    UpdateVerseRequest, VerseDto, validate_musical_key,
};

/// Shared state for Hymns API endpoints
#[derive(Clone)]
pub struct HymnsApiState {
    pub database: Arc<SqliteService>,
}

/// Build Hymns API routes
pub fn routes(database: Arc<SqliteService>) -> Router<()> {
    let state = HymnsApiState { database };

    Router::new()
        .route("/", get(list_hymns).post(create_hymn))
        .route(
            "/{hymn_id}",
            get(get_hymn).put(update_hymn).delete(delete_hymn),
        )
        .route("/{hymn_id}/restore", post(restore_hymn))
        .route("/{hymn_id}/verses", get(list_verses).post(create_verse))
        .route(
            "/{hymn_id}/verses/{verse_id}",
            get(get_verse).put(update_verse).delete(delete_verse),
        )
        .with_state(state)
}

fn hymn_not_found() -> ApiError {
    ApiError::not_found("HYMN_NOT_FOUND", "Hymn not found")
}

fn verse_not_found() -> ApiError {
    ApiError::not_found("VERSE_NOT_FOUND", "Verse not found")
}

/// List hymns with filtering and pagination
///
/// Filter keys: `term`, `title`, `author`, `number`, `key`, `deleted`,
/// `category.name`, `verses:content`.
#[utoipa::path(
    get,
    path = "/api/v1/hymns",
    tag = "hymns",
    responses(
        (status = 200, description = "Paginated hymns"),
        (status = 406, description = "Invalid cursor token")
    )
)]
pub async fn list_hymns(
    State(state): State<HymnsApiState>,
    _auth: Auth,
    query: ListQuery,
) -> Result<Json<Paginated<HymnDto>>, ApiError> {
    let page = hymn::list_hymns(state.database.pool(), &query.filters, &query.params)
        .await
        .map_err(ApiError::from_paginate)?;

    Ok(Json(page.map(HymnDto::from)))
}

/// Create a hymn
#[utoipa::path(
    post,
    path = "/api/v1/hymns",
    tag = "hymns",
    request_body = CreateHymnRequest,
    responses(
        (status = 201, description = "Hymn created", body = HymnDto),
        (status = 409, description = "Hymn number already in use")
    )
)]
pub async fn create_hymn(
    State(state): State<HymnsApiState>,
    auth: Auth,
    ValidatedJson(body): ValidatedJson<CreateHymnRequest>,
) -> Result<(StatusCode, Json<HymnDto>), ApiError> {
    auth.ctx.require_role(Role::Editor)?;
    let pool = state.database.pool();

    let row = hymn::create_hymn(
        pool,
        body.number,
        &body.title,
        body.author.as_deref(),
        body.musical_key.as_deref(),
        body.category_id.as_deref(),
    )
    .await
    .map_err(ApiError::from_sqlite)?;

    audit::record_best_effort(
        pool,
        Some(&auth.ctx.user_id),
        "hymn.create",
        "hymn",
        Some(&row.id),
        Some(&serde_json::json!({ "number": row.number, "title": row.title })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(HymnDto::from(row))))
}

/// Get a hymn with its verses
#[utoipa::path(
    get,
    path = "/api/v1/hymns/{hymn_id}",
    tag = "hymns",
    responses(
        (status = 200, description = "Hymn detail", body = HymnDetailResponse),
        (status = 404, description = "Hymn not found")
    )
)]
pub async fn get_hymn(
    State(state): State<HymnsApiState>,
    _auth: Auth,
    Path(hymn_id): Path<String>,
) -> Result<Json<HymnDetailResponse>, ApiError> {
    let pool = state.database.pool();

    let row = hymn::get_hymn(pool, &hymn_id)
        .await
        .map_err(ApiError::from_sqlite)?
        .ok_or_else(hymn_not_found)?;
    let verses = verse::list_verses(pool, &hymn_id)
        .await
        .map_err(ApiError::from_sqlite)?;

    Ok(Json(HymnDetailResponse {
        hymn: HymnDto::from(row),
        verses: verses.into_iter().map(VerseDto::from).collect(),
    }))
}

/// Update a hymn; explicit `null` clears nullable fields
#[utoipa::path(
    put,
    path = "/api/v1/hymns/{hymn_id}",
    tag = "hymns",
    request_body = UpdateHymnRequest,
    responses(
        (status = 200, description = "Hymn updated", body = HymnDto),
        (status = 404, description = "Hymn not found"),
        (status = 409, description = "Hymn number already in use")
    )
)]
pub async fn update_hymn(
    State(state): State<HymnsApiState>,
    auth: Auth,
    Path(hymn_id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateHymnRequest>,
) -> Result<Json<HymnDto>, ApiError> {
    auth.ctx.require_role(Role::Editor)?;

    if let Some(Some(key)) = &body.musical_key
        && validate_musical_key(key).is_err()
    {
        return Err(ApiError::bad_request(
            "INVALID_MUSICAL_KEY",
            format!("Unknown musical key: {}", key),
        ));
    }

    let pool = state.database.pool();
    let row = hymn::update_hymn(
        pool,
        &hymn_id,
        body.number,
        body.title.as_deref(),
        body.author.as_ref().map(|o| o.as_deref()),
        body.musical_key.as_ref().map(|o| o.as_deref()),
        body.category_id.as_ref().map(|o| o.as_deref()),
    )
    .await
    .map_err(ApiError::from_sqlite)?
    .ok_or_else(hymn_not_found)?;

    audit::record_best_effort(
        pool,
        Some(&auth.ctx.user_id),
        "hymn.update",
        "hymn",
        Some(&hymn_id),
        None,
    )
    .await;

    Ok(Json(HymnDto::from(row)))
}

/// Soft-delete a hymn; its number becomes reusable
#[utoipa::path(
    delete,
    path = "/api/v1/hymns/{hymn_id}",
    tag = "hymns",
    responses(
        (status = 204, description = "Hymn deleted"),
        (status = 404, description = "Hymn not found")
    )
)]
pub async fn delete_hymn(
    State(state): State<HymnsApiState>,
    auth: Auth,
    Path(hymn_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    auth.ctx.require_role(Role::Editor)?;
    let pool = state.database.pool();

    let deleted = hymn::soft_delete_hymn(pool, &hymn_id)
        .await
        .map_err(ApiError::from_sqlite)?;
    if !deleted {
        return Err(hymn_not_found());
    }

    audit::record_best_effort(
        pool,
        Some(&auth.ctx.user_id),
        "hymn.delete",
        "hymn",
        Some(&hymn_id),
        None,
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

/// Restore a soft-deleted hymn
#[utoipa::path(
    post,
    path = "/api/v1/hymns/{hymn_id}/restore",
    tag = "hymns",
    responses(
        (status = 200, description = "Hymn restored", body = HymnDto),
        (status = 404, description = "No deleted hymn with this id"),
        (status = 409, description = "Hymn number has been taken by a live hymn")
    )
)]
pub async fn restore_hymn(
    State(state): State<HymnsApiState>,
    auth: Auth,
    Path(hymn_id): Path<String>,
) -> Result<Json<HymnDto>, ApiError> {
    auth.ctx.require_role(Role::Editor)?;
    let pool = state.database.pool();

    let row = hymn::restore_hymn(pool, &hymn_id)
        .await
        .map_err(ApiError::from_sqlite)?
        .ok_or_else(hymn_not_found)?;

    audit::record_best_effort(
        pool,
        Some(&auth.ctx.user_id),
        "hymn.restore",
        "hymn",
        Some(&hymn_id),
        None,
    )
    .await;

    Ok(Json(HymnDto::from(row)))
}

/// List a hymn's verses, ordered by verse number
#[utoipa::path(
    get,
    path = "/api/v1/hymns/{hymn_id}/verses",
    tag = "verses",
    responses(
        (status = 200, description = "Verses", body = [VerseDto]),
        (status = 404, description = "Hymn not found")
    )
)]
pub async fn list_verses(
    State(state): State<HymnsApiState>,
    _auth: Auth,
    Path(hymn_id): Path<String>,
) -> Result<Json<Vec<VerseDto>>, ApiError> {
    let pool = state.database.pool();

    hymn::get_hymn(pool, &hymn_id)
        .await
        .map_err(ApiError::from_sqlite)?
        .ok_or_else(hymn_not_found)?;

    let verses = verse::list_verses(pool, &hymn_id)
        .await
        .map_err(ApiError::from_sqlite)?;

    Ok(Json(verses.into_iter().map(VerseDto::from).collect()))
}

/// Add a verse to a hymn
#[utoipa::path(
    post,
    path = "/api/v1/hymns/{hymn_id}/verses",
    tag = "verses",
    request_body = CreateVerseRequest,
    responses(
        (status = 201, description = "Verse created", body = VerseDto),
        (status = 404, description = "Hymn not found"),
        (status = 409, description = "Verse number already exists for this hymn")
    )
)]
pub async fn create_verse(
    State(state): State<HymnsApiState>,
    auth: Auth,
    Path(hymn_id): Path<String>,
    ValidatedJson(body): ValidatedJson<CreateVerseRequest>,
) -> Result<(StatusCode, Json<VerseDto>), ApiError> {
    auth.ctx.require_role(Role::Editor)?;
    let pool = state.database.pool();

    hymn::get_hymn(pool, &hymn_id)
        .await
        .map_err(ApiError::from_sqlite)?
        .ok_or_else(hymn_not_found)?;

    let row = verse::create_verse(pool, &hymn_id, body.number, &body.content)
        .await
        .map_err(ApiError::from_sqlite)?;

    audit::record_best_effort(
        pool,
        Some(&auth.ctx.user_id),
        "verse.create",
        "verse",
        Some(&row.id),
        Some(&serde_json::json!({ "hymn_id": hymn_id, "number": row.number })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(VerseDto::from(row))))
}

/// Get a single verse
#[utoipa::path(
    get,
    path = "/api/v1/hymns/{hymn_id}/verses/{verse_id}",
    tag = "verses",
    responses(
        (status = 200, description = "Verse", body = VerseDto),
        (status = 404, description = "Verse not found")
    )
)]
pub async fn get_verse(
    State(state): State<HymnsApiState>,
    _auth: Auth,
    Path((hymn_id, verse_id)): Path<(String, String)>,
) -> Result<Json<VerseDto>, ApiError> {
    let row = verse::get_verse(state.database.pool(), &hymn_id, &verse_id)
        .await
        .map_err(ApiError::from_sqlite)?
        .ok_or_else(verse_not_found)?;

    Ok(Json(VerseDto::from(row)))
}

/// Update a verse
#[utoipa::path(
    put,
    path = "/api/v1/hymns/{hymn_id}/verses/{verse_id}",
    tag = "verses",
    request_body = UpdateVerseRequest,
    responses(
        (status = 200, description = "Verse updated", body = VerseDto),
        (status = 404, description = "Verse not found"),
        (status = 409, description = "Verse number already exists for this hymn")
    )
)]
pub async fn update_verse(
    State(state): State<HymnsApiState>,
    auth: Auth,
    Path((hymn_id, verse_id)): Path<(String, String)>,
    ValidatedJson(body): ValidatedJson<UpdateVerseRequest>,
) -> Result<Json<VerseDto>, ApiError> {
    auth.ctx.require_role(Role::Editor)?;
    let pool = state.database.pool();

    let row = verse::update_verse(pool, &hymn_id, &verse_id, body.number, body.content.as_deref())
        .await
        .map_err(ApiError::from_sqlite)?
        .ok_or_else(verse_not_found)?;

    audit::record_best_effort(
        pool,
        Some(&auth.ctx.user_id),
        "verse.update",
        "verse",
        Some(&verse_id),
        None,
    )
    .await;

    Ok(Json(VerseDto::from(row)))
}

/// Delete a verse (hard delete)
#[utoipa::path(
    delete,
    path = "/api/v1/hymns/{hymn_id}/verses/{verse_id}",
    tag = "verses",
    responses(
        (status = 204, description = "Verse deleted"),
        (status = 404, description = "Verse not found")
    )
)]
pub async fn delete_verse(
    State(state): State<HymnsApiState>,
    auth: Auth,
    Path((hymn_id, verse_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    auth.ctx.require_role(Role::Editor)?;
    let pool = state.database.pool();

    let deleted = verse::delete_verse(pool, &hymn_id, &verse_id)
        .await
        .map_err(ApiError::from_sqlite)?;
    if !deleted {
        return Err(verse_not_found());
    }

    audit::record_best_effort(
        pool,
        Some(&auth.ctx.user_id),
        "verse.delete",
        "verse",
        Some(&verse_id),
        None,
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}
