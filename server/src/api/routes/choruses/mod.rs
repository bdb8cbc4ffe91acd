//! Chorus API endpoints

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
use crate::data::sqlite::repositories::{audit, chorus};

use types::{ChorusDto, CreateChorusRequest, UpdateChorusRequest};
use super::hymns::types::validate_musical_key;

/// Shared state for Choruses API endpoints
#[derive(Clone)]
pub struct ChorusesApiState {
    pub database: Arc<SqliteService>,
}

/// Build Choruses API routes
pub fn routes(database: Arc<SqliteService>) -> Router<()> {
    let state = ChorusesApiState { database };

    Router::new()
        .route("/", get(list_choruses).post(create_chorus))
        .route(
            "/{chorus_id}",
            get(get_chorus).put(update_chorus).delete(delete_chorus),
        )
        .route("/{chorus_id}/restore", post(restore_chorus))
        .with_state(state)
}

fn chorus_not_found() -> ApiError {
    ApiError::not_found("CHORUS_NOT_FOUND", "Chorus not found")
}

/// List choruses with filtering and pagination
///
/// Filter keys: `term`, `title`, `content`, `key`, `deleted`.
#[utoipa::path(
    get,
    path = "/api/v1/choruses",
    tag = "choruses",
    responses(
        (status = 200, description = "Paginated choruses"),
        (status = 406, description = "Invalid cursor token")
    )
)]
pub async fn list_choruses(
    State(state): State<ChorusesApiState>,
    _auth: Auth,
    query: ListQuery,
) -> Result<Json<Paginated<ChorusDto>>, ApiError> {
    let page = chorus::list_choruses(state.database.pool(), &query.filters, &query.params)
        .await
        .map_err(ApiError::from_paginate)?;

    Ok(Json(page.map(ChorusDto::from)))
}

/// Create a chorus
#[utoipa::path(
    post,
    path = "/api/v1/choruses",
    tag = "choruses",
    request_body = CreateChorusRequest,
    responses(
        (status = 201, description = "Chorus created", body = ChorusDto)
    )
)]
pub async fn create_chorus(
    State(state): State<ChorusesApiState>,
    auth: Auth,
    ValidatedJson(body): ValidatedJson<CreateChorusRequest>,
) -> Result<(StatusCode, Json<ChorusDto>), ApiError> {
    auth.ctx.require_role(Role::Editor)?;
    let pool = state.database.pool();

    let row = chorus::create_chorus(pool, &body.title, &body.content, body.musical_key.as_deref())
        .await
        .map_err(ApiError::from_sqlite)?;

    audit::record_best_effort(
        pool,
        Some(&auth.ctx.user_id),
        "chorus.create",
        "chorus",
        Some(&row.id),
        Some(&serde_json::json!({ "title": row.title })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(ChorusDto::from(row))))
}

/// Get a live chorus
#[utoipa::path(
    get,
    path = "/api/v1/choruses/{chorus_id}",
    tag = "choruses",
    responses(
        (status = 200, description = "Chorus", body = ChorusDto),
        (status = 404, description = "Chorus not found")
    )
)]
pub async fn get_chorus(
    State(state): State<ChorusesApiState>,
    _auth: Auth,
    Path(chorus_id): Path<String>,
) -> Result<Json<ChorusDto>, ApiError> {
    let row = chorus::get_chorus(state.database.pool(), &chorus_id)
        .await
        .map_err(ApiError::from_sqlite)?
        .ok_or_else(chorus_not_found)?;

    Ok(Json(ChorusDto::from(row)))
}

/// Update a chorus; explicit `null` clears the musical key
#[utoipa::path(
    put,
    path = "/api/v1/choruses/{chorus_id}",
    tag = "choruses",
    request_body = UpdateChorusRequest,
    responses(
        (status = 200, description = "Chorus updated", body = ChorusDto),
        (status = 404, description = "Chorus not found")
    )
)]
pub async fn update_chorus(
    State(state): State<ChorusesApiState>,
    auth: Auth,
    Path(chorus_id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateChorusRequest>,
) -> Result<Json<ChorusDto>, ApiError> {
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
    let row = chorus::update_chorus(
        pool,
        &chorus_id,
        body.title.as_deref(),
        body.content.as_deref(),
        body.musical_key.as_ref().map(|o| o.as_deref()),
    )
    .await
    .map_err(ApiError::from_sqlite)?
    .ok_or_else(chorus_not_found)?;

    audit::record_best_effort(
        pool,
        Some(&auth.ctx.user_id),
        "chorus.update",
        "chorus",
        Some(&chorus_id),
        None,
    )
    .await;

    Ok(Json(ChorusDto::from(row)))
}

/// Soft-delete a chorus
#[utoipa::path(
    delete,
    path = "/api/v1/choruses/{chorus_id}",
    tag = "choruses",
    responses(
        (status = 204, description = "Chorus deleted"),
        (status = 404, description = "Chorus not found")
    )
)]
pub async fn delete_chorus(
    State(state): State<ChorusesApiState>,
    auth: Auth,
    Path(chorus_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    auth.ctx.require_role(Role::Editor)?;
    let pool = state.database.pool();

    let deleted = chorus::soft_delete_chorus(pool, &chorus_id)
        .await
        .map_err(ApiError::from_sqlite)?;
    if !deleted {
        return Err(chorus_not_found());
    }

    audit::record_best_effort(
        pool,
        Some(&auth.ctx.user_id),
        "chorus.delete",
        "chorus",
        Some(&chorus_id),
        None,
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

/// Restore a soft-deleted chorus
#[utoipa::path(
    post,
    path = "/api/v1/choruses/{chorus_id}/restore",
    tag = "choruses",
    responses(
        (status = 200, description = "Chorus restored", body = ChorusDto),
        (status = 404, description = "No deleted chorus with this id")
    )
)]
pub async fn restore_chorus(
    State(state): State<ChorusesApiState>,
    auth: Auth,
    Path(chorus_id): Path<String>,
) -> Result<Json<ChorusDto>, ApiError> {
    auth.ctx.require_role(Role::Editor)?;
    let pool = state.database.pool();

    let row = chorus::restore_chorus(pool, &chorus_id)
        .await
        .map_err(ApiError::from_sqlite)?
        .ok_or_else(chorus_not_found)?;

    audit::record_best_effort(
        pool,
        Some(&auth.ctx.user_id),
        "chorus.restore",
        "chorus",
        Some(&chorus_id),
        None,
    )
    .await;

    Ok(Json(ChorusDto::from(row)))
}
