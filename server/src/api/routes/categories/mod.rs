//! Category API endpoints
//!
//! Listing includes each category's live hymn count via the raw
//! aggregate query path.

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
use crate::data::sqlite::repositories::{audit, category};

use types::{CategoryDto, CreateCategoryRequest, UpdateCategoryRequest};

/// Shared state for Categories API endpoints
#[derive(Clone)]
pub struct CategoriesApiState {
    pub database: Arc<SqliteService>,
}

/// Build Categories API routes
pub fn routes(database: Arc<SqliteService>) -> Router<()> {
    let state = CategoriesApiState { database };

    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route(
            "/{category_id}",
            get(get_category)
                .put(update_category)
                .delete(delete_category),
        )
        .route("/{category_id}/restore", post(restore_category))
        .with_state(state)
}

fn category_not_found() -> ApiError {
    ApiError::not_found("CATEGORY_NOT_FOUND", "Category not found")
}

/// List categories with live hymn counts
///
/// Filter keys: `term`, `name`, `deleted`. Page pagination only.
#[utoipa::path(
    get,
    path = "/api/v1/categories",
    tag = "categories",
    responses(
        (status = 200, description = "Paginated categories with hymn counts")
    )
)]
pub async fn list_categories(
    State(state): State<CategoriesApiState>,
    _auth: Auth,
    query: ListQuery,
) -> Result<Json<Paginated<CategoryDto>>, ApiError> {
    let page = category::list_categories(state.database.pool(), &query.filters, &query.params)
        .await
        .map_err(ApiError::from_paginate)?;

    Ok(Json(page.map(CategoryDto::from)))
}

/// Create a category
#[utoipa::path(
    post,
    path = "/api/v1/categories",
    tag = "categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created", body = CategoryDto),
        (status = 409, description = "Category name already exists")
    )
)]
pub async fn create_category(
    State(state): State<CategoriesApiState>,
    auth: Auth,
    ValidatedJson(body): ValidatedJson<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<CategoryDto>), ApiError> {
    auth.ctx.require_role(Role::Editor)?;
    let pool = state.database.pool();

    let row = category::create_category(pool, &body.name, body.description.as_deref())
        .await
        .map_err(ApiError::from_sqlite)?;

    audit::record_best_effort(
        pool,
        Some(&auth.ctx.user_id),
        "category.create",
        "category",
        Some(&row.id),
        Some(&serde_json::json!({ "name": row.name })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(CategoryDto::from(row))))
}

/// Get a live category
#[utoipa::path(
    get,
    path = "/api/v1/categories/{category_id}",
    tag = "categories",
    responses(
        (status = 200, description = "Category", body = CategoryDto),
        (status = 404, description = "Category not found")
    )
)]
pub async fn get_category(
    State(state): State<CategoriesApiState>,
    _auth: Auth,
    Path(category_id): Path<String>,
) -> Result<Json<CategoryDto>, ApiError> {
    let row = category::get_category(state.database.pool(), &category_id)
        .await
        .map_err(ApiError::from_sqlite)?
        .ok_or_else(category_not_found)?;

    Ok(Json(CategoryDto::from(row)))
}

/// Update a category; explicit `null` clears the description
#[utoipa::path(
    put,
    path = "/api/v1/categories/{category_id}",
    tag = "categories",
    request_body = UpdateCategoryRequest,
    responses(
        (status = 200, description = "Category updated", body = CategoryDto),
        (status = 404, description = "Category not found"),
        (status = 409, description = "Category name already exists")
    )
)]
pub async fn update_category(
    State(state): State<CategoriesApiState>,
    auth: Auth,
    Path(category_id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateCategoryRequest>,
) -> Result<Json<CategoryDto>, ApiError> {
    auth.ctx.require_role(Role::Editor)?;
    let pool = state.database.pool();

    let row = category::update_category(
        pool,
        &category_id,
        body.name.as_deref(),
        body.description.as_ref().map(|o| o.as_deref()),
    )
    .await
    .map_err(ApiError::from_sqlite)?
    .ok_or_else(category_not_found)?;

    audit::record_best_effort(
        pool,
        Some(&auth.ctx.user_id),
        "category.update",
        "category",
        Some(&category_id),
        None,
    )
    .await;

    Ok(Json(CategoryDto::from(row)))
}

/// Soft-delete a category; hymns keep their category assignment
#[utoipa::path(
    delete,
    path = "/api/v1/categories/{category_id}",
    tag = "categories",
    responses(
        (status = 204, description = "Category deleted"),
        (status = 404, description = "Category not found")
    )
)]
pub async fn delete_category(
    State(state): State<CategoriesApiState>,
    auth: Auth,
    Path(category_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    auth.ctx.require_role(Role::Editor)?;
    let pool = state.database.pool();

    let deleted = category::soft_delete_category(pool, &category_id)
        .await
        .map_err(ApiError::from_sqlite)?;
    if !deleted {
        return Err(category_not_found());
    }

    audit::record_best_effort(
        pool,
        Some(&auth.ctx.user_id),
        "category.delete",
        "category",
        Some(&category_id),
        None,
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

/// Restore a soft-deleted category
#[utoipa::path(
    post,
    path = "/api/v1/categories/{category_id}/restore",
    tag = "categories",
    responses(
        (status = 200, description = "Category restored", body = CategoryDto),
        (status = 404, description = "No deleted category with this id")
    )
)]
pub async fn restore_category(
    State(state): State<CategoriesApiState>,
    auth: Auth,
    Path(category_id): Path<String>,
) -> Result<Json<CategoryDto>, ApiError> {
    auth.ctx.require_role(Role::Editor)?;
    let pool = state.database.pool();

    let row = category::restore_category(pool, &category_id)
        .await
        .map_err(ApiError::from_sqlite)?
        .ok_or_else(category_not_found)?;

    audit::record_best_effort(
        pool,
        Some(&auth.ctx.user_id),
        "category.restore",
        "category",
        Some(&category_id),
        None,
    )
    .await;

    Ok(Json(CategoryDto::from(row)))
}
