//! User API endpoints

pub mod types;

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, put};
use axum::{Json, Router};

use crate::api::auth::{Auth, Role};
use crate::api::extractors::ValidatedJson;
use crate::api::types::{ApiError, ListQuery};
use crate::data::query::Paginated;
use crate::data::sqlite::SqliteService;
use crate::data::sqlite::repositories::{audit, user};

use types::{UpdateProfileRequest, UpdateUserRoleRequest, UserDto};

/// Shared state for Users API endpoints
#[derive(Clone)]
pub struct UsersApiState {
    pub database: Arc<SqliteService>,
}

/// Build Users API routes
pub fn routes(database: Arc<SqliteService>) -> Router<()> {
    let state = UsersApiState { database };

    Router::new()
        .route("/", get(list_users))
        .route("/me", get(get_current_user).put(update_current_user))
        .route("/{user_id}/role", put(update_user_role))
        .with_state(state)
}

/// List user accounts (admin only)
#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "users",
    responses(
        (status = 200, description = "Paginated users"),
        (status = 403, description = "Requires the admin role")
    )
)]
pub async fn list_users(
    State(state): State<UsersApiState>,
    auth: Auth,
    query: ListQuery,
) -> Result<Json<Paginated<UserDto>>, ApiError> {
    auth.ctx.require_role(Role::Admin)?;

    let page = user::list_users(state.database.pool(), &query.filters, &query.params)
        .await
        .map_err(ApiError::from_paginate)?;

    Ok(Json(page.map(UserDto::from)))
}

/// Get the caller's profile
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    tag = "users",
    responses(
        (status = 200, description = "User profile", body = UserDto),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_current_user(
    State(state): State<UsersApiState>,
    auth: Auth,
) -> Result<Json<UserDto>, ApiError> {
    let row = user::get_user(state.database.pool(), &auth.ctx.user_id)
        .await
        .map_err(ApiError::from_sqlite)?
        .ok_or_else(|| ApiError::not_found("USER_NOT_FOUND", "User not found"))?;

    Ok(Json(UserDto::from(row)))
}

/// Update the caller's profile
#[utoipa::path(
    put,
    path = "/api/v1/users/me",
    tag = "users",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserDto),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_current_user(
    State(state): State<UsersApiState>,
    auth: Auth,
    ValidatedJson(body): ValidatedJson<UpdateProfileRequest>,
) -> Result<Json<UserDto>, ApiError> {
    let row = user::update_user(
        state.database.pool(),
        &auth.ctx.user_id,
        body.display_name.as_ref().map(|v| v.as_deref()),
        None,
    )
    .await
    .map_err(ApiError::from_sqlite)?
    .ok_or_else(|| ApiError::not_found("USER_NOT_FOUND", "User not found"))?;

    Ok(Json(UserDto::from(row)))
}

/// Change a user's role (admin only)
#[utoipa::path(
    put,
    path = "/api/v1/users/{user_id}/role",
    tag = "users",
    request_body = UpdateUserRoleRequest,
    responses(
        (status = 200, description = "Role updated", body = UserDto),
        (status = 400, description = "Unknown role"),
        (status = 403, description = "Requires the admin role"),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_user_role(
    State(state): State<UsersApiState>,
    auth: Auth,
    Path(user_id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateUserRoleRequest>,
) -> Result<Json<UserDto>, ApiError> {
    auth.ctx.require_role(Role::Admin)?;

    let role: Role = body
        .role
        .parse()
        .map_err(|_| ApiError::bad_request("INVALID_ROLE", format!("Unknown role: {}", body.role)))?;

    if user_id == auth.ctx.user_id && role != Role::Admin {
        return Err(ApiError::bad_request(
            "SELF_DEMOTION",
            "Admins cannot demote themselves",
        ));
    }

    let pool = state.database.pool();
    let row = user::update_user(pool, &user_id, None, Some(role.as_str()))
        .await
        .map_err(ApiError::from_sqlite)?
        .ok_or_else(|| ApiError::not_found("USER_NOT_FOUND", "User not found"))?;

    audit::record_best_effort(
        pool,
        Some(&auth.ctx.user_id),
        "user.role_change",
        "user",
        Some(&user_id),
        Some(&serde_json::json!({ "role": role.as_str() })),
    )
    .await;

    Ok(Json(UserDto::from(row)))
}
