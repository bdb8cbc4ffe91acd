//! Authentication API endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::api::auth::AuthManager;
use crate::api::extractors::ValidatedJson;
use crate::api::routes::users::types::UserDto;
use crate::api::types::ApiError;
use crate::data::sqlite::SqliteService;
use crate::data::sqlite::repositories::{audit, user};
use crate::utils::crypto::{hash_password, verify_password};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(email(message = "Email address is invalid"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(max = 100, message = "Display name must be at most 100 characters"))]
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "Email address is invalid"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password cannot be empty"))]
    pub password: String,
}

/// A session token and the account it belongs to
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub token: String,
    pub user: UserDto,
}

/// Auth routes state
#[derive(Clone)]
pub struct AuthRoutesState {
    pub auth_manager: Arc<AuthManager>,
    pub database: Arc<SqliteService>,
}

/// Create auth routes (mounted without the auth middleware)
pub fn routes(auth_manager: Arc<AuthManager>, database: Arc<SqliteService>) -> Router {
    let state = AuthRoutesState {
        auth_manager,
        database,
    };

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .with_state(state)
}

/// Register a new account
///
/// The first account on a fresh database becomes the admin.
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created", body = SessionResponse),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register(
    State(state): State<AuthRoutesState>,
    ValidatedJson(body): ValidatedJson<RegisterRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let pool = state.database.pool();
    let password_hash = hash_password(&body.password);

    let user = user::create_user(
        pool,
        &body.email,
        &password_hash,
        body.display_name.as_deref(),
    )
    .await
    .map_err(ApiError::from_sqlite)?;

    let token = state
        .auth_manager
        .create_session(&user.id, &user.role)
        .map_err(|e| {
            tracing::error!(error = %e, "Session creation failed");
            ApiError::internal("Session creation failed")
        })?;

    audit::record_best_effort(pool, Some(&user.id), "user.register", "user", Some(&user.id), None)
        .await;

    Ok(Json(SessionResponse {
        token,
        user: UserDto::from(user),
    }))
}

/// Log in with email and password
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued", body = SessionResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AuthRoutesState>,
    ValidatedJson(body): ValidatedJson<LoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let pool = state.database.pool();

    // One error for both unknown email and bad password
    let invalid = || ApiError::unauthorized("INVALID_CREDENTIALS", "Invalid email or password");

    let user = user::get_by_email(pool, &body.email)
        .await
        .map_err(ApiError::from_sqlite)?
        .ok_or_else(invalid)?;

    let ok = verify_password(&body.password, &user.password_hash).map_err(|e| {
        tracing::error!(error = %e, "Stored password hash is malformed");
        ApiError::internal("Credential check failed")
    })?;
    if !ok {
        return Err(invalid());
    }

    let token = state
        .auth_manager
        .create_session(&user.id, &user.role)
        .map_err(|e| {
            tracing::error!(error = %e, "Session creation failed");
            ApiError::internal("Session creation failed")
        })?;

    Ok(Json(SessionResponse {
        token,
        user: UserDto::from(user),
    }))
}
