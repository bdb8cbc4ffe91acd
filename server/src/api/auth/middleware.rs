//! Authentication middleware and request extractor

use std::sync::Arc;

use axum::Json;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::data::sqlite::SqliteService;
use crate::data::sqlite::repositories::user;

use super::context::{AuthContext, Role};
use super::jwt::JwtError;
use super::manager::AuthManager;

/// Authentication failure response
#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    Expired,
    Invalid,
    UnknownUser,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (code, message) = match self {
            Self::MissingToken => ("MISSING_TOKEN", "Authorization header is required"),
            Self::Expired => ("SESSION_EXPIRED", "Session token has expired"),
            Self::Invalid => ("SESSION_INVALID", "Session token is invalid"),
            Self::UnknownUser => ("UNKNOWN_USER", "Session user no longer exists"),
        };
        (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "error": "unauthorized",
                "code": code,
                "message": message
            })),
        )
            .into_response()
    }
}

/// Shared state for the auth middleware
#[derive(Clone)]
pub struct AuthState {
    pub auth_manager: Arc<AuthManager>,
    pub database: Arc<SqliteService>,
}

/// Synthetic identity used when authentication is disabled
const LOCAL_USER_ID: &str = "local";

/// Require a valid session and inject [`AuthContext`] into the request
///
/// The role comes from the current database row, not the token, so role
/// changes take effect without reissuing sessions.
pub async fn require_auth(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    if !state.auth_manager.is_enabled() {
        req.extensions_mut().insert(AuthContext {
            user_id: LOCAL_USER_ID.to_string(),
            role: Role::Admin,
        });
        return Ok(next.run(req).await);
    }

    let token = bearer_token(&req).ok_or(AuthError::MissingToken)?;

    let claims = state
        .auth_manager
        .validate_session(token)
        .map_err(|e| match e {
            JwtError::Expired => AuthError::Expired,
            JwtError::InvalidSignature | JwtError::Invalid(_) => AuthError::Invalid,
        })?;

    let row = user::get_user(state.database.pool(), claims.user_id())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "User lookup failed during auth");
            AuthError::Invalid
        })?
        .ok_or(AuthError::UnknownUser)?;

    let role = row.role.parse().unwrap_or(Role::Member);
    req.extensions_mut().insert(AuthContext {
        user_id: row.id,
        role,
    });

    Ok(next.run(req).await)
}

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Extractor for the authentication context injected by [`require_auth`]
#[derive(Debug, Clone)]
pub struct Auth {
    pub ctx: AuthContext,
}

impl<S> FromRequestParts<S> for Auth
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .map(|ctx| Auth { ctx })
            .ok_or(AuthError::MissingToken)
    }
}
