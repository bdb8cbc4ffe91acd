//! Shared API types
//!
//! Error responses, listing query parameters, and the mapping from
//! data-layer errors to HTTP statuses.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::{FromRequestParts, Query};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};

use crate::data::query::{
    Boolish, Filters, ListParams, PaginateError, PaginationType, SortDirection,
};

/// Maximum items per page for paginated endpoints
pub const MAX_PAGE_SIZE: u32 = 200;

/// Deserializer distinguishing an absent field from an explicit null
///
/// Used with `#[serde(default, deserialize_with = "double_option")]`:
/// missing stays `None`, `null` becomes `Some(None)` (clear the column),
/// and a value becomes `Some(Some(v))`.
pub fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    serde::Deserialize::deserialize(de).map(Some)
}

/// Standard API error response
#[derive(Debug)]
pub enum ApiError {
    BadRequest { code: String, message: String },
    NotFound { code: String, message: String },
    Unauthorized { code: String, message: String },
    Forbidden { code: String, message: String },
    NotAcceptable { code: String, message: String },
    Conflict { code: String, message: String },
    ServiceUnavailable { message: String },
    Internal { message: String },
}

impl ApiError {
    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFound {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn unauthorized(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unauthorized {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn forbidden(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Forbidden {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn conflict(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conflict {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn from_sqlite(e: crate::data::sqlite::SqliteError) -> Self {
        use crate::data::sqlite::SqliteError;
        match e {
            SqliteError::Conflict(message) => Self::Conflict {
                code: "CONFLICT".to_string(),
                message,
            },
            other => {
                tracing::error!(error = %other, "SQLite error");
                Self::Internal {
                    message: "Database operation failed".to_string(),
                }
            }
        }
    }

    pub fn from_data(e: crate::data::DataError) -> Self {
        tracing::error!(error = %e, "Data error");
        Self::Internal {
            message: "Database operation failed".to_string(),
        }
    }

    /// Invalid cursor tokens come back as 406; everything else is internal
    pub fn from_paginate(e: PaginateError) -> Self {
        match e {
            PaginateError::InvalidCursor => Self::NotAcceptable {
                code: "INVALID_CURSOR".to_string(),
                message: "Cursor token could not be decoded".to_string(),
            },
            PaginateError::Data(e) => Self::from_data(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, code, message) = match self {
            Self::BadRequest { code, message } => {
                (StatusCode::BAD_REQUEST, "bad_request", code, message)
            }
            Self::NotFound { code, message } => (StatusCode::NOT_FOUND, "not_found", code, message),
            Self::Unauthorized { code, message } => {
                (StatusCode::UNAUTHORIZED, "unauthorized", code, message)
            }
            Self::Forbidden { code, message } => {
                (StatusCode::FORBIDDEN, "forbidden", code, message)
            }
            Self::NotAcceptable { code, message } => {
                (StatusCode::NOT_ACCEPTABLE, "not_acceptable", code, message)
            }
            Self::Conflict { code, message } => (StatusCode::CONFLICT, "conflict", code, message),
            Self::ServiceUnavailable { message } => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                "SERVICE_UNAVAILABLE".to_string(),
                message,
            ),
            Self::Internal { message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "INTERNAL".to_string(),
                message,
            ),
        };
        (
            status,
            Json(serde_json::json!({
                "error": error_type,
                "code": code,
                "message": message
            })),
        )
            .into_response()
    }
}

/// Query parameters reserved for pagination and sorting; every other
/// parameter is an entity filter handed to the filter schema.
pub const RESERVED_KEYS: &[&str] = &[
    "size",
    "page",
    "cursor",
    "orderBy",
    "direction",
    "isPaginated",
    "paginationType",
];

/// Listing query extractor: pagination parameters plus free-form filters
///
/// Filter values arrive as strings; the query engine infers their types
/// against the endpoint's filter schema.
#[derive(Debug, Default)]
pub struct ListQuery {
    pub params: ListParams,
    pub filters: Filters,
}

impl ListQuery {
    fn from_pairs(pairs: BTreeMap<String, String>) -> Result<Self, ApiError> {
        let mut params = ListParams::default();
        let mut filters = Filters::new();

        for (key, value) in pairs {
            match key.as_str() {
                "size" => {
                    let size: u32 = value.parse().map_err(|_| {
                        ApiError::bad_request("INVALID_SIZE", "size must be a positive integer")
                    })?;
                    if size == 0 || size > MAX_PAGE_SIZE {
                        return Err(ApiError::bad_request(
                            "INVALID_SIZE",
                            format!("size must be between 1 and {MAX_PAGE_SIZE}"),
                        ));
                    }
                    params.size = Some(size);
                }
                "page" => {
                    let page: u32 = value.parse().map_err(|_| {
                        ApiError::bad_request("INVALID_PAGE", "page must be a positive integer")
                    })?;
                    if page == 0 {
                        return Err(ApiError::bad_request("INVALID_PAGE", "page must be >= 1"));
                    }
                    params.page = Some(page);
                }
                "cursor" => params.cursor = Some(value),
                "orderBy" => {
                    params.order_by = value
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect();
                }
                "direction" => {
                    params.direction = match value.to_ascii_lowercase().as_str() {
                        "asc" => SortDirection::Asc,
                        "desc" => SortDirection::Desc,
                        _ => {
                            return Err(ApiError::bad_request(
                                "INVALID_DIRECTION",
                                "direction must be 'asc' or 'desc'",
                            ));
                        }
                    };
                }
                "isPaginated" => params.is_paginated = Some(Boolish::Text(value)),
                "paginationType" => {
                    params.pagination_type = match value.to_ascii_lowercase().as_str() {
                        "page" => PaginationType::Page,
                        "cursor" => PaginationType::Cursor,
                        _ => {
                            return Err(ApiError::bad_request(
                                "INVALID_PAGINATION_TYPE",
                                "paginationType must be 'page' or 'cursor'",
                            ));
                        }
                    };
                }
                _ => filters.insert(key, serde_json::Value::String(value)),
            }
        }

        Ok(Self { params, filters })
    }
}

impl<S> FromRequestParts<S> for ListQuery
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(pairs) = Query::<BTreeMap<String, String>>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::bad_request("QUERY_PARSE_ERROR", e.body_text()))?;
        Self::from_pairs(pairs)
    }
}
