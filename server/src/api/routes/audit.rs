//! Audit log API endpoint (admin only)

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::SqlitePool;
use utoipa::ToSchema;

use crate::api::auth::{Auth, Role};
use crate::api::types::{ApiError, ListQuery};
use crate::data::DataError;
use crate::data::query::{map_paginated, Paginated, RowMapper};
use crate::data::sqlite::SqliteService;
use crate::data::sqlite::repositories::{audit, user};
use crate::data::types::AuditLogRow;

/// Audit entry DTO for API responses
#[derive(Debug, Serialize, ToSchema)]
pub struct AuditLogDto {
    pub id: String,
    pub actor_id: Option<String>,
    pub actor_email: Option<String>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub detail: Option<Value>,
    pub created_at: DateTime<Utc>,
}

impl From<AuditLogRow> for AuditLogDto {
    fn from(row: AuditLogRow) -> Self {
        Self {
            id: row.id,
            actor_id: row.actor_id,
            actor_email: None,
            action: row.action,
            entity_type: row.entity_type,
            entity_id: row.entity_id,
            detail: row.detail.and_then(|d| serde_json::from_str(&d).ok()),
            created_at: DateTime::from_timestamp(row.created_at, 0).unwrap_or_else(Utc::now),
        }
    }
}

/// Resolves actor emails while mapping rows to DTOs. The accumulator caches
/// lookups, so an actor appearing on many rows costs one query.
struct ActorEmails<'a> {
    pool: &'a SqlitePool,
}

#[async_trait]
impl RowMapper<AuditLogRow> for ActorEmails<'_> {
    type Out = AuditLogDto;
    type Acc = BTreeMap<String, Option<String>>;

    async fn map(
        &self,
        row: &AuditLogRow,
        _window: &[AuditLogRow],
        mut acc: Self::Acc,
    ) -> Result<(Self::Out, Self::Acc), DataError> {
        let actor_email = match &row.actor_id {
            Some(id) => match acc.get(id) {
                Some(cached) => cached.clone(),
                None => {
                    let email = user::get_user(self.pool, id)
                        .await
                        .map_err(DataError::from)?
                        .map(|u| u.email);
                    acc.insert(id.clone(), email.clone());
                    email
                }
            },
            None => None,
        };
        let dto = AuditLogDto {
            actor_email,
            ..AuditLogDto::from(row.clone())
        };
        Ok((dto, acc))
    }
}

/// Shared state for the Audit API endpoint
#[derive(Clone)]
pub struct AuditApiState {
    pub database: Arc<SqliteService>,
}

/// Build Audit API routes
pub fn routes(database: Arc<SqliteService>) -> Router<()> {
    let state = AuditApiState { database };

    Router::new().route("/", get(list_audit_logs)).with_state(state)
}

/// List audit entries, newest first by default
///
/// Filter keys: `action`, `entity_type`, `entity_id`, `actor_id`, plus
/// `from`/`to` bounds on the entry timestamp.
#[utoipa::path(
    get,
    path = "/api/v1/audit",
    tag = "audit",
    responses(
        (status = 200, description = "Paginated audit entries"),
        (status = 403, description = "Requires the admin role")
    )
)]
pub async fn list_audit_logs(
    State(state): State<AuditApiState>,
    auth: Auth,
    query: ListQuery,
) -> Result<Json<Paginated<AuditLogDto>>, ApiError> {
    auth.ctx.require_role(Role::Admin)?;

    let pool = state.database.pool();
    let page = audit::list_audit_logs(pool, &query.filters, &query.params)
        .await
        .map_err(ApiError::from_paginate)?;

    let page = map_paginated(&ActorEmails { pool }, page)
        .await
        .map_err(ApiError::from_data)?;

    Ok(Json(page))
}
