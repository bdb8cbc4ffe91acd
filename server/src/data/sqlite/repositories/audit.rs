//! Audit log repository for SQLite operations
//!
//! Append-only. A failed audit write never fails the mutation that produced
//! it; callers use [`record_best_effort`] on the hot path.

use std::sync::LazyLock;

use serde_json::Value;
use sqlx::SqlitePool;

use crate::data::query::{
    paginate, translate, DataType, FilterSchema, Filters, ListParams, Paginated, PaginateError,
};
use crate::data::sqlite::{SqliteCollection, SqliteError};
use crate::data::types::AuditLogRow;

static FILTER_SCHEMA: LazyLock<FilterSchema> = LazyLock::new(|| {
    FilterSchema::builder()
        .entry("action|equals")
        .entry("entity_type|equals")
        .entry("actor_id|equals")
        .entry("entity_id|equals")
        .aliased_entry("from", "created_at|gte", DataType::Date)
        .aliased_entry("to", "created_at|lte", DataType::Date)
        .build()
        .expect("audit filter schema")
});

pub fn filter_schema() -> &'static FilterSchema {
    &FILTER_SCHEMA
}

pub fn collection(pool: &SqlitePool) -> SqliteCollection<AuditLogRow> {
    SqliteCollection::new(pool.clone(), "audit_logs")
}

/// List audit entries, newest first unless the request orders otherwise
pub async fn list_audit_logs(
    pool: &SqlitePool,
    filters: &Filters,
    params: &ListParams,
) -> Result<Paginated<AuditLogRow>, PaginateError> {
    let pred = translate(filters, &FILTER_SCHEMA);
    let params = if params.order_by.is_empty() {
        ListParams {
            order_by: vec!["created_at".to_string()],
            ..params.clone()
        }
    } else {
        params.clone()
    };
    paginate(&collection(pool), Some(&pred), &params).await
}

/// Append an audit entry
pub async fn record(
    pool: &SqlitePool,
    actor_id: Option<&str>,
    action: &str,
    entity_type: &str,
    entity_id: Option<&str>,
    detail: Option<&Value>,
) -> Result<AuditLogRow, SqliteError> {
    let id = cuid2::create_id();
    let now = chrono::Utc::now().timestamp();
    let detail_json = detail.map(|v| v.to_string());

    sqlx::query(
        "INSERT INTO audit_logs (id, actor_id, action, entity_type, entity_id, detail, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(actor_id)
    .bind(action)
    .bind(entity_type)
    .bind(entity_id)
    .bind(&detail_json)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(AuditLogRow {
        id,
        actor_id: actor_id.map(String::from),
        action: action.to_string(),
        entity_type: entity_type.to_string(),
        entity_id: entity_id.map(String::from),
        detail: detail_json,
        created_at: now,
    })
}

/// Append an audit entry, logging instead of propagating failures
pub async fn record_best_effort(
    pool: &SqlitePool,
    actor_id: Option<&str>,
    action: &str,
    entity_type: &str,
    entity_id: Option<&str>,
    detail: Option<&Value>,
) {
    if let Err(e) = record(pool, actor_id, action, entity_type, entity_id, detail).await {
        tracing::warn!(action, entity_type, error = %e, "Audit write failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn setup_test_pool() -> SqlitePool {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        sqlx::query(crate::data::sqlite::schema::SCHEMA)
            .execute(&pool)
            .await
            .unwrap();
        pool
    }

    #[tokio::test]
    async fn record_and_list_newest_first() {
        let pool = setup_test_pool().await;
        record(&pool, None, "create", "hymn", Some("h1"), None).await.unwrap();
        record(&pool, None, "delete", "hymn", Some("h1"), Some(&json!({"soft": true})))
            .await
            .unwrap();

        let page = list_audit_logs(&pool, &Filters::new(), &ListParams::default())
            .await
            .unwrap();
        assert_eq!(page.items().len(), 2);
    }

    #[tokio::test]
    async fn filter_by_action() {
        let pool = setup_test_pool().await;
        record(&pool, Some("u1"), "create", "hymn", Some("h1"), None).await.unwrap();
        record(&pool, Some("u1"), "update", "hymn", Some("h1"), None).await.unwrap();

        let filters = Filters::new().with("action", json!("create"));
        let page = list_audit_logs(&pool, &filters, &ListParams::default())
            .await
            .unwrap();
        assert_eq!(page.items().len(), 1);
        assert_eq!(page.items()[0].action, "create");
    }

    #[tokio::test]
    async fn detail_round_trips_as_json_text() {
        let pool = setup_test_pool().await;
        let entry = record(
            &pool,
            None,
            "update",
            "category",
            Some("c1"),
            Some(&json!({"name": {"from": "Old", "to": "New"}})),
        )
        .await
        .unwrap();

        let parsed: Value = serde_json::from_str(entry.detail.as_deref().unwrap()).unwrap();
        assert_eq!(parsed["name"]["to"], "New");
    }
}
