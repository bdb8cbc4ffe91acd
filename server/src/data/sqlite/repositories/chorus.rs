//! Chorus repository for SQLite operations
//!
//! Standalone refrains with the same soft-delete lifecycle as hymns.

use std::sync::LazyLock;

use sqlx::SqlitePool;

use super::hymn::MUSICAL_KEYS;
use crate::data::query::{
    paginate, render_predicate, translate, DataType, FilterSchema, Filters, FunctionField,
    ListParams, Paginated, PaginateError, Predicate, Scalar, SqlArg,
};
use crate::data::sqlite::{SqliteCollection, SqliteError};
use crate::data::types::ChorusRow;

static FILTER_SCHEMA: LazyLock<FilterSchema> = LazyLock::new(|| {
    FilterSchema::builder()
        .entry("title|contains")
        .entry("content|contains")
        .function(
            FunctionField::new("deleted", |scalar, _| match scalar {
                Scalar::Bool(deleted) => Some(Predicate::is_null("deleted_at", !deleted)),
                _ => None,
            })
            .with_data_type(DataType::Boolean),
        )
        .function(
            FunctionField::new("key", |scalar, _| match scalar {
                Scalar::Text(key) => {
                    Some(Predicate::equals("musical_key", Scalar::Text(key.clone())))
                }
                _ => None,
            })
            .with_enum_values(MUSICAL_KEYS.iter().copied()),
        )
        .build()
        .expect("chorus filter schema")
});

pub fn filter_schema() -> &'static FilterSchema {
    &FILTER_SCHEMA
}

pub fn collection(pool: &SqlitePool) -> SqliteCollection<ChorusRow> {
    SqliteCollection::new(pool.clone(), "choruses")
}

pub fn list_predicate(filters: &Filters) -> Predicate {
    let mut pred = translate(filters, &FILTER_SCHEMA);
    if filters.get("deleted").is_none() {
        if let Predicate::And(parts) = &mut pred {
            parts.push(Predicate::is_null("deleted_at", true));
        }
    }
    pred
}

/// List choruses with filtering and pagination
pub async fn list_choruses(
    pool: &SqlitePool,
    filters: &Filters,
    params: &ListParams,
) -> Result<Paginated<ChorusRow>, PaginateError> {
    let pred = list_predicate(filters);
    paginate(&collection(pool), Some(&pred), params).await
}

/// Create a chorus with a generated CUID2 ID
pub async fn create_chorus(
    pool: &SqlitePool,
    title: &str,
    content: &str,
    musical_key: Option<&str>,
) -> Result<ChorusRow, SqliteError> {
    let id = cuid2::create_id();
    let now = chrono::Utc::now().timestamp();

    sqlx::query(
        "INSERT INTO choruses (id, title, content, musical_key, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(title)
    .bind(content)
    .bind(musical_key)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(ChorusRow {
        id,
        title: title.to_string(),
        content: content.to_string(),
        musical_key: musical_key.map(String::from),
        created_at: now,
        updated_at: now,
        deleted_at: None,
    })
}

/// Get a live chorus by ID
pub async fn get_chorus(pool: &SqlitePool, id: &str) -> Result<Option<ChorusRow>, SqliteError> {
    let row = sqlx::query_as::<_, ChorusRow>(
        "SELECT * FROM choruses WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

fn mutation_scope(id: &str, deleted: bool) -> Predicate {
    Predicate::And(vec![
        Predicate::equals("id", Scalar::Text(id.to_string())),
        Predicate::is_null("deleted_at", !deleted),
    ])
}

fn scope_clause(id: &str, deleted: bool) -> Result<(String, Vec<SqlArg>), SqliteError> {
    render_predicate(&mutation_scope(id, deleted), "choruses")
        .ok_or_else(|| SqliteError::QueryBuild("mutation scope rendered empty".to_string()))
}

fn bind_args<'q>(
    mut query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    args: Vec<SqlArg>,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    for arg in args {
        query = match arg {
            SqlArg::Text(s) => query.bind(s),
            SqlArg::Int(i) => query.bind(i),
            SqlArg::Real(r) => query.bind(r),
            SqlArg::Null => query.bind(Option::<String>::None),
        };
    }
    query
}

/// Update a live chorus's fields
pub async fn update_chorus(
    pool: &SqlitePool,
    id: &str,
    title: Option<&str>,
    content: Option<&str>,
    musical_key: Option<Option<&str>>,
) -> Result<Option<ChorusRow>, SqliteError> {
    let now = chrono::Utc::now().timestamp();
    let mut sets = vec!["updated_at = ?".to_string()];
    let mut binds: Vec<SqlArg> = vec![SqlArg::Int(now)];

    if let Some(title) = title {
        sets.push("title = ?".to_string());
        binds.push(SqlArg::Text(title.to_string()));
    }
    if let Some(content) = content {
        sets.push("content = ?".to_string());
        binds.push(SqlArg::Text(content.to_string()));
    }
    if let Some(key) = musical_key {
        sets.push("musical_key = ?".to_string());
        binds.push(key.map_or(SqlArg::Null, |v| SqlArg::Text(v.to_string())));
    }

    let (scope_sql, scope_args) = scope_clause(id, false)?;
    binds.extend(scope_args);

    let sql = format!("UPDATE choruses SET {} WHERE {scope_sql}", sets.join(", "));
    let result = bind_args(sqlx::query(&sql), binds).execute(pool).await?;
    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get_chorus(pool, id).await
}

/// Soft-delete a live chorus
pub async fn soft_delete_chorus(pool: &SqlitePool, id: &str) -> Result<bool, SqliteError> {
    let (scope_sql, scope_args) = scope_clause(id, false)?;
    let now = chrono::Utc::now().timestamp();
    let sql = format!("UPDATE choruses SET deleted_at = ?, updated_at = ? WHERE {scope_sql}");
    let mut binds = vec![SqlArg::Int(now), SqlArg::Int(now)];
    binds.extend(scope_args);
    let result = bind_args(sqlx::query(&sql), binds).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

/// Restore a soft-deleted chorus
pub async fn restore_chorus(pool: &SqlitePool, id: &str) -> Result<Option<ChorusRow>, SqliteError> {
    let (scope_sql, scope_args) = scope_clause(id, true)?;
    let now = chrono::Utc::now().timestamp();
    let sql = format!("UPDATE choruses SET deleted_at = NULL, updated_at = ? WHERE {scope_sql}");
    let mut binds = vec![SqlArg::Int(now)];
    binds.extend(scope_args);
    let result = bind_args(sqlx::query(&sql), binds).execute(pool).await?;
    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get_chorus(pool, id).await
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
    async fn create_get_update() {
        let pool = setup_test_pool().await;
        let chorus = create_chorus(&pool, "Hallelujah", "Hallelujah, praise the Lamb", Some("D"))
            .await
            .unwrap();

        let fetched = get_chorus(&pool, &chorus.id).await.unwrap().unwrap();
        assert_eq!(fetched.title, "Hallelujah");

        let updated = update_chorus(&pool, &chorus.id, None, None, Some(None))
            .await
            .unwrap()
            .unwrap();
        assert!(updated.musical_key.is_none());
    }

    #[tokio::test]
    async fn soft_delete_lifecycle() {
        let pool = setup_test_pool().await;
        let chorus = create_chorus(&pool, "T", "C", None).await.unwrap();

        assert!(soft_delete_chorus(&pool, &chorus.id).await.unwrap());
        assert!(get_chorus(&pool, &chorus.id).await.unwrap().is_none());

        let restored = restore_chorus(&pool, &chorus.id).await.unwrap().unwrap();
        assert!(restored.deleted_at.is_none());
    }

    #[tokio::test]
    async fn term_search_over_title_and_content() {
        let pool = setup_test_pool().await;
        let by_content = create_chorus(&pool, "First", "wonderful grace of Jesus", None)
            .await
            .unwrap();
        create_chorus(&pool, "Second", "other words", None).await.unwrap();

        let filters = Filters::new().with("term", json!("grace"));
        let page = list_choruses(&pool, &filters, &ListParams::default())
            .await
            .unwrap();
        assert_eq!(page.items().len(), 1);
        assert_eq!(page.items()[0].id, by_content.id);
    }
}
