//! Hymn repository for SQLite operations
//!
//! Listing goes through the filter schema and pagination engine; mutations
//! are scoped with a rendered predicate so they only ever touch live rows.

use std::sync::LazyLock;

use sqlx::SqlitePool;

use crate::data::query::{
    paginate, render_predicate, translate, DataType, FilterSchema, Filters, FunctionField,
    ListParams, Paginated, PaginateError, Predicate, Scalar, SqlArg,
};
use crate::data::sqlite::{SqliteCollection, SqliteError};
use crate::data::types::HymnRow;

/// Musical keys a hymn can be tagged with
pub const MUSICAL_KEYS: &[&str] = &[
    "C", "G", "D", "A", "E", "B", "F#", "F", "Bb", "Eb", "Ab", "Db",
];

static FILTER_SCHEMA: LazyLock<FilterSchema> = LazyLock::new(|| {
    FilterSchema::builder()
        .relation("category", "categories", "category_id", "id")
        .relation("verses", "verses", "id", "hymn_id")
        .entry("title|contains")
        .entry("author|contains")
        .typed_entry("number|equals", DataType::Number)
        .entry("category.name|contains")
        .entry("verses:content|contains")
        .function(deleted_field())
        .function(musical_key_field())
        .build()
        .expect("hymn filter schema")
});

/// `deleted=true` shows only soft-deleted rows, `deleted=false` only live ones
fn deleted_field() -> FunctionField {
    FunctionField::new("deleted", |scalar, _| match scalar {
        Scalar::Bool(deleted) => Some(Predicate::is_null("deleted_at", !deleted)),
        _ => None,
    })
    .with_data_type(DataType::Boolean)
}

/// Exact key match; the enum values also catch term searches like "Eb"
fn musical_key_field() -> FunctionField {
    FunctionField::new("key", |scalar, _| match scalar {
        Scalar::Text(key) => Some(Predicate::equals("musical_key", Scalar::Text(key.clone()))),
        _ => None,
    })
    .with_enum_values(MUSICAL_KEYS.iter().copied())
}

pub fn filter_schema() -> &'static FilterSchema {
    &FILTER_SCHEMA
}

pub fn collection(pool: &SqlitePool) -> SqliteCollection<HymnRow> {
    SqliteCollection::new(pool.clone(), "hymns")
}

/// Build the listing predicate: user filters plus default live-rows scope
pub fn list_predicate(filters: &Filters) -> Predicate {
    let mut pred = translate(filters, &FILTER_SCHEMA);
    if filters.get("deleted").is_none() {
        if let Predicate::And(parts) = &mut pred {
            parts.push(Predicate::is_null("deleted_at", true));
        }
    }
    pred
}

/// List hymns with filtering and pagination
pub async fn list_hymns(
    pool: &SqlitePool,
    filters: &Filters,
    params: &ListParams,
) -> Result<Paginated<HymnRow>, PaginateError> {
    let pred = list_predicate(filters);
    paginate(&collection(pool), Some(&pred), params).await
}

/// Create a hymn with a generated CUID2 ID
pub async fn create_hymn(
    pool: &SqlitePool,
    number: i64,
    title: &str,
    author: Option<&str>,
    musical_key: Option<&str>,
    category_id: Option<&str>,
) -> Result<HymnRow, SqliteError> {
    let id = cuid2::create_id();
    let now = chrono::Utc::now().timestamp();

    let result = sqlx::query(
        "INSERT INTO hymns (id, number, title, author, musical_key, category_id, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(number)
    .bind(title)
    .bind(author)
    .bind(musical_key)
    .bind(category_id)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await;

    match result {
        Ok(_) => Ok(HymnRow {
            id,
            number,
            title: title.to_string(),
            author: author.map(String::from),
            musical_key: musical_key.map(String::from),
            category_id: category_id.map(String::from),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }),
        Err(e) => {
            let err = SqliteError::from(e);
            if err.is_unique_violation() {
                return Err(SqliteError::Conflict(format!(
                    "Hymn number {number} is already in use"
                )));
            }
            Err(err)
        }
    }
}

/// Get a live hymn by ID
pub async fn get_hymn(pool: &SqlitePool, id: &str) -> Result<Option<HymnRow>, SqliteError> {
    let row = sqlx::query_as::<_, HymnRow>(
        "SELECT * FROM hymns WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Scope for mutations: one row by id, live (or deleted, for restore)
fn mutation_scope(id: &str, deleted: bool) -> Predicate {
    Predicate::And(vec![
        Predicate::equals("id", Scalar::Text(id.to_string())),
        Predicate::is_null("deleted_at", !deleted),
    ])
}

fn scope_clause(id: &str, deleted: bool) -> Result<(String, Vec<SqlArg>), SqliteError> {
    render_predicate(&mutation_scope(id, deleted), "hymns")
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

/// Update a live hymn's fields
#[allow(clippy::too_many_arguments)]
pub async fn update_hymn(
    pool: &SqlitePool,
    id: &str,
    number: Option<i64>,
    title: Option<&str>,
    author: Option<Option<&str>>,
    musical_key: Option<Option<&str>>,
    category_id: Option<Option<&str>>,
) -> Result<Option<HymnRow>, SqliteError> {
    let mut sets = vec!["updated_at = ?".to_string()];
    let now = chrono::Utc::now().timestamp();
    let mut binds: Vec<SqlArg> = vec![SqlArg::Int(now)];

    if let Some(number) = number {
        sets.push("number = ?".to_string());
        binds.push(SqlArg::Int(number));
    }
    if let Some(title) = title {
        sets.push("title = ?".to_string());
        binds.push(SqlArg::Text(title.to_string()));
    }
    if let Some(author) = author {
        sets.push("author = ?".to_string());
        binds.push(author.map_or(SqlArg::Null, |v| SqlArg::Text(v.to_string())));
    }
    if let Some(key) = musical_key {
        sets.push("musical_key = ?".to_string());
        binds.push(key.map_or(SqlArg::Null, |v| SqlArg::Text(v.to_string())));
    }
    if let Some(category) = category_id {
        sets.push("category_id = ?".to_string());
        binds.push(category.map_or(SqlArg::Null, |v| SqlArg::Text(v.to_string())));
    }

    let (scope_sql, scope_args) = scope_clause(id, false)?;
    binds.extend(scope_args);

    let sql = format!("UPDATE hymns SET {} WHERE {scope_sql}", sets.join(", "));
    let result = bind_args(sqlx::query(&sql), binds).execute(pool).await;
    match result {
        Ok(r) if r.rows_affected() == 0 => Ok(None),
        Ok(_) => get_hymn(pool, id).await,
        Err(e) => {
            let err = SqliteError::from(e);
            if err.is_unique_violation() {
                return Err(SqliteError::Conflict(
                    "Hymn number is already in use".to_string(),
                ));
            }
            Err(err)
        }
    }
}

/// Soft-delete a live hymn; returns false when no live row matched
pub async fn soft_delete_hymn(pool: &SqlitePool, id: &str) -> Result<bool, SqliteError> {
    let (scope_sql, scope_args) = scope_clause(id, false)?;
    let now = chrono::Utc::now().timestamp();
    let sql = format!("UPDATE hymns SET deleted_at = ?, updated_at = ? WHERE {scope_sql}");
    let mut binds = vec![SqlArg::Int(now), SqlArg::Int(now)];
    binds.extend(scope_args);
    let result = bind_args(sqlx::query(&sql), binds).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

/// Restore a soft-deleted hymn
pub async fn restore_hymn(pool: &SqlitePool, id: &str) -> Result<Option<HymnRow>, SqliteError> {
    let (scope_sql, scope_args) = scope_clause(id, true)?;
    let now = chrono::Utc::now().timestamp();
    let sql = format!("UPDATE hymns SET deleted_at = NULL, updated_at = ? WHERE {scope_sql}");
    let mut binds = vec![SqlArg::Int(now)];
    binds.extend(scope_args);
    let result = bind_args(sqlx::query(&sql), binds).execute(pool).await;
    match result {
        Ok(r) if r.rows_affected() == 0 => Ok(None),
        Ok(_) => get_hymn(pool, id).await,
        Err(e) => {
            let err = SqliteError::from(e);
            if err.is_unique_violation() {
                // A live hymn has taken this number in the meantime
                return Err(SqliteError::Conflict(
                    "Hymn number is already in use".to_string(),
                ));
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::query::SortDirection;
    use serde_json::json;

    async fn setup_test_pool() -> SqlitePool {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        sqlx::query(crate::data::sqlite::schema::SCHEMA)
            .execute(&pool)
            .await
            .unwrap();
        pool
    }

    #[test]
    fn scope_clause_renders_for_both_lifecycles() {
        let (sql, args) = scope_clause("h1", false).unwrap();
        assert_eq!(sql, "(hymns.id = ? AND hymns.deleted_at IS NULL)");
        assert_eq!(args.len(), 1);

        let (sql, _) = scope_clause("h1", true).unwrap();
        assert_eq!(sql, "(hymns.id = ? AND hymns.deleted_at IS NOT NULL)");
    }

    async fn seed_category(pool: &SqlitePool, id: &str, name: &str) {
        sqlx::query(
            "INSERT INTO categories (id, name, created_at, updated_at) VALUES (?, ?, 0, 0)",
        )
        .bind(id)
        .bind(name)
        .execute(pool)
        .await
        .unwrap();
    }

    async fn seed_verse(pool: &SqlitePool, hymn_id: &str, number: i64, content: &str) {
        sqlx::query(
            "INSERT INTO verses (id, hymn_id, number, content, created_at, updated_at) \
             VALUES (?, ?, ?, ?, 0, 0)",
        )
        .bind(cuid2::create_id())
        .bind(hymn_id)
        .bind(number)
        .bind(content)
        .execute(pool)
        .await
        .unwrap();
    }

    fn asc_by_number() -> ListParams {
        ListParams {
            order_by: vec!["number".to_string()],
            direction: SortDirection::Asc,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_and_get() {
        let pool = setup_test_pool().await;
        let hymn = create_hymn(&pool, 1, "Amazing Grace", Some("John Newton"), Some("G"), None)
            .await
            .unwrap();
        assert!(!hymn.id.is_empty());

        let fetched = get_hymn(&pool, &hymn.id).await.unwrap().unwrap();
        assert_eq!(fetched.title, "Amazing Grace");
        assert_eq!(fetched.musical_key.as_deref(), Some("G"));
    }

    #[tokio::test]
    async fn duplicate_number_conflicts() {
        let pool = setup_test_pool().await;
        create_hymn(&pool, 1, "First", None, None, None).await.unwrap();
        let err = create_hymn(&pool, 1, "Second", None, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SqliteError::Conflict(_)));
    }

    #[tokio::test]
    async fn soft_delete_hides_and_restore_revives() {
        let pool = setup_test_pool().await;
        let hymn = create_hymn(&pool, 1, "Abide", None, None, None).await.unwrap();

        assert!(soft_delete_hymn(&pool, &hymn.id).await.unwrap());
        assert!(get_hymn(&pool, &hymn.id).await.unwrap().is_none());
        // Already deleted, second delete is a no-op
        assert!(!soft_delete_hymn(&pool, &hymn.id).await.unwrap());

        let restored = restore_hymn(&pool, &hymn.id).await.unwrap().unwrap();
        assert!(restored.deleted_at.is_none());
    }

    #[tokio::test]
    async fn restore_conflicts_when_number_was_retaken() {
        let pool = setup_test_pool().await;
        let old = create_hymn(&pool, 7, "Old", None, None, None).await.unwrap();
        soft_delete_hymn(&pool, &old.id).await.unwrap();
        create_hymn(&pool, 7, "New", None, None, None).await.unwrap();

        let err = restore_hymn(&pool, &old.id).await.unwrap_err();
        assert!(matches!(err, SqliteError::Conflict(_)));
    }

    #[tokio::test]
    async fn update_is_scoped_to_live_rows() {
        let pool = setup_test_pool().await;
        let hymn = create_hymn(&pool, 1, "Title", None, None, None).await.unwrap();
        soft_delete_hymn(&pool, &hymn.id).await.unwrap();

        let updated = update_hymn(&pool, &hymn.id, None, Some("Renamed"), None, None, None)
            .await
            .unwrap();
        assert!(updated.is_none());
    }

    #[tokio::test]
    async fn listing_excludes_deleted_by_default() {
        let pool = setup_test_pool().await;
        let a = create_hymn(&pool, 1, "Live", None, None, None).await.unwrap();
        let b = create_hymn(&pool, 2, "Gone", None, None, None).await.unwrap();
        soft_delete_hymn(&pool, &b.id).await.unwrap();

        let page = list_hymns(&pool, &Filters::new(), &asc_by_number())
            .await
            .unwrap();
        assert_eq!(page.items().len(), 1);
        assert_eq!(page.items()[0].id, a.id);

        // deleted=true flips the visibility
        let filters = Filters::new().with("deleted", json!(true));
        let page = list_hymns(&pool, &filters, &asc_by_number()).await.unwrap();
        assert_eq!(page.items()[0].id, b.id);
    }

    #[tokio::test]
    async fn term_search_spans_relations() {
        let pool = setup_test_pool().await;
        seed_category(&pool, "cat1", "Gospel Classics").await;
        let by_title = create_hymn(&pool, 1, "Amazing Grace", None, None, None)
            .await
            .unwrap();
        let by_category = create_hymn(&pool, 2, "Other", None, None, Some("cat1"))
            .await
            .unwrap();
        let by_verse = create_hymn(&pool, 3, "Third", None, None, None).await.unwrap();
        seed_verse(&pool, &by_verse.id, 1, "grace that taught my heart to fear").await;
        create_hymn(&pool, 4, "Unrelated", None, None, None).await.unwrap();

        let filters = Filters::new().with("term", json!("grace"));
        let page = list_hymns(&pool, &filters, &asc_by_number()).await.unwrap();
        let ids: Vec<&str> = page.items().iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&by_title.id.as_str()));
        assert!(ids.contains(&by_verse.id.as_str()));
        assert!(!ids.contains(&by_category.id.as_str()));

        let filters = Filters::new().with("term", json!("gospel"));
        let page = list_hymns(&pool, &filters, &asc_by_number()).await.unwrap();
        assert_eq!(page.items()[0].id, by_category.id);
    }

    #[tokio::test]
    async fn term_matching_musical_key() {
        let pool = setup_test_pool().await;
        let in_eb = create_hymn(&pool, 1, "First", None, Some("Eb"), None).await.unwrap();
        create_hymn(&pool, 2, "Second", None, Some("C"), None).await.unwrap();

        let filters = Filters::new().with("term", json!("eb"));
        let page = list_hymns(&pool, &filters, &asc_by_number()).await.unwrap();
        assert_eq!(page.items().len(), 1);
        assert_eq!(page.items()[0].id, in_eb.id);
    }

    #[tokio::test]
    async fn keyed_filter_on_relation() {
        let pool = setup_test_pool().await;
        seed_category(&pool, "cat1", "Advent").await;
        seed_category(&pool, "cat2", "Easter").await;
        let advent = create_hymn(&pool, 1, "One", None, None, Some("cat1")).await.unwrap();
        create_hymn(&pool, 2, "Two", None, None, Some("cat2")).await.unwrap();

        let filters = Filters::new().with("category.name", json!("advent"));
        let page = list_hymns(&pool, &filters, &asc_by_number()).await.unwrap();
        assert_eq!(page.items().len(), 1);
        assert_eq!(page.items()[0].id, advent.id);
    }
}
