//! Category repository for SQLite operations
//!
//! The listing is a hand-written aggregate (live hymn count per category),
//! so it goes through raw pagination: the statement is wrapped in a
//! subquery, filtered with an inline fragment, and page-sliced.

use std::sync::LazyLock;

use sqlx::SqlitePool;

use crate::data::query::infer::to_scalar;
use crate::data::query::{
    paginate_raw, render_predicate_raw, translate, CompareOp, CondValue, Condition, DataType,
    FilterSchema, Filters, ListParams, Paginated, PaginateError, Predicate, RawDialect, Scalar,
    SortKey,
};
use crate::data::sqlite::{SqliteCollection, SqliteError};
use crate::data::types::{CategoryRow, CategoryWithCountRow};

/// Base statement for the listing; aliased columns become the subquery's
/// output columns, so the filter fragment addresses them as `q.*`
const LIST_SQL: &str = "SELECT c.id, c.name, c.description, c.created_at, c.updated_at, \
     c.deleted_at, COUNT(h.id) AS hymn_count \
     FROM categories c \
     LEFT JOIN hymns h ON h.category_id = c.id AND h.deleted_at IS NULL \
     GROUP BY c.id";

static FILTER_SCHEMA: LazyLock<FilterSchema> = LazyLock::new(|| {
    FilterSchema::builder()
        .typed_entry("name|contains", DataType::String)
        .build()
        .expect("category filter schema")
});

/// Live/deleted scope from the `deleted` filter. Query-string values arrive
/// as JSON strings, so the flag goes through scalar coercion.
fn deleted_scope(filters: &Filters) -> Predicate {
    let deleted = filters
        .get("deleted")
        .and_then(|v| to_scalar(v, DataType::Boolean, &[]))
        .is_some_and(|s| matches!(s, Scalar::Bool(true)));
    Predicate::Cond(Condition {
        column: "deleted_at".to_string(),
        op: if deleted { CompareOp::Not } else { CompareOp::Equals },
        value: CondValue::One(Scalar::Null),
        path: None,
    })
}

/// Build the inline filter fragment for the wrapped listing statement
pub fn list_fragment(filters: &Filters) -> Option<String> {
    let pred = Predicate::And(vec![
        translate(filters, &FILTER_SCHEMA),
        deleted_scope(filters),
    ]);
    render_predicate_raw(&pred, "q", RawDialect::Sqlite)
}

/// List categories with live hymn counts; page strategy only
pub async fn list_categories(
    pool: &SqlitePool,
    filters: &Filters,
    params: &ListParams,
) -> Result<Paginated<CategoryWithCountRow>, PaginateError> {
    let source: SqliteCollection<CategoryWithCountRow> =
        SqliteCollection::new(pool.clone(), "categories");
    let fragment = list_fragment(filters);
    let order: Vec<SortKey> = params.sort_keys();
    let order = if order.is_empty() {
        vec![SortKey::new("name", params.direction)]
    } else {
        order
    };
    paginate_raw(&source, LIST_SQL, fragment.as_deref(), &order, params).await
}

/// Create a category with a generated CUID2 ID
pub async fn create_category(
    pool: &SqlitePool,
    name: &str,
    description: Option<&str>,
) -> Result<CategoryRow, SqliteError> {
    let id = cuid2::create_id();
    let now = chrono::Utc::now().timestamp();

    let result = sqlx::query(
        "INSERT INTO categories (id, name, description, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(name)
    .bind(description)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await;

    match result {
        Ok(_) => Ok(CategoryRow {
            id,
            name: name.to_string(),
            description: description.map(String::from),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }),
        Err(e) => {
            let err = SqliteError::from(e);
            if err.is_unique_violation() {
                return Err(SqliteError::Conflict(format!(
                    "Category '{name}' already exists"
                )));
            }
            Err(err)
        }
    }
}

/// Get a live category by ID
pub async fn get_category(pool: &SqlitePool, id: &str) -> Result<Option<CategoryRow>, SqliteError> {
    let row = sqlx::query_as::<_, CategoryRow>(
        "SELECT * FROM categories WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Update a live category
pub async fn update_category(
    pool: &SqlitePool,
    id: &str,
    name: Option<&str>,
    description: Option<Option<&str>>,
) -> Result<Option<CategoryRow>, SqliteError> {
    let now = chrono::Utc::now().timestamp();
    let mut sets = vec!["updated_at = ?"];
    if name.is_some() {
        sets.push("name = ?");
    }
    if description.is_some() {
        sets.push("description = ?");
    }
    let sql = format!(
        "UPDATE categories SET {} WHERE id = ? AND deleted_at IS NULL",
        sets.join(", ")
    );

    let mut query = sqlx::query(&sql).bind(now);
    if let Some(name) = name {
        query = query.bind(name);
    }
    if let Some(description) = description {
        query = query.bind(description);
    }
    let result = query.bind(id).execute(pool).await;

    match result {
        Ok(r) if r.rows_affected() == 0 => Ok(None),
        Ok(_) => get_category(pool, id).await,
        Err(e) => {
            let err = SqliteError::from(e);
            if err.is_unique_violation() {
                return Err(SqliteError::Conflict(
                    "Category name already exists".to_string(),
                ));
            }
            Err(err)
        }
    }
}

/// Soft-delete a live category; hymns keep their category_id
pub async fn soft_delete_category(pool: &SqlitePool, id: &str) -> Result<bool, SqliteError> {
    let now = chrono::Utc::now().timestamp();
    let result = sqlx::query(
        "UPDATE categories SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(now)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Restore a soft-deleted category
pub async fn restore_category(
    pool: &SqlitePool,
    id: &str,
) -> Result<Option<CategoryRow>, SqliteError> {
    let now = chrono::Utc::now().timestamp();
    let result = sqlx::query(
        "UPDATE categories SET deleted_at = NULL, updated_at = ? WHERE id = ? AND deleted_at IS NOT NULL",
    )
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get_category(pool, id).await
}
