//! User repository for SQLite operations
//!
//! The first registered account becomes the admin; later registrations
//! default to member.

use std::sync::LazyLock;

use sqlx::SqlitePool;

use crate::core::constants::{ROLE_ADMIN, ROLE_EDITOR, ROLE_MEMBER};
use crate::data::query::{
    paginate, translate, FilterSchema, Filters, ListParams, Paginated, PaginateError,
};
use crate::data::sqlite::{SqliteCollection, SqliteError};
use crate::data::types::UserRow;

static FILTER_SCHEMA: LazyLock<FilterSchema> = LazyLock::new(|| {
    FilterSchema::builder()
        .entry("email|contains")
        .entry("display_name|contains")
        .enum_entry("role|equals", [ROLE_MEMBER, ROLE_EDITOR, ROLE_ADMIN])
        .build()
        .expect("user filter schema")
});

pub fn filter_schema() -> &'static FilterSchema {
    &FILTER_SCHEMA
}

pub fn collection(pool: &SqlitePool) -> SqliteCollection<UserRow> {
    SqliteCollection::new(pool.clone(), "users")
}

/// List users with filtering and pagination
pub async fn list_users(
    pool: &SqlitePool,
    filters: &Filters,
    params: &ListParams,
) -> Result<Paginated<UserRow>, PaginateError> {
    let pred = translate(filters, &FILTER_SCHEMA);
    paginate(&collection(pool), Some(&pred), params).await
}

/// Create a user with a generated CUID2 ID
///
/// The very first user gets the admin role.
pub async fn create_user(
    pool: &SqlitePool,
    email: &str,
    password_hash: &str,
    display_name: Option<&str>,
) -> Result<UserRow, SqliteError> {
    let id = cuid2::create_id();
    let now = chrono::Utc::now().timestamp();

    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    let role = if existing == 0 { ROLE_ADMIN } else { ROLE_MEMBER };

    let result = sqlx::query(
        "INSERT INTO users (id, email, password_hash, display_name, role, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(email)
    .bind(password_hash)
    .bind(display_name)
    .bind(role)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await;

    match result {
        Ok(_) => Ok(UserRow {
            id,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            display_name: display_name.map(String::from),
            role: role.to_string(),
            created_at: now,
            updated_at: now,
        }),
        Err(e) => {
            let err = SqliteError::from(e);
            if err.is_unique_violation() {
                return Err(SqliteError::Conflict(
                    "Email address is already registered".to_string(),
                ));
            }
            Err(err)
        }
    }
}

/// Get a user by ID
pub async fn get_user(pool: &SqlitePool, id: &str) -> Result<Option<UserRow>, SqliteError> {
    let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Get a user by email
pub async fn get_by_email(pool: &SqlitePool, email: &str) -> Result<Option<UserRow>, SqliteError> {
    let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Update a user's display name and/or role
pub async fn update_user(
    pool: &SqlitePool,
    id: &str,
    display_name: Option<Option<&str>>,
    role: Option<&str>,
) -> Result<Option<UserRow>, SqliteError> {
    let now = chrono::Utc::now().timestamp();
    let mut sets = vec!["updated_at = ?"];
    if display_name.is_some() {
        sets.push("display_name = ?");
    }
    if role.is_some() {
        sets.push("role = ?");
    }
    let sql = format!("UPDATE users SET {} WHERE id = ?", sets.join(", "));

    let mut query = sqlx::query(&sql).bind(now);
    if let Some(display_name) = display_name {
        query = query.bind(display_name);
    }
    if let Some(role) = role {
        query = query.bind(role);
    }
    let result = query.bind(id).execute(pool).await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get_user(pool, id).await
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
    async fn first_user_is_admin_rest_are_members() {
        let pool = setup_test_pool().await;
        let first = create_user(&pool, "a@example.com", "hash", None).await.unwrap();
        let second = create_user(&pool, "b@example.com", "hash", None).await.unwrap();
        assert_eq!(first.role, ROLE_ADMIN);
        assert_eq!(second.role, ROLE_MEMBER);
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let pool = setup_test_pool().await;
        create_user(&pool, "a@example.com", "hash", None).await.unwrap();
        let err = create_user(&pool, "a@example.com", "hash", None)
            .await
            .unwrap_err();
        assert!(matches!(err, SqliteError::Conflict(_)));
    }

    #[tokio::test]
    async fn lookup_by_email() {
        let pool = setup_test_pool().await;
        create_user(&pool, "a@example.com", "hash", Some("Alice")).await.unwrap();
        let user = get_by_email(&pool, "a@example.com").await.unwrap().unwrap();
        assert_eq!(user.display_name.as_deref(), Some("Alice"));
        assert!(get_by_email(&pool, "nope@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn role_update() {
        let pool = setup_test_pool().await;
        create_user(&pool, "a@example.com", "hash", None).await.unwrap();
        let user = create_user(&pool, "b@example.com", "hash", None).await.unwrap();

        let updated = update_user(&pool, &user.id, None, Some(ROLE_EDITOR))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.role, ROLE_EDITOR);
    }

    #[tokio::test]
    async fn absent_display_name_is_preserved_null_clears_it() {
        let pool = setup_test_pool().await;
        let user = create_user(&pool, "a@example.com", "hash", Some("Alice"))
            .await
            .unwrap();

        let updated = update_user(&pool, &user.id, None, None).await.unwrap().unwrap();
        assert_eq!(updated.display_name.as_deref(), Some("Alice"));

        let updated = update_user(&pool, &user.id, Some(None), None)
            .await
            .unwrap()
            .unwrap();
        assert!(updated.display_name.is_none());
    }

    #[tokio::test]
    async fn listing_filters_by_role() {
        let pool = setup_test_pool().await;
        let admin = create_user(&pool, "a@example.com", "hash", None).await.unwrap();
        create_user(&pool, "b@example.com", "hash", None).await.unwrap();

        let filters = Filters::new().with("role", json!("admin"));
        let page = list_users(&pool, &filters, &ListParams::default())
            .await
            .unwrap();
        assert_eq!(page.items().len(), 1);
        assert_eq!(page.items()[0].id, admin.id);
    }
}
