//! Verse repository for SQLite operations
//!
//! Verses belong to a hymn and are hard-deleted with it (FK cascade).
//! Verse numbers are unique within a hymn.

use sqlx::SqlitePool;

use crate::data::sqlite::SqliteError;
use crate::data::types::VerseRow;

/// Create a verse with a generated CUID2 ID
pub async fn create_verse(
    pool: &SqlitePool,
    hymn_id: &str,
    number: i64,
    content: &str,
) -> Result<VerseRow, SqliteError> {
    let id = cuid2::create_id();
    let now = chrono::Utc::now().timestamp();

    let result = sqlx::query(
        "INSERT INTO verses (id, hymn_id, number, content, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(hymn_id)
    .bind(number)
    .bind(content)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await;

    match result {
        Ok(_) => Ok(VerseRow {
            id,
            hymn_id: hymn_id.to_string(),
            number,
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        }),
        Err(e) => {
            let err = SqliteError::from(e);
            if err.is_unique_violation() {
                return Err(SqliteError::Conflict(format!(
                    "Verse {number} already exists for this hymn"
                )));
            }
            Err(err)
        }
    }
}

/// Get a verse by ID, scoped to its hymn
pub async fn get_verse(
    pool: &SqlitePool,
    hymn_id: &str,
    id: &str,
) -> Result<Option<VerseRow>, SqliteError> {
    let row = sqlx::query_as::<_, VerseRow>(
        "SELECT * FROM verses WHERE id = ? AND hymn_id = ?",
    )
    .bind(id)
    .bind(hymn_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// All verses of a hymn in verse-number order
pub async fn list_verses(pool: &SqlitePool, hymn_id: &str) -> Result<Vec<VerseRow>, SqliteError> {
    let rows = sqlx::query_as::<_, VerseRow>(
        "SELECT * FROM verses WHERE hymn_id = ? ORDER BY number ASC",
    )
    .bind(hymn_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Update a verse's number and/or content
pub async fn update_verse(
    pool: &SqlitePool,
    hymn_id: &str,
    id: &str,
    number: Option<i64>,
    content: Option<&str>,
) -> Result<Option<VerseRow>, SqliteError> {
    let now = chrono::Utc::now().timestamp();
    let mut sets = vec!["updated_at = ?"];
    if number.is_some() {
        sets.push("number = ?");
    }
    if content.is_some() {
        sets.push("content = ?");
    }
    let sql = format!(
        "UPDATE verses SET {} WHERE id = ? AND hymn_id = ?",
        sets.join(", ")
    );

    let mut query = sqlx::query(&sql).bind(now);
    if let Some(number) = number {
        query = query.bind(number);
    }
    if let Some(content) = content {
        query = query.bind(content);
    }
    let result = query.bind(id).bind(hymn_id).execute(pool).await;

    match result {
        Ok(r) if r.rows_affected() == 0 => Ok(None),
        Ok(_) => get_verse(pool, hymn_id, id).await,
        Err(e) => {
            let err = SqliteError::from(e);
            if err.is_unique_violation() {
                return Err(SqliteError::Conflict(
                    "Verse number already exists for this hymn".to_string(),
                ));
            }
            Err(err)
        }
    }
}

/// Delete a verse; returns false when no row matched
pub async fn delete_verse(
    pool: &SqlitePool,
    hymn_id: &str,
    id: &str,
) -> Result<bool, SqliteError> {
    let result = sqlx::query("DELETE FROM verses WHERE id = ? AND hymn_id = ?")
        .bind(id)
        .bind(hymn_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sqlite::repositories::hymn::create_hymn;

    async fn setup() -> (SqlitePool, String) {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        sqlx::query(crate::data::sqlite::schema::SCHEMA)
            .execute(&pool)
            .await
            .unwrap();
        let hymn = create_hymn(&pool, 1, "Test", None, None, None).await.unwrap();
        (pool, hymn.id)
    }

    #[tokio::test]
    async fn create_and_list_in_order() {
        let (pool, hymn_id) = setup().await;
        create_verse(&pool, &hymn_id, 2, "second").await.unwrap();
        create_verse(&pool, &hymn_id, 1, "first").await.unwrap();

        let verses = list_verses(&pool, &hymn_id).await.unwrap();
        assert_eq!(verses.len(), 2);
        assert_eq!(verses[0].content, "first");
        assert_eq!(verses[1].content, "second");
    }

    #[tokio::test]
    async fn duplicate_number_conflicts() {
        let (pool, hymn_id) = setup().await;
        create_verse(&pool, &hymn_id, 1, "first").await.unwrap();
        let err = create_verse(&pool, &hymn_id, 1, "dup").await.unwrap_err();
        assert!(matches!(err, SqliteError::Conflict(_)));
    }

    #[tokio::test]
    async fn update_and_delete() {
        let (pool, hymn_id) = setup().await;
        let verse = create_verse(&pool, &hymn_id, 1, "original").await.unwrap();

        let updated = update_verse(&pool, &hymn_id, &verse.id, None, Some("edited"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.content, "edited");

        assert!(delete_verse(&pool, &hymn_id, &verse.id).await.unwrap());
        assert!(get_verse(&pool, &hymn_id, &verse.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn scoped_to_owning_hymn() {
        let (pool, hymn_id) = setup().await;
        let other = create_hymn(&pool, 2, "Other", None, None, None).await.unwrap();
        let verse = create_verse(&pool, &hymn_id, 1, "mine").await.unwrap();

        assert!(get_verse(&pool, &other.id, &verse.id).await.unwrap().is_none());
        assert!(!delete_verse(&pool, &other.id, &verse.id).await.unwrap());
    }

    #[tokio::test]
    async fn verses_cascade_with_hymn_row_delete() {
        let (pool, hymn_id) = setup().await;
        create_verse(&pool, &hymn_id, 1, "v").await.unwrap();

        sqlx::query("DELETE FROM hymns WHERE id = ?")
            .bind(&hymn_id)
            .execute(&pool)
            .await
            .unwrap();
        assert!(list_verses(&pool, &hymn_id).await.unwrap().is_empty());
    }
}
