//! Queryable implementation over a SQLite table
//!
//! [`SqliteCollection`] adapts one table to the pagination engine. Windowed
//! fetches compile to a single SELECT; anchored fetches use a row-value
//! keyset comparison against the anchor row, resolved in-query with scalar
//! subqueries, so no second round trip is needed. Anchored fetches require
//! every sort key to be NOT NULL and to share one direction (the engine
//! appends the id tie-break with the same direction).

use std::marker::PhantomData;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{FromRow, SqlitePool};

use crate::data::error::DataError;
use crate::data::query::{
    render_predicate, FindArgs, Predicate, Queryable, SortDirection, SortKey, SqlArg,
};

pub struct SqliteCollection<T> {
    pool: SqlitePool,
    table: &'static str,
    _row: PhantomData<fn() -> T>,
}

impl<T> SqliteCollection<T> {
    pub fn new(pool: SqlitePool, table: &'static str) -> Self {
        Self {
            pool,
            table,
            _row: PhantomData,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn where_clause(&self, where_: Option<&Predicate>) -> (Option<String>, Vec<SqlArg>) {
        match where_.and_then(|p| render_predicate(p, self.table)) {
            Some((frag, args)) => (Some(frag), args),
            None => (None, Vec::new()),
        }
    }
}

fn is_ident(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn order_clause(table: &str, keys: &[SortKey]) -> Option<String> {
    let parts: Vec<String> = keys
        .iter()
        .filter(|k| is_ident(&k.column))
        .map(|k| format!("{table}.{} {}", k.column, k.direction.as_sql()))
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

fn bind_all<'q, O>(
    mut query: sqlx::query::QueryAs<'q, sqlx::Sqlite, O, SqliteArguments<'q>>,
    args: Vec<SqlArg>,
) -> sqlx::query::QueryAs<'q, sqlx::Sqlite, O, SqliteArguments<'q>> {
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

fn bind_all_scalar<'q, O>(
    mut query: sqlx::query::QueryScalar<'q, sqlx::Sqlite, O, SqliteArguments<'q>>,
    args: Vec<SqlArg>,
) -> sqlx::query::QueryScalar<'q, sqlx::Sqlite, O, SqliteArguments<'q>> {
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

#[async_trait]
impl<T> Queryable for SqliteCollection<T>
where
    T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
{
    type Row = T;

    async fn count(&self, where_: Option<&Predicate>) -> Result<u64, DataError> {
        let (frag, args) = self.where_clause(where_);
        let mut sql = format!("SELECT COUNT(*) FROM {}", self.table);
        if let Some(frag) = &frag {
            sql.push_str(" WHERE ");
            sql.push_str(frag);
        }
        let count: i64 = bind_all_scalar(sqlx::query_scalar(&sql), args)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn find_many(&self, args: FindArgs<'_>) -> Result<Vec<T>, DataError> {
        let table = self.table;
        let (frag, mut binds) = self.where_clause(args.where_);
        let mut where_parts: Vec<String> = frag.into_iter().collect();

        let backward = args.take.is_some_and(|t| t < 0);
        let mut order = args.order_by.clone();
        if backward {
            for key in &mut order {
                key.direction = key.direction.reversed();
            }
        }

        if let Some(anchor) = args.cursor {
            let keys: Vec<&SortKey> = order.iter().filter(|k| is_ident(&k.column)).collect();
            if keys.is_empty() {
                return Ok(Vec::new());
            }
            let lhs: Vec<String> = keys
                .iter()
                .map(|k| format!("{table}.{}", k.column))
                .collect();
            let rhs: Vec<String> = keys
                .iter()
                .map(|k| {
                    if k.column == "id" {
                        "?".to_string()
                    } else {
                        format!("(SELECT {c} FROM {table} WHERE {table}.id = ?)", c = k.column)
                    }
                })
                .collect();
            for _ in &keys {
                binds.push(SqlArg::Text(anchor.to_string()));
            }
            // Inclusive of the anchor row; the engine excludes it via skip
            let cmp = match keys[0].direction {
                SortDirection::Asc => ">=",
                SortDirection::Desc => "<=",
            };
            where_parts.push(format!(
                "({}) {cmp} ({})",
                lhs.join(", "),
                rhs.join(", ")
            ));
        }

        let mut sql = format!("SELECT {table}.* FROM {table}");
        if !where_parts.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_parts.join(" AND "));
        }
        if let Some(order_sql) = order_clause(table, &order) {
            sql.push_str(" ORDER BY ");
            sql.push_str(&order_sql);
        }
        let limit: i64 = args.take.map_or(-1, |t| t.unsigned_abs() as i64);
        sql.push_str(&format!(" LIMIT {limit} OFFSET {}", args.skip));

        let mut rows: Vec<T> = bind_all(sqlx::query_as(&sql), binds)
            .fetch_all(&self.pool)
            .await?;
        if backward {
            rows.reverse();
        }
        Ok(rows)
    }

    async fn find_first(&self, where_: Option<&Predicate>) -> Result<Option<T>, DataError> {
        let (frag, args) = self.where_clause(where_);
        let mut sql = format!("SELECT {t}.* FROM {t}", t = self.table);
        if let Some(frag) = &frag {
            sql.push_str(" WHERE ");
            sql.push_str(frag);
        }
        sql.push_str(" LIMIT 1");
        let row = bind_all(sqlx::query_as(&sql), args)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn execute_raw(&self, sql: &str) -> Result<Vec<T>, DataError> {
        Ok(sqlx::query_as(sql).fetch_all(&self.pool).await?)
    }

    async fn count_raw(&self, sql: &str) -> Result<u64, DataError> {
        let count: i64 = sqlx::query_scalar(sql).fetch_one(&self.pool).await?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::query::{
        encode_cursor, paginate, DecodedCursor, ListParams, Paginated, PaginationType, Scalar,
    };
    use crate::data::types::HymnRow;

    async fn seeded_collection(n: i64) -> SqliteCollection<HymnRow> {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        sqlx::query(crate::data::sqlite::schema::SCHEMA)
            .execute(&pool)
            .await
            .unwrap();
        for i in 0..n {
            sqlx::query(
                "INSERT INTO hymns (id, number, title, author, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, 0, 0)",
            )
            .bind(format!("h{i:03}"))
            .bind(i + 1)
            .bind(format!("Hymn {i:03}"))
            .bind(if i % 2 == 0 { "Watts" } else { "Crosby" })
            .execute(&pool)
            .await
            .unwrap();
        }
        SqliteCollection::new(pool, "hymns")
    }

    fn by_number() -> Vec<SortKey> {
        vec![
            SortKey::new("number", SortDirection::Asc),
            SortKey::new("id", SortDirection::Asc),
        ]
    }

    fn ids(rows: &[HymnRow]) -> Vec<&str> {
        rows.iter().map(|r| r.id.as_str()).collect()
    }

    #[tokio::test]
    async fn count_with_predicate() {
        let coll = seeded_collection(6).await;
        assert_eq!(coll.count(None).await.unwrap(), 6);
        let pred = Predicate::equals("author", Scalar::Text("Watts".to_string()));
        assert_eq!(coll.count(Some(&pred)).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn windowed_fetch_with_skip_and_take() {
        let coll = seeded_collection(10).await;
        let rows = coll
            .find_many(FindArgs {
                where_: None,
                order_by: by_number(),
                skip: 4,
                take: Some(3),
                cursor: None,
            })
            .await
            .unwrap();
        assert_eq!(ids(&rows), vec!["h004", "h005", "h006"]);
    }

    #[tokio::test]
    async fn anchored_fetch_forward_is_inclusive() {
        let coll = seeded_collection(10).await;
        let rows = coll
            .find_many(FindArgs {
                where_: None,
                order_by: by_number(),
                skip: 1,
                take: Some(3),
                cursor: Some("h004"),
            })
            .await
            .unwrap();
        // Inclusive anchor excluded by skip=1
        assert_eq!(ids(&rows), vec!["h005", "h006", "h007"]);
    }

    #[tokio::test]
    async fn anchored_fetch_backward_returns_forward_order() {
        let coll = seeded_collection(10).await;
        let rows = coll
            .find_many(FindArgs {
                where_: None,
                order_by: by_number(),
                skip: 1,
                take: Some(-3),
                cursor: Some("h005"),
            })
            .await
            .unwrap();
        assert_eq!(ids(&rows), vec!["h002", "h003", "h004"]);
    }

    #[tokio::test]
    async fn negative_take_without_anchor_is_the_tail() {
        let coll = seeded_collection(5).await;
        let rows = coll
            .find_many(FindArgs {
                where_: None,
                order_by: by_number(),
                skip: 0,
                take: Some(-2),
                cursor: None,
            })
            .await
            .unwrap();
        assert_eq!(ids(&rows), vec!["h003", "h004"]);
    }

    #[tokio::test]
    async fn missing_anchor_yields_no_rows() {
        let coll = seeded_collection(5).await;
        let rows = coll
            .find_many(FindArgs {
                where_: None,
                order_by: by_number(),
                skip: 1,
                take: Some(3),
                cursor: Some("nope"),
            })
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn raw_queries_round_trip() {
        let coll = seeded_collection(4).await;
        let rows = coll
            .execute_raw("SELECT * FROM hymns WHERE number > 2 ORDER BY number")
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        let count = coll
            .count_raw("SELECT COUNT(*) FROM hymns WHERE number > 2")
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn page_pagination_end_to_end() {
        let coll = seeded_collection(25).await;
        let params = ListParams {
            size: Some(10),
            page: Some(2),
            order_by: vec!["number".to_string()],
            direction: SortDirection::Asc,
            ..Default::default()
        };
        match paginate(&coll, None, &params).await.unwrap() {
            Paginated::Pages { items, meta } => {
                assert_eq!(items.len(), 10);
                assert_eq!(items[0].id, "h010");
                assert_eq!(meta.total_items, 25);
                assert_eq!(meta.total_pages, 3);
            }
            other => panic!("expected Pages, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn cursor_pagination_end_to_end() {
        let coll = seeded_collection(5).await;
        let params = ListParams {
            size: Some(2),
            pagination_type: PaginationType::Cursor,
            order_by: vec!["number".to_string()],
            direction: SortDirection::Asc,
            ..Default::default()
        };

        let Paginated::Cursors { edges, cursors, total_count } =
            paginate(&coll, None, &params).await.unwrap()
        else {
            panic!("expected Cursors");
        };
        assert_eq!(ids(&edges), vec!["h000", "h001"]);
        assert_eq!(total_count, 5);
        assert!(cursors.has_next && !cursors.has_previous);

        let next = ListParams {
            cursor: cursors.next.clone(),
            ..params.clone()
        };
        let Paginated::Cursors { edges, cursors, .. } =
            paginate(&coll, None, &next).await.unwrap()
        else {
            panic!("expected Cursors");
        };
        assert_eq!(ids(&edges), vec!["h002", "h003"]);
        assert!(cursors.has_next && cursors.has_previous);

        let last = ListParams {
            cursor: Some(encode_cursor(&DecodedCursor::last_page())),
            ..params.clone()
        };
        let Paginated::Cursors { edges, cursors, .. } =
            paginate(&coll, None, &last).await.unwrap()
        else {
            panic!("expected Cursors");
        };
        assert_eq!(ids(&edges), vec!["h004"]);
        assert!(!cursors.has_next && cursors.has_previous);
    }

    #[tokio::test]
    async fn filtered_pagination_applies_predicate_to_both_queries() {
        let coll = seeded_collection(10).await;
        let pred = Predicate::equals("author", Scalar::Text("Watts".to_string()));
        let params = ListParams {
            size: Some(3),
            order_by: vec!["number".to_string()],
            direction: SortDirection::Asc,
            ..Default::default()
        };
        match paginate(&coll, Some(&pred), &params).await.unwrap() {
            Paginated::Pages { items, meta } => {
                assert_eq!(meta.total_items, 5);
                assert!(items.iter().all(|h| h.author.as_deref() == Some("Watts")));
            }
            other => panic!("expected Pages, got {other:?}"),
        }
    }
}
