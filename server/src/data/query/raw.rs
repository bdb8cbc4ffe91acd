//! Inline-literal predicate rendering and raw query pagination
//!
//! Some listings are hand-written SELECTs (joins, aggregates) that the
//! structured builder cannot produce. This module renders the same
//! [`Predicate`] trees to self-contained SQL fragments with values inlined
//! as quoted literals, and paginates the assembled statement by wrapping it
//! in a subquery. Text matching renders per [`RawDialect`]; the array and
//! jsonb operators follow Postgres conventions and only the subset the
//! active backend understands should reach it. Values that cannot be
//! rendered drop their clause, same as the parameterized builder.

use chrono::SecondsFormat;

use crate::data::query::paginate::{
    PageMeta, Paginated, PaginateError, Queryable, ListParams, SortKey,
};
use crate::data::query::infer::Scalar;
use crate::data::query::predicate::{CompareOp, CondValue, Condition, Predicate};
use crate::utils::sql::{escape_like_pattern, quote_literal};

/// Target dialect for inline fragments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawDialect {
    /// Case-insensitive matching via ILIKE
    Postgres,
    /// LIKE with an explicit backslash escape; case-insensitive for ASCII
    Sqlite,
}

impl RawDialect {
    fn like(self, col: &str, pattern: &str) -> String {
        let lit = quote_literal(pattern);
        match self {
            Self::Postgres => format!("{col} ILIKE {lit}"),
            Self::Sqlite => format!("{col} LIKE {lit} ESCAPE '\\'"),
        }
    }
}

/// Render a predicate to an inline-literal SQL fragment
pub fn render_predicate_raw(
    pred: &Predicate,
    qualifier: &str,
    dialect: RawDialect,
) -> Option<String> {
    match pred {
        Predicate::And(parts) => render_group(parts, " AND ", qualifier, dialect),
        Predicate::Or(parts) => render_group(parts, " OR ", qualifier, dialect),
        Predicate::Related { relation, inner } => {
            let inner_sql = render_predicate_raw(inner, &relation.table, dialect)?;
            Some(format!(
                "EXISTS (SELECT 1 FROM {rel} WHERE {rel}.{fk} = {base}.{lk} AND {inner_sql})",
                rel = relation.table,
                fk = relation.foreign_column,
                base = qualifier,
                lk = relation.local_column,
            ))
        }
        Predicate::Cond(c) => render_condition(c, qualifier, dialect),
    }
}

fn render_group(
    parts: &[Predicate],
    joiner: &str,
    qualifier: &str,
    dialect: RawDialect,
) -> Option<String> {
    let rendered: Vec<String> = parts
        .iter()
        .filter_map(|p| render_predicate_raw(p, qualifier, dialect))
        .collect();
    match rendered.len() {
        0 => None,
        1 => Some(rendered.into_iter().next().unwrap()),
        _ => Some(format!("({})", rendered.join(joiner))),
    }
}

fn render_condition(c: &Condition, qualifier: &str, dialect: RawDialect) -> Option<String> {
    let col = format!("{qualifier}.{}", c.column);

    match (&c.op, &c.value) {
        (CompareOp::Contains, CondValue::One(Scalar::Text(s))) => {
            Some(dialect.like(&col, &format!("%{}%", escape_like_pattern(s))))
        }
        (CompareOp::StartsWith, CondValue::One(Scalar::Text(s))) => {
            Some(dialect.like(&col, &format!("{}%", escape_like_pattern(s))))
        }
        (CompareOp::EndsWith, CondValue::One(Scalar::Text(s))) => {
            Some(dialect.like(&col, &format!("%{}", escape_like_pattern(s))))
        }
        (CompareOp::Equals, CondValue::One(Scalar::Null)) => Some(format!("{col} IS NULL")),
        (CompareOp::Not, CondValue::One(Scalar::Null)) => Some(format!("{col} IS NOT NULL")),
        (CompareOp::Equals, CondValue::One(s)) => Some(format!("{col} = {}", literal(s)?)),
        (CompareOp::Not, CondValue::One(s)) => Some(format!("{col} <> {}", literal(s)?)),
        (CompareOp::Gt, CondValue::One(s)) => Some(format!("{col} > {}", literal(s)?)),
        (CompareOp::Gte, CondValue::One(s)) => Some(format!("{col} >= {}", literal(s)?)),
        (CompareOp::Lt, CondValue::One(s)) => Some(format!("{col} < {}", literal(s)?)),
        (CompareOp::Lte, CondValue::One(s)) => Some(format!("{col} <= {}", literal(s)?)),
        (CompareOp::In, CondValue::Many(list)) => {
            if list.is_empty() {
                return Some("FALSE".to_string());
            }
            Some(format!("{col} IN ({})", literal_list(list)?))
        }
        (CompareOp::NotIn, CondValue::Many(list)) => {
            if list.is_empty() {
                return Some("TRUE".to_string());
            }
            Some(format!("{col} NOT IN ({})", literal_list(list)?))
        }
        (CompareOp::Has, CondValue::One(s)) => Some(format!(
            "{col} @> {}",
            array_literal(std::slice::from_ref(s))?
        )),
        (CompareOp::HasEvery, CondValue::Many(list)) => {
            if list.is_empty() {
                return Some("TRUE".to_string());
            }
            Some(format!("{col} @> {}", array_literal(list)?))
        }
        (CompareOp::HasSome, CondValue::Many(list)) => {
            if list.is_empty() {
                return Some("FALSE".to_string());
            }
            Some(format!("{col} && {}", array_literal(list)?))
        }
        (CompareOp::IsEmpty, CondValue::One(Scalar::Bool(true))) => {
            Some(format!("cardinality({col}) = 0"))
        }
        (CompareOp::IsEmpty, CondValue::One(Scalar::Bool(false))) => {
            Some(format!("cardinality({col}) <> 0"))
        }
        (CompareOp::JsonEquals, CondValue::One(s)) => {
            let path = pg_path(c.path.as_deref()?);
            Some(format!("{col} #>> {path} = {}", text_literal(s)?))
        }
        (CompareOp::JsonContains, CondValue::One(Scalar::Json(v))) => {
            Some(format!("{col} @> {}::jsonb", quote_literal(&v.to_string())))
        }
        (CompareOp::JsonContainedBy, CondValue::One(Scalar::Json(v))) => {
            Some(format!("{col} <@ {}::jsonb", quote_literal(&v.to_string())))
        }
        (CompareOp::JsonKeyExists, _) => {
            let path = c.path.as_deref()?;
            Some(format!("{col} ? {}", quote_literal(path)))
        }
        (CompareOp::JsonKeysAll, CondValue::Many(keys)) => {
            Some(format!("{col} ?& {}", key_array(keys)?))
        }
        (CompareOp::JsonKeysAny, CondValue::Many(keys)) => {
            Some(format!("{col} ?| {}", key_array(keys)?))
        }
        _ => None,
    }
}

fn literal(scalar: &Scalar) -> Option<String> {
    match scalar {
        Scalar::Text(s) => Some(quote_literal(s)),
        Scalar::Number(n) => Some(number_literal(*n)),
        Scalar::Bool(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Scalar::Date(dt) => Some(format!(
            "{}::timestamp",
            quote_literal(&dt.to_rfc3339_opts(SecondsFormat::Secs, true))
        )),
        Scalar::Json(v) => Some(format!("{}::jsonb", quote_literal(&v.to_string()))),
        Scalar::Null => None,
    }
}

/// Scalar rendered as a plain text literal, for `#>>` comparisons
fn text_literal(scalar: &Scalar) -> Option<String> {
    match scalar {
        Scalar::Text(s) => Some(quote_literal(s)),
        Scalar::Number(n) => Some(quote_literal(&trim_number(*n))),
        Scalar::Bool(b) => Some(quote_literal(if *b { "true" } else { "false" })),
        _ => None,
    }
}

fn literal_list(list: &[Scalar]) -> Option<String> {
    let parts: Vec<String> = list.iter().map(literal).collect::<Option<_>>()?;
    Some(parts.join(", "))
}

fn number_literal(n: f64) -> String {
    trim_number(n)
}

fn trim_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// Typed array literal; the element type comes from the first non-null member
pub fn array_literal(list: &[Scalar]) -> Option<String> {
    let suffix = match list.iter().find(|s| !matches!(s, Scalar::Null)) {
        Some(Scalar::Number(_)) => "numeric[]",
        Some(Scalar::Bool(_)) => "boolean[]",
        Some(Scalar::Date(_)) => "timestamp[]",
        Some(Scalar::Json(_)) => "jsonb[]",
        Some(Scalar::Text(_)) => "text[]",
        // All-null or empty arrays default to text
        _ => "text[]",
    };
    let elems: Vec<String> = list
        .iter()
        .map(|s| match s {
            Scalar::Null => Some("NULL".to_string()),
            Scalar::Date(dt) => Some(quote_literal(
                &dt.to_rfc3339_opts(SecondsFormat::Secs, true),
            )),
            Scalar::Json(v) => Some(quote_literal(&v.to_string())),
            other => literal(other),
        })
        .collect::<Option<_>>()?;
    Some(format!("ARRAY[{}]::{suffix}", elems.join(", ")))
}

fn key_array(keys: &[Scalar]) -> Option<String> {
    let elems: Vec<String> = keys
        .iter()
        .map(|k| match k {
            Scalar::Text(s) => Some(quote_literal(s)),
            _ => None,
        })
        .collect::<Option<_>>()?;
    if elems.is_empty() {
        return None;
    }
    Some(format!("ARRAY[{}]", elems.join(", ")))
}

/// Dotted key path to a Postgres path literal: `a.b` becomes `'{a,b}'`
fn pg_path(path: &str) -> String {
    let inner = path.trim_start_matches("$.").replace('.', ",");
    quote_literal(&format!("{{{inner}}}"))
}

/// Wrap a hand-written SELECT with filtering, ordering, and an optional window
pub fn wrap_query(
    base_sql: &str,
    where_frag: Option<&str>,
    order_by: &[SortKey],
    window: Option<(u32, u64)>,
) -> String {
    let mut sql = format!("SELECT * FROM ({base_sql}) AS q");
    if let Some(frag) = where_frag {
        sql.push_str(" WHERE ");
        sql.push_str(frag);
    }
    if !order_by.is_empty() {
        let keys: Vec<String> = order_by
            .iter()
            .map(|k| format!("q.{} {}", k.column, k.direction.as_sql()))
            .collect();
        sql.push_str(" ORDER BY ");
        sql.push_str(&keys.join(", "));
    }
    if let Some((limit, offset)) = window {
        sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}"));
    }
    sql
}

/// COUNT(*) wrapper over the same statement and filter
pub fn count_query(base_sql: &str, where_frag: Option<&str>) -> String {
    let mut sql = format!("SELECT COUNT(*) FROM ({base_sql}) AS q");
    if let Some(frag) = where_frag {
        sql.push_str(" WHERE ");
        sql.push_str(frag);
    }
    sql
}

/// Paginate a hand-written SELECT; page strategy only
pub async fn paginate_raw<Q: Queryable>(
    source: &Q,
    base_sql: &str,
    where_frag: Option<&str>,
    order_by: &[SortKey],
    params: &ListParams,
) -> Result<Paginated<Q::Row>, PaginateError> {
    if !params.is_paginated() {
        let sql = wrap_query(base_sql, where_frag, order_by, None);
        let items = source.execute_raw(&sql).await?;
        return Ok(Paginated::All { items });
    }

    let size = params.size();
    let page = params.page();
    let offset = (page as u64 - 1) * size as u64;

    let data_sql = wrap_query(base_sql, where_frag, order_by, Some((size, offset)));
    let count_sql = count_query(base_sql, where_frag);
    let (items, total_items) = tokio::try_join!(
        source.execute_raw(&data_sql),
        source.count_raw(&count_sql)
    )?;

    let meta = PageMeta {
        item_count: items.len() as u64,
        total_items,
        items_per_page: size,
        total_pages: total_items.div_ceil(size as u64),
        current_page: page,
    };
    Ok(Paginated::Pages { items, meta })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::query::infer::DataType;
    use crate::data::query::paginate::SortDirection;
    use crate::data::query::predicate::condition_for;
    use serde_json::json;

    fn raw(c: Condition) -> Option<String> {
        render_predicate_raw(&Predicate::Cond(c), "q", RawDialect::Postgres)
    }

    #[test]
    fn ilike_with_quote_doubling() {
        let c = condition_for("author", CompareOp::Contains, DataType::String, &json!("O'Brien"), &[])
            .unwrap();
        assert_eq!(raw(c).unwrap(), "q.author ILIKE '%O''Brien%'");
    }

    #[test]
    fn sqlite_like_with_explicit_escape() {
        let c = condition_for("name", CompareOp::Contains, DataType::String, &json!("100%"), &[])
            .unwrap();
        let sql = render_predicate_raw(&Predicate::Cond(c), "q", RawDialect::Sqlite).unwrap();
        assert_eq!(sql, "q.name LIKE '%100\\%%' ESCAPE '\\'");
    }

    #[test]
    fn numeric_array_literal() {
        let list = vec![Scalar::Number(1.0), Scalar::Number(2.5)];
        assert_eq!(array_literal(&list).unwrap(), "ARRAY[1, 2.5]::numeric[]");
    }

    #[test]
    fn boolean_array_literal() {
        let list = vec![Scalar::Bool(true), Scalar::Bool(false)];
        assert_eq!(
            array_literal(&list).unwrap(),
            "ARRAY[TRUE, FALSE]::boolean[]"
        );
    }

    #[test]
    fn empty_array_defaults_to_text() {
        assert_eq!(array_literal(&[]).unwrap(), "ARRAY[]::text[]");
    }

    #[test]
    fn leading_null_uses_first_non_null_type() {
        let list = vec![Scalar::Null, Scalar::Number(3.0)];
        assert_eq!(array_literal(&list).unwrap(), "ARRAY[NULL, 3]::numeric[]");
    }

    #[test]
    fn empty_in_renders_false() {
        let c = Condition {
            column: "n".to_string(),
            op: CompareOp::In,
            value: CondValue::Many(vec![]),
            path: None,
        };
        assert_eq!(raw(c).unwrap(), "FALSE");
    }

    #[test]
    fn date_comparison_casts_to_timestamp() {
        let c = condition_for("created_at", CompareOp::Gte, DataType::Date, &json!("2024-01-01"), &[])
            .unwrap();
        assert_eq!(
            raw(c).unwrap(),
            "q.created_at >= '2024-01-01T00:00:00Z'::timestamp"
        );
    }

    #[test]
    fn json_path_comparison() {
        let c = Condition {
            column: "detail".to_string(),
            op: CompareOp::JsonEquals,
            value: CondValue::One(Scalar::Text("register".to_string())),
            path: Some("action.kind".to_string()),
        };
        assert_eq!(
            raw(c).unwrap(),
            "q.detail #>> '{action,kind}' = 'register'"
        );
    }

    #[test]
    fn wrap_query_assembly() {
        let sql = wrap_query(
            "SELECT c.*, COUNT(h.id) AS hymn_count FROM categories c \
             LEFT JOIN hymns h ON h.category_id = c.id GROUP BY c.id",
            Some("q.name ILIKE '%gospel%'"),
            &[SortKey::new("name", SortDirection::Asc)],
            Some((10, 20)),
        );
        assert!(sql.starts_with("SELECT * FROM (SELECT c.*, "));
        assert!(sql.contains(") AS q WHERE q.name ILIKE '%gospel%'"));
        assert!(sql.ends_with("ORDER BY q.name ASC LIMIT 10 OFFSET 20"));
    }

    #[test]
    fn count_query_assembly() {
        let sql = count_query("SELECT * FROM hymns", Some("q.number > 5"));
        assert_eq!(
            sql,
            "SELECT COUNT(*) FROM (SELECT * FROM hymns) AS q WHERE q.number > 5"
        );
    }

    #[test]
    fn unrenderable_value_drops_clause() {
        let c = Condition {
            column: "n".to_string(),
            op: CompareOp::Equals,
            value: CondValue::One(Scalar::Null),
            path: None,
        };
        // IS NULL still renders; a null inside a list does not
        assert_eq!(raw(c).unwrap(), "q.n IS NULL");
        let c = Condition {
            column: "n".to_string(),
            op: CompareOp::In,
            value: CondValue::Many(vec![Scalar::Null]),
            path: None,
        };
        assert!(raw(c).is_none());
    }
}
