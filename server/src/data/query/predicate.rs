//! Structured filter predicates and their parameterized SQL rendering
//!
//! Translation produces a [`Predicate`] tree instead of SQL strings: comparisons
//! carry a typed value, relation scopes wrap an inner predicate, and `And`/`Or`
//! group children. The tree renders to a parameterized WHERE fragment here, or
//! to an inline-literal fragment in the raw builder. Unsupported combinations
//! render to `None` and the clause is dropped (list filtering is permissive);
//! mutation scoping must therefore only use combinations this module supports.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::data::query::infer::{self, DataType, Scalar};
use crate::utils::sql::escape_like_pattern;

/// A named relation between the base table and a related table
///
/// `local_column` lives on the base table, `foreign_column` on the related
/// one. Both one-to-one and one-to-many shapes render as an EXISTS subquery,
/// so the same struct covers both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub name: String,
    pub table: String,
    pub local_column: String,
    pub foreign_column: String,
}

/// Comparison operator for a single condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Contains,
    StartsWith,
    EndsWith,
    Equals,
    Not,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
    Has,
    HasSome,
    HasEvery,
    IsEmpty,
    JsonEquals,
    JsonContains,
    JsonContainedBy,
    JsonKeyExists,
    JsonKeysAll,
    JsonKeysAny,
}

impl CompareOp {
    /// Text-search operators also participate in term matching
    pub fn is_text_search(self) -> bool {
        matches!(self, Self::Contains | Self::StartsWith | Self::EndsWith)
    }

    pub fn is_ordering(self) -> bool {
        matches!(self, Self::Gt | Self::Gte | Self::Lt | Self::Lte)
    }
}

impl FromStr for CompareOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "contains" => Self::Contains,
            "starts_with" => Self::StartsWith,
            "ends_with" => Self::EndsWith,
            "equals" => Self::Equals,
            "not" => Self::Not,
            "gt" => Self::Gt,
            "gte" => Self::Gte,
            "lt" => Self::Lt,
            "lte" => Self::Lte,
            "in" => Self::In,
            "not_in" => Self::NotIn,
            "has" => Self::Has,
            "has_some" => Self::HasSome,
            "has_every" => Self::HasEvery,
            "is_empty" => Self::IsEmpty,
            "json_equals" => Self::JsonEquals,
            "json_contains" => Self::JsonContains,
            "json_contained_by" => Self::JsonContainedBy,
            "json_key_exists" => Self::JsonKeyExists,
            "json_keys_all" => Self::JsonKeysAll,
            "json_keys_any" => Self::JsonKeysAny,
            other => return Err(format!("unknown filter operator: {other}")),
        })
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Contains => "contains",
            Self::StartsWith => "starts_with",
            Self::EndsWith => "ends_with",
            Self::Equals => "equals",
            Self::Not => "not",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::Has => "has",
            Self::HasSome => "has_some",
            Self::HasEvery => "has_every",
            Self::IsEmpty => "is_empty",
            Self::JsonEquals => "json_equals",
            Self::JsonContains => "json_contains",
            Self::JsonContainedBy => "json_contained_by",
            Self::JsonKeyExists => "json_key_exists",
            Self::JsonKeysAll => "json_keys_all",
            Self::JsonKeysAny => "json_keys_any",
        };
        f.write_str(s)
    }
}

/// The comparand of a condition: one scalar or a list of scalars
#[derive(Debug, Clone, PartialEq)]
pub enum CondValue {
    One(Scalar),
    Many(Vec<Scalar>),
}

/// A single column comparison
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: String,
    pub op: CompareOp,
    pub value: CondValue,
    /// JSON key path for the `json_*` operators
    pub path: Option<String>,
}

/// A boolean filter tree over one base table and its relations
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Cond(Condition),
    Related {
        relation: Relation,
        inner: Box<Predicate>,
    },
}

impl Predicate {
    pub fn cond(condition: Condition) -> Self {
        Self::Cond(condition)
    }

    /// An always-true predicate (renders to nothing)
    pub fn empty() -> Self {
        Self::And(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::And(parts) | Self::Or(parts) => parts.is_empty(),
            _ => false,
        }
    }

    /// Equality on a column, convenience for mutation scoping
    pub fn equals(column: &str, value: Scalar) -> Self {
        Self::Cond(Condition {
            column: column.to_string(),
            op: CompareOp::Equals,
            value: CondValue::One(value),
            path: None,
        })
    }

    /// `column IS NULL` / `column IS NOT NULL`
    pub fn is_null(column: &str, null: bool) -> Self {
        Self::Cond(Condition {
            column: column.to_string(),
            op: if null { CompareOp::Equals } else { CompareOp::Not },
            value: CondValue::One(Scalar::Null),
            path: None,
        })
    }
}

/// Build a [`Condition`] for an operator applied to a loosely-typed value
///
/// This is the single operator-selection strategy shared by the parameterized
/// and raw builders. `None` means the value cannot be coerced for the
/// operator, and the clause is dropped.
pub fn condition_for(
    column: &str,
    op: CompareOp,
    data_type: DataType,
    value: &Value,
    enum_values: &[String],
) -> Option<Condition> {
    let cond = |op: CompareOp, value: CondValue, path: Option<String>| {
        Some(Condition {
            column: column.to_string(),
            op,
            value,
            path,
        })
    };

    if op.is_text_search() {
        let Scalar::Text(s) = infer::to_scalar(value, DataType::String, enum_values)? else {
            return None;
        };
        return cond(op, CondValue::One(Scalar::Text(s)), None);
    }

    if op.is_ordering() {
        let target = if data_type == DataType::Date {
            DataType::Date
        } else {
            DataType::Number
        };
        let scalar = infer::to_scalar(value, target, enum_values)?;
        return cond(op, CondValue::One(scalar), None);
    }

    match op {
        CompareOp::Equals | CompareOp::Not => {
            if value.is_null() {
                return cond(op, CondValue::One(Scalar::Null), None);
            }
            match data_type {
                // An array value turns equality into membership
                DataType::Array => {
                    let list = scalar_list(value, enum_values)?;
                    let list_op = if op == CompareOp::Equals {
                        CompareOp::In
                    } else {
                        CompareOp::NotIn
                    };
                    cond(list_op, CondValue::Many(list), None)
                }
                other => {
                    let scalar = infer::to_scalar(value, other, enum_values)?;
                    cond(op, CondValue::One(scalar), None)
                }
            }
        }
        CompareOp::In | CompareOp::NotIn => {
            let list = match value {
                Value::Array(_) => scalar_list(value, enum_values)?,
                single => vec![infer::to_scalar_inferred(single, enum_values)?],
            };
            cond(op, CondValue::Many(list), None)
        }
        CompareOp::Has => {
            let scalar = infer::to_scalar_inferred(value, enum_values)?;
            cond(op, CondValue::One(scalar), None)
        }
        CompareOp::HasSome | CompareOp::HasEvery => {
            let list = match value {
                Value::Array(_) => scalar_list(value, enum_values)?,
                single => vec![infer::to_scalar_inferred(single, enum_values)?],
            };
            cond(op, CondValue::Many(list), None)
        }
        CompareOp::IsEmpty => {
            let Scalar::Bool(b) = infer::to_scalar(value, DataType::Boolean, enum_values)? else {
                return None;
            };
            cond(op, CondValue::One(Scalar::Bool(b)), None)
        }
        CompareOp::JsonEquals => {
            let obj = value.as_object()?;
            let path = obj.get("path")?.as_str()?.to_string();
            let target = obj.get("equals")?;
            let scalar = infer::to_scalar_inferred(target, enum_values)?;
            cond(op, CondValue::One(scalar), Some(path))
        }
        CompareOp::JsonContains | CompareOp::JsonContainedBy => {
            let scalar = infer::to_scalar(value, DataType::Json, enum_values)?;
            cond(op, CondValue::One(scalar), None)
        }
        CompareOp::JsonKeyExists => {
            let path = value.as_str()?.to_string();
            cond(op, CondValue::One(Scalar::Null), Some(path))
        }
        CompareOp::JsonKeysAll | CompareOp::JsonKeysAny => {
            let keys = value
                .as_array()?
                .iter()
                .map(|v| v.as_str().map(|s| Scalar::Text(s.to_string())))
                .collect::<Option<Vec<_>>>()?;
            cond(op, CondValue::Many(keys), None)
        }
        // handled above
        _ => None,
    }
}

fn scalar_list(value: &Value, enum_values: &[String]) -> Option<Vec<Scalar>> {
    value
        .as_array()?
        .iter()
        .map(|v| infer::to_scalar_inferred(v, enum_values))
        .collect()
}

/// A bind argument produced by predicate rendering
#[derive(Debug, Clone, PartialEq)]
pub enum SqlArg {
    Text(String),
    Int(i64),
    Real(f64),
    Null,
}

impl SqlArg {
    fn from_scalar(scalar: &Scalar) -> SqlArg {
        match scalar {
            Scalar::Text(s) => SqlArg::Text(s.clone()),
            Scalar::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
                    SqlArg::Int(*n as i64)
                } else {
                    SqlArg::Real(*n)
                }
            }
            Scalar::Bool(b) => SqlArg::Int(*b as i64),
            Scalar::Date(dt) => SqlArg::Int(dt.timestamp()),
            Scalar::Json(v) => SqlArg::Text(v.to_string()),
            Scalar::Null => SqlArg::Null,
        }
    }
}

/// Render a predicate to a parameterized SQLite WHERE fragment
///
/// Columns are qualified with `qualifier` (the base table name). Returns
/// `None` when nothing in the tree is renderable.
pub fn render_predicate(pred: &Predicate, qualifier: &str) -> Option<(String, Vec<SqlArg>)> {
    let mut args = Vec::new();
    let sql = render_node(pred, qualifier, &mut args)?;
    Some((sql, args))
}

fn render_node(pred: &Predicate, qualifier: &str, args: &mut Vec<SqlArg>) -> Option<String> {
    match pred {
        Predicate::And(parts) => render_group(parts, " AND ", qualifier, args),
        Predicate::Or(parts) => render_group(parts, " OR ", qualifier, args),
        Predicate::Related { relation, inner } => {
            let mut inner_args = Vec::new();
            let inner_sql = render_node(inner, &relation.table, &mut inner_args)?;
            args.extend(inner_args);
            Some(format!(
                "EXISTS (SELECT 1 FROM {rel} WHERE {rel}.{fk} = {base}.{lk} AND {inner_sql})",
                rel = relation.table,
                fk = relation.foreign_column,
                base = qualifier,
                lk = relation.local_column,
            ))
        }
        Predicate::Cond(c) => render_condition(c, qualifier, args),
    }
}

fn render_group(
    parts: &[Predicate],
    joiner: &str,
    qualifier: &str,
    args: &mut Vec<SqlArg>,
) -> Option<String> {
    let rendered: Vec<String> = parts
        .iter()
        .filter_map(|p| render_node(p, qualifier, args))
        .collect();
    match rendered.len() {
        0 => None,
        1 => Some(rendered.into_iter().next().unwrap()),
        _ => Some(format!("({})", rendered.join(joiner))),
    }
}

fn render_condition(c: &Condition, qualifier: &str, args: &mut Vec<SqlArg>) -> Option<String> {
    let col = format!("{qualifier}.{}", c.column);

    match (&c.op, &c.value) {
        (CompareOp::Contains, CondValue::One(Scalar::Text(s))) => {
            args.push(SqlArg::Text(format!("%{}%", escape_like_pattern(s))));
            Some(format!("{col} LIKE ? ESCAPE '\\'"))
        }
        (CompareOp::StartsWith, CondValue::One(Scalar::Text(s))) => {
            args.push(SqlArg::Text(format!("{}%", escape_like_pattern(s))));
            Some(format!("{col} LIKE ? ESCAPE '\\'"))
        }
        (CompareOp::EndsWith, CondValue::One(Scalar::Text(s))) => {
            args.push(SqlArg::Text(format!("%{}", escape_like_pattern(s))));
            Some(format!("{col} LIKE ? ESCAPE '\\'"))
        }
        (CompareOp::Equals, CondValue::One(Scalar::Null)) => Some(format!("{col} IS NULL")),
        (CompareOp::Not, CondValue::One(Scalar::Null)) => Some(format!("{col} IS NOT NULL")),
        (CompareOp::Equals, CondValue::One(Scalar::Json(v))) => {
            args.push(SqlArg::Text(v.to_string()));
            Some(format!("json({col}) = json(?)"))
        }
        (CompareOp::Equals, CondValue::One(s)) => {
            args.push(SqlArg::from_scalar(s));
            Some(format!("{col} = ?"))
        }
        (CompareOp::Not, CondValue::One(s)) => {
            args.push(SqlArg::from_scalar(s));
            Some(format!("{col} <> ?"))
        }
        (CompareOp::Gt, CondValue::One(s)) => {
            args.push(SqlArg::from_scalar(s));
            Some(format!("{col} > ?"))
        }
        (CompareOp::Gte, CondValue::One(s)) => {
            args.push(SqlArg::from_scalar(s));
            Some(format!("{col} >= ?"))
        }
        (CompareOp::Lt, CondValue::One(s)) => {
            args.push(SqlArg::from_scalar(s));
            Some(format!("{col} < ?"))
        }
        (CompareOp::Lte, CondValue::One(s)) => {
            args.push(SqlArg::from_scalar(s));
            Some(format!("{col} <= ?"))
        }
        (CompareOp::In, CondValue::Many(list)) => {
            if list.is_empty() {
                return Some("1=0".to_string());
            }
            let holes = placeholders(list.len());
            args.extend(list.iter().map(SqlArg::from_scalar));
            Some(format!("{col} IN ({holes})"))
        }
        (CompareOp::NotIn, CondValue::Many(list)) => {
            if list.is_empty() {
                return Some("1=1".to_string());
            }
            let holes = placeholders(list.len());
            args.extend(list.iter().map(SqlArg::from_scalar));
            Some(format!("{col} NOT IN ({holes})"))
        }
        (CompareOp::Has, CondValue::One(s)) => {
            args.push(SqlArg::from_scalar(s));
            Some(format!(
                "EXISTS (SELECT 1 FROM json_each({col}) WHERE json_each.value = ?)"
            ))
        }
        (CompareOp::HasSome, CondValue::Many(list)) => {
            if list.is_empty() {
                return Some("1=0".to_string());
            }
            let holes = placeholders(list.len());
            args.extend(list.iter().map(SqlArg::from_scalar));
            Some(format!(
                "EXISTS (SELECT 1 FROM json_each({col}) WHERE json_each.value IN ({holes}))"
            ))
        }
        (CompareOp::HasEvery, CondValue::Many(list)) => {
            if list.is_empty() {
                return Some("1=1".to_string());
            }
            let parts: Vec<String> = list
                .iter()
                .map(|s| {
                    args.push(SqlArg::from_scalar(s));
                    format!("EXISTS (SELECT 1 FROM json_each({col}) WHERE json_each.value = ?)")
                })
                .collect();
            Some(format!("({})", parts.join(" AND ")))
        }
        (CompareOp::IsEmpty, CondValue::One(Scalar::Bool(true))) => Some(format!(
            "({col} IS NULL OR json_array_length({col}) = 0)"
        )),
        (CompareOp::IsEmpty, CondValue::One(Scalar::Bool(false))) => {
            Some(format!("json_array_length({col}) > 0"))
        }
        (CompareOp::JsonEquals, CondValue::One(s)) => {
            let path = json_path(c.path.as_deref()?);
            args.push(SqlArg::Text(path));
            args.push(SqlArg::from_scalar(s));
            Some(format!("json_extract({col}, ?) = ?"))
        }
        (CompareOp::JsonKeyExists, _) => {
            let path = json_path(c.path.as_deref()?);
            args.push(SqlArg::Text(path));
            Some(format!("json_extract({col}, ?) IS NOT NULL"))
        }
        (CompareOp::JsonKeysAll, CondValue::Many(keys)) => {
            render_key_group(&col, keys, " AND ", args)
        }
        (CompareOp::JsonKeysAny, CondValue::Many(keys)) => {
            render_key_group(&col, keys, " OR ", args)
        }
        // Containment has no SQLite rendering; the clause is dropped
        (CompareOp::JsonContains | CompareOp::JsonContainedBy, _) => None,
        _ => None,
    }
}

fn render_key_group(
    col: &str,
    keys: &[Scalar],
    joiner: &str,
    args: &mut Vec<SqlArg>,
) -> Option<String> {
    if keys.is_empty() {
        return None;
    }
    let parts: Vec<String> = keys
        .iter()
        .filter_map(|k| match k {
            Scalar::Text(key) => {
                args.push(SqlArg::Text(json_path(key)));
                Some(format!("json_extract({col}, ?) IS NOT NULL"))
            }
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        None
    } else if parts.len() == 1 {
        Some(parts.into_iter().next().unwrap())
    } else {
        Some(format!("({})", parts.join(joiner)))
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Normalize a dotted key path to a SQLite JSON path expression
pub fn json_path(path: &str) -> String {
    if path.starts_with('$') {
        path.to_string()
    } else {
        format!("$.{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NO_ENUMS: &[String] = &[];

    fn render(pred: &Predicate) -> Option<(String, Vec<SqlArg>)> {
        render_predicate(pred, "hymns")
    }

    #[test]
    fn contains_escapes_like_metacharacters() {
        let c = condition_for("title", CompareOp::Contains, DataType::String, &json!("50%"), NO_ENUMS)
            .unwrap();
        let (sql, args) = render(&Predicate::Cond(c)).unwrap();
        assert_eq!(sql, "hymns.title LIKE ? ESCAPE '\\'");
        assert_eq!(args, vec![SqlArg::Text("%50\\%%".to_string())]);
    }

    #[test]
    fn equals_null_renders_is_null() {
        let c = condition_for("deleted_at", CompareOp::Equals, DataType::String, &Value::Null, NO_ENUMS)
            .unwrap();
        let (sql, args) = render(&Predicate::Cond(c)).unwrap();
        assert_eq!(sql, "hymns.deleted_at IS NULL");
        assert!(args.is_empty());
    }

    #[test]
    fn equals_with_array_becomes_in() {
        let c = condition_for("number", CompareOp::Equals, DataType::Array, &json!([1, 2, 3]), NO_ENUMS)
            .unwrap();
        assert_eq!(c.op, CompareOp::In);
        let (sql, args) = render(&Predicate::Cond(c)).unwrap();
        assert_eq!(sql, "hymns.number IN (?, ?, ?)");
        assert_eq!(args.len(), 3);
    }

    #[test]
    fn empty_in_is_always_false() {
        let c = Condition {
            column: "number".to_string(),
            op: CompareOp::In,
            value: CondValue::Many(vec![]),
            path: None,
        };
        let (sql, _) = render(&Predicate::Cond(c)).unwrap();
        assert_eq!(sql, "1=0");
    }

    #[test]
    fn empty_not_in_is_always_true() {
        let c = Condition {
            column: "number".to_string(),
            op: CompareOp::NotIn,
            value: CondValue::Many(vec![]),
            path: None,
        };
        let (sql, _) = render(&Predicate::Cond(c)).unwrap();
        assert_eq!(sql, "1=1");
    }

    #[test]
    fn related_renders_exists_subquery() {
        let c = condition_for("name", CompareOp::Contains, DataType::String, &json!("gospel"), NO_ENUMS)
            .unwrap();
        let pred = Predicate::Related {
            relation: Relation {
                name: "category".to_string(),
                table: "categories".to_string(),
                local_column: "category_id".to_string(),
                foreign_column: "id".to_string(),
            },
            inner: Box::new(Predicate::Cond(c)),
        };
        let (sql, args) = render(&pred).unwrap();
        assert_eq!(
            sql,
            "EXISTS (SELECT 1 FROM categories WHERE categories.id = hymns.category_id \
             AND categories.name LIKE ? ESCAPE '\\')"
        );
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn and_group_joins_and_parenthesizes() {
        let a = Predicate::equals("author", Scalar::Text("Crosby".to_string()));
        let b = Predicate::is_null("deleted_at", true);
        let (sql, args) = render(&Predicate::And(vec![a, b])).unwrap();
        assert_eq!(sql, "(hymns.author = ? AND hymns.deleted_at IS NULL)");
        assert_eq!(args, vec![SqlArg::Text("Crosby".to_string())]);
    }

    #[test]
    fn empty_groups_render_nothing() {
        assert!(render(&Predicate::And(vec![])).is_none());
        assert!(render(&Predicate::Or(vec![])).is_none());
    }

    #[test]
    fn unsupported_members_are_dropped_not_failed() {
        let supported = Predicate::is_null("deleted_at", true);
        let unsupported = Predicate::Cond(Condition {
            column: "detail".to_string(),
            op: CompareOp::JsonContains,
            value: CondValue::One(Scalar::Json(json!({"a": 1}))),
            path: None,
        });
        let (sql, _) = render(&Predicate::And(vec![unsupported, supported])).unwrap();
        assert_eq!(sql, "hymns.deleted_at IS NULL");
    }

    #[test]
    fn number_args_bind_as_int_when_integral() {
        assert_eq!(SqlArg::from_scalar(&Scalar::Number(42.0)), SqlArg::Int(42));
        assert_eq!(SqlArg::from_scalar(&Scalar::Number(1.5)), SqlArg::Real(1.5));
    }

    #[test]
    fn json_path_normalization() {
        assert_eq!(json_path("a.b"), "$.a.b");
        assert_eq!(json_path("$.a"), "$.a");
    }

    #[test]
    fn ordering_on_date_field_uses_date_scalar() {
        let c = condition_for(
            "created_at",
            CompareOp::Gte,
            DataType::Date,
            &json!("2024-01-01"),
            NO_ENUMS,
        )
        .unwrap();
        match &c.value {
            CondValue::One(Scalar::Date(_)) => {}
            other => panic!("expected date scalar, got {other:?}"),
        }
    }

    #[test]
    fn array_membership_ops() {
        let c = condition_for("tags", CompareOp::Has, DataType::Array, &json!("advent"), NO_ENUMS)
            .unwrap();
        let (sql, _) = render(&Predicate::Cond(c)).unwrap();
        assert_eq!(
            sql,
            "EXISTS (SELECT 1 FROM json_each(hymns.tags) WHERE json_each.value = ?)"
        );
    }
}
