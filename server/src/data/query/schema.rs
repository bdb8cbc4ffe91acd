//! Filter schema DSL
//!
//! Each listable entity declares which filter keys it accepts and how each
//! key maps onto SQL. Entries are compact directives parsed once at startup:
//!
//! - `"title|contains"`: scalar column with an operator (default `contains`)
//! - `"category.name|contains"`: one-to-one relation traversal
//! - `"verses:content|contains"`: one-to-many relation traversal
//!
//! Relation names must be registered on the builder before use. Malformed
//! directives fail `build()`, so a bad schema aborts startup instead of
//! silently producing broken filters.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::data::query::infer::{DataType, Scalar};
use crate::data::query::predicate::{CompareOp, Predicate, Relation};

/// Reserved key for cross-field term search
pub const TERM_KEY: &str = "term";

/// User-supplied filter criteria, keyed by filter key
///
/// A `BTreeMap` keeps iteration order deterministic, so translation is
/// reproducible for identical inputs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters(BTreeMap<String, Value>);

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn term(&self) -> Option<&str> {
        self.0.get(TERM_KEY).and_then(Value::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Value)> for Filters {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Invalid filter directive: {0}")]
    InvalidDirective(String),
    #[error("Unknown operator in directive '{directive}': {op}")]
    UnknownOperator { directive: String, op: String },
    #[error("Unknown relation in directive '{directive}': {relation}")]
    UnknownRelation { directive: String, relation: String },
}

/// A scalar column entry
#[derive(Debug, Clone)]
pub struct ScalarField {
    pub key: String,
    pub column: String,
    pub op: CompareOp,
    /// Pinned type; inferred from the value when `None`
    pub data_type: Option<DataType>,
    pub enum_values: Vec<String>,
}

/// A relation traversal entry (`parent.column` or `parent:column`)
#[derive(Debug, Clone)]
pub struct RelationField {
    pub key: String,
    pub relation: Relation,
    pub column: String,
    pub op: CompareOp,
}

type BuildFn = dyn Fn(&Scalar, &Filters) -> Option<Predicate> + Send + Sync;

/// A computed entry: the predicate is produced by a closure instead of a
/// column mapping. Used for derived filters like soft-delete visibility.
#[derive(Clone)]
pub struct FunctionField {
    pub key: String,
    pub data_type: Option<DataType>,
    /// Non-empty values also make the field match during term search
    pub enum_values: Vec<String>,
    pub build: Arc<BuildFn>,
}

impl FunctionField {
    pub fn new(
        key: impl Into<String>,
        build: impl Fn(&Scalar, &Filters) -> Option<Predicate> + Send + Sync + 'static,
    ) -> Self {
        Self {
            key: key.into(),
            data_type: None,
            enum_values: Vec::new(),
            build: Arc::new(build),
        }
    }

    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = Some(data_type);
        self
    }

    pub fn with_enum_values(mut self, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.enum_values = values.into_iter().map(Into::into).collect();
        self
    }
}

impl fmt::Debug for FunctionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionField")
            .field("key", &self.key)
            .field("data_type", &self.data_type)
            .field("enum_values", &self.enum_values)
            .finish_non_exhaustive()
    }
}

/// One parsed schema entry
#[derive(Debug, Clone)]
pub enum FilterField {
    Scalar(ScalarField),
    OneToOne(RelationField),
    OneToMany(RelationField),
    Function(FunctionField),
}

impl FilterField {
    pub fn key(&self) -> &str {
        match self {
            Self::Scalar(f) => &f.key,
            Self::OneToOne(f) | Self::OneToMany(f) => &f.key,
            Self::Function(f) => &f.key,
        }
    }
}

/// A validated filter schema for one entity
#[derive(Debug, Clone, Default)]
pub struct FilterSchema {
    fields: Vec<FilterField>,
}

impl FilterSchema {
    pub fn builder() -> FilterSchemaBuilder {
        FilterSchemaBuilder::default()
    }

    pub fn fields(&self) -> &[FilterField] {
        &self.fields
    }
}

#[derive(Default)]
struct DirectiveSpec {
    directive: String,
    key_override: Option<String>,
    data_type: Option<DataType>,
    enum_values: Vec<String>,
}

#[derive(Default)]
pub struct FilterSchemaBuilder {
    relations: Vec<Relation>,
    directives: Vec<DirectiveSpec>,
    functions: Vec<FunctionField>,
}

impl FilterSchemaBuilder {
    /// Register a relation so directives can traverse it
    pub fn relation(
        mut self,
        name: &str,
        table: &str,
        local_column: &str,
        foreign_column: &str,
    ) -> Self {
        self.relations.push(Relation {
            name: name.to_string(),
            table: table.to_string(),
            local_column: local_column.to_string(),
            foreign_column: foreign_column.to_string(),
        });
        self
    }

    pub fn entry(mut self, directive: &str) -> Self {
        self.directives.push(DirectiveSpec {
            directive: directive.to_string(),
            ..Default::default()
        });
        self
    }

    /// An entry with a pinned type, bypassing inference
    pub fn typed_entry(mut self, directive: &str, data_type: DataType) -> Self {
        self.directives.push(DirectiveSpec {
            directive: directive.to_string(),
            data_type: Some(data_type),
            ..Default::default()
        });
        self
    }

    /// A typed entry whose filter key differs from the column it targets,
    /// e.g. `from` and `to` both ranging over `created_at`
    pub fn aliased_entry(mut self, key: &str, directive: &str, data_type: DataType) -> Self {
        self.directives.push(DirectiveSpec {
            directive: directive.to_string(),
            key_override: Some(key.to_string()),
            data_type: Some(data_type),
            ..Default::default()
        });
        self
    }

    /// An entry restricted to a closed set of values
    pub fn enum_entry(
        mut self,
        directive: &str,
        values: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.directives.push(DirectiveSpec {
            directive: directive.to_string(),
            data_type: Some(DataType::Enum),
            enum_values: values.into_iter().map(Into::into).collect(),
            ..Default::default()
        });
        self
    }

    pub fn function(mut self, field: FunctionField) -> Self {
        self.functions.push(field);
        self
    }

    pub fn build(self) -> Result<FilterSchema, SchemaError> {
        let mut fields = Vec::with_capacity(self.directives.len() + self.functions.len());
        for spec in &self.directives {
            let mut field = parse_directive(
                &spec.directive,
                spec.data_type,
                &spec.enum_values,
                &self.relations,
            )?;
            if let (Some(key), FilterField::Scalar(f)) = (&spec.key_override, &mut field) {
                f.key = key.clone();
            }
            fields.push(field);
        }
        fields.extend(self.functions.into_iter().map(FilterField::Function));
        Ok(FilterSchema { fields })
    }
}

fn parse_directive(
    directive: &str,
    data_type: Option<DataType>,
    enum_values: &[String],
    relations: &[Relation],
) -> Result<FilterField, SchemaError> {
    let (path, op_str) = match directive.split_once('|') {
        Some((path, op)) => (path, op),
        None => (directive, "contains"),
    };
    let op = CompareOp::from_str(op_str).map_err(|_| SchemaError::UnknownOperator {
        directive: directive.to_string(),
        op: op_str.to_string(),
    })?;

    if path.contains('.') && path.contains(':') {
        return Err(SchemaError::InvalidDirective(directive.to_string()));
    }

    if let Some((parent, column)) = path.split_once('.') {
        let relation = lookup_relation(directive, parent, relations)?;
        check_ident(directive, column)?;
        return Ok(FilterField::OneToOne(RelationField {
            key: path.to_string(),
            relation,
            column: column.to_string(),
            op,
        }));
    }

    if let Some((parent, column)) = path.split_once(':') {
        let relation = lookup_relation(directive, parent, relations)?;
        check_ident(directive, column)?;
        return Ok(FilterField::OneToMany(RelationField {
            key: path.to_string(),
            relation,
            column: column.to_string(),
            op,
        }));
    }

    check_ident(directive, path)?;
    Ok(FilterField::Scalar(ScalarField {
        key: path.to_string(),
        column: path.to_string(),
        op,
        data_type,
        enum_values: enum_values.to_vec(),
    }))
}

fn lookup_relation(
    directive: &str,
    name: &str,
    relations: &[Relation],
) -> Result<Relation, SchemaError> {
    relations
        .iter()
        .find(|r| r.name == name)
        .cloned()
        .ok_or_else(|| SchemaError::UnknownRelation {
            directive: directive.to_string(),
            relation: name.to_string(),
        })
}

fn check_ident(directive: &str, part: &str) -> Result<(), SchemaError> {
    let valid = !part.is_empty()
        && part
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(SchemaError::InvalidDirective(directive.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hymn_relations(builder: FilterSchemaBuilder) -> FilterSchemaBuilder {
        builder
            .relation("category", "categories", "category_id", "id")
            .relation("verses", "verses", "id", "hymn_id")
    }

    #[test]
    fn scalar_directive_defaults_to_contains() {
        let schema = FilterSchema::builder().entry("title").build().unwrap();
        match &schema.fields()[0] {
            FilterField::Scalar(f) => {
                assert_eq!(f.key, "title");
                assert_eq!(f.op, CompareOp::Contains);
            }
            other => panic!("expected scalar, got {other:?}"),
        }
    }

    #[test]
    fn dot_directive_is_one_to_one() {
        let schema = hymn_relations(FilterSchema::builder())
            .entry("category.name|contains")
            .build()
            .unwrap();
        match &schema.fields()[0] {
            FilterField::OneToOne(f) => {
                assert_eq!(f.relation.table, "categories");
                assert_eq!(f.column, "name");
            }
            other => panic!("expected one-to-one, got {other:?}"),
        }
    }

    #[test]
    fn colon_directive_is_one_to_many() {
        let schema = hymn_relations(FilterSchema::builder())
            .entry("verses:content|contains")
            .build()
            .unwrap();
        match &schema.fields()[0] {
            FilterField::OneToMany(f) => {
                assert_eq!(f.relation.table, "verses");
                assert_eq!(f.column, "content");
            }
            other => panic!("expected one-to-many, got {other:?}"),
        }
    }

    #[test]
    fn unknown_operator_fails_build() {
        let err = FilterSchema::builder().entry("title|fuzzes").build().unwrap_err();
        assert!(matches!(err, SchemaError::UnknownOperator { .. }));
    }

    #[test]
    fn unknown_relation_fails_build() {
        let err = FilterSchema::builder()
            .entry("category.name|contains")
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnknownRelation { .. }));
    }

    #[test]
    fn mixed_relation_shape_fails_build() {
        let err = hymn_relations(FilterSchema::builder())
            .entry("category.verses:content|contains")
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidDirective(_)));
    }

    #[test]
    fn invalid_identifier_fails_build() {
        let err = FilterSchema::builder()
            .entry("title; DROP TABLE hymns|equals")
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidDirective(_)));
    }

    #[test]
    fn aliased_entry_keeps_its_own_key() {
        let schema = FilterSchema::builder()
            .aliased_entry("from", "created_at|gte", DataType::Date)
            .build()
            .unwrap();
        match &schema.fields()[0] {
            FilterField::Scalar(f) => {
                assert_eq!(f.key, "from");
                assert_eq!(f.column, "created_at");
                assert_eq!(f.op, CompareOp::Gte);
            }
            other => panic!("expected scalar, got {other:?}"),
        }
    }

    #[test]
    fn filters_term_accessor() {
        let filters = Filters::new().with(TERM_KEY, json!("grace"));
        assert_eq!(filters.term(), Some("grace"));
        assert_eq!(Filters::new().term(), None);
    }
}
