//! Filter translation
//!
//! Turns user-supplied [`Filters`] into a [`Predicate`] tree by walking the
//! entity's [`FilterSchema`]. Two passes: keyed criteria first (AND-combined),
//! then the reserved `term` key, which fans out across every text-searchable
//! entry (OR-combined) and is ANDed with the rest. Keys the schema does not
//! declare are ignored, never errors. Translation is pure, so identical
//! inputs always produce identical predicates.

use serde_json::Value;

use crate::data::query::infer::{self, DataType, Scalar};
use crate::data::query::predicate::{condition_for, Predicate};
use crate::data::query::schema::{FilterField, FilterSchema, Filters, RelationField, TERM_KEY};

/// Translate filters into a predicate for the schema's entity
pub fn translate(filters: &Filters, schema: &FilterSchema) -> Predicate {
    let mut clauses = Vec::new();

    for field in schema.fields() {
        if let Some(clause) = keyed_contribution(field, filters) {
            clauses.push(clause);
        }
    }

    if let Some(term) = filters.term() {
        let term_filters = Filters::new().with(TERM_KEY, Value::String(term.to_string()));
        let matches: Vec<Predicate> = schema
            .fields()
            .iter()
            .filter_map(|field| term_contribution(field, term, &term_filters))
            .collect();
        if !matches.is_empty() {
            clauses.push(Predicate::Or(matches));
        }
    }

    Predicate::And(clauses)
}

fn keyed_contribution(field: &FilterField, filters: &Filters) -> Option<Predicate> {
    match field {
        FilterField::Scalar(f) => {
            if f.key == TERM_KEY {
                return None;
            }
            let value = filters.get(&f.key)?;
            let data_type = f
                .data_type
                .or_else(|| infer::infer_type(value, &f.enum_values))?;
            condition_for(&f.column, f.op, data_type, value, &f.enum_values)
                .map(Predicate::Cond)
        }
        FilterField::OneToOne(f) | FilterField::OneToMany(f) => {
            let value = filters.get(&f.key)?;
            let data_type = infer::infer_type(value, &[])?;
            let cond = condition_for(&f.column, f.op, data_type, value, &[])?;
            Some(related(f, Predicate::Cond(cond)))
        }
        FilterField::Function(f) => {
            let value = filters.get(&f.key)?;
            let data_type = f
                .data_type
                .or_else(|| infer::infer_type(value, &f.enum_values))?;
            let scalar = infer::to_scalar(value, data_type, &f.enum_values)?;
            (f.build)(&scalar, filters)
        }
    }
}

fn term_contribution(field: &FilterField, term: &str, term_filters: &Filters) -> Option<Predicate> {
    match field {
        FilterField::Scalar(f) if f.op.is_text_search() => {
            let value = Value::String(term.to_string());
            condition_for(&f.column, f.op, DataType::String, &value, &[]).map(Predicate::Cond)
        }
        FilterField::OneToOne(f) | FilterField::OneToMany(f) if f.op.is_text_search() => {
            let value = Value::String(term.to_string());
            let cond = condition_for(&f.column, f.op, DataType::String, &value, &[])?;
            Some(related(f, Predicate::Cond(cond)))
        }
        // Enum-valued function fields match the term against their value set
        FilterField::Function(f) if !f.enum_values.is_empty() => {
            let canonical = f
                .enum_values
                .iter()
                .find(|e| e.eq_ignore_ascii_case(term))?;
            (f.build)(&Scalar::Text(canonical.clone()), term_filters)
        }
        _ => None,
    }
}

fn related(field: &RelationField, inner: Predicate) -> Predicate {
    Predicate::Related {
        relation: field.relation.clone(),
        inner: Box::new(inner),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::query::predicate::{CompareOp, CondValue, Condition};
    use crate::data::query::schema::FunctionField;
    use serde_json::json;

    fn hymn_schema() -> FilterSchema {
        FilterSchema::builder()
            .relation("category", "categories", "category_id", "id")
            .relation("verses", "verses", "id", "hymn_id")
            .entry("title|contains")
            .entry("author|contains")
            .typed_entry("number|equals", DataType::Number)
            .entry("category.name|contains")
            .entry("verses:content|contains")
            .function(
                FunctionField::new("key", |scalar, _| match scalar {
                    Scalar::Text(v) => Some(Predicate::equals("musical_key", Scalar::Text(v.clone()))),
                    _ => None,
                })
                .with_enum_values(["C", "G", "D", "F"]),
            )
            .build()
            .unwrap()
    }

    fn parts(pred: Predicate) -> Vec<Predicate> {
        match pred {
            Predicate::And(parts) => parts,
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let filters = Filters::new().with("publisher", json!("x"));
        let pred = translate(&filters, &hymn_schema());
        assert!(pred.is_empty());
    }

    #[test]
    fn empty_filters_give_empty_predicate() {
        let pred = translate(&Filters::new(), &hymn_schema());
        assert!(pred.is_empty());
    }

    #[test]
    fn keyed_criteria_and_combined() {
        let filters = Filters::new()
            .with("title", json!("amazing"))
            .with("number", json!("12"));
        let clauses = parts(translate(&filters, &hymn_schema()));
        assert_eq!(clauses.len(), 2);
    }

    #[test]
    fn term_fans_out_across_text_entries_or_combined() {
        let filters = Filters::new().with("term", json!("grace"));
        let clauses = parts(translate(&filters, &hymn_schema()));
        assert_eq!(clauses.len(), 1);
        let Predicate::Or(matches) = &clauses[0] else {
            panic!("expected Or group");
        };
        // title, author, category.name, verses:content
        assert_eq!(matches.len(), 4);
        assert!(matches
            .iter()
            .any(|p| matches!(p, Predicate::Related { relation, .. } if relation.table == "verses")));
    }

    #[test]
    fn term_matching_enum_function_adds_equality() {
        let filters = Filters::new().with("term", json!("g"));
        let clauses = parts(translate(&filters, &hymn_schema()));
        let Predicate::Or(matches) = &clauses[0] else {
            panic!("expected Or group");
        };
        // 4 text entries + the canonicalized musical-key match
        assert_eq!(matches.len(), 5);
        assert!(matches.contains(&Predicate::Cond(Condition {
            column: "musical_key".to_string(),
            op: CompareOp::Equals,
            value: CondValue::One(Scalar::Text("G".to_string())),
            path: None,
        })));
    }

    #[test]
    fn term_and_keyed_criteria_combine_with_and() {
        let filters = Filters::new()
            .with("term", json!("grace"))
            .with("number", json!(12));
        let clauses = parts(translate(&filters, &hymn_schema()));
        assert_eq!(clauses.len(), 2);
    }

    #[test]
    fn null_valued_filter_contributes_nothing() {
        let filters = Filters::new().with("title", json!(null));
        assert!(translate(&filters, &hymn_schema()).is_empty());
    }

    #[test]
    fn translation_is_deterministic() {
        let filters = Filters::new()
            .with("term", json!("grace"))
            .with("title", json!("amazing"))
            .with("number", json!([1, 2]));
        let schema = hymn_schema();
        let a = translate(&filters, &schema);
        let b = translate(&filters, &schema);
        assert_eq!(a, b);
    }
}
