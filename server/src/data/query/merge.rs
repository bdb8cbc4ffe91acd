//! Cross-collection result merging
//!
//! Unified search fetches matches per entity, then merges them in memory
//! into one ordered, page-sliced result. Rows expose their sort values
//! through a key function, so unrelated row types can share an ordering.

use std::cmp::Ordering;

use crate::data::query::paginate::{ListParams, PageMeta, Paginated, SortDirection};

/// A comparable sort value extracted from a merged row
#[derive(Debug, Clone, PartialEq)]
pub enum SortValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl SortValue {
    fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Number(_) => 2,
            Self::Text(_) => 3,
        }
    }

    /// Total order across value kinds; nulls sort smallest
    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

/// Merge pre-fetched collections into one ordered, paginated result
///
/// `sort_value` maps a row and a sort column to its value. Ties across all
/// keys keep their input order (collections concatenate in argument order).
/// Slicing follows the page strategy; cursor navigation is not offered here.
pub fn merge_and_paginate<T>(
    collections: Vec<Vec<T>>,
    params: &ListParams,
    sort_value: impl Fn(&T, &str) -> SortValue,
) -> Paginated<T> {
    let mut rows: Vec<T> = collections.into_iter().flatten().collect();

    rows.sort_by(|a, b| {
        for column in &params.order_by {
            let ord = sort_value(a, column).compare(&sort_value(b, column));
            let ord = match params.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });

    if !params.is_paginated() {
        return Paginated::All { items: rows };
    }

    let size = params.size();
    let page = params.page();
    let total_items = rows.len() as u64;
    let start = ((page as u64 - 1) * size as u64).min(total_items) as usize;
    let end = (start + size as usize).min(rows.len());
    let items: Vec<T> = rows.drain(..end).skip(start).collect();

    Paginated::Pages {
        meta: PageMeta {
            item_count: items.len() as u64,
            total_items,
            items_per_page: size,
            total_pages: total_items.div_ceil(size as u64),
            current_page: page,
        },
        items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::query::paginate::Boolish;

    #[derive(Debug, Clone, PartialEq)]
    struct Hit {
        title: Option<String>,
        weight: f64,
    }

    fn hit(title: Option<&str>, weight: f64) -> Hit {
        Hit {
            title: title.map(String::from),
            weight,
        }
    }

    fn key(row: &Hit, column: &str) -> SortValue {
        match column {
            "title" => row
                .title
                .clone()
                .map_or(SortValue::Null, SortValue::Text),
            "weight" => SortValue::Number(row.weight),
            _ => SortValue::Null,
        }
    }

    fn asc_params() -> ListParams {
        ListParams {
            order_by: vec!["title".to_string()],
            direction: SortDirection::Asc,
            ..Default::default()
        }
    }

    #[test]
    fn merges_and_orders_across_collections() {
        let a = vec![hit(Some("Cleft"), 1.0), hit(Some("Amazing"), 1.0)];
        let b = vec![hit(Some("Blessed"), 1.0)];
        let out = merge_and_paginate(vec![a, b], &asc_params(), key);
        let titles: Vec<_> = out.items().iter().map(|h| h.title.clone().unwrap()).collect();
        assert_eq!(titles, vec!["Amazing", "Blessed", "Cleft"]);
    }

    #[test]
    fn nulls_first_ascending_last_descending() {
        let rows = vec![hit(None, 0.0), hit(Some("A"), 0.0)];
        let out = merge_and_paginate(vec![rows.clone()], &asc_params(), key);
        assert_eq!(out.items()[0].title, None);

        let desc = ListParams {
            direction: SortDirection::Desc,
            ..asc_params()
        };
        let out = merge_and_paginate(vec![rows], &desc, key);
        assert_eq!(out.items()[1].title, None);
    }

    #[test]
    fn full_ties_keep_input_order() {
        let a = vec![hit(Some("Same"), 1.0)];
        let b = vec![hit(Some("Same"), 2.0)];
        let out = merge_and_paginate(vec![a, b], &asc_params(), key);
        assert_eq!(out.items()[0].weight, 1.0);
        assert_eq!(out.items()[1].weight, 2.0);
    }

    #[test]
    fn secondary_key_breaks_ties() {
        let rows = vec![hit(Some("Same"), 2.0), hit(Some("Same"), 1.0)];
        let params = ListParams {
            order_by: vec!["title".to_string(), "weight".to_string()],
            ..asc_params()
        };
        let out = merge_and_paginate(vec![rows], &params, key);
        assert_eq!(out.items()[0].weight, 1.0);
    }

    #[test]
    fn page_slicing_with_meta() {
        let rows: Vec<Hit> = (0..7).map(|i| hit(Some(&format!("T{i}")), 0.0)).collect();
        let params = ListParams {
            size: Some(3),
            page: Some(3),
            ..asc_params()
        };
        let out = merge_and_paginate(vec![rows], &params, key);
        match out {
            Paginated::Pages { items, meta } => {
                assert_eq!(items.len(), 1);
                assert_eq!(meta.total_pages, 3);
                assert_eq!(meta.total_items, 7);
            }
            other => panic!("expected Pages, got {other:?}"),
        }
    }

    #[test]
    fn disabled_pagination_returns_all_sorted() {
        let params = ListParams {
            is_paginated: Some(Boolish::Text("false".to_string())),
            ..asc_params()
        };
        let rows = vec![hit(Some("B"), 0.0), hit(Some("A"), 0.0)];
        let out = merge_and_paginate(vec![rows], &params, key);
        match out {
            Paginated::All { items } => {
                assert_eq!(items[0].title.as_deref(), Some("A"));
            }
            other => panic!("expected All, got {other:?}"),
        }
    }
}
