//! Pagination engine
//!
//! One entry point, [`paginate`], drives three outcomes over any
//! [`Queryable`] source: everything (pagination disabled), page/offset
//! windows with count metadata, or cursor windows with navigation tokens.
//! The count and the page fetch run concurrently; both see the same
//! predicate, and the snapshot is not transactional.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::data::error::DataError;
use crate::data::query::cursor::{decode_cursor, encode_cursor, CursorError, DecodedCursor};
use crate::data::query::predicate::Predicate;

/// Window size when the request does not specify one
pub const DEFAULT_PAGE_SIZE: u32 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

/// A single ORDER BY key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub column: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn new(column: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            column: column.into(),
            direction,
        }
    }
}

/// Truthiness wrapper for the `isPaginated` parameter
///
/// Query strings deliver booleans as text; `"false"` and `"0"` are false,
/// everything else is true.
#[derive(Debug, Clone, PartialEq, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum Boolish {
    Bool(bool),
    Text(String),
}

impl Boolish {
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Text(s) => !matches!(s.to_ascii_lowercase().as_str(), "false" | "0"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaginationType {
    #[default]
    Page,
    Cursor,
}

/// Normalized listing parameters
#[derive(Debug, Clone, Default)]
pub struct ListParams {
    pub size: Option<u32>,
    pub page: Option<u32>,
    pub cursor: Option<String>,
    /// Sort columns, most significant first; all share `direction`
    pub order_by: Vec<String>,
    pub direction: SortDirection,
    pub is_paginated: Option<Boolish>,
    pub pagination_type: PaginationType,
}

impl ListParams {
    pub fn size(&self) -> u32 {
        self.size.unwrap_or(DEFAULT_PAGE_SIZE).max(1)
    }

    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn is_paginated(&self) -> bool {
        self.is_paginated.as_ref().is_none_or(Boolish::is_truthy)
    }

    pub fn sort_keys(&self) -> Vec<SortKey> {
        self.order_by
            .iter()
            .map(|c| SortKey::new(c.clone(), self.direction))
            .collect()
    }
}

/// Page-strategy metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub item_count: u64,
    pub total_items: u64,
    pub items_per_page: u32,
    pub total_pages: u64,
    pub current_page: u32,
}

/// Cursor-strategy navigation tokens
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageCursors {
    pub first: Option<String>,
    pub previous: Option<String>,
    pub next: Option<String>,
    pub last: Option<String>,
    pub has_next: bool,
    pub has_previous: bool,
}

/// A listing result in one of the three pagination shapes
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(untagged)]
pub enum Paginated<T> {
    All {
        #[serde(rename = "pageItems")]
        items: Vec<T>,
    },
    Pages {
        #[serde(rename = "pageItems")]
        items: Vec<T>,
        #[serde(rename = "pageMeta")]
        meta: PageMeta,
    },
    Cursors {
        #[serde(rename = "pageEdges")]
        edges: Vec<T>,
        #[serde(rename = "pageCursors")]
        cursors: PageCursors,
        #[serde(rename = "totalCount")]
        total_count: u64,
    },
}

impl<T> Paginated<T> {
    pub fn items(&self) -> &[T] {
        match self {
            Self::All { items } | Self::Pages { items, .. } => items,
            Self::Cursors { edges, .. } => edges,
        }
    }

    pub fn into_items(self) -> Vec<T> {
        match self {
            Self::All { items } | Self::Pages { items, .. } => items,
            Self::Cursors { edges, .. } => edges,
        }
    }

    /// Convert the rows while keeping the pagination shape and metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        match self {
            Self::All { items } => Paginated::All {
                items: items.into_iter().map(f).collect(),
            },
            Self::Pages { items, meta } => Paginated::Pages {
                items: items.into_iter().map(f).collect(),
                meta,
            },
            Self::Cursors {
                edges,
                cursors,
                total_count,
            } => Paginated::Cursors {
                edges: edges.into_iter().map(f).collect(),
                cursors,
                total_count,
            },
        }
    }
}

/// Rows addressable by a stable unique id, required for cursor anchors
pub trait HasId {
    fn id(&self) -> &str;
}

/// Arguments for a windowed fetch
///
/// `take`'s sign is the traversal direction: negative fetches backward from
/// the anchor (or the end of the result set when there is no anchor), with
/// rows returned in forward order either way.
#[derive(Debug, Clone, Default)]
pub struct FindArgs<'a> {
    pub where_: Option<&'a Predicate>,
    pub order_by: Vec<SortKey>,
    pub skip: u64,
    pub take: Option<i64>,
    /// Anchor row id; the anchor itself is excluded via `skip`
    pub cursor: Option<&'a str>,
}

/// A paginatable row source
#[async_trait]
pub trait Queryable: Send + Sync {
    type Row: Send + Unpin;

    async fn count(&self, where_: Option<&Predicate>) -> Result<u64, DataError>;
    async fn find_many(&self, args: FindArgs<'_>) -> Result<Vec<Self::Row>, DataError>;
    async fn find_first(&self, where_: Option<&Predicate>) -> Result<Option<Self::Row>, DataError>;
    /// Run a caller-built SELECT; used by the raw pagination path
    async fn execute_raw(&self, sql: &str) -> Result<Vec<Self::Row>, DataError>;
    async fn count_raw(&self, sql: &str) -> Result<u64, DataError>;
}

#[derive(Debug, Error)]
pub enum PaginateError {
    #[error("Invalid cursor token")]
    InvalidCursor,
    #[error(transparent)]
    Data(#[from] DataError),
}

impl From<CursorError> for PaginateError {
    fn from(_: CursorError) -> Self {
        Self::InvalidCursor
    }
}

/// Run a listing query with the strategy the parameters select
pub async fn paginate<Q>(
    source: &Q,
    where_: Option<&Predicate>,
    params: &ListParams,
) -> Result<Paginated<Q::Row>, PaginateError>
where
    Q: Queryable,
    Q::Row: HasId,
{
    if !params.is_paginated() {
        let items = source
            .find_many(FindArgs {
                where_,
                order_by: params.sort_keys(),
                skip: 0,
                take: None,
                cursor: None,
            })
            .await?;
        return Ok(Paginated::All { items });
    }

    match params.pagination_type {
        PaginationType::Page => page_strategy(source, where_, params).await,
        PaginationType::Cursor => cursor_strategy(source, where_, params).await,
    }
}

async fn page_strategy<Q: Queryable>(
    source: &Q,
    where_: Option<&Predicate>,
    params: &ListParams,
) -> Result<Paginated<Q::Row>, PaginateError> {
    let size = params.size();
    let page = params.page();
    let skip = (page as u64 - 1) * size as u64;

    let find = source.find_many(FindArgs {
        where_,
        order_by: params.sort_keys(),
        skip,
        take: Some(size as i64),
        cursor: None,
    });
    let (total_items, items) = tokio::try_join!(source.count(where_), find)?;

    let meta = PageMeta {
        item_count: items.len() as u64,
        total_items,
        items_per_page: size,
        total_pages: total_items.div_ceil(size as u64),
        current_page: page,
    };
    Ok(Paginated::Pages { items, meta })
}

async fn cursor_strategy<Q>(
    source: &Q,
    where_: Option<&Predicate>,
    params: &ListParams,
) -> Result<Paginated<Q::Row>, PaginateError>
where
    Q: Queryable,
    Q::Row: HasId,
{
    let size = params.size() as u64;
    let decoded = match &params.cursor {
        Some(token) => Some(decode_cursor(token)?),
        None => None,
    };
    let (dir, anchor, last) = match &decoded {
        Some(c) => (c.dir as i64, c.id.as_deref(), c.last),
        None => (1, None, false),
    };

    let total_count = source.count(where_).await?;

    // One extra row detects a neighboring page; the jump-to-last token
    // instead sizes its window from the count so the final partial page
    // comes back exactly.
    let base_take = if last && total_count % size != 0 {
        total_count % size
    } else {
        size + 1
    };

    // Ties on the sort keys are broken by id so the traversal order is total
    let mut order_by = params.sort_keys();
    order_by.push(SortKey::new("id", params.direction));

    let mut edges = source
        .find_many(FindArgs {
            where_,
            order_by,
            skip: if anchor.is_some() { 1 } else { 0 },
            take: Some(base_take as i64 * dir),
            cursor: anchor,
        })
        .await?;

    let overfetched = edges.len() as u64 > size;
    if overfetched {
        if dir < 0 {
            edges.remove(0);
        } else {
            edges.pop();
        }
    }

    let (has_next, has_previous) = match (anchor.is_some(), dir > 0) {
        (true, true) => (overfetched, true),
        (true, false) => (true, overfetched),
        // Jumped to the last page
        (false, false) => (false, total_count > edges.len() as u64),
        // First page
        (false, true) => (overfetched, false),
    };

    let cursors = PageCursors {
        first: Some(encode_cursor(&DecodedCursor::first_page())),
        last: Some(encode_cursor(&DecodedCursor::last_page())),
        next: has_next
            .then(|| edges.last().map(|r| encode_cursor(&DecodedCursor::forward(r.id()))))
            .flatten(),
        previous: has_previous
            .then(|| edges.first().map(|r| encode_cursor(&DecodedCursor::backward(r.id()))))
            .flatten(),
        has_next,
        has_previous,
    };

    Ok(Paginated::Cursors {
        edges,
        cursors,
        total_count,
    })
}
