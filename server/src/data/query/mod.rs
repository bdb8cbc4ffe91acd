//! Dynamic filtering and pagination over listable entities

pub mod cursor;
pub mod infer;
pub mod mapper;
pub mod merge;
pub mod paginate;
pub mod predicate;
pub mod raw;
pub mod schema;
pub mod translate;

pub use cursor::{decode_cursor, encode_cursor, CursorError, DecodedCursor};
pub use infer::{DataType, Scalar};
pub use mapper::{map_paginated, map_rows, RowMapper};
pub use merge::{merge_and_paginate, SortValue};
pub use paginate::{
    paginate, Boolish, FindArgs, HasId, ListParams, PageCursors, PageMeta, Paginated,
    PaginateError, PaginationType, Queryable, SortDirection, SortKey, DEFAULT_PAGE_SIZE,
};
pub use predicate::{
    condition_for, render_predicate, CompareOp, CondValue, Condition, Predicate, Relation, SqlArg,
};
pub use raw::{paginate_raw, render_predicate_raw, RawDialect};
pub use schema::{
    FilterField, FilterSchema, FilterSchemaBuilder, Filters, FunctionField, SchemaError, TERM_KEY,
};
pub use translate::translate;
