//! Data layer: query engine, SQLite storage, and shared row types

pub mod error;
pub mod query;
pub mod sqlite;
pub mod types;

pub use error::DataError;
