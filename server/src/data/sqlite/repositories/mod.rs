//! SQLite repositories, one module per entity

pub mod audit;
pub mod category;
pub mod chorus;
pub mod hymn;
pub mod user;
pub mod verse;
