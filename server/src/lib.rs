//! Hymnal server library
//!
//! REST backend for a hymn catalog: hymns, categories, verses, choruses,
//! and users, with JWT authentication, soft-delete lifecycle, audit logging,
//! and a schema-driven filter/pagination engine shared by all list endpoints.

pub mod api;
pub mod app;
pub mod core;
pub mod data;
pub mod utils;
