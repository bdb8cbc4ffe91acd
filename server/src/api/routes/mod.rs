//! API route modules

pub mod audit;
pub mod auth;
pub mod categories;
pub mod choruses;
pub mod health;
pub mod hymns;
pub mod search;
pub mod users;
