//! `PostgreSQL` adapters for reviewer assignment persistence.

mod models;
mod schema;
mod store;

pub use store::{AssignmentPgPool, PostgresAssignmentStore};
