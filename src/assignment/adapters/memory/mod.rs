//! In-memory adapters for reviewer assignment.

mod store;

pub use store::InMemoryAssignmentStore;
