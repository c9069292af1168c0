//! Shared test helpers for in-memory store integration tests.

use mockable::DefaultClock;
use reviewer_rotation::assignment::{
    adapters::memory::InMemoryAssignmentStore,
    services::{CreateTeamRequest, ReviewerAssignmentService},
};
use rstest::fixture;
use std::io;
use std::sync::Arc;
use tokio::runtime::Runtime;

/// Service type used by the in-memory integration tests.
pub type MemoryService = ReviewerAssignmentService<InMemoryAssignmentStore, DefaultClock>;

/// Provides a tokio runtime for async operations in tests.
///
/// # Errors
///
/// Returns an error if the runtime cannot be created.
#[fixture]
pub fn runtime() -> io::Result<Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
}

/// Provides a service over a fresh in-memory store.
#[fixture]
pub fn service() -> Arc<MemoryService> {
    Arc::new(ReviewerAssignmentService::new(
        Arc::new(InMemoryAssignmentStore::new()),
        Arc::new(DefaultClock),
    ))
}

/// Team `platform`: author `ana` plus `ben`, `cat` and `dan`, all active.
#[must_use]
pub fn platform_team() -> CreateTeamRequest {
    CreateTeamRequest::new("platform")
        .with_member("ana", "Ana", true)
        .with_member("ben", "Ben", true)
        .with_member("cat", "Cat", true)
        .with_member("dan", "Dan", true)
}
