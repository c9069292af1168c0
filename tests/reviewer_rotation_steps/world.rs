//! Shared world state for reviewer rotation BDD scenarios.

use std::sync::Arc;

use mockable::DefaultClock;
use reviewer_rotation::assignment::{
    adapters::memory::InMemoryAssignmentStore,
    domain::{PullRequest, UserId},
    services::{
        AssignmentError, InactiveReassignmentReport, ReassignOutcome, ReviewerAssignmentService,
    },
};
use rstest::fixture;

/// Service type used by the BDD world.
pub type TestRotationService = ReviewerAssignmentService<InMemoryAssignmentStore, DefaultClock>;

/// Scenario world for reviewer rotation behaviour tests.
pub struct RotationWorld {
    pub service: TestRotationService,
    pub last_pull_request: Option<PullRequest>,
    pub deactivated_reviewer: Option<UserId>,
    pub last_bulk_result: Option<Result<InactiveReassignmentReport, AssignmentError>>,
    pub last_reassign_result: Option<Result<ReassignOutcome, AssignmentError>>,
}

impl RotationWorld {
    /// Creates a world over an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        let service = ReviewerAssignmentService::new(
            Arc::new(InMemoryAssignmentStore::new()),
            Arc::new(DefaultClock),
        );
        Self {
            service,
            last_pull_request: None,
            deactivated_reviewer: None,
            last_bulk_result: None,
            last_reassign_result: None,
        }
    }

    /// Returns the pull request most recently opened or merged.
    ///
    /// # Errors
    ///
    /// Returns an error when no pull request has been recorded yet.
    pub fn pull_request(&self) -> Result<&PullRequest, eyre::Report> {
        self.last_pull_request
            .as_ref()
            .ok_or_else(|| eyre::eyre!("missing pull request in scenario world"))
    }

    /// Returns the first reviewer of the recorded pull request.
    ///
    /// # Errors
    ///
    /// Returns an error when the pull request has no reviewers.
    pub fn first_reviewer(&self) -> Result<UserId, eyre::Report> {
        self.pull_request()?
            .reviewers()
            .first()
            .cloned()
            .ok_or_else(|| eyre::eyre!("pull request has no reviewers"))
    }
}

impl Default for RotationWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> RotationWorld {
    RotationWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
