//! Unit-of-work port.
//!
//! A unit of work hands a closure an [`AssignmentTransaction`] and commits
//! every write the closure made if, and only if, it returns `Ok`. The closure
//! is synchronous: `PostgreSQL` adapters run it on a blocking thread.

use super::{PullRequestRepository, StoreError, TeamRepository, UserRepository};
use async_trait::async_trait;

/// Repository access scoped to one open transaction.
pub trait AssignmentTransaction {
    /// Returns the pull request repository bound to this transaction.
    fn pull_requests(&mut self) -> &mut dyn PullRequestRepository;

    /// Returns the user repository bound to this transaction.
    fn users(&mut self) -> &mut dyn UserRepository;

    /// Returns the team repository bound to this transaction.
    fn teams(&mut self) -> &mut dyn TeamRepository;
}

/// Atomic execution contract for multi-step store mutations.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// Runs `work` inside a transaction.
    ///
    /// All writes are committed when `work` returns `Ok` and rolled back when
    /// it returns `Err`. Failures of the transaction machinery itself are
    /// reported through `E::from(StoreError)`.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `work`, or a converted [`StoreError`]
    /// when the transaction cannot be opened or committed.
    async fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn AssignmentTransaction) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<StoreError> + Send + 'static;
}
