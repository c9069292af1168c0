//! Repository ports for teams, users, pull requests and reviewer
//! assignments.
//!
//! Repositories are only reachable through an open
//! [`AssignmentTransaction`](super::AssignmentTransaction), so every call
//! they make belongs to a single unit of work.

use crate::assignment::domain::{
    PullRequest, PullRequestId, PullRequestSummary, Team, TeamName, User, UserId,
};
use std::sync::Arc;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Pull request and reviewer-assignment persistence contract.
pub trait PullRequestRepository {
    /// Finds a pull request, including its reviewers, by identifier.
    ///
    /// Returns `None` when the pull request does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] when the lookup fails.
    fn find_by_id(&mut self, id: &PullRequestId) -> StoreResult<Option<PullRequest>>;

    /// Finds a pull request and locks it against concurrent mutation until
    /// the enclosing unit of work ends.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] when the lookup fails.
    fn lock_by_id(&mut self, id: &PullRequestId) -> StoreResult<Option<PullRequest>>;

    /// Stores a new pull request row. Reviewer rows are written separately
    /// through [`Self::assign_reviewer`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicatePullRequest`] when the identifier is
    /// taken.
    fn create(&mut self, pull_request: &PullRequest) -> StoreResult<()>;

    /// Persists status and merge timestamp changes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::PullRequestNotFound`] when the row is missing.
    fn update(&mut self, pull_request: &PullRequest) -> StoreResult<()>;

    /// Adds a reviewer-assignment row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateAssignment`] when the pair already
    /// exists, [`StoreError::PullRequestNotFound`] or
    /// [`StoreError::UserNotFound`] when either side is missing.
    fn assign_reviewer(
        &mut self,
        pull_request_id: &PullRequestId,
        reviewer: &UserId,
    ) -> StoreResult<()>;

    /// Removes a reviewer-assignment row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AssignmentNotFound`] when the pair is absent.
    fn unassign_reviewer(
        &mut self,
        pull_request_id: &PullRequestId,
        reviewer: &UserId,
    ) -> StoreResult<()>;

    /// Lists assigned reviewers of a pull request whose active flag is false,
    /// in assignment order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] when the query fails.
    fn list_inactive_reviewers(
        &mut self,
        pull_request_id: &PullRequestId,
    ) -> StoreResult<Vec<UserId>>;

    /// Lists every pull request the user is assigned to review, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] when the query fails.
    fn list_by_reviewer(&mut self, reviewer: &UserId) -> StoreResult<Vec<PullRequestSummary>>;
}

/// User persistence contract.
pub trait UserRepository {
    /// Finds a user by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] when the lookup fails.
    fn find_by_id(&mut self, id: &UserId) -> StoreResult<Option<User>>;

    /// Persists name, team and active flag changes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UserNotFound`] when the user does not exist.
    fn update(&mut self, user: &User) -> StoreResult<()>;

    /// Lists the active members of `user`'s team, excluding `user`, ordered
    /// by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UserNotFound`] when `user` does not exist.
    fn list_active_teammates(&mut self, user: &UserId) -> StoreResult<Vec<User>>;
}

/// Team persistence contract.
pub trait TeamRepository {
    /// Stores a new team and upserts its members by identifier, returning
    /// the team as persisted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateTeam`] when the name is taken.
    fn create(&mut self, team: &Team) -> StoreResult<Team>;

    /// Finds a team and its members, ordered by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] when the lookup fails.
    fn find_by_name(&mut self, name: &TeamName) -> StoreResult<Option<Team>>;

    /// Marks every active member of the team inactive and returns how many
    /// users changed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TeamNotFound`] when the team does not exist, or
    /// [`StoreError::Persistence`] when the update fails.
    fn deactivate_members(&mut self, name: &TeamName) -> StoreResult<u64>;
}

/// Errors returned by store implementations.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// A pull request with the same identifier already exists.
    #[error("duplicate pull request identifier: {0}")]
    DuplicatePullRequest(PullRequestId),

    /// A team with the same name already exists.
    #[error("duplicate team name: {0}")]
    DuplicateTeam(TeamName),

    /// The reviewer is already assigned to the pull request.
    #[error("reviewer {reviewer} already assigned to pull request {pull_request_id}")]
    DuplicateAssignment {
        /// Pull request side of the pair.
        pull_request_id: PullRequestId,
        /// Reviewer side of the pair.
        reviewer: UserId,
    },

    /// The pull request was not found.
    #[error("pull request not found: {0}")]
    PullRequestNotFound(PullRequestId),

    /// The user was not found.
    #[error("user not found: {0}")]
    UserNotFound(UserId),

    /// The team was not found.
    #[error("team not found: {0}")]
    TeamNotFound(TeamName),

    /// The reviewer is not assigned to the pull request.
    #[error("reviewer {reviewer} is not assigned to pull request {pull_request_id}")]
    AssignmentNotFound {
        /// Pull request side of the pair.
        pull_request_id: PullRequestId,
        /// Reviewer side of the pair.
        reviewer: UserId,
    },

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
