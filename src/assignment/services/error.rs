//! Service-level error taxonomy.
//!
//! Store and domain failures are translated here into the kinds a caller maps
//! to responses. Unexpected failures are logged and collapsed into an opaque
//! [`AssignmentError::Internal`].

use crate::assignment::{
    domain::{AssignmentDomainError, PullRequestId, TeamName, UserId},
    ports::StoreError,
};
use std::fmt;
use thiserror::Error;

/// Stable machine-readable error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// `NOT_FOUND`
    NotFound,
    /// `PR_EXISTS`
    PullRequestExists,
    /// `TEAM_EXISTS`
    TeamExists,
    /// `PR_MERGED`
    PullRequestMerged,
    /// `NOT_ASSIGNED`
    ReviewerMissing,
    /// `NO_CANDIDATE`
    NoCandidate,
    /// `INVALID_INPUT`
    InvalidInput,
    /// `INTERNAL_ERROR`
    Internal,
}

impl ErrorCode {
    /// Returns the wire representation of the code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::PullRequestExists => "PR_EXISTS",
            Self::TeamExists => "TEAM_EXISTS",
            Self::PullRequestMerged => "PR_MERGED",
            Self::ReviewerMissing => "NOT_ASSIGNED",
            Self::NoCandidate => "NO_CANDIDATE",
            Self::InvalidInput => "INVALID_INPUT",
            Self::Internal => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entity referenced by a not-found or already-exists error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    /// A pull request.
    PullRequest(PullRequestId),
    /// A user.
    User(UserId),
    /// A team.
    Team(TeamName),
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PullRequest(id) => write!(f, "pull request '{id}'"),
            Self::User(id) => write!(f, "user '{id}'"),
            Self::Team(name) => write!(f, "team '{name}'"),
        }
    }
}

/// State-incompatible mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConflictKind {
    /// Reviewers cannot change on a merged pull request.
    #[error("cannot reassign reviewer on merged pull request")]
    ReassignOnMerged,
    /// The user is not assigned as a reviewer of the pull request.
    #[error("user is not assigned as reviewer to this pull request")]
    ReviewerMissing,
    /// No active teammate can take over the review.
    #[error("no active replacement candidate available in team")]
    NoCandidate,
}

impl ConflictKind {
    /// Returns the stable code for this conflict.
    #[must_use]
    pub const fn code(self) -> ErrorCode {
        match self {
            Self::ReassignOnMerged => ErrorCode::PullRequestMerged,
            Self::ReviewerMissing => ErrorCode::ReviewerMissing,
            Self::NoCandidate => ErrorCode::NoCandidate,
        }
    }
}

/// Errors returned by the reviewer assignment service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssignmentError {
    /// The referenced entity does not exist.
    #[error("{0} not found")]
    NotFound(Resource),
    /// The entity being created already exists.
    #[error("{0} already exists")]
    AlreadyExists(Resource),
    /// The mutation is incompatible with the current state.
    #[error(transparent)]
    Conflict(#[from] ConflictKind),
    /// A request value failed validation.
    #[error("invalid input: {0}")]
    InvalidInput(AssignmentDomainError),
    /// Unexpected failure; details are logged, never returned.
    #[error("internal error")]
    Internal,
}

impl AssignmentError {
    /// Returns the stable code a caller maps to a response.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::AlreadyExists(Resource::Team(_)) => ErrorCode::TeamExists,
            Self::AlreadyExists(_) => ErrorCode::PullRequestExists,
            Self::Conflict(kind) => kind.code(),
            Self::InvalidInput(_) => ErrorCode::InvalidInput,
            Self::Internal => ErrorCode::Internal,
        }
    }
}

impl From<StoreError> for AssignmentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicatePullRequest(id) => Self::AlreadyExists(Resource::PullRequest(id)),
            StoreError::DuplicateTeam(name) => Self::AlreadyExists(Resource::Team(name)),
            StoreError::PullRequestNotFound(id) => Self::NotFound(Resource::PullRequest(id)),
            StoreError::UserNotFound(id) => Self::NotFound(Resource::User(id)),
            StoreError::TeamNotFound(name) => Self::NotFound(Resource::Team(name)),
            StoreError::AssignmentNotFound { .. } => Self::Conflict(ConflictKind::ReviewerMissing),
            StoreError::DuplicateAssignment { .. } | StoreError::Persistence(_) => {
                tracing::error!(error = %err, "store operation failed");
                Self::Internal
            }
        }
    }
}

impl From<AssignmentDomainError> for AssignmentError {
    fn from(err: AssignmentDomainError) -> Self {
        match err {
            AssignmentDomainError::PullRequestMerged(_) => {
                Self::Conflict(ConflictKind::ReassignOnMerged)
            }
            AssignmentDomainError::ReviewerNotAssigned { .. } => {
                Self::Conflict(ConflictKind::ReviewerMissing)
            }
            validation if validation.is_validation() => Self::InvalidInput(validation),
            invariant => {
                tracing::error!(error = %invariant, "assignment invariant violated");
                Self::Internal
            }
        }
    }
}

/// Result type for assignment service operations.
pub type AssignmentResult<T> = Result<T, AssignmentError>;
