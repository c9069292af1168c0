//! Error types for assignment domain validation and invariants.

use super::{PullRequestId, UserId};
use thiserror::Error;

/// Errors returned while constructing or mutating assignment domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AssignmentDomainError {
    /// The pull request identifier is empty after trimming.
    #[error("pull request id must not be empty")]
    EmptyPullRequestId,

    /// The pull request name is empty after trimming.
    #[error("pull request name must not be empty")]
    EmptyPullRequestName,

    /// The user identifier is empty after trimming.
    #[error("user id must not be empty")]
    EmptyUserId,

    /// The user display name is empty after trimming.
    #[error("user name must not be empty")]
    EmptyUserName,

    /// The team name is empty after trimming.
    #[error("team name must not be empty")]
    EmptyTeamName,

    /// A text field exceeds the stored length limit.
    #[error("{field} is {length} characters long, exceeding the limit of 255")]
    TooLong {
        /// Name of the offending field.
        field: &'static str,
        /// Length of the trimmed value in characters.
        length: usize,
    },

    /// A team request listed the same member twice.
    #[error("team member {0} is listed more than once")]
    DuplicateTeamMember(UserId),

    /// The author was offered as one of their own reviewers.
    #[error("author {author} cannot review pull request {pull_request_id}")]
    AuthorAsReviewer {
        /// Pull request being modified.
        pull_request_id: PullRequestId,
        /// Author of the pull request.
        author: UserId,
    },

    /// The reviewer is already part of the assignment set.
    #[error("reviewer {reviewer} is already assigned to pull request {pull_request_id}")]
    ReviewerAlreadyAssigned {
        /// Pull request being modified.
        pull_request_id: PullRequestId,
        /// Reviewer that is already assigned.
        reviewer: UserId,
    },

    /// The reviewer is not part of the assignment set.
    #[error("reviewer {reviewer} is not assigned to pull request {pull_request_id}")]
    ReviewerNotAssigned {
        /// Pull request being modified.
        pull_request_id: PullRequestId,
        /// Reviewer that was expected to be assigned.
        reviewer: UserId,
    },

    /// The pull request is merged and can no longer change.
    #[error("pull request {0} is merged")]
    PullRequestMerged(PullRequestId),
}

impl AssignmentDomainError {
    /// Returns `true` when the error describes malformed caller input rather
    /// than a rejected state change.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptyPullRequestId
                | Self::EmptyPullRequestName
                | Self::EmptyUserId
                | Self::EmptyUserName
                | Self::EmptyTeamName
                | Self::TooLong { .. }
                | Self::DuplicateTeamMember(_)
        )
    }

    /// Names the field a blank-value error refers to.
    #[must_use]
    pub(crate) const fn field(&self) -> &'static str {
        match self {
            Self::EmptyPullRequestId => "pull request id",
            Self::EmptyPullRequestName => "pull request name",
            Self::EmptyUserId => "user id",
            Self::EmptyUserName => "user name",
            Self::EmptyTeamName => "team name",
            _ => "value",
        }
    }
}

/// Error returned while parsing pull request statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown pull request status: {0}")]
pub struct ParsePullRequestStatusError(pub String);
