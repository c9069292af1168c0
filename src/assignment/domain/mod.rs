//! Domain model for reviewer assignment.
//!
//! Teams own users; pull requests carry a reviewer set drawn from the
//! author's team. The [`PullRequest`] aggregate guards the review lifecycle
//! so that merged pull requests stay frozen and authors never review their
//! own work.

mod error;
mod ids;
mod pull_request;
mod team;

pub use error::{AssignmentDomainError, ParsePullRequestStatusError};
pub use ids::{DisplayName, MAX_TEXT_LEN, PullRequestId, TeamName, UserId};
pub use pull_request::{
    MAX_INITIAL_REVIEWERS, PersistedPullRequestData, PullRequest, PullRequestStatus,
    PullRequestSummary, ReviewerReassignment,
};
pub use team::{Team, TeamMember, User};
