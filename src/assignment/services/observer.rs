//! Optional instrumentation hooks for the assignment service.
//!
//! Observers are notified after a unit of work commits, so they never see
//! rolled-back changes. All methods default to no-ops.

use super::ErrorCode;
use crate::assignment::domain::{PullRequest, PullRequestId, TeamName, UserId};
use std::time::Duration;

/// Service operation reported to [`AssignmentObserver::operation_finished`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignmentOperation {
    /// Pull request creation.
    CreatePullRequest,
    /// Pull request merge.
    MergePullRequest,
    /// Single reviewer reassignment.
    ReassignPullRequest,
    /// Bulk replacement of inactive reviewers.
    ReassignInactiveReviewers,
    /// Team creation.
    CreateTeam,
    /// Team lookup.
    GetTeam,
    /// Bulk team deactivation.
    DeactivateTeamMembers,
    /// User activity toggle.
    SetUserActive,
    /// Reviewer assignment listing.
    GetReviewerAssignments,
}

impl AssignmentOperation {
    /// Returns a stable label suitable for metric dimensions.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreatePullRequest => "create_pull_request",
            Self::MergePullRequest => "merge_pull_request",
            Self::ReassignPullRequest => "reassign_pull_request",
            Self::ReassignInactiveReviewers => "reassign_inactive_reviewers",
            Self::CreateTeam => "create_team",
            Self::GetTeam => "get_team",
            Self::DeactivateTeamMembers => "deactivate_team_members",
            Self::SetUserActive => "set_user_active",
            Self::GetReviewerAssignments => "get_reviewer_assignments",
        }
    }
}

/// Receives notifications about committed assignment changes.
pub trait AssignmentObserver: Send + Sync {
    /// A pull request was opened with its initial reviewers.
    fn pull_request_created(&self, _pull_request: &PullRequest) {}

    /// A pull request moved from open to merged. Not called for repeated
    /// merges.
    fn pull_request_merged(&self, _pull_request: &PullRequest) {}

    /// A reviewer was replaced.
    fn reviewer_reassigned(
        &self,
        _pull_request_id: &PullRequestId,
        _old_reviewer: &UserId,
        _new_reviewer: &UserId,
    ) {
    }

    /// An inactive reviewer was dropped without a substitute.
    fn reviewer_removed(&self, _pull_request_id: &PullRequestId, _reviewer: &UserId) {}

    /// A single reassignment failed because nobody could take over.
    fn no_candidate(&self, _pull_request_id: &PullRequestId, _reviewer: &UserId) {}

    /// Members of a team were deactivated.
    fn team_members_deactivated(&self, _team: &TeamName, _count: u64) {}

    /// An operation finished; `error` is `None` on success.
    fn operation_finished(
        &self,
        _operation: AssignmentOperation,
        _elapsed: Duration,
        _error: Option<ErrorCode>,
    ) {
    }
}

/// Observer that ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl AssignmentObserver for NoopObserver {}
