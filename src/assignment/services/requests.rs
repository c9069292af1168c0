//! Request and outcome types for the assignment service.

use crate::assignment::domain::{
    AssignmentDomainError, DisplayName, PullRequest, PullRequestId, ReviewerReassignment, Team,
    TeamMember, TeamName, UserId,
};

/// Request payload for opening a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePullRequestRequest {
    id: String,
    name: String,
    author_id: String,
}

impl CreatePullRequestRequest {
    /// Creates a request with the required pull request fields.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        author_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            author_id: author_id.into(),
        }
    }

    /// Returns the raw pull request identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the raw author identifier.
    #[must_use]
    pub fn author_id(&self) -> &str {
        &self.author_id
    }

    pub(super) fn into_parts(
        self,
    ) -> Result<(PullRequestId, DisplayName, UserId), AssignmentDomainError> {
        Ok((
            PullRequestId::new(self.id)?,
            DisplayName::new(self.name, AssignmentDomainError::EmptyPullRequestName)?,
            UserId::new(self.author_id)?,
        ))
    }
}

/// Request payload for replacing one reviewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReassignReviewerRequest {
    pull_request_id: String,
    old_reviewer_id: String,
}

impl ReassignReviewerRequest {
    /// Creates a request to replace `old_reviewer_id` on `pull_request_id`.
    #[must_use]
    pub fn new(pull_request_id: impl Into<String>, old_reviewer_id: impl Into<String>) -> Self {
        Self {
            pull_request_id: pull_request_id.into(),
            old_reviewer_id: old_reviewer_id.into(),
        }
    }

    /// Returns the raw pull request identifier.
    #[must_use]
    pub fn pull_request_id(&self) -> &str {
        &self.pull_request_id
    }

    /// Returns the raw identifier of the reviewer being replaced.
    #[must_use]
    pub fn old_reviewer_id(&self) -> &str {
        &self.old_reviewer_id
    }

    pub(super) fn into_parts(self) -> Result<(PullRequestId, UserId), AssignmentDomainError> {
        Ok((
            PullRequestId::new(self.pull_request_id)?,
            UserId::new(self.old_reviewer_id)?,
        ))
    }
}

/// Request payload for creating a team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTeamRequest {
    name: String,
    members: Vec<(String, String, bool)>,
}

impl CreateTeamRequest {
    /// Creates a request for a team without members.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
        }
    }

    /// Adds a member. Members are upserted by `user_id` on creation.
    #[must_use]
    pub fn with_member(
        mut self,
        user_id: impl Into<String>,
        user_name: impl Into<String>,
        active: bool,
    ) -> Self {
        self.members.push((user_id.into(), user_name.into(), active));
        self
    }

    /// Returns the raw team name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(super) fn into_team(self) -> Result<Team, AssignmentDomainError> {
        let name = TeamName::new(self.name)?;
        let members = self
            .members
            .into_iter()
            .map(|(id, user_name, active)| TeamMember::from_parts(id, user_name, active))
            .collect::<Result<Vec<_>, _>>()?;
        Team::new(name, members)
    }
}

/// Result of a successful single reviewer reassignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReassignOutcome {
    /// Pull request with the updated reviewer set.
    pub pull_request: PullRequest,
    /// Reviewer who took over.
    pub replaced_by: UserId,
}

/// Result of replacing every inactive reviewer of a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InactiveReassignmentReport {
    /// Pull request with the updated reviewer set.
    pub pull_request: PullRequest,
    /// Per-reviewer outcomes in the order the inactive reviewers were found.
    pub reassignments: Vec<ReviewerReassignment>,
}
