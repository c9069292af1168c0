//! Pull request aggregate and its review lifecycle.

use super::{
    AssignmentDomainError, DisplayName, ParsePullRequestStatusError, PullRequestId, UserId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Maximum number of reviewers assigned when a pull request is opened.
pub const MAX_INITIAL_REVIEWERS: usize = 2;

/// Pull request lifecycle status.
///
/// `Open` is the initial state and `Merged` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PullRequestStatus {
    /// Awaiting review; the reviewer set may change.
    Open,
    /// Merged; the pull request is frozen.
    Merged,
}

impl PullRequestStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Merged => "MERGED",
        }
    }
}

impl TryFrom<&str> for PullRequestStatus {
    type Error = ParsePullRequestStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "OPEN" => Ok(Self::Open),
            "MERGED" => Ok(Self::Merged),
            _ => Err(ParsePullRequestStatusError(value.to_owned())),
        }
    }
}

/// Pull request aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    id: PullRequestId,
    name: DisplayName,
    author: UserId,
    status: PullRequestStatus,
    reviewers: Vec<UserId>,
    created_at: DateTime<Utc>,
    merged_at: Option<DateTime<Utc>>,
}

/// Parameter object for reconstructing a persisted pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedPullRequestData {
    /// Persisted pull request identifier.
    pub id: PullRequestId,
    /// Persisted pull request name.
    pub name: DisplayName,
    /// Persisted author identifier.
    pub author: UserId,
    /// Persisted lifecycle status.
    pub status: PullRequestStatus,
    /// Persisted reviewer assignments in assignment order.
    pub reviewers: Vec<UserId>,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted merge timestamp, if merged.
    pub merged_at: Option<DateTime<Utc>>,
}

impl PullRequest {
    /// Opens a new pull request with an initial reviewer set.
    ///
    /// # Errors
    ///
    /// Returns [`AssignmentDomainError::AuthorAsReviewer`] when the author is
    /// among `reviewers`, or [`AssignmentDomainError::ReviewerAlreadyAssigned`]
    /// when a reviewer is listed twice.
    pub fn open(
        id: PullRequestId,
        name: DisplayName,
        author: UserId,
        reviewers: Vec<UserId>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, AssignmentDomainError> {
        let mut pull_request = Self {
            id,
            name,
            author,
            status: PullRequestStatus::Open,
            reviewers: Vec::with_capacity(reviewers.len()),
            created_at,
            merged_at: None,
        };
        for reviewer in reviewers {
            pull_request.ensure_assignable(&reviewer)?;
            pull_request.reviewers.push(reviewer);
        }
        Ok(pull_request)
    }

    /// Reconstructs a pull request from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedPullRequestData) -> Self {
        Self {
            id: data.id,
            name: data.name,
            author: data.author,
            status: data.status,
            reviewers: data.reviewers,
            created_at: data.created_at,
            merged_at: data.merged_at,
        }
    }

    /// Returns the pull request identifier.
    #[must_use]
    pub const fn id(&self) -> &PullRequestId {
        &self.id
    }

    /// Returns the pull request name.
    #[must_use]
    pub const fn name(&self) -> &DisplayName {
        &self.name
    }

    /// Returns the author identifier.
    #[must_use]
    pub const fn author(&self) -> &UserId {
        &self.author
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> PullRequestStatus {
        self.status
    }

    /// Returns the assigned reviewers in assignment order.
    #[must_use]
    pub fn reviewers(&self) -> &[UserId] {
        &self.reviewers
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the merge timestamp, if merged.
    #[must_use]
    pub const fn merged_at(&self) -> Option<DateTime<Utc>> {
        self.merged_at
    }

    /// Returns `true` once the pull request has been merged.
    #[must_use]
    pub fn is_merged(&self) -> bool {
        self.status == PullRequestStatus::Merged
    }

    /// Returns `true` when `user` is an assigned reviewer.
    #[must_use]
    pub fn has_reviewer(&self, user: &UserId) -> bool {
        self.reviewers.contains(user)
    }

    /// Returns the users that may not be picked as a new reviewer: the author
    /// and everyone currently assigned.
    #[must_use]
    pub fn exclusion_set(&self) -> HashSet<UserId> {
        std::iter::once(&self.author)
            .chain(&self.reviewers)
            .cloned()
            .collect()
    }

    /// Returns a summary view of this pull request.
    #[must_use]
    pub fn summary(&self) -> PullRequestSummary {
        PullRequestSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            author: self.author.clone(),
            status: self.status,
        }
    }

    /// Fails when the pull request no longer accepts reviewer changes.
    ///
    /// # Errors
    ///
    /// Returns [`AssignmentDomainError::PullRequestMerged`] once merged.
    pub fn ensure_open(&self) -> Result<(), AssignmentDomainError> {
        if self.is_merged() {
            return Err(AssignmentDomainError::PullRequestMerged(self.id.clone()));
        }
        Ok(())
    }

    /// Fails when `reviewer` is not currently assigned.
    ///
    /// # Errors
    ///
    /// Returns [`AssignmentDomainError::ReviewerNotAssigned`].
    pub fn ensure_assigned(&self, reviewer: &UserId) -> Result<(), AssignmentDomainError> {
        if !self.has_reviewer(reviewer) {
            return Err(AssignmentDomainError::ReviewerNotAssigned {
                pull_request_id: self.id.clone(),
                reviewer: reviewer.clone(),
            });
        }
        Ok(())
    }

    /// Merges the pull request.
    ///
    /// Returns `true` when the status changed. Merging an already merged pull
    /// request keeps the original merge timestamp and returns `false`.
    pub fn merge(&mut self, merged_at: DateTime<Utc>) -> bool {
        if self.is_merged() {
            return false;
        }
        self.status = PullRequestStatus::Merged;
        self.merged_at = Some(merged_at);
        true
    }

    /// Replaces `old` with `new`, keeping `old`'s position in the set.
    ///
    /// # Errors
    ///
    /// Returns an [`AssignmentDomainError`] when the pull request is merged,
    /// `old` is not assigned, or `new` is the author or already assigned.
    pub fn replace_reviewer(
        &mut self,
        old: &UserId,
        new: UserId,
    ) -> Result<(), AssignmentDomainError> {
        self.ensure_open()?;
        self.ensure_assigned(old)?;
        self.ensure_assignable(&new)?;
        if let Some(slot) = self.reviewers.iter_mut().find(|reviewer| **reviewer == *old) {
            *slot = new;
        }
        Ok(())
    }

    /// Removes `reviewer` from the assignment set.
    ///
    /// # Errors
    ///
    /// Returns an [`AssignmentDomainError`] when the pull request is merged
    /// or `reviewer` is not assigned.
    pub fn remove_reviewer(&mut self, reviewer: &UserId) -> Result<(), AssignmentDomainError> {
        self.ensure_open()?;
        self.ensure_assigned(reviewer)?;
        self.reviewers.retain(|assigned| assigned != reviewer);
        Ok(())
    }

    fn ensure_assignable(&self, reviewer: &UserId) -> Result<(), AssignmentDomainError> {
        if *reviewer == self.author {
            return Err(AssignmentDomainError::AuthorAsReviewer {
                pull_request_id: self.id.clone(),
                author: self.author.clone(),
            });
        }
        if self.has_reviewer(reviewer) {
            return Err(AssignmentDomainError::ReviewerAlreadyAssigned {
                pull_request_id: self.id.clone(),
                reviewer: reviewer.clone(),
            });
        }
        Ok(())
    }
}

/// Short pull request view used in reviewer assignment listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestSummary {
    id: PullRequestId,
    name: DisplayName,
    author: UserId,
    status: PullRequestStatus,
}

impl PullRequestSummary {
    /// Creates a summary from its parts.
    #[must_use]
    pub const fn new(
        id: PullRequestId,
        name: DisplayName,
        author: UserId,
        status: PullRequestStatus,
    ) -> Self {
        Self {
            id,
            name,
            author,
            status,
        }
    }

    /// Returns the pull request identifier.
    #[must_use]
    pub const fn id(&self) -> &PullRequestId {
        &self.id
    }

    /// Returns the pull request name.
    #[must_use]
    pub const fn name(&self) -> &DisplayName {
        &self.name
    }

    /// Returns the author identifier.
    #[must_use]
    pub const fn author(&self) -> &UserId {
        &self.author
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> PullRequestStatus {
        self.status
    }
}

/// Outcome of replacing one inactive reviewer during bulk reassignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewerReassignment {
    old_reviewer_id: UserId,
    new_reviewer_id: Option<UserId>,
    was_removed: bool,
}

impl ReviewerReassignment {
    /// Records that `old` was replaced by `new`.
    #[must_use]
    pub const fn replaced(old: UserId, new: UserId) -> Self {
        Self {
            old_reviewer_id: old,
            new_reviewer_id: Some(new),
            was_removed: false,
        }
    }

    /// Records that `old` was dropped because nobody could replace them.
    #[must_use]
    pub const fn removed(old: UserId) -> Self {
        Self {
            old_reviewer_id: old,
            new_reviewer_id: None,
            was_removed: true,
        }
    }

    /// Returns the reviewer that was taken off the pull request.
    #[must_use]
    pub const fn old_reviewer_id(&self) -> &UserId {
        &self.old_reviewer_id
    }

    /// Returns the substitute reviewer, if one was found.
    #[must_use]
    pub const fn new_reviewer_id(&self) -> Option<&UserId> {
        self.new_reviewer_id.as_ref()
    }

    /// Returns `true` when the reviewer was removed without a substitute.
    #[must_use]
    pub const fn was_removed(&self) -> bool {
        self.was_removed
    }
}
