//! Pull request lifecycle operations: open, merge, reassign.

use super::{
    AssignmentError, AssignmentOperation, AssignmentResult, CandidateSelector, ConflictKind,
    CreatePullRequestRequest, InactiveReassignmentReport, ReassignOutcome,
    ReassignReviewerRequest, Resource, ReviewerAssignmentService,
};
use crate::assignment::{
    domain::{
        DisplayName, MAX_INITIAL_REVIEWERS, PullRequest, PullRequestId, ReviewerReassignment,
        UserId,
    },
    ports::{AssignmentTransaction, UnitOfWork},
};
use chrono::{DateTime, SubsecRound, Utc};
use mockable::Clock;
use std::collections::HashSet;
use std::time::Instant;
use tracing::{info, instrument};

impl<S, C> ReviewerAssignmentService<S, C>
where
    S: UnitOfWork,
    C: Clock + Send + Sync,
{
    /// Opens a pull request and assigns up to two active teammates of the
    /// author as reviewers.
    ///
    /// # Errors
    ///
    /// Returns [`AssignmentError::AlreadyExists`] when the identifier is
    /// taken, [`AssignmentError::NotFound`] when the author is unknown, and
    /// [`AssignmentError::InvalidInput`] for blank request fields.
    #[instrument(skip(self, request), fields(pull_request_id = request.id(), author_id = request.author_id()))]
    pub async fn create_pull_request(
        &self,
        request: CreatePullRequestRequest,
    ) -> AssignmentResult<PullRequest> {
        let started = Instant::now();
        let result = self.open(request).await;
        self.finish(AssignmentOperation::CreatePullRequest, started, result)
    }

    /// Merges a pull request. Merging twice returns the stored pull request
    /// unchanged, including its original merge timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`AssignmentError::NotFound`] when the pull request is
    /// unknown.
    #[instrument(skip(self))]
    pub async fn merge_pull_request(&self, pull_request_id: &str) -> AssignmentResult<PullRequest> {
        let started = Instant::now();
        let result = self.merge(pull_request_id).await;
        self.finish(AssignmentOperation::MergePullRequest, started, result)
    }

    /// Replaces one reviewer with a random active teammate of that reviewer.
    ///
    /// # Errors
    ///
    /// Returns [`AssignmentError::NotFound`] when the pull request is
    /// unknown, or [`AssignmentError::Conflict`] when it is merged, the
    /// reviewer is not assigned, or nobody can take over.
    #[instrument(skip(self, request), fields(pull_request_id = request.pull_request_id(), old_reviewer_id = request.old_reviewer_id()))]
    pub async fn reassign_pull_request(
        &self,
        request: ReassignReviewerRequest,
    ) -> AssignmentResult<ReassignOutcome> {
        let started = Instant::now();
        let result = self.reassign(request).await;
        self.finish(AssignmentOperation::ReassignPullRequest, started, result)
    }

    /// Replaces every inactive reviewer of a pull request, dropping those
    /// for whom no substitute exists.
    ///
    /// # Errors
    ///
    /// Returns [`AssignmentError::NotFound`] when the pull request is
    /// unknown, or [`AssignmentError::Conflict`] when it is merged.
    #[instrument(skip(self))]
    pub async fn reassign_inactive_reviewers(
        &self,
        pull_request_id: &str,
    ) -> AssignmentResult<InactiveReassignmentReport> {
        let started = Instant::now();
        let result = self.reassign_inactive(pull_request_id).await;
        self.finish(AssignmentOperation::ReassignInactiveReviewers, started, result)
    }

    async fn open(&self, request: CreatePullRequestRequest) -> AssignmentResult<PullRequest> {
        let (id, name, author) = request.into_parts()?;
        let selector = self.selector;
        let created_at = stored_instant(self.clock.utc());

        let pull_request = self
            .store
            .transaction(move |tx| open_in(tx, selector, id, name, author, created_at))
            .await?;

        info!(
            reviewers = pull_request.reviewers().len(),
            "pull request opened"
        );
        self.observer.pull_request_created(&pull_request);
        Ok(pull_request)
    }

    async fn merge(&self, pull_request_id: &str) -> AssignmentResult<PullRequest> {
        let id = PullRequestId::new(pull_request_id)?;
        let merged_at = stored_instant(self.clock.utc());

        let (pull_request, transitioned) = self
            .store
            .transaction(move |tx| merge_in(tx, &id, merged_at))
            .await?;

        if transitioned {
            info!("pull request merged");
            self.observer.pull_request_merged(&pull_request);
        }
        Ok(pull_request)
    }

    async fn reassign(&self, request: ReassignReviewerRequest) -> AssignmentResult<ReassignOutcome> {
        let (id, old_reviewer) = request.into_parts()?;
        let selector = self.selector;
        let work_id = id.clone();
        let work_reviewer = old_reviewer.clone();

        let result = self
            .store
            .transaction(move |tx| reassign_in(tx, selector, &work_id, &work_reviewer))
            .await;

        match &result {
            Ok(outcome) => {
                info!(new_reviewer_id = %outcome.replaced_by, "reviewer reassigned");
                self.observer
                    .reviewer_reassigned(&id, &old_reviewer, &outcome.replaced_by);
            }
            Err(AssignmentError::Conflict(ConflictKind::NoCandidate)) => {
                self.observer.no_candidate(&id, &old_reviewer);
            }
            Err(_) => {}
        }
        result
    }

    async fn reassign_inactive(
        &self,
        pull_request_id: &str,
    ) -> AssignmentResult<InactiveReassignmentReport> {
        let id = PullRequestId::new(pull_request_id)?;
        let selector = self.selector;

        let report = self
            .store
            .transaction(move |tx| reassign_inactive_in(tx, selector, &id))
            .await?;

        let updated = report.pull_request.id();
        for reassignment in &report.reassignments {
            let old = reassignment.old_reviewer_id();
            match reassignment.new_reviewer_id() {
                Some(new) => self.observer.reviewer_reassigned(updated, old, new),
                None => self.observer.reviewer_removed(updated, old),
            }
        }
        if !report.reassignments.is_empty() {
            info!(
                reassigned = report.reassignments.len(),
                "inactive reviewers reassigned"
            );
        }
        Ok(report)
    }
}

/// Truncates `instant` to the microsecond precision timestamps are stored
/// with, so the value returned now equals the value read back later.
fn stored_instant(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant.trunc_subsecs(6)
}

fn open_in(
    tx: &mut dyn AssignmentTransaction,
    selector: CandidateSelector,
    id: PullRequestId,
    name: DisplayName,
    author: UserId,
    created_at: DateTime<Utc>,
) -> AssignmentResult<PullRequest> {
    // The unique key on insert still decides concurrent creates.
    if tx.pull_requests().find_by_id(&id)?.is_some() {
        return Err(AssignmentError::AlreadyExists(Resource::PullRequest(id)));
    }

    let teammates = tx.users().list_active_teammates(&author)?;
    let reviewers = selector
        .pick(&teammates, &HashSet::new(), MAX_INITIAL_REVIEWERS)
        .into_iter()
        .map(|user| user.id().clone())
        .collect();

    let pull_request = PullRequest::open(id, name, author, reviewers, created_at)?;
    tx.pull_requests().create(&pull_request)?;
    for reviewer in pull_request.reviewers() {
        tx.pull_requests()
            .assign_reviewer(pull_request.id(), reviewer)?;
    }
    Ok(pull_request)
}

fn merge_in(
    tx: &mut dyn AssignmentTransaction,
    id: &PullRequestId,
    merged_at: DateTime<Utc>,
) -> AssignmentResult<(PullRequest, bool)> {
    let mut pull_request = lock_pull_request(tx, id)?;
    let transitioned = pull_request.merge(merged_at);
    if transitioned {
        tx.pull_requests().update(&pull_request)?;
    }
    Ok((pull_request, transitioned))
}

fn reassign_in(
    tx: &mut dyn AssignmentTransaction,
    selector: CandidateSelector,
    id: &PullRequestId,
    old_reviewer: &UserId,
) -> AssignmentResult<ReassignOutcome> {
    let mut pull_request = lock_pull_request(tx, id)?;
    pull_request.ensure_open()?;
    pull_request.ensure_assigned(old_reviewer)?;

    let teammates = tx.users().list_active_teammates(old_reviewer)?;
    let excluded = pull_request.exclusion_set();
    let replacement = selector
        .pick(&teammates, &excluded, 1)
        .into_iter()
        .next()
        .ok_or(ConflictKind::NoCandidate)?;
    let replaced_by = replacement.id().clone();

    tx.pull_requests().unassign_reviewer(id, old_reviewer)?;
    tx.pull_requests().assign_reviewer(id, &replaced_by)?;
    pull_request.replace_reviewer(old_reviewer, replaced_by.clone())?;

    Ok(ReassignOutcome {
        pull_request,
        replaced_by,
    })
}

fn reassign_inactive_in(
    tx: &mut dyn AssignmentTransaction,
    selector: CandidateSelector,
    id: &PullRequestId,
) -> AssignmentResult<InactiveReassignmentReport> {
    let mut pull_request = lock_pull_request(tx, id)?;
    pull_request.ensure_open()?;

    let inactive = tx.pull_requests().list_inactive_reviewers(id)?;
    let mut reassignments = Vec::with_capacity(inactive.len());
    // Grows with every substitute so one batch never picks the same person
    // twice.
    let mut excluded = pull_request.exclusion_set();

    for old_reviewer in inactive {
        let teammates = tx.users().list_active_teammates(&old_reviewer)?;
        let candidate = selector.pick(&teammates, &excluded, 1).into_iter().next();
        tx.pull_requests().unassign_reviewer(id, &old_reviewer)?;

        let Some(replacement) = candidate else {
            pull_request.remove_reviewer(&old_reviewer)?;
            reassignments.push(ReviewerReassignment::removed(old_reviewer));
            continue;
        };

        let new_reviewer = replacement.id().clone();
        tx.pull_requests().assign_reviewer(id, &new_reviewer)?;
        pull_request.replace_reviewer(&old_reviewer, new_reviewer.clone())?;
        excluded.insert(new_reviewer.clone());
        reassignments.push(ReviewerReassignment::replaced(old_reviewer, new_reviewer));
    }

    Ok(InactiveReassignmentReport {
        pull_request,
        reassignments,
    })
}

fn lock_pull_request(
    tx: &mut dyn AssignmentTransaction,
    id: &PullRequestId,
) -> AssignmentResult<PullRequest> {
    tx.pull_requests()
        .lock_by_id(id)?
        .ok_or_else(|| AssignmentError::NotFound(Resource::PullRequest(id.clone())))
}
