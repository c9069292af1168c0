//! In-memory assignment store for tests and local runs.

use crate::assignment::{
    domain::{
        PersistedPullRequestData, PullRequest, PullRequestId, PullRequestSummary, Team,
        TeamMember, TeamName, User, UserId,
    },
    ports::{
        AssignmentTransaction, PullRequestRepository, StoreError, StoreResult, TeamRepository,
        UnitOfWork, UserRepository,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

/// Thread-safe in-memory store.
///
/// Each unit of work runs against a private copy of the whole store while
/// holding the store lock, and the copy replaces the shared state only when
/// the work succeeds. Transactions are therefore fully serialised.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAssignmentStore {
    state: Arc<Mutex<InMemoryState>>,
}

#[derive(Debug, Clone, Default)]
struct InMemoryState {
    teams: BTreeSet<TeamName>,
    users: BTreeMap<UserId, User>,
    // Reviewer lists are kept empty here and rebuilt from `assignments`.
    pull_requests: BTreeMap<PullRequestId, PersistedPullRequestData>,
    // Assignment order is insertion order.
    assignments: Vec<(PullRequestId, UserId)>,
}

impl InMemoryAssignmentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UnitOfWork for InMemoryAssignmentStore {
    async fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn AssignmentTransaction) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<StoreError> + Send + 'static,
    {
        let mut state = self.state.lock().map_err(|err| {
            E::from(StoreError::persistence(std::io::Error::other(
                err.to_string(),
            )))
        })?;
        let mut working = state.clone();
        let value = work(&mut working)?;
        *state = working;
        Ok(value)
    }
}

impl InMemoryState {
    fn load(&self, id: &PullRequestId) -> Option<PullRequest> {
        let mut data = self.pull_requests.get(id)?.clone();
        data.reviewers = self.reviewers_of(id);
        Some(PullRequest::from_persisted(data))
    }

    fn reviewers_of(&self, id: &PullRequestId) -> Vec<UserId> {
        self.assignments
            .iter()
            .filter(|(pull_request_id, _)| pull_request_id == id)
            .map(|(_, reviewer)| reviewer.clone())
            .collect()
    }

    fn is_assigned(&self, id: &PullRequestId, reviewer: &UserId) -> bool {
        self.assignments
            .iter()
            .any(|(pull_request_id, assigned)| pull_request_id == id && assigned == reviewer)
    }
}

impl AssignmentTransaction for InMemoryState {
    fn pull_requests(&mut self) -> &mut dyn PullRequestRepository {
        self
    }

    fn users(&mut self) -> &mut dyn UserRepository {
        self
    }

    fn teams(&mut self) -> &mut dyn TeamRepository {
        self
    }
}

impl PullRequestRepository for InMemoryState {
    fn find_by_id(&mut self, id: &PullRequestId) -> StoreResult<Option<PullRequest>> {
        Ok(self.load(id))
    }

    fn lock_by_id(&mut self, id: &PullRequestId) -> StoreResult<Option<PullRequest>> {
        // The store lock is already held for the whole unit of work.
        Ok(self.load(id))
    }

    fn create(&mut self, pull_request: &PullRequest) -> StoreResult<()> {
        if self.pull_requests.contains_key(pull_request.id()) {
            return Err(StoreError::DuplicatePullRequest(pull_request.id().clone()));
        }
        if !self.users.contains_key(pull_request.author()) {
            return Err(StoreError::UserNotFound(pull_request.author().clone()));
        }
        let data = PersistedPullRequestData {
            id: pull_request.id().clone(),
            name: pull_request.name().clone(),
            author: pull_request.author().clone(),
            status: pull_request.status(),
            reviewers: Vec::new(),
            created_at: pull_request.created_at(),
            merged_at: pull_request.merged_at(),
        };
        self.pull_requests.insert(pull_request.id().clone(), data);
        Ok(())
    }

    fn update(&mut self, pull_request: &PullRequest) -> StoreResult<()> {
        let stored = self
            .pull_requests
            .get_mut(pull_request.id())
            .ok_or_else(|| StoreError::PullRequestNotFound(pull_request.id().clone()))?;
        stored.status = pull_request.status();
        stored.merged_at = pull_request.merged_at();
        Ok(())
    }

    fn assign_reviewer(
        &mut self,
        pull_request_id: &PullRequestId,
        reviewer: &UserId,
    ) -> StoreResult<()> {
        if !self.pull_requests.contains_key(pull_request_id) {
            return Err(StoreError::PullRequestNotFound(pull_request_id.clone()));
        }
        if !self.users.contains_key(reviewer) {
            return Err(StoreError::UserNotFound(reviewer.clone()));
        }
        if self.is_assigned(pull_request_id, reviewer) {
            return Err(StoreError::DuplicateAssignment {
                pull_request_id: pull_request_id.clone(),
                reviewer: reviewer.clone(),
            });
        }
        self.assignments
            .push((pull_request_id.clone(), reviewer.clone()));
        Ok(())
    }

    fn unassign_reviewer(
        &mut self,
        pull_request_id: &PullRequestId,
        reviewer: &UserId,
    ) -> StoreResult<()> {
        if !self.is_assigned(pull_request_id, reviewer) {
            return Err(StoreError::AssignmentNotFound {
                pull_request_id: pull_request_id.clone(),
                reviewer: reviewer.clone(),
            });
        }
        self.assignments
            .retain(|(id, assigned)| !(id == pull_request_id && assigned == reviewer));
        Ok(())
    }

    fn list_inactive_reviewers(
        &mut self,
        pull_request_id: &PullRequestId,
    ) -> StoreResult<Vec<UserId>> {
        Ok(self
            .reviewers_of(pull_request_id)
            .into_iter()
            .filter(|reviewer| self.users.get(reviewer).is_some_and(|user| !user.is_active()))
            .collect())
    }

    fn list_by_reviewer(&mut self, reviewer: &UserId) -> StoreResult<Vec<PullRequestSummary>> {
        let mut rows: Vec<(DateTime<Utc>, PullRequestSummary)> = self
            .assignments
            .iter()
            .filter(|(_, assigned)| assigned == reviewer)
            .filter_map(|(id, _)| self.pull_requests.get(id))
            .map(|data| {
                let summary = PullRequestSummary::new(
                    data.id.clone(),
                    data.name.clone(),
                    data.author.clone(),
                    data.status,
                );
                (data.created_at, summary)
            })
            .collect();
        rows.sort_by(|(left_at, left), (right_at, right)| {
            left_at.cmp(right_at).then_with(|| left.id().cmp(right.id()))
        });
        Ok(rows.into_iter().map(|(_, summary)| summary).collect())
    }
}

impl UserRepository for InMemoryState {
    fn find_by_id(&mut self, id: &UserId) -> StoreResult<Option<User>> {
        Ok(self.users.get(id).cloned())
    }

    fn update(&mut self, user: &User) -> StoreResult<()> {
        let stored = self
            .users
            .get_mut(user.id())
            .ok_or_else(|| StoreError::UserNotFound(user.id().clone()))?;
        stored.clone_from(user);
        Ok(())
    }

    fn list_active_teammates(&mut self, user: &UserId) -> StoreResult<Vec<User>> {
        let team = self
            .users
            .get(user)
            .map(|found| found.team().clone())
            .ok_or_else(|| StoreError::UserNotFound(user.clone()))?;
        Ok(self
            .users
            .values()
            .filter(|candidate| {
                candidate.team() == &team && candidate.is_active() && candidate.id() != user
            })
            .cloned()
            .collect())
    }
}

impl TeamRepository for InMemoryState {
    fn create(&mut self, team: &Team) -> StoreResult<Team> {
        if !self.teams.insert(team.name().clone()) {
            return Err(StoreError::DuplicateTeam(team.name().clone()));
        }
        for member in team.member_users() {
            self.users.insert(member.id().clone(), member);
        }
        self.members_of(team.name())
            .ok_or_else(|| StoreError::TeamNotFound(team.name().clone()))
    }

    fn find_by_name(&mut self, name: &TeamName) -> StoreResult<Option<Team>> {
        Ok(self.members_of(name))
    }

    fn deactivate_members(&mut self, name: &TeamName) -> StoreResult<u64> {
        if !self.teams.contains(name) {
            return Err(StoreError::TeamNotFound(name.clone()));
        }
        let mut changed = 0;
        for user in self.users.values_mut().filter(|user| user.team() == name) {
            if user.set_active(false) {
                changed += 1;
            }
        }
        Ok(changed)
    }
}

impl InMemoryState {
    fn members_of(&self, name: &TeamName) -> Option<Team> {
        if !self.teams.contains(name) {
            return None;
        }
        let members = self
            .users
            .values()
            .filter(|user| user.team() == name)
            .map(|user| TeamMember::new(user.id().clone(), user.name().clone(), user.is_active()))
            .collect();
        Some(Team::from_persisted(name.clone(), members))
    }
}
