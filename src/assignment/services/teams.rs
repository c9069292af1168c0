//! Team and user operations.

use super::{
    AssignmentError, AssignmentOperation, AssignmentResult, CreateTeamRequest, Resource,
    ReviewerAssignmentService,
};
use crate::assignment::{
    domain::{PullRequestSummary, Team, TeamName, User, UserId},
    ports::{AssignmentTransaction, UnitOfWork},
};
use mockable::Clock;
use std::time::Instant;
use tracing::{info, instrument, warn};

impl<S, C> ReviewerAssignmentService<S, C>
where
    S: UnitOfWork,
    C: Clock + Send + Sync,
{
    /// Creates a team and upserts its members by user identifier.
    ///
    /// A member that already exists has its name, team and active flag
    /// overwritten, which moves it out of its previous team.
    ///
    /// # Errors
    ///
    /// Returns [`AssignmentError::AlreadyExists`] when the team name is
    /// taken, or [`AssignmentError::InvalidInput`] for blank or repeated
    /// members.
    #[instrument(skip(self, request), fields(team_name = request.name()))]
    pub async fn create_team(&self, request: CreateTeamRequest) -> AssignmentResult<Team> {
        let started = Instant::now();
        let result = self.add_team(request).await;
        self.finish(AssignmentOperation::CreateTeam, started, result)
    }

    /// Returns a team with its members ordered by user identifier.
    ///
    /// # Errors
    ///
    /// Returns [`AssignmentError::NotFound`] when the team does not exist.
    #[instrument(skip(self))]
    pub async fn get_team(&self, team_name: &str) -> AssignmentResult<Team> {
        let started = Instant::now();
        let result = self.find_team(team_name).await;
        self.finish(AssignmentOperation::GetTeam, started, result)
    }

    /// Deactivates every active member of a team and returns how many users
    /// changed.
    ///
    /// # Errors
    ///
    /// Returns [`AssignmentError::NotFound`] when the team does not exist.
    #[instrument(skip(self))]
    pub async fn deactivate_team_members(&self, team_name: &str) -> AssignmentResult<u64> {
        let started = Instant::now();
        let result = self.deactivate(team_name).await;
        self.finish(AssignmentOperation::DeactivateTeamMembers, started, result)
    }

    /// Sets a user's active flag and returns the updated user.
    ///
    /// # Errors
    ///
    /// Returns [`AssignmentError::NotFound`] when the user does not exist.
    #[instrument(skip(self))]
    pub async fn set_user_active(&self, user_id: &str, active: bool) -> AssignmentResult<User> {
        let started = Instant::now();
        let result = self.toggle_user(user_id, active).await;
        self.finish(AssignmentOperation::SetUserActive, started, result)
    }

    /// Lists the pull requests a user is assigned to review, oldest first.
    ///
    /// Unknown users have no assignments.
    ///
    /// # Errors
    ///
    /// Returns [`AssignmentError::Internal`] when the store fails.
    #[instrument(skip(self))]
    pub async fn get_reviewer_assignments(
        &self,
        user_id: &str,
    ) -> AssignmentResult<Vec<PullRequestSummary>> {
        let started = Instant::now();
        let result = self.assignments_of(user_id).await;
        self.finish(AssignmentOperation::GetReviewerAssignments, started, result)
    }

    async fn add_team(&self, request: CreateTeamRequest) -> AssignmentResult<Team> {
        let team = request.into_team()?;
        let created = self
            .store
            .transaction(move |tx| create_team_in(tx, &team))
            .await?;
        info!(members = created.members().len(), "team created");
        Ok(created)
    }

    async fn find_team(&self, team_name: &str) -> AssignmentResult<Team> {
        let name = TeamName::new(team_name)?;
        self.store
            .transaction(move |tx| {
                tx.teams()
                    .find_by_name(&name)?
                    .ok_or(AssignmentError::NotFound(Resource::Team(name)))
            })
            .await
    }

    async fn deactivate(&self, team_name: &str) -> AssignmentResult<u64> {
        let name = TeamName::new(team_name)?;
        let work_name = name.clone();
        let deactivated = self
            .store
            .transaction(move |tx| deactivate_in(tx, &work_name))
            .await?;
        info!(deactivated, "team members deactivated");
        self.observer.team_members_deactivated(&name, deactivated);
        Ok(deactivated)
    }

    async fn toggle_user(&self, user_id: &str, active: bool) -> AssignmentResult<User> {
        let id = UserId::new(user_id)?;
        let (user, changed) = self
            .store
            .transaction(move |tx| set_active_in(tx, id, active))
            .await?;
        if changed {
            info!(active, "user activity changed");
        }
        Ok(user)
    }

    async fn assignments_of(&self, user_id: &str) -> AssignmentResult<Vec<PullRequestSummary>> {
        let id = UserId::new(user_id)?;
        self.store
            .transaction(move |tx| Ok(tx.pull_requests().list_by_reviewer(&id)?))
            .await
    }
}

fn create_team_in(tx: &mut dyn AssignmentTransaction, team: &Team) -> AssignmentResult<Team> {
    // The unique key on insert still decides concurrent creates.
    if tx.teams().find_by_name(team.name())?.is_some() {
        return Err(AssignmentError::AlreadyExists(Resource::Team(
            team.name().clone(),
        )));
    }

    for member in team.members() {
        let Some(existing) = tx.users().find_by_id(member.id())? else {
            continue;
        };
        if existing.team() != team.name() {
            warn!(
                user_id = %member.id(),
                from_team = %existing.team(),
                to_team = %team.name(),
                "user moved to another team"
            );
        }
    }

    Ok(tx.teams().create(team)?)
}

fn deactivate_in(tx: &mut dyn AssignmentTransaction, name: &TeamName) -> AssignmentResult<u64> {
    Ok(tx.teams().deactivate_members(name)?)
}

fn set_active_in(
    tx: &mut dyn AssignmentTransaction,
    id: UserId,
    active: bool,
) -> AssignmentResult<(User, bool)> {
    let Some(mut user) = tx.users().find_by_id(&id)? else {
        return Err(AssignmentError::NotFound(Resource::User(id)));
    };
    let changed = user.set_active(active);
    if changed {
        tx.users().update(&user)?;
    }
    Ok((user, changed))
}
