//! Team and user types.

use super::{AssignmentDomainError, DisplayName, TeamName, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A user who may author or review pull requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    name: DisplayName,
    team: TeamName,
    active: bool,
}

impl User {
    /// Creates a user belonging to `team`.
    #[must_use]
    pub const fn new(id: UserId, name: DisplayName, team: TeamName, active: bool) -> Self {
        Self {
            id,
            name,
            team,
            active,
        }
    }

    /// Returns the user identifier.
    #[must_use]
    pub const fn id(&self) -> &UserId {
        &self.id
    }

    /// Returns the display name.
    #[must_use]
    pub const fn name(&self) -> &DisplayName {
        &self.name
    }

    /// Returns the team the user belongs to.
    #[must_use]
    pub const fn team(&self) -> &TeamName {
        &self.team
    }

    /// Returns whether the user may be picked as a reviewer.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Sets the active flag, returning `true` when the value changed.
    pub const fn set_active(&mut self, active: bool) -> bool {
        let changed = self.active != active;
        self.active = active;
        changed
    }
}

/// A team member as listed on a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    id: UserId,
    name: DisplayName,
    active: bool,
}

impl TeamMember {
    /// Creates a team member.
    #[must_use]
    pub const fn new(id: UserId, name: DisplayName, active: bool) -> Self {
        Self { id, name, active }
    }

    /// Creates a team member from raw values.
    ///
    /// # Errors
    ///
    /// Returns [`AssignmentDomainError`] when the id or name is blank.
    pub fn from_parts(
        id: impl Into<String>,
        name: impl Into<String>,
        active: bool,
    ) -> Result<Self, AssignmentDomainError> {
        Ok(Self::new(
            UserId::new(id)?,
            DisplayName::new(name, AssignmentDomainError::EmptyUserName)?,
            active,
        ))
    }

    /// Returns the member's user identifier.
    #[must_use]
    pub const fn id(&self) -> &UserId {
        &self.id
    }

    /// Returns the member's display name.
    #[must_use]
    pub const fn name(&self) -> &DisplayName {
        &self.name
    }

    /// Returns whether the member is active.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }
}

/// A named team and its members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    name: TeamName,
    members: Vec<TeamMember>,
}

impl Team {
    /// Creates a team, rejecting member lists that repeat a user.
    ///
    /// # Errors
    ///
    /// Returns [`AssignmentDomainError::DuplicateTeamMember`] when two
    /// members share an identifier.
    pub fn new(name: TeamName, members: Vec<TeamMember>) -> Result<Self, AssignmentDomainError> {
        let mut seen = HashSet::with_capacity(members.len());
        if let Some(duplicate) = members.iter().find(|member| !seen.insert(member.id())) {
            return Err(AssignmentDomainError::DuplicateTeamMember(
                duplicate.id().clone(),
            ));
        }
        Ok(Self { name, members })
    }

    /// Reconstructs a team from persisted storage.
    #[must_use]
    pub const fn from_persisted(name: TeamName, members: Vec<TeamMember>) -> Self {
        Self { name, members }
    }

    /// Returns the team name.
    #[must_use]
    pub const fn name(&self) -> &TeamName {
        &self.name
    }

    /// Returns the members in listing order.
    #[must_use]
    pub fn members(&self) -> &[TeamMember] {
        &self.members
    }

    /// Returns the members as users bound to this team, ready for upsert.
    #[must_use]
    pub fn member_users(&self) -> Vec<User> {
        self.members
            .iter()
            .map(|member| {
                User::new(
                    member.id.clone(),
                    member.name.clone(),
                    self.name.clone(),
                    member.active,
                )
            })
            .collect()
    }
}
