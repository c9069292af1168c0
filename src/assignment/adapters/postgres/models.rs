//! Diesel row models for reviewer assignment persistence.

use super::schema::{pull_request_reviewers, pull_requests, teams, users};
use chrono::{DateTime, Utc};
use diesel::prelude::*;

/// Query result row for users.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserRow {
    /// User identifier.
    pub user_id: String,
    /// Display name.
    pub username: String,
    /// Team name.
    pub team_name: String,
    /// Active flag.
    pub is_active: bool,
}

/// Insert model for users, also used for upserts.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub struct NewUserRow {
    /// User identifier.
    pub user_id: String,
    /// Display name.
    pub username: String,
    /// Team name.
    pub team_name: String,
    /// Active flag.
    pub is_active: bool,
}

/// Insert model for teams.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = teams)]
pub struct NewTeamRow {
    /// Team name.
    pub team_name: String,
}

/// Query result row for pull requests.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = pull_requests)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PullRequestRow {
    /// Pull request identifier.
    pub pull_request_id: String,
    /// Pull request title.
    pub pull_request_name: String,
    /// Author identifier.
    pub author_id: String,
    /// Lifecycle status.
    pub status: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Merge timestamp.
    pub merged_at: Option<DateTime<Utc>>,
}

/// Insert model for pull requests.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = pull_requests)]
pub struct NewPullRequestRow {
    /// Pull request identifier.
    pub pull_request_id: String,
    /// Pull request title.
    pub pull_request_name: String,
    /// Author identifier.
    pub author_id: String,
    /// Lifecycle status.
    pub status: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Merge timestamp.
    pub merged_at: Option<DateTime<Utc>>,
}

/// Insert model for reviewer assignments. `assigned_at` takes its default.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = pull_request_reviewers)]
pub struct NewReviewerRow {
    /// Assigned pull request.
    pub pull_request_id: String,
    /// Assigned reviewer.
    pub reviewer_id: String,
}
