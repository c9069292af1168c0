//! Shared test helpers for `PostgreSQL` integration tests.

use super::cluster::{BoxError, ManagedCluster, TemporaryDatabase, shared_cluster};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use eyre::WrapErr;
use mockable::DefaultClock;
use reviewer_rotation::{
    assignment::{
        adapters::postgres::PostgresAssignmentStore,
        services::{CreateTeamRequest, ReviewerAssignmentService},
    },
    config::StoreConfig,
};
use std::sync::Arc;
use uuid::Uuid;

/// SQL creating the reviewer tables.
pub const CREATE_TABLES_SQL: &str =
    include_str!("../../migrations/2026-10-01-000000_create_reviewer_tables/up.sql");

/// Template database holding the migrated schema.
pub const TEMPLATE_DB: &str = "reviewer_rotation_template";

/// Service type used by the `PostgreSQL` integration tests.
pub type PgService = ReviewerAssignmentService<PostgresAssignmentStore, DefaultClock>;

/// A store over a database that exists for one test only.
///
/// `store` is declared first so its pool closes before the database is
/// dropped.
pub struct TestDatabase {
    /// Store connected to the temporary database.
    pub store: PostgresAssignmentStore,
    _database: TemporaryDatabase,
}

fn apply_migrations(url: &str) -> Result<(), BoxError> {
    let mut connection = PgConnection::establish(url)?;
    connection.batch_execute(CREATE_TABLES_SQL)?;
    Ok(())
}

fn provision(cluster: &'static ManagedCluster) -> Result<TestDatabase, BoxError> {
    cluster.ensure_template(TEMPLATE_DB, apply_migrations)?;
    let database = cluster
        .temporary_database_from_template(&format!("test_{}", Uuid::new_v4().simple()), TEMPLATE_DB)?;
    let store = PostgresAssignmentStore::connect(&StoreConfig::new(database.url()))?;
    Ok(TestDatabase {
        store,
        _database: database,
    })
}

/// Starts the shared embedded cluster if needed and returns a store over a
/// fresh database cloned from the migrated template.
///
/// # Errors
///
/// Returns an error when the cluster cannot start or the database cannot be
/// created.
pub async fn test_database() -> eyre::Result<TestDatabase> {
    tokio::task::spawn_blocking(|| provision(shared_cluster()?))
        .await
        .wrap_err("provisioning task")?
        .map_err(|err| eyre::eyre!("provision test database: {err}"))
}

/// Wraps a store in a service using the system clock.
#[must_use]
pub fn service_over(store: PostgresAssignmentStore) -> Arc<PgService> {
    Arc::new(ReviewerAssignmentService::new(
        Arc::new(store),
        Arc::new(DefaultClock),
    ))
}

/// Returns `prefix` with a random suffix.
#[must_use]
pub fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

/// Identifiers for a four-member team whose first member authors.
pub struct Crew {
    /// Team name.
    pub team: String,
    /// Pull request author.
    pub author: String,
    /// Remaining members, in identifier order.
    pub reviewers: [String; 3],
}

impl Default for Crew {
    fn default() -> Self {
        Self {
            team: unique("team"),
            author: unique("author"),
            reviewers: [unique("r1"), unique("r2"), unique("r3")],
        }
    }
}

impl Crew {
    /// Generates fresh identifiers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the author identifier.
    #[must_use]
    pub fn author(&self) -> &str {
        &self.author
    }

    /// Returns every member identifier, author first.
    pub fn members(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.author.as_str()).chain(self.reviewers.iter().map(String::as_str))
    }

    /// Builds a creation request with every member active.
    #[must_use]
    pub fn request(&self) -> CreateTeamRequest {
        self.members()
            .fold(CreateTeamRequest::new(self.team.as_str()), |request, id| {
                request.with_member(id, "Member", true)
            })
    }
}
