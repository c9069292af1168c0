//! `PostgreSQL` unit of work and repositories for reviewer assignment.

use super::{
    models::{NewPullRequestRow, NewReviewerRow, NewTeamRow, NewUserRow, PullRequestRow, UserRow},
    schema::{pull_request_reviewers, pull_requests, teams, users},
};
use crate::assignment::{
    domain::{
        AssignmentDomainError, DisplayName, PersistedPullRequestData, PullRequest, PullRequestId,
        PullRequestStatus, PullRequestSummary, Team, TeamMember, TeamName, User, UserId,
    },
    ports::{
        AssignmentTransaction, PullRequestRepository, StoreError, StoreResult, TeamRepository,
        UnitOfWork, UserRepository,
    },
};
use crate::config::StoreConfig;
use async_trait::async_trait;
use diesel::dsl::exists;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorInformation, DatabaseErrorKind, Error as DieselError};
use diesel::upsert::excluded;

/// `PostgreSQL` connection pool type used by the assignment store.
pub type AssignmentPgPool = Pool<ConnectionManager<PgConnection>>;

const FK_REVIEWERS_PULL_REQUEST: &str = "fk_reviewers_pull_request";

/// `PostgreSQL`-backed assignment store.
///
/// Every unit of work checks out one pooled connection on a blocking thread
/// and runs inside a database transaction. Pull requests read through
/// [`PullRequestRepository::lock_by_id`] are locked with `SELECT ... FOR
/// UPDATE` until the transaction ends.
#[derive(Debug, Clone)]
pub struct PostgresAssignmentStore {
    pool: AssignmentPgPool,
}

impl PostgresAssignmentStore {
    /// Creates a store from an existing connection pool.
    #[must_use]
    pub const fn new(pool: AssignmentPgPool) -> Self {
        Self { pool }
    }

    /// Builds a connection pool from `config`.
    ///
    /// This blocks while the pool opens its initial connections.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] when the pool cannot be built.
    pub fn connect(config: &StoreConfig) -> StoreResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(config.database_url.as_str());
        let pool = Pool::builder()
            .max_size(config.max_connections)
            .connection_timeout(config.connect_timeout)
            .build(manager)
            .map_err(StoreError::persistence)?;
        tracing::info!(
            max_connections = config.max_connections,
            "assignment store connected"
        );
        Ok(Self::new(pool))
    }

    /// Returns the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &AssignmentPgPool {
        &self.pool
    }
}

#[async_trait]
impl UnitOfWork for PostgresAssignmentStore {
    async fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn AssignmentTransaction) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<StoreError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut pooled = pool
                .get()
                .map_err(|err| E::from(StoreError::persistence(err)))?;
            let connection: &mut PgConnection = &mut pooled;
            connection
                .transaction::<T, TxAbort<E>, _>(|conn| {
                    let mut tx = PgTransaction { connection: conn };
                    work(&mut tx).map_err(TxAbort::Work)
                })
                .map_err(TxAbort::into_inner)
        })
        .await
        .map_err(|err| E::from(StoreError::persistence(err)))?
    }
}

/// Reason a transaction was rolled back.
enum TxAbort<E> {
    Work(E),
    Database(DieselError),
}

impl<E> From<DieselError> for TxAbort<E> {
    fn from(err: DieselError) -> Self {
        Self::Database(err)
    }
}

impl<E: From<StoreError>> TxAbort<E> {
    fn into_inner(self) -> E {
        match self {
            Self::Work(err) => err,
            Self::Database(err) => E::from(StoreError::persistence(err)),
        }
    }
}

struct PgTransaction<'conn> {
    connection: &'conn mut PgConnection,
}

impl AssignmentTransaction for PgTransaction<'_> {
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

impl PullRequestRepository for PgTransaction<'_> {
    fn find_by_id(&mut self, id: &PullRequestId) -> StoreResult<Option<PullRequest>> {
        let row = pull_requests::table
            .find(id.as_str())
            .select(PullRequestRow::as_select())
            .get_result::<PullRequestRow>(self.connection)
            .optional()
            .map_err(StoreError::persistence)?;
        row.map(|found| hydrate_pull_request(self.connection, found))
            .transpose()
    }

    fn lock_by_id(&mut self, id: &PullRequestId) -> StoreResult<Option<PullRequest>> {
        let row = pull_requests::table
            .find(id.as_str())
            .select(PullRequestRow::as_select())
            .for_update()
            .get_result::<PullRequestRow>(self.connection)
            .optional()
            .map_err(StoreError::persistence)?;
        row.map(|found| hydrate_pull_request(self.connection, found))
            .transpose()
    }

    fn create(&mut self, pull_request: &PullRequest) -> StoreResult<()> {
        let row = NewPullRequestRow {
            pull_request_id: pull_request.id().as_str().to_owned(),
            pull_request_name: pull_request.name().as_str().to_owned(),
            author_id: pull_request.author().as_str().to_owned(),
            status: pull_request.status().as_str().to_owned(),
            created_at: pull_request.created_at(),
            merged_at: pull_request.merged_at(),
        };
        diesel::insert_into(pull_requests::table)
            .values(&row)
            .execute(self.connection)
            .map_err(|err| match err {
                DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    StoreError::DuplicatePullRequest(pull_request.id().clone())
                }
                DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                    StoreError::UserNotFound(pull_request.author().clone())
                }
                _ => StoreError::persistence(err),
            })?;
        Ok(())
    }

    fn update(&mut self, pull_request: &PullRequest) -> StoreResult<()> {
        let updated = diesel::update(pull_requests::table.find(pull_request.id().as_str()))
            .set((
                pull_requests::status.eq(pull_request.status().as_str()),
                pull_requests::merged_at.eq(pull_request.merged_at()),
            ))
            .execute(self.connection)
            .map_err(StoreError::persistence)?;
        if updated == 0 {
            return Err(StoreError::PullRequestNotFound(pull_request.id().clone()));
        }
        Ok(())
    }

    fn assign_reviewer(
        &mut self,
        pull_request_id: &PullRequestId,
        reviewer: &UserId,
    ) -> StoreResult<()> {
        let row = NewReviewerRow {
            pull_request_id: pull_request_id.as_str().to_owned(),
            reviewer_id: reviewer.as_str().to_owned(),
        };
        diesel::insert_into(pull_request_reviewers::table)
            .values(&row)
            .execute(self.connection)
            .map_err(|err| match err {
                DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    StoreError::DuplicateAssignment {
                        pull_request_id: pull_request_id.clone(),
                        reviewer: reviewer.clone(),
                    }
                }
                DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, ref info)
                    if is_constraint(&**info, FK_REVIEWERS_PULL_REQUEST) =>
                {
                    StoreError::PullRequestNotFound(pull_request_id.clone())
                }
                DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                    StoreError::UserNotFound(reviewer.clone())
                }
                _ => StoreError::persistence(err),
            })?;
        Ok(())
    }

    fn unassign_reviewer(
        &mut self,
        pull_request_id: &PullRequestId,
        reviewer: &UserId,
    ) -> StoreResult<()> {
        let removed = diesel::delete(
            pull_request_reviewers::table
                .filter(pull_request_reviewers::pull_request_id.eq(pull_request_id.as_str()))
                .filter(pull_request_reviewers::reviewer_id.eq(reviewer.as_str())),
        )
        .execute(self.connection)
        .map_err(StoreError::persistence)?;
        if removed == 0 {
            return Err(StoreError::AssignmentNotFound {
                pull_request_id: pull_request_id.clone(),
                reviewer: reviewer.clone(),
            });
        }
        Ok(())
    }

    fn list_inactive_reviewers(
        &mut self,
        pull_request_id: &PullRequestId,
    ) -> StoreResult<Vec<UserId>> {
        let rows = pull_request_reviewers::table
            .inner_join(users::table)
            .filter(pull_request_reviewers::pull_request_id.eq(pull_request_id.as_str()))
            .filter(users::is_active.eq(false))
            .order((
                pull_request_reviewers::assigned_at.asc(),
                pull_request_reviewers::reviewer_id.asc(),
            ))
            .select(pull_request_reviewers::reviewer_id)
            .load::<String>(self.connection)
            .map_err(StoreError::persistence)?;
        to_user_ids(rows)
    }

    fn list_by_reviewer(&mut self, reviewer: &UserId) -> StoreResult<Vec<PullRequestSummary>> {
        let rows = pull_request_reviewers::table
            .inner_join(pull_requests::table)
            .filter(pull_request_reviewers::reviewer_id.eq(reviewer.as_str()))
            .order((
                pull_requests::created_at.asc(),
                pull_requests::pull_request_id.asc(),
            ))
            .select(PullRequestRow::as_select())
            .load::<PullRequestRow>(self.connection)
            .map_err(StoreError::persistence)?;
        rows.into_iter()
            .map(|row| row_to_pull_request(row, Vec::new()).map(|found| found.summary()))
            .collect()
    }
}

impl UserRepository for PgTransaction<'_> {
    fn find_by_id(&mut self, id: &UserId) -> StoreResult<Option<User>> {
        let row = users::table
            .find(id.as_str())
            .select(UserRow::as_select())
            .get_result::<UserRow>(self.connection)
            .optional()
            .map_err(StoreError::persistence)?;
        row.map(row_to_user).transpose()
    }

    fn update(&mut self, user: &User) -> StoreResult<()> {
        let updated = diesel::update(users::table.find(user.id().as_str()))
            .set((
                users::username.eq(user.name().as_str()),
                users::team_name.eq(user.team().as_str()),
                users::is_active.eq(user.is_active()),
            ))
            .execute(self.connection)
            .map_err(StoreError::persistence)?;
        if updated == 0 {
            return Err(StoreError::UserNotFound(user.id().clone()));
        }
        Ok(())
    }

    fn list_active_teammates(&mut self, user: &UserId) -> StoreResult<Vec<User>> {
        let team = users::table
            .find(user.as_str())
            .select(users::team_name)
            .get_result::<String>(self.connection)
            .optional()
            .map_err(StoreError::persistence)?
            .ok_or_else(|| StoreError::UserNotFound(user.clone()))?;

        users::table
            .filter(users::team_name.eq(&team))
            .filter(users::is_active.eq(true))
            .filter(users::user_id.ne(user.as_str()))
            .order(users::user_id.asc())
            .select(UserRow::as_select())
            .load::<UserRow>(self.connection)
            .map_err(StoreError::persistence)?
            .into_iter()
            .map(row_to_user)
            .collect()
    }
}

impl TeamRepository for PgTransaction<'_> {
    fn create(&mut self, team: &Team) -> StoreResult<Team> {
        let name = team.name();
        diesel::insert_into(teams::table)
            .values(&NewTeamRow {
                team_name: name.as_str().to_owned(),
            })
            .execute(self.connection)
            .map_err(|err| match err {
                DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    StoreError::DuplicateTeam(name.clone())
                }
                _ => StoreError::persistence(err),
            })?;

        let members: Vec<NewUserRow> = team
            .member_users()
            .iter()
            .map(|user| NewUserRow {
                user_id: user.id().as_str().to_owned(),
                username: user.name().as_str().to_owned(),
                team_name: user.team().as_str().to_owned(),
                is_active: user.is_active(),
            })
            .collect();
        if !members.is_empty() {
            diesel::insert_into(users::table)
                .values(&members)
                .on_conflict(users::user_id)
                .do_update()
                .set((
                    users::username.eq(excluded(users::username)),
                    users::team_name.eq(excluded(users::team_name)),
                    users::is_active.eq(excluded(users::is_active)),
                ))
                .execute(self.connection)
                .map_err(StoreError::persistence)?;
        }

        load_team(self.connection, name)?.ok_or_else(|| StoreError::TeamNotFound(name.clone()))
    }

    fn find_by_name(&mut self, name: &TeamName) -> StoreResult<Option<Team>> {
        load_team(self.connection, name)
    }

    fn deactivate_members(&mut self, name: &TeamName) -> StoreResult<u64> {
        if !team_exists(self.connection, name)? {
            return Err(StoreError::TeamNotFound(name.clone()));
        }
        let changed = diesel::update(
            users::table
                .filter(users::team_name.eq(name.as_str()))
                .filter(users::is_active.eq(true)),
        )
        .set(users::is_active.eq(false))
        .execute(self.connection)
        .map_err(StoreError::persistence)?;
        u64::try_from(changed).map_err(StoreError::persistence)
    }
}

fn team_exists(connection: &mut PgConnection, name: &TeamName) -> StoreResult<bool> {
    diesel::select(exists(teams::table.find(name.as_str())))
        .get_result(connection)
        .map_err(StoreError::persistence)
}

fn load_team(connection: &mut PgConnection, name: &TeamName) -> StoreResult<Option<Team>> {
    if !team_exists(connection, name)? {
        return Ok(None);
    }

    let members = users::table
        .filter(users::team_name.eq(name.as_str()))
        .order(users::user_id.asc())
        .select(UserRow::as_select())
        .load::<UserRow>(connection)
        .map_err(StoreError::persistence)?
        .into_iter()
        .map(|row| {
            row_to_user(row).map(|user| {
                TeamMember::new(user.id().clone(), user.name().clone(), user.is_active())
            })
        })
        .collect::<StoreResult<Vec<_>>>()?;
    Ok(Some(Team::from_persisted(name.clone(), members)))
}

fn hydrate_pull_request(
    connection: &mut PgConnection,
    row: PullRequestRow,
) -> StoreResult<PullRequest> {
    let reviewers = pull_request_reviewers::table
        .filter(pull_request_reviewers::pull_request_id.eq(&row.pull_request_id))
        .order((
            pull_request_reviewers::assigned_at.asc(),
            pull_request_reviewers::reviewer_id.asc(),
        ))
        .select(pull_request_reviewers::reviewer_id)
        .load::<String>(connection)
        .map_err(StoreError::persistence)?;
    row_to_pull_request(row, to_user_ids(reviewers)?)
}

fn row_to_pull_request(row: PullRequestRow, reviewers: Vec<UserId>) -> StoreResult<PullRequest> {
    let PullRequestRow {
        pull_request_id,
        pull_request_name,
        author_id,
        status,
        created_at,
        merged_at,
    } = row;

    let data = PersistedPullRequestData {
        id: PullRequestId::new(pull_request_id).map_err(StoreError::persistence)?,
        name: DisplayName::new(pull_request_name, AssignmentDomainError::EmptyPullRequestName)
            .map_err(StoreError::persistence)?,
        author: UserId::new(author_id).map_err(StoreError::persistence)?,
        status: PullRequestStatus::try_from(status.as_str()).map_err(StoreError::persistence)?,
        reviewers,
        created_at,
        merged_at,
    };
    Ok(PullRequest::from_persisted(data))
}

fn row_to_user(row: UserRow) -> StoreResult<User> {
    Ok(User::new(
        UserId::new(row.user_id).map_err(StoreError::persistence)?,
        DisplayName::new(row.username, AssignmentDomainError::EmptyUserName)
            .map_err(StoreError::persistence)?,
        TeamName::new(row.team_name).map_err(StoreError::persistence)?,
        row.is_active,
    ))
}

fn to_user_ids(rows: Vec<String>) -> StoreResult<Vec<UserId>> {
    rows.into_iter()
        .map(|id| UserId::new(id).map_err(StoreError::persistence))
        .collect()
}

fn is_constraint(info: &dyn DatabaseErrorInformation, constraint: &str) -> bool {
    info.constraint_name().is_some_and(|name| name == constraint)
}
