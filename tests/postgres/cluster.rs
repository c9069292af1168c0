//! Embedded `PostgreSQL` cluster shared by the integration tests.
//!
//! The cluster starts once per test binary. Each test gets its own database
//! cloned from a migrated template, so tests never see each other's rows.

use crate::test_helpers::{EnvChange, EnvVarGuard, locate_pg_worker_path};
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs::{Permissions, PermissionsExt};
use cap_std::fs_utf8::Dir;
use diesel::prelude::*;
use diesel::sql_types::{Bool, Text};
use pg_embedded_setup_unpriv::worker_process_test_api::{
    WorkerOperation, WorkerRequest, WorkerRequestArgs, run as run_worker,
};
use pg_embedded_setup_unpriv::{
    ExecutionPrivileges, TestBootstrapSettings, bootstrap_for_tests, detect_execution_privileges,
};
use postgresql_embedded::{PostgreSQL, Settings, Status};
use std::ffi::OsString;
use std::io;
use std::net::TcpListener;
use std::sync::{Mutex, OnceLock, PoisonError};
use std::time::Duration;
use tokio::runtime::Runtime;

/// Error type of the cluster helpers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

static SHARED_CLUSTER: OnceLock<Result<ManagedCluster, String>> = OnceLock::new();
static TEMPLATE_LOCK: Mutex<()> = Mutex::new(());

fn boxed(err: impl std::error::Error + Send + Sync + 'static) -> BoxError {
    Box::new(err)
}

/// Embedded cluster started in-process, or through `pg_worker` when the
/// tests run as root.
pub struct ManagedCluster {
    bootstrap: TestBootstrapSettings,
    env_vars: Vec<(String, Option<String>)>,
    runtime: Option<Runtime>,
    postgres: Option<PostgreSQL>,
}

impl ManagedCluster {
    fn start() -> Result<Self, BoxError> {
        let guard = EnvVarGuard::set_many(&bootstrap_env()?);
        let mut bootstrap = bootstrap_for_tests().map_err(boxed)?;
        drop(guard);
        read_password_file(&mut bootstrap.settings)?;
        let env_vars = bootstrap.environment.to_env();
        let mut cluster = Self {
            bootstrap,
            env_vars,
            runtime: None,
            postgres: None,
        };
        match cluster.bootstrap.privileges {
            ExecutionPrivileges::Root => cluster.start_with_worker()?,
            ExecutionPrivileges::Unprivileged => cluster.start_in_process()?,
        }
        read_port_from_pid_file(&mut cluster.bootstrap.settings)?;
        Ok(cluster)
    }

    fn start_in_process(&mut self) -> Result<(), BoxError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(boxed)?;
        let overrides: Vec<EnvChange> = self
            .env_vars
            .iter()
            .map(|(key, value)| (OsString::from(key), value.as_ref().map(OsString::from)))
            .collect();
        let guard = EnvVarGuard::set_many(&overrides);
        let mut postgres = PostgreSQL::new(self.bootstrap.settings.clone());
        runtime.block_on(async {
            postgres.setup().await?;
            if !matches!(postgres.status(), Status::Started) {
                postgres.start().await?;
            }
            Ok::<(), postgresql_embedded::Error>(())
        })?;
        drop(guard);
        self.bootstrap.settings = postgres.settings().clone();
        self.runtime = Some(runtime);
        self.postgres = Some(postgres);
        Ok(())
    }

    fn start_with_worker(&self) -> Result<(), BoxError> {
        self.worker(WorkerOperation::Setup, self.bootstrap.setup_timeout)?;
        self.worker(WorkerOperation::Start, self.bootstrap.start_timeout)
    }

    fn worker(&self, operation: WorkerOperation, timeout: Duration) -> Result<(), BoxError> {
        let worker = self.bootstrap.worker_binary.as_ref().ok_or_else(|| {
            boxed(io::Error::new(
                io::ErrorKind::NotFound,
                "running as root needs PG_EMBEDDED_WORKER",
            ))
        })?;
        run_worker(&WorkerRequest::new(WorkerRequestArgs {
            worker: worker.as_path(),
            settings: &self.bootstrap.settings,
            env_vars: &self.env_vars,
            operation,
            timeout,
        }))
        .map_err(boxed)
    }

    fn stop(&mut self) -> Result<(), BoxError> {
        match (self.postgres.take(), &self.runtime) {
            (Some(postgres), Some(runtime)) => {
                runtime.block_on(postgres.stop()).map_err(boxed)
            }
            (None, _) if matches!(self.bootstrap.privileges, ExecutionPrivileges::Root) => {
                self.worker(WorkerOperation::Stop, self.bootstrap.shutdown_timeout)
            }
            _ => Ok(()),
        }
    }

    /// Returns the connection URL of `database` on this cluster.
    #[must_use]
    pub fn database_url(&self, database: &str) -> String {
        self.bootstrap.settings.url(database)
    }

    /// Creates `template` and runs `migrate` against it unless it already
    /// exists. A failed migration drops the half-built template.
    ///
    /// # Errors
    ///
    /// Returns an error when the admin connection, creation or migration
    /// fails.
    pub fn ensure_template<F>(&self, template: &str, migrate: F) -> Result<(), BoxError>
    where
        F: FnOnce(&str) -> Result<(), BoxError>,
    {
        let _serialised = TEMPLATE_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        if self.database_exists(template)? {
            return Ok(());
        }
        self.admin_sql(&format!("CREATE DATABASE {}", quote_identifier(template)))?;
        if let Err(err) = migrate(&self.database_url(template)) {
            self.admin_sql(&format!("DROP DATABASE {}", quote_identifier(template)))?;
            return Err(err);
        }
        Ok(())
    }

    /// Clones `template` into a fresh database that is dropped with the
    /// returned handle.
    ///
    /// # Errors
    ///
    /// Returns an error when `CREATE DATABASE ... TEMPLATE` fails.
    pub fn temporary_database_from_template(
        &'static self,
        name: &str,
        template: &str,
    ) -> Result<TemporaryDatabase, BoxError> {
        self.admin_sql(&format!(
            "CREATE DATABASE {} TEMPLATE {}",
            quote_identifier(name),
            quote_identifier(template),
        ))?;
        Ok(TemporaryDatabase {
            cluster: self,
            name: name.to_owned(),
            url: self.database_url(name),
        })
    }

    fn admin_sql(&self, sql: &str) -> Result<(), BoxError> {
        let mut connection =
            PgConnection::establish(&self.database_url("postgres")).map_err(boxed)?;
        diesel::sql_query(sql)
            .execute(&mut connection)
            .map_err(boxed)?;
        Ok(())
    }

    fn database_exists(&self, name: &str) -> Result<bool, BoxError> {
        #[derive(diesel::QueryableByName)]
        struct Found {
            #[diesel(sql_type = Bool)]
            present: bool,
        }

        let mut connection =
            PgConnection::establish(&self.database_url("postgres")).map_err(boxed)?;
        let found = diesel::sql_query(
            "SELECT EXISTS (SELECT 1 FROM pg_database WHERE datname = $1) AS present",
        )
        .bind::<Text, _>(name)
        .get_result::<Found>(&mut connection)
        .map_err(boxed)?;
        Ok(found.present)
    }
}

impl Drop for ManagedCluster {
    fn drop(&mut self) {
        drop(self.stop());
    }
}

/// Database cloned from a template for one test.
pub struct TemporaryDatabase {
    cluster: &'static ManagedCluster,
    name: String,
    url: String,
}

impl TemporaryDatabase {
    /// Returns the connection URL of the database.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Drop for TemporaryDatabase {
    fn drop(&mut self) {
        // FORCE closes pool connections that are still idle.
        drop(self.cluster.admin_sql(&format!(
            "DROP DATABASE IF EXISTS {} WITH (FORCE)",
            quote_identifier(&self.name)
        )));
    }
}

/// Returns the cluster for this test binary, starting it on first use.
///
/// Blocks while the cluster starts; call it from a blocking context.
///
/// # Errors
///
/// Returns the start-up failure, which is cached for later callers.
pub fn shared_cluster() -> Result<&'static ManagedCluster, BoxError> {
    SHARED_CLUSTER
        .get_or_init(|| ManagedCluster::start().map_err(|err| err.to_string()))
        .as_ref()
        .map_err(|err| boxed(io::Error::other(format!("embedded PostgreSQL: {err}"))))
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Environment for `bootstrap_for_tests`: a free port, and the worker binary
/// when running as root.
fn bootstrap_env() -> Result<Vec<EnvChange>, BoxError> {
    let mut changes = Vec::new();
    if std::env::var_os("PG_PORT").is_none() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).map_err(boxed)?;
        let port = listener.local_addr().map_err(boxed)?.port();
        changes.push((OsString::from("PG_PORT"), Some(OsString::from(port.to_string()))));
    }
    if matches!(detect_execution_privileges(), ExecutionPrivileges::Root)
        && std::env::var_os("PG_EMBEDDED_WORKER").is_none()
    {
        let worker = locate_pg_worker_path().ok_or_else(|| {
            boxed(io::Error::new(
                io::ErrorKind::NotFound,
                "pg_worker binary not found and PG_EMBEDDED_WORKER is unset",
            ))
        })?;
        let staged = stage_worker(&worker)?;
        changes.push((
            OsString::from("PG_EMBEDDED_WORKER"),
            Some(OsString::from(staged.as_str())),
        ));
    }
    Ok(changes)
}

/// Copies the worker somewhere `nobody` can execute it.
fn stage_worker(worker: &Utf8Path) -> Result<Utf8PathBuf, BoxError> {
    let temp_dir = Utf8PathBuf::try_from(std::env::temp_dir()).map_err(boxed)?;
    let staged_name = format!("pg_worker_{}", std::process::id());
    let (source_dir, source_name) = open_parent(worker)?;
    let target_dir = Dir::open_ambient_dir(&temp_dir, ambient_authority()).map_err(boxed)?;
    match target_dir.remove_file(&staged_name) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => return Err(boxed(err)),
        _ => {}
    }
    source_dir
        .copy(source_name, &target_dir, &staged_name)
        .map_err(boxed)?;
    target_dir
        .set_permissions(&staged_name, Permissions::from_mode(0o755))
        .map_err(boxed)?;
    Ok(temp_dir.join(staged_name))
}

fn open_parent(path: &Utf8Path) -> Result<(Dir, &str), BoxError> {
    let name = path
        .file_name()
        .ok_or_else(|| boxed(io::Error::other(format!("{path} has no file name"))))?;
    let parent = path.parent().unwrap_or_else(|| Utf8Path::new("."));
    let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(boxed)?;
    Ok((dir, name))
}

fn read_password_file(settings: &mut Settings) -> Result<(), BoxError> {
    let path = Utf8PathBuf::try_from(settings.password_file.clone()).map_err(boxed)?;
    let (dir, name) = open_parent(&path)?;
    match dir.read_to_string(name) {
        Ok(contents) if !contents.trim_end().is_empty() => {
            contents.trim_end().clone_into(&mut settings.password);
            Ok(())
        }
        Ok(_) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(boxed(err)),
    }
}

/// The fourth line of `postmaster.pid` holds the port the server bound.
fn read_port_from_pid_file(settings: &mut Settings) -> Result<(), BoxError> {
    let data_dir = Utf8PathBuf::try_from(settings.data_dir.clone()).map_err(boxed)?;
    let dir = Dir::open_ambient_dir(&data_dir, ambient_authority()).map_err(boxed)?;
    let contents = match dir.read_to_string("postmaster.pid") {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(boxed(err)),
    };
    if let Some(port) = contents
        .lines()
        .nth(3)
        .and_then(|line| line.trim().parse::<u16>().ok())
    {
        settings.port = port;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{open_parent, quote_identifier, stage_worker};
    use crate::test_helpers::EnvVarGuard;
    use camino::Utf8PathBuf;
    use rstest::rstest;
    use std::ffi::OsString;
    use std::io::Write;

    #[rstest]
    #[case::plain("test_db", "\"test_db\"")]
    #[case::embedded_quote("odd\"name", "\"odd\"\"name\"")]
    fn identifiers_are_quoted_for_admin_sql(#[case] raw: &str, #[case] quoted: &str) {
        assert_eq!(quote_identifier(raw), quoted);
    }

    #[rstest]
    fn staged_worker_is_executable_copy() {
        let source_dir = Utf8PathBuf::try_from(std::env::temp_dir())
            .expect("utf-8 temp dir")
            .join(format!("worker_src_{}", uuid::Uuid::new_v4().simple()));
        std::fs::create_dir(&source_dir).expect("create source dir");
        let source = source_dir.join("pg_worker");
        let (dir, name) = open_parent(&source).expect("open source dir");
        dir.create(name)
            .and_then(|mut file| file.write_all(b"#!/bin/sh\nexit 0\n"))
            .expect("write worker script");

        let staged = stage_worker(&source).expect("stage worker");

        let mode = std::os::unix::fs::PermissionsExt::mode(
            &std::fs::metadata(&staged).expect("staged metadata").permissions(),
        );
        assert_ne!(mode & 0o111, 0, "staged worker must be executable");
        assert_eq!(
            std::fs::read(&staged).expect("read staged"),
            b"#!/bin/sh\nexit 0\n"
        );
    }

    #[rstest]
    fn env_guard_restores_previous_values() {
        let key = OsString::from("REVIEWER_ROTATION_GUARD_CHECK");
        {
            let _guard = EnvVarGuard::set_many(&[(key.clone(), Some(OsString::from("set")))]);
            assert_eq!(std::env::var_os(&key), Some(OsString::from("set")));
        }
        assert_eq!(std::env::var_os(&key), None);
    }
}
