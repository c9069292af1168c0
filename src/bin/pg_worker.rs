//! Runs embedded `PostgreSQL` lifecycle steps for the integration tests when
//! the test process itself is root.
//!
//! ```text
//! pg_worker <setup|start|stop> <payload.json>
//! ```
//!
//! The payload is a serialised `WorkerPayload` from `pg-embed-setup-unpriv`:
//! cluster settings plus environment overrides. `PostgreSQL` refuses to run
//! as root, so the worker re-executes itself as `nobody` (through `runuser`,
//! falling back to `su`) and drops any remaining privileges before touching
//! the data directory.

#[cfg(unix)]
fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    unix::main()
}

#[cfg(not(unix))]
fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    Err("pg_worker requires a Unix host".into())
}

#[cfg(unix)]
mod unix {
    use camino::{Utf8Path, Utf8PathBuf};
    use nix::unistd::{Uid, User, initgroups, setgid, setuid};
    use pg_embedded_setup_unpriv::ambient_dir_and_path;
    use pg_embedded_setup_unpriv::worker::{PlainSecret, WorkerPayload};
    use postgresql_embedded::{PostgreSQL, Status};
    use std::env;
    use std::ffi::CString;
    use std::io::{self, Read};
    use std::process::{Command, ExitStatus};
    use thiserror::Error;

    const REEXEC_MARKER: &str = "PG_WORKER_REEXEC";
    const SAFE_PATH: &str = "/usr/sbin:/usr/bin:/sbin:/bin";
    const UNPRIVILEGED_USER: &str = "nobody";

    #[derive(Debug, Error)]
    pub enum WorkerError {
        #[error("usage: pg_worker <setup|start|stop> <payload.json>: {0}")]
        Usage(String),
        #[error("cannot read payload {path}: {source}")]
        PayloadRead {
            path: Utf8PathBuf,
            #[source]
            source: Box<dyn std::error::Error + Send + Sync>,
        },
        #[error("cannot parse payload: {0}")]
        PayloadParse(#[from] serde_json::Error),
        #[error("invalid cluster settings: {0}")]
        Settings(String),
        #[error("cannot build runtime: {0}")]
        Runtime(#[source] io::Error),
        #[error("cannot drop privileges: {0}")]
        Privileges(String),
        #[error("postgres {step} failed: {message}")]
        Postgres { step: &'static str, message: String },
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Step {
        Setup,
        Start,
        Stop,
    }

    impl Step {
        pub fn parse(raw: &str) -> Result<Self, WorkerError> {
            match raw {
                "setup" => Ok(Self::Setup),
                "start" => Ok(Self::Start),
                "stop" => Ok(Self::Stop),
                other => Err(WorkerError::Usage(format!("unknown step '{other}'"))),
            }
        }

        const fn label(self) -> &'static str {
            match self {
                Self::Setup => "setup",
                Self::Start => "start",
                Self::Stop => "stop",
            }
        }
    }

    pub fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let args = utf8_args()?;
        if Uid::effective().is_root() && env::var_os(REEXEC_MARKER).is_none() {
            let status = reexec_unprivileged(&args)?;
            std::process::exit(status.code().unwrap_or(1));
        }
        let (step, payload_path) = parse_args(&args)?;
        run(step, &payload_path)?;
        Ok(())
    }

    fn utf8_args() -> Result<Vec<String>, WorkerError> {
        env::args_os()
            .map(|arg| {
                arg.into_string()
                    .map_err(|_| WorkerError::Usage("arguments must be UTF-8".to_owned()))
            })
            .collect()
    }

    pub fn parse_args(args: &[String]) -> Result<(Step, Utf8PathBuf), WorkerError> {
        match args {
            [_, step, payload] => Ok((Step::parse(step)?, Utf8PathBuf::from(payload))),
            [_, _] | [_] | [] => Err(WorkerError::Usage("missing argument".to_owned())),
            _ => Err(WorkerError::Usage("too many arguments".to_owned())),
        }
    }

    fn run(step: Step, payload_path: &Utf8Path) -> Result<(), WorkerError> {
        let payload = read_payload(payload_path)?;
        become_user(UNPRIVILEGED_USER)?;
        let settings = payload
            .settings
            .into_settings()
            .map_err(|err| WorkerError::Settings(err.to_string()))?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(WorkerError::Runtime)?;
        apply_environment(&payload.environment);

        let mut postgres = PostgreSQL::new(settings);
        let failed = |message: postgresql_embedded::Error| WorkerError::Postgres {
            step: step.label(),
            message: message.to_string(),
        };
        runtime.block_on(async {
            match step {
                Step::Setup => {
                    postgres.setup().await.map_err(failed)?;
                    start_unless_running(&mut postgres).await.map_err(failed)
                }
                Step::Start => {
                    start_unless_running(&mut postgres).await.map_err(failed)?;
                    // The server must outlive this process.
                    std::mem::forget(postgres);
                    Ok(())
                }
                Step::Stop => postgres.stop().await.map_err(failed),
            }
        })
    }

    async fn start_unless_running(
        postgres: &mut PostgreSQL,
    ) -> Result<(), postgresql_embedded::Error> {
        if matches!(postgres.status(), Status::Started) {
            return Ok(());
        }
        postgres.start().await
    }

    fn read_payload(path: &Utf8Path) -> Result<WorkerPayload, WorkerError> {
        let read_failed = |source: Box<dyn std::error::Error + Send + Sync>| {
            WorkerError::PayloadRead {
                path: path.to_path_buf(),
                source,
            }
        };
        let (dir, relative) = ambient_dir_and_path(path).map_err(|err| read_failed(err.into()))?;
        let mut file = dir
            .open(relative.as_std_path())
            .map_err(|err| read_failed(err.into()))?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .map_err(|err| read_failed(err.into()))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn reexec_unprivileged(args: &[String]) -> Result<ExitStatus, WorkerError> {
        let exe = env::current_exe().map_err(WorkerError::Runtime)?;
        let forwarded = args.get(1..).unwrap_or_default();
        let runuser = Command::new("runuser")
            .args(["-u", UNPRIVILEGED_USER, "--"])
            .arg(&exe)
            .args(forwarded)
            .env(REEXEC_MARKER, "1")
            .env("PATH", SAFE_PATH)
            .status();
        match runuser {
            Ok(status) => Ok(status),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                let exe_text = exe.to_string_lossy();
                let command = std::iter::once(exe_text.as_ref())
                    .chain(forwarded.iter().map(String::as_str))
                    .map(quote_for_shell)
                    .collect::<Vec<_>>()
                    .join(" ");
                Command::new("/bin/su")
                    .args(["-s", "/bin/sh", UNPRIVILEGED_USER, "-c"])
                    .arg(format!("{REEXEC_MARKER}=1 exec {command}"))
                    .env("PATH", SAFE_PATH)
                    .status()
                    .map_err(|su_err| WorkerError::Privileges(su_err.to_string()))
            }
            Err(err) => Err(WorkerError::Privileges(err.to_string())),
        }
    }

    fn become_user(name: &str) -> Result<(), WorkerError> {
        if !Uid::effective().is_root() {
            return Ok(());
        }
        let denied = |err: nix::Error| WorkerError::Privileges(err.to_string());
        let user = User::from_name(name)
            .map_err(denied)?
            .ok_or_else(|| WorkerError::Privileges(format!("no user named '{name}'")))?;
        let c_name = CString::new(user.name.as_str())
            .map_err(|err| WorkerError::Privileges(err.to_string()))?;
        initgroups(&c_name, user.gid).map_err(denied)?;
        setgid(user.gid).map_err(denied)?;
        setuid(user.uid).map_err(denied)?;

        // SAFETY: the worker is single-threaded at this point.
        unsafe {
            env::set_var("HOME", &user.dir);
            env::set_var("USER", &user.name);
            env::set_var("LOGNAME", &user.name);
        }
        Ok(())
    }

    fn apply_environment(environment: &[(String, Option<PlainSecret>)]) {
        for (key, value) in environment {
            // SAFETY: the worker is single-threaded and owns its environment.
            unsafe {
                match value {
                    Some(secret) => env::set_var(key, secret.expose()),
                    None => env::remove_var(key),
                }
            }
        }
    }

    /// Wraps `value` in single quotes for `/bin/sh`, escaping embedded
    /// quotes.
    pub fn quote_for_shell(value: &str) -> String {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}
