//! Process-environment helpers shared by integration tests.

use camino::Utf8PathBuf;
use std::env;
use std::ffi::OsString;
use std::sync::{Mutex, MutexGuard, PoisonError};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// One environment change: set to `Some(value)` or remove on `None`.
pub type EnvChange = (OsString, Option<OsString>);

/// Applies environment changes and restores the previous values on drop.
///
/// Holding the guard holds a process-wide lock, so guards never interleave.
pub struct EnvVarGuard {
    restore: Vec<EnvChange>,
    _lock: MutexGuard<'static, ()>,
}

impl EnvVarGuard {
    /// Applies `changes` for the lifetime of the guard.
    #[must_use]
    pub fn set_many(changes: &[EnvChange]) -> Self {
        let lock = ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let restore = changes
            .iter()
            .map(|(key, value)| {
                let previous = env::var_os(key);
                apply(key, value.as_ref());
                (key.clone(), previous)
            })
            .collect();
        Self {
            restore,
            _lock: lock,
        }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        for (key, value) in self.restore.drain(..).rev() {
            apply(&key, value.as_ref());
        }
    }
}

fn apply(key: &OsString, value: Option<&OsString>) {
    // SAFETY: every mutation happens while `ENV_LOCK` is held.
    unsafe {
        match value {
            Some(new_value) => env::set_var(key, new_value),
            None => env::remove_var(key),
        }
    }
}

/// Finds the `pg_worker` binary built alongside the test executable.
///
/// Checks `CARGO_BIN_EXE_pg_worker` first, then the target directory above
/// the running test, then `PATH`.
#[must_use]
pub fn locate_pg_worker_path() -> Option<Utf8PathBuf> {
    if let Some(path) = option_env!("CARGO_BIN_EXE_pg_worker") {
        return Some(Utf8PathBuf::from(path));
    }
    beside_test_binary().or_else(on_search_path)
}

fn beside_test_binary() -> Option<Utf8PathBuf> {
    let exe = Utf8PathBuf::try_from(env::current_exe().ok()?).ok()?;
    let candidate = exe.parent()?.parent()?.join("pg_worker");
    candidate.is_file().then_some(candidate)
}

fn on_search_path() -> Option<Utf8PathBuf> {
    let search_path = env::var_os("PATH")?;
    env::split_paths(&search_path)
        .filter_map(|dir| Utf8PathBuf::try_from(dir.join("pg_worker")).ok())
        .find(|candidate| candidate.is_file())
}
