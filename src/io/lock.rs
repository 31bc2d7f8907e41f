//! Single-instance lock file.
//!
//! The lock lives in `$XDG_RUNTIME_DIR` (the system temp dir when unset) and
//! holds the owning PID followed by the config directory in use, one per
//! line. The OS releases the `fs2` lock when the process dies, so a file left
//! behind by a crash never blocks the next start.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::common::constants::LOCK_FILE_NAME;
use crate::common::utils::private_path;

/// Contents of a lock file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceInfo {
    pub pid: u32,
    /// `--config` directory of the running instance, if any.
    pub config_dir: Option<PathBuf>,
}

impl InstanceInfo {
    pub fn current() -> Self {
        Self {
            pid: std::process::id(),
            config_dir: crate::config::get_custom_config_dir(),
        }
    }

    pub fn from_lock_contents(contents: &str) -> Result<Self> {
        let mut lines = contents.lines();
        let pid = lines
            .next()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .context("Lock file is empty")?
            .parse::<u32>()
            .context("Invalid PID format in lock file")?;
        let config_dir = lines
            .next()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(PathBuf::from);

        Ok(Self { pid, config_dir })
    }

    pub fn to_lock_contents(&self) -> String {
        match &self.config_dir {
            Some(dir) => format!("{}\n{}\n", self.pid, dir.display()),
            None => format!("{}\n\n", self.pid),
        }
    }
}

/// Held for the lifetime of the running instance. Dropping it unlocks and
/// removes the file.
#[derive(Debug)]
pub struct LockGuard {
    file: File,
    path: PathBuf,
}

impl LockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Location of the lock file.
pub fn lock_path() -> PathBuf {
    let runtime_dir = std::env::var_os("XDG_RUNTIME_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir);
    runtime_dir.join(LOCK_FILE_NAME)
}

/// Take the instance lock at the default location.
pub fn acquire_lock() -> Result<LockGuard> {
    acquire_lock_at(&lock_path())
}

/// Take an exclusive lock on `path` and record this process in it.
///
/// Fails with the other instance's PID when the lock is already held.
pub fn acquire_lock_at(path: &Path) -> Result<LockGuard> {
    let mut file = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .with_context(|| format!("Failed to open lock file {}", private_path(path)))?;

    if file.try_lock_exclusive().is_err() {
        let holder = std::fs::read_to_string(path)
            .ok()
            .and_then(|contents| InstanceInfo::from_lock_contents(&contents).ok());
        match holder {
            Some(info) => anyhow::bail!("eyeshade is already running (PID: {})", info.pid),
            None => anyhow::bail!("eyeshade is already running"),
        }
    }

    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(InstanceInfo::current().to_lock_contents().as_bytes())?;
    file.flush()?;

    Ok(LockGuard {
        file,
        path: path.to_path_buf(),
    })
}

/// The running instance recorded at `path`, if its process is still alive.
pub fn running_instance_at(path: &Path) -> Option<InstanceInfo> {
    let contents = std::fs::read_to_string(path).ok()?;
    let info = InstanceInfo::from_lock_contents(&contents).ok()?;
    is_instance_running(info.pid).then_some(info)
}

pub fn running_instance() -> Option<InstanceInfo> {
    running_instance_at(&lock_path())
}

/// Check whether `pid` names a live process.
#[cfg(unix)]
pub fn is_instance_running(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    // Signal 0 probes for existence without delivering anything.
    kill(Pid::from_raw(pid as i32), None).is_ok()
}

#[cfg(not(unix))]
pub fn is_instance_running(pid: u32) -> bool {
    pid != 0
}

/// Ask a running instance to reload its configuration.
#[cfg(unix)]
pub fn send_reload_signal(pid: u32) -> Result<()> {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    kill(Pid::from_raw(pid as i32), Signal::SIGUSR2)
        .map_err(|e| anyhow::anyhow!("Failed to send reload signal: {}", e))
}

#[cfg(not(unix))]
pub fn send_reload_signal(_pid: u32) -> Result<()> {
    anyhow::bail!("Reload signals are not supported on this platform")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn lock_contents_parse() {
        let info = InstanceInfo::from_lock_contents("4242\n/home/u/cfg\n").unwrap();
        assert_eq!(info.pid, 4242);
        assert_eq!(info.config_dir, Some(PathBuf::from("/home/u/cfg")));

        let info = InstanceInfo::from_lock_contents("17\n\n").unwrap();
        assert_eq!(info.config_dir, None);

        assert!(InstanceInfo::from_lock_contents("").is_err());
        assert!(InstanceInfo::from_lock_contents("abc\n").is_err());
    }

    #[test]
    fn lock_contents_serialize() {
        let info = InstanceInfo {
            pid: 9,
            config_dir: None,
        };
        assert_eq!(info.to_lock_contents(), "9\n\n");
        assert_eq!(InstanceInfo::from_lock_contents(&info.to_lock_contents()).unwrap(), info);
    }

    #[test]
    fn second_lock_fails_until_first_drops() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("eyeshade.lock");

        let guard = acquire_lock_at(&path).unwrap();
        let err = acquire_lock_at(&path).unwrap_err().to_string();
        assert!(err.contains("already running"));
        assert!(err.contains(&std::process::id().to_string()));

        drop(guard);
        assert!(!path.exists());
        assert!(acquire_lock_at(&path).is_ok());
    }

    #[test]
    fn current_process_is_reported_running() {
        assert!(is_instance_running(std::process::id()));
    }
}
