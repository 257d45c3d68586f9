//! Single-instance pid lock
//!
//! The pid file holds the decimal pid of the controller that owns it. A pid
//! that no longer names a live process is a stale lease and is taken over.

use relval_errors::{Error, OpsError, PlatformError};
use relval_events::{AppEvent, EventEmitter, EventSender, LockEvent};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// A held pid file, released on drop
pub struct PidLock {
    path: PathBuf,
    pid: u32,
    tx: EventSender,
}

impl EventEmitter for PidLock {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(&self.tx)
    }
}

impl PidLock {
    /// Acquire the lock at `path`, retrying while another live instance holds it
    ///
    /// # Errors
    ///
    /// Returns `OpsError::LockTimeout` when a live holder is still present
    /// after `attempts` checks, or `PlatformError::LockFile` if the pid file
    /// cannot be written.
    pub async fn acquire(
        path: &Path,
        attempts: u32,
        retry_delay: Duration,
        tx: EventSender,
    ) -> Result<Self, Error> {
        let own_pid = std::process::id();
        let mut holder = 0;

        for attempt in 1..=attempts {
            match read_holder(path).await {
                Some(pid) if pid_is_alive(pid) && u32::try_from(pid).ok() != Some(own_pid) => {
                    holder = pid;
                    tx.emit(AppEvent::Lock(LockEvent::Waiting {
                        holder: pid,
                        attempt,
                        attempts,
                    }));
                    if attempt < attempts {
                        tokio::time::sleep(retry_delay).await;
                    }
                }
                _ => {
                    write_pid(path, own_pid).await?;
                    tx.emit(AppEvent::Lock(LockEvent::Acquired {
                        path: path.display().to_string(),
                        pid: own_pid,
                    }));
                    return Ok(Self {
                        path: path.to_path_buf(),
                        pid: own_pid,
                        tx,
                    });
                }
            }
        }

        Err(OpsError::LockTimeout {
            path: path.display().to_string(),
            pid: holder,
            attempts,
        }
        .into())
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn pid(&self) -> u32 {
        self.pid
    }
}

impl Drop for PidLock {
    fn drop(&mut self) {
        // Only remove the file if it still names us
        let ours = std::fs::read_to_string(&self.path)
            .ok()
            .and_then(|contents| contents.trim().parse::<u32>().ok())
            == Some(self.pid);
        if ours && std::fs::remove_file(&self.path).is_ok() {
            self.emit(AppEvent::Lock(LockEvent::Released {
                path: self.path.display().to_string(),
            }));
        }
    }
}

async fn read_holder(path: &Path) -> Option<i32> {
    let contents = fs::read_to_string(path).await.ok()?;
    contents.trim().parse().ok()
}

async fn write_pid(path: &Path, pid: u32) -> Result<(), Error> {
    let lock_error = |e: std::io::Error| PlatformError::LockFile {
        path: path.display().to_string(),
        message: e.to_string(),
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await.map_err(lock_error)?;
        }
    }
    fs::write(path, format!("{pid}\n"))
        .await
        .map_err(lock_error)?;
    Ok(())
}

/// Whether `pid` names a live process
///
/// Probes with signal 0. A process owned by another user answers `EPERM`,
/// which still means it exists.
#[must_use]
pub fn pid_is_alive(pid: i32) -> bool {
    // 0 and negative values address process groups, never a single holder
    if pid <= 0 {
        return false;
    }
    // SAFETY: kill with signal 0 performs only existence and permission
    // checks; no signal is delivered.
    #[allow(unsafe_code)]
    let rc = unsafe { libc::kill(pid, 0) };
    if rc == 0 {
        return true;
    }
    std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}
