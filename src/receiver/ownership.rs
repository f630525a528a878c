use super::ReceiverError;
use crate::config::StatePaths;
use crate::shared::fs_atomic::atomic_write_private;
use std::fs;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);
const SIGNAL_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverState {
    NotRunning,
    Running { pid: u32 },
    /// Marker names a process that is gone.
    Stale { pid: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopResult {
    pub pid: u32,
    pub forced: bool,
}

pub fn receiver_state(paths: &StatePaths) -> Result<ReceiverState, ReceiverError> {
    match read_pid_marker(paths)? {
        Some(pid) if is_process_alive(pid) => Ok(ReceiverState::Running { pid }),
        Some(pid) => Ok(ReceiverState::Stale { pid }),
        None => Ok(ReceiverState::NotRunning),
    }
}

/// Decimal pid from the marker file. An unparsable marker reads as stale
/// pid 0 so callers discard it.
pub fn read_pid_marker(paths: &StatePaths) -> Result<Option<u32>, ReceiverError> {
    let path = paths.receiver_pid_path();
    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ReceiverError::ReadMarker {
                path: path.display().to_string(),
                source,
            })
        }
    };
    Ok(Some(raw.trim().parse::<u32>().unwrap_or(0)))
}

pub fn write_pid_marker(paths: &StatePaths, pid: u32) -> Result<(), ReceiverError> {
    let path = paths.receiver_pid_path();
    atomic_write_private(&path, pid.to_string().as_bytes()).map_err(|source| {
        ReceiverError::WriteMarker {
            path: path.display().to_string(),
            source,
        }
    })
}

pub fn clear_pid_marker(paths: &StatePaths) {
    let _ = fs::remove_file(paths.receiver_pid_path());
}

/// Removes the marker only while it still names `pid`.
pub fn clear_pid_marker_if_owned(paths: &StatePaths, pid: u32) {
    if matches!(read_pid_marker(paths), Ok(Some(current)) if current == pid) {
        clear_pid_marker(paths);
    }
}

pub fn signal_stop(paths: &StatePaths) -> Result<(), ReceiverError> {
    let path = paths.receiver_stop_path();
    fs::write(&path, b"stop").map_err(|source| ReceiverError::WriteMarker {
        path: path.display().to_string(),
        source,
    })
}

/// Asks the receiver to exit through the stop file, then escalates to
/// `TERM` and `KILL` once `timeout` passes.
pub fn stop_receiver(paths: &StatePaths, timeout: Duration) -> Result<StopResult, ReceiverError> {
    let pid = match receiver_state(paths)? {
        ReceiverState::Running { pid } => pid,
        ReceiverState::Stale { pid } => {
            tracing::info!(event = "receiver.stale_marker_removed", pid);
            clear_pid_marker(paths);
            let _ = fs::remove_file(paths.receiver_stop_path());
            return Err(ReceiverError::NotRunning);
        }
        ReceiverState::NotRunning => return Err(ReceiverError::NotRunning),
    };

    signal_stop(paths)?;
    tracing::info!(event = "receiver.stop.requested", pid);

    let mut forced = false;
    if !wait_for_exit(pid, timeout) {
        send_signal(pid, "-TERM");
        if !wait_for_exit(pid, SIGNAL_GRACE) {
            forced = true;
            tracing::warn!(event = "receiver.stop.force_kill", pid);
            send_signal(pid, "-KILL");
            if !wait_for_exit(pid, SIGNAL_GRACE) {
                tracing::error!(event = "receiver.stop.failed", pid, "receiver survived TERM/KILL");
                return Err(ReceiverError::StopFailedAlive { pid });
            }
        }
    }

    clear_pid_marker_if_owned(paths, pid);
    let _ = fs::remove_file(paths.receiver_stop_path());
    Ok(StopResult { pid, forced })
}

fn wait_for_exit(pid: u32, timeout: Duration) -> bool {
    let start = Instant::now();
    while is_process_alive(pid) {
        if start.elapsed() >= timeout {
            return false;
        }
        thread::sleep(STOP_POLL_INTERVAL);
    }
    true
}

/// Signal-0 probe; never delivers a signal.
pub fn is_process_alive(pid: u32) -> bool {
    if pid == 0 {
        return false;
    }

    #[cfg(unix)]
    {
        Command::new("kill")
            .arg("-0")
            .arg(pid.to_string())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    #[cfg(not(unix))]
    {
        false
    }
}

fn send_signal(pid: u32, signal: &str) {
    #[cfg(unix)]
    {
        let _ = Command::new("kill")
            .arg(signal)
            .arg(pid.to_string())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
    }

    #[cfg(not(unix))]
    {
        let _ = (pid, signal);
    }
}
