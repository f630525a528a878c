use super::ownership::{clear_pid_marker, is_process_alive, read_pid_marker, receiver_state};
use super::{ReceiverError, ReceiverState};
use crate::config::{Settings, StatePaths};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::Duration;

pub const RECEIVER_VERB: &str = "__receiver";

/// Program and arguments that start a receiver daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl ReceiverCommand {
    /// `<program> __receiver --state-root <root>`, defaulting `program` to
    /// the running executable.
    pub fn for_state_root(program: Option<&Path>, state_root: &Path) -> Result<Self, ReceiverError> {
        let program = match program {
            Some(program) => program.to_path_buf(),
            None => std::env::current_exe().map_err(|source| ReceiverError::Spawn {
                program: "current executable".to_string(),
                source,
            })?,
        };
        Ok(Self {
            program,
            args: vec![
                RECEIVER_VERB.into(),
                "--state-root".into(),
                state_root.as_os_str().to_owned(),
            ],
        })
    }
}

/// Keeps one receiver process alive for the state root.
#[derive(Debug)]
pub struct ReceiverSupervisor {
    paths: StatePaths,
    command: ReceiverCommand,
    start_attempts: u32,
    start_interval: Duration,
    start_lock: Mutex<()>,
}

impl ReceiverSupervisor {
    pub fn new(
        paths: StatePaths,
        command: ReceiverCommand,
        start_attempts: u32,
        start_interval: Duration,
    ) -> Self {
        Self {
            paths,
            command,
            start_attempts,
            start_interval,
            start_lock: Mutex::new(()),
        }
    }

    pub fn from_settings(paths: &StatePaths, settings: &Settings) -> Result<Self, ReceiverError> {
        let command =
            ReceiverCommand::for_state_root(settings.receiver.program.as_deref(), &paths.root)?;
        Ok(Self::new(
            paths.clone(),
            command,
            settings.receiver.start_attempts,
            Duration::from_millis(settings.receiver.start_interval_ms),
        ))
    }

    pub fn command(&self) -> &ReceiverCommand {
        &self.command
    }

    /// Returns the pid of a live receiver, starting one when the marker is
    /// missing or stale. Idempotent; safe before every dispatch.
    pub fn ensure_running(&self) -> Result<u32, ReceiverError> {
        let _guard = self
            .start_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let stale = match receiver_state(&self.paths)? {
            ReceiverState::Running { pid } => return Ok(pid),
            ReceiverState::Stale { pid } => {
                tracing::warn!(event = "receiver.stale_marker_removed", pid);
                clear_pid_marker(&self.paths);
                Some(pid)
            }
            ReceiverState::NotRunning => None,
        };

        let spawned = self.spawn()?;
        tracing::info!(
            event = "receiver.spawned",
            pid = spawned,
            program = %self.command.program.display()
        );

        for _ in 0..self.start_attempts {
            thread::sleep(self.start_interval);
            if let Some(pid) = read_pid_marker(&self.paths)? {
                if Some(pid) != stale && is_process_alive(pid) {
                    tracing::info!(event = "receiver.started", pid);
                    return Ok(pid);
                }
            }
        }

        tracing::warn!(
            event = "receiver.start_timeout",
            attempts = self.start_attempts,
            interval_ms = self.start_interval.as_millis() as u64
        );
        Err(ReceiverError::StartTimeout {
            attempts: self.start_attempts,
        })
    }

    fn spawn(&self) -> Result<u32, ReceiverError> {
        let mut command = Command::new(&self.command.program);
        command
            .args(&self.command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let mut child = command.spawn().map_err(|source| ReceiverError::Spawn {
            program: self.command.program.display().to_string(),
            source,
        })?;
        let pid = child.id();
        // Reap on exit so a dead receiver never probes alive as a zombie.
        let _ = thread::Builder::new()
            .name("receiver-reaper".to_string())
            .spawn(move || {
                let _ = child.wait();
            });
        Ok(pid)
    }
}
