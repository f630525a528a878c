//! Long-lived half of the receiver. Artifacts are not written here: the OS
//! hands each `<callback_scheme>://` URL to a fresh `ulysses-bridge callback
//! <url>` process, so that command must be registered as the scheme's URL
//! handler. A live daemon proves the marker is held and stale artifacts are
//! being swept; it says nothing about whether that handler is registered.

use super::ownership::{clear_pid_marker_if_owned, read_pid_marker, receiver_state, write_pid_marker};
use super::{ReceiverError, ReceiverState};
use crate::config::{bootstrap_state_root, Settings, StatePaths};
use crate::store::SecureStore;
use std::fs;
use std::thread;
use std::time::{Duration, Instant};

pub const RECEIVER_TICK: Duration = Duration::from_millis(250);

/// Receiver daemon loop. Holds the pid marker, sweeps stale artifacts, and
/// returns once the stop file appears or another process takes the marker.
pub fn run_receiver(paths: &StatePaths, settings: &Settings) -> Result<(), ReceiverError> {
    bootstrap_state_root(paths)?;
    let own_pid = std::process::id();
    if let ReceiverState::Running { pid } = receiver_state(paths)? {
        if pid != own_pid {
            return Err(ReceiverError::AlreadyRunning { pid });
        }
    }

    let stop_path = paths.receiver_stop_path();
    let _ = fs::remove_file(&stop_path);
    let store = SecureStore::open(paths.callbacks_dir())?;
    write_pid_marker(paths, own_pid)?;
    tracing::info!(event = "receiver.started", pid = own_pid, root = %paths.root.display());

    let retention = settings.store.retention();
    let sweep_interval = settings.store.sweep_interval();
    let mut last_sweep: Option<Instant> = None;

    let reason = loop {
        if stop_path.exists() {
            break "stop file detected";
        }
        match read_pid_marker(paths) {
            Ok(Some(pid)) if pid == own_pid => {}
            _ => break "pid marker no longer held",
        }
        if last_sweep.map_or(true, |at| at.elapsed() >= sweep_interval) {
            store.sweep_stale(retention);
            last_sweep = Some(Instant::now());
        }
        thread::sleep(RECEIVER_TICK);
    };

    clear_pid_marker_if_owned(paths, own_pid);
    let _ = fs::remove_file(&stop_path);
    tracing::info!(event = "receiver.stopped", pid = own_pid, reason);
    Ok(())
}
