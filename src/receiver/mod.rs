pub mod callback;
pub mod daemon;
pub mod ownership;
pub mod supervisor;

pub use callback::{handle_callback_url, parse_callback_url};
pub use daemon::run_receiver;
pub use ownership::{
    is_process_alive, read_pid_marker, receiver_state, signal_stop, stop_receiver, ReceiverState,
    StopResult,
};
pub use supervisor::{ReceiverCommand, ReceiverSupervisor};

#[derive(Debug, thiserror::Error)]
pub enum ReceiverError {
    #[error("failed to read receiver marker {path}: {source}")]
    ReadMarker {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write receiver marker {path}: {source}")]
    WriteMarker {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to spawn receiver `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("receiver did not report a live pid after {attempts} attempts")]
    StartTimeout { attempts: u32 },
    #[error("receiver is already running with pid {pid}")]
    AlreadyRunning { pid: u32 },
    #[error("receiver pid {pid} remained alive after TERM/KILL")]
    StopFailedAlive { pid: u32 },
    #[error("receiver is not running")]
    NotRunning,
    #[error("invalid callback url: {reason}")]
    InvalidCallbackUrl { reason: String },
    #[error(transparent)]
    Store(#[from] crate::store::StoreError),
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
}
