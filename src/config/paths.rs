use crate::config::ConfigError;
use crate::shared::fs_atomic::ensure_private_dir;
use std::fs;
use std::path::PathBuf;

pub const GLOBAL_STATE_DIR: &str = ".ulysses-bridge";
pub const GLOBAL_SETTINGS_FILE_NAME: &str = "config.yaml";

/// Layout of everything the bridge keeps on disk for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatePaths {
    pub root: PathBuf,
}

impl StatePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn settings_file(&self) -> PathBuf {
        self.root.join(GLOBAL_SETTINGS_FILE_NAME)
    }

    pub fn callbacks_dir(&self) -> PathBuf {
        self.root.join("callbacks")
    }

    pub fn receiver_dir(&self) -> PathBuf {
        self.root.join("receiver")
    }

    pub fn receiver_pid_path(&self) -> PathBuf {
        self.receiver_dir().join("receiver.pid")
    }

    pub fn receiver_stop_path(&self) -> PathBuf {
        self.receiver_dir().join("stop")
    }

    pub fn credentials_dir(&self) -> PathBuf {
        self.root.join("credentials")
    }

    pub fn access_token_path(&self) -> PathBuf {
        self.credentials_dir().join("access-token")
    }

    pub fn log_path(&self) -> PathBuf {
        self.root.join("logs/bridge.log")
    }
}

pub fn default_state_root_path() -> Result<PathBuf, ConfigError> {
    let home = std::env::var_os("HOME").ok_or(ConfigError::HomeDirectoryUnavailable)?;
    Ok(PathBuf::from(home).join(GLOBAL_STATE_DIR))
}

pub fn bootstrap_state_root(paths: &StatePaths) -> Result<(), ConfigError> {
    for path in [paths.receiver_dir(), paths.root.join("logs")] {
        fs::create_dir_all(&path).map_err(|source| ConfigError::CreateDir {
            path: path.display().to_string(),
            source,
        })?;
    }
    for path in [paths.callbacks_dir(), paths.credentials_dir()] {
        ensure_private_dir(&path).map_err(|source| ConfigError::CreateDir {
            path: path.display().to_string(),
            source,
        })?;
    }
    Ok(())
}
