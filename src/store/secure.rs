use super::{CallbackArtifact, StoreError};
use crate::shared::fs_atomic::{atomic_write_private, ensure_private_dir, loose_permission_bits};
use crate::shared::ids::CorrelationId;
use std::fs;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime};

pub const ARTIFACT_EXTENSION: &str = "json";
pub const MAX_ARTIFACT_BYTES: u64 = 4 * 1024 * 1024;

/// Private, owner-only directory holding callback artifacts keyed by
/// correlation id. Symbolic links are never followed, read, or deleted.
#[derive(Debug, Clone)]
pub struct SecureStore {
    root: PathBuf,
}

impl SecureStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        match fs::symlink_metadata(&root) {
            Ok(meta) if meta.file_type().is_symlink() => {
                return Err(StoreError::SymlinkRejected {
                    path: root.display().to_string(),
                })
            }
            Ok(meta) if !meta.is_dir() => {
                return Err(StoreError::Setup {
                    path: root.display().to_string(),
                    source: std::io::Error::other("store root is not a directory"),
                })
            }
            Ok(_) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(StoreError::Setup {
                    path: root.display().to_string(),
                    source,
                })
            }
        }

        ensure_private_dir(&root).map_err(|source| StoreError::Setup {
            path: root.display().to_string(),
            source,
        })?;
        let root = fs::canonicalize(&root).map_err(|source| StoreError::Setup {
            path: root.display().to_string(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic artifact path for `id`, checked to be a direct child
    /// of the store root.
    pub fn path_for(&self, id: &CorrelationId) -> Result<PathBuf, StoreError> {
        let candidate = self
            .root
            .join(format!("{}.{ARTIFACT_EXTENSION}", id.as_str()));
        let direct_child = candidate.parent() == Some(self.root.as_path())
            && candidate
                .strip_prefix(&self.root)
                .map(|rest| {
                    let mut components = rest.components();
                    matches!(components.next(), Some(Component::Normal(_)))
                        && components.next().is_none()
                })
                .unwrap_or(false);
        if !direct_child {
            return Err(StoreError::OutsideRoot {
                path: candidate.display().to_string(),
            });
        }
        Ok(candidate)
    }

    /// Writes the artifact owner-read/write only, replacing any stale
    /// artifact with the same id.
    pub fn write_artifact(&self, artifact: &CallbackArtifact) -> Result<PathBuf, StoreError> {
        let path = self.path_for(&artifact.callback_id)?;
        let encoded = serde_json::to_vec(artifact).map_err(|source| StoreError::Encode {
            path: path.display().to_string(),
            source,
        })?;
        atomic_write_private(&path, &encoded).map_err(|source| StoreError::Write {
            path: path.display().to_string(),
            source,
        })?;
        Ok(path)
    }

    pub fn read_artifact(&self, id: &CorrelationId) -> Result<CallbackArtifact, StoreError> {
        let path = self.path_for(id)?;
        let shown = path.display().to_string();
        let linked = match fs::symlink_metadata(&path) {
            Ok(meta) => meta,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound { path: shown })
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: shown,
                    source,
                })
            }
        };
        if linked.file_type().is_symlink() {
            tracing::warn!(event = "store.symlink_rejected", path = %shown, "refusing to read symlinked artifact");
            return Err(StoreError::SymlinkRejected { path: shown });
        }
        if !linked.is_file() {
            return Err(StoreError::NotRegularFile { path: shown });
        }
        let loose = loose_permission_bits(&linked);
        if loose != 0 {
            tracing::warn!(
                event = "store.permission_anomaly",
                path = %shown,
                mode = %format!("{loose:o}"),
                "artifact is readable beyond its owner"
            );
        }

        let file = fs::File::open(&path).map_err(|source| StoreError::Read {
            path: shown.clone(),
            source,
        })?;
        let opened = file.metadata().map_err(|source| StoreError::Read {
            path: shown.clone(),
            source,
        })?;
        if !same_file(&linked, &opened) {
            tracing::warn!(event = "store.symlink_rejected", path = %shown, "artifact swapped between lstat and open");
            return Err(StoreError::SymlinkRejected { path: shown });
        }
        if opened.len() > MAX_ARTIFACT_BYTES {
            return Err(StoreError::Corrupt {
                path: shown,
                reason: format!("artifact exceeds {MAX_ARTIFACT_BYTES} bytes"),
            });
        }

        let mut raw = Vec::with_capacity(opened.len() as usize);
        file.take(MAX_ARTIFACT_BYTES + 1)
            .read_to_end(&mut raw)
            .map_err(|source| StoreError::Read {
                path: shown.clone(),
                source,
            })?;
        let artifact: CallbackArtifact =
            serde_json::from_slice(&raw).map_err(|err| StoreError::Corrupt {
                path: shown.clone(),
                reason: err.to_string(),
            })?;
        if artifact.callback_id != *id {
            return Err(StoreError::Corrupt {
                path: shown,
                reason: format!(
                    "artifact carries callback id `{}`",
                    artifact.callback_id.as_str()
                ),
            });
        }
        Ok(artifact)
    }

    /// Best-effort removal. Missing files are fine; symlinks are logged and
    /// left in place.
    pub fn delete_artifact(&self, id: &CorrelationId) {
        let path = match self.path_for(id) {
            Ok(path) => path,
            Err(err) => {
                tracing::warn!(event = "store.delete_failed", error = %err);
                return;
            }
        };
        remove_regular_file(&path);
    }

    /// Removes artifacts (and abandoned temp files) older than `max_age`.
    /// Returns the number of files removed.
    pub fn sweep_stale(&self, max_age: Duration) -> usize {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(event = "store.sweep_failed", path = %self.root.display(), error = %err);
                return 0;
            }
        };
        let now = SystemTime::now();
        let mut removed = 0;
        for entry in entries.filter_map(Result::ok) {
            let path = entry.path();
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let is_artifact = path.extension().and_then(|ext| ext.to_str()) == Some(ARTIFACT_EXTENSION);
            let is_temp = name.starts_with('.') && name.contains(".tmp-");
            if !is_artifact && !is_temp {
                continue;
            }
            let Ok(meta) = fs::symlink_metadata(&path) else {
                continue;
            };
            if meta.file_type().is_symlink() {
                tracing::warn!(event = "store.sweep_skipped_symlink", path = %path.display());
                continue;
            }
            if !meta.is_file() {
                continue;
            }
            let age = meta
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or_default();
            if age > max_age && remove_regular_file(&path) {
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::info!(event = "store.swept", removed, "removed stale callback artifacts");
        }
        removed
    }
}

fn remove_regular_file(path: &Path) -> bool {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => {
            tracing::warn!(event = "store.symlink_not_deleted", path = %path.display());
            false
        }
        Ok(_) => match fs::remove_file(path) {
            Ok(()) => true,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => false,
            Err(err) => {
                tracing::warn!(event = "store.delete_failed", path = %path.display(), error = %err);
                false
            }
        },
        Err(_) => false,
    }
}

#[cfg(unix)]
fn same_file(a: &fs::Metadata, b: &fs::Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;
    a.dev() == b.dev() && a.ino() == b.ino()
}

#[cfg(not(unix))]
fn same_file(_a: &fs::Metadata, b: &fs::Metadata) -> bool {
    b.is_file()
}
