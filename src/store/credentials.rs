use super::StoreError;
use crate::config::StatePaths;
use crate::shared::fs_atomic::{atomic_write_private, ensure_private_dir};
use std::fs;

/// Reads the persisted access token. A missing, empty, or symlinked file
/// yields `None`.
pub fn load_access_token(paths: &StatePaths) -> Option<String> {
    let path = paths.access_token_path();
    let meta = fs::symlink_metadata(&path).ok()?;
    if meta.file_type().is_symlink() || !meta.is_file() {
        tracing::warn!(event = "credentials.rejected", path = %path.display(), "access token file is not a regular file");
        return None;
    }
    let raw = fs::read_to_string(&path).ok()?;
    let token = raw.trim();
    (!token.is_empty()).then(|| token.to_string())
}

pub fn save_access_token(paths: &StatePaths, token: &str) -> Result<(), StoreError> {
    let dir = paths.credentials_dir();
    ensure_private_dir(&dir).map_err(|source| StoreError::Setup {
        path: dir.display().to_string(),
        source,
    })?;
    let path = paths.access_token_path();
    atomic_write_private(&path, token.trim().as_bytes()).map_err(|source| StoreError::Write {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn token_round_trips_and_blank_is_absent() {
        let dir = tempdir().expect("tempdir");
        let paths = StatePaths::new(dir.path());
        assert_eq!(load_access_token(&paths), None);

        save_access_token(&paths, " tok-123\n").expect("save");
        assert_eq!(load_access_token(&paths).as_deref(), Some("tok-123"));

        save_access_token(&paths, "   ").expect("save blank");
        assert_eq!(load_access_token(&paths), None);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_token_is_ignored() {
        let dir = tempdir().expect("tempdir");
        let paths = StatePaths::new(dir.path());
        fs::create_dir_all(paths.credentials_dir()).expect("mkdir");
        let decoy = dir.path().join("decoy");
        fs::write(&decoy, "stolen").expect("decoy");
        std::os::unix::fs::symlink(&decoy, paths.access_token_path()).expect("symlink");

        assert_eq!(load_access_token(&paths), None);
    }
}
