use std::collections::BTreeMap;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use tempfile::tempdir;
use ulysses_bridge::config::{bootstrap_state_root, StatePaths};
use ulysses_bridge::receiver::handle_callback_url;
use ulysses_bridge::shared::ids::CorrelationId;
use ulysses_bridge::store::{CallbackArtifact, SecureStore, StoreError};

fn mode(path: &std::path::Path) -> u32 {
    fs::metadata(path).expect("metadata").permissions().mode() & 0o777
}

#[test]
fn store_directory_and_artifacts_are_owner_only() {
    let dir = tempdir().expect("tempdir");
    let paths = StatePaths::new(dir.path().join(".ulysses-bridge"));
    bootstrap_state_root(&paths).expect("bootstrap");
    fs::set_permissions(paths.callbacks_dir(), fs::Permissions::from_mode(0o755))
        .expect("loosen dir");

    let store = SecureStore::open(paths.callbacks_dir()).expect("store");
    assert_eq!(mode(store.root()), 0o700);

    let id = CorrelationId::parse("new-group-1-ab").expect("id");
    let path = store
        .write_artifact(&CallbackArtifact::success(id, BTreeMap::new()))
        .expect("write");
    assert_eq!(mode(&path), 0o600);
}

#[test]
fn rewriting_an_artifact_replaces_a_planted_symlink_without_following_it() {
    let dir = tempdir().expect("tempdir");
    let store = SecureStore::open(dir.path().join("callbacks")).expect("store");
    let victim = dir.path().join("victim.txt");
    fs::write(&victim, "untouched").expect("victim");
    let id = CorrelationId::parse("trash-4-cd").expect("id");
    std::os::unix::fs::symlink(&victim, store.path_for(&id).expect("path")).expect("symlink");

    assert!(matches!(
        store.read_artifact(&id),
        Err(StoreError::SymlinkRejected { .. })
    ));
    store
        .write_artifact(&CallbackArtifact::success(id.clone(), BTreeMap::new()))
        .expect("write replaces link");

    assert_eq!(fs::read_to_string(&victim).expect("victim"), "untouched");
    assert!(store.read_artifact(&id).is_ok());
}

#[test]
fn callback_handler_output_is_readable_by_the_store() {
    let dir = tempdir().expect("tempdir");
    let store = SecureStore::open(dir.path().join("callbacks")).expect("store");

    handle_callback_url(
        &store,
        "ulysses-bridge",
        "ulysses-bridge://x-callback-url/error?callbackId=remove-note-5-ef&errorCode=7&errorMessage=Locked",
    )
    .expect("handle");

    let id = CorrelationId::parse("remove-note-5-ef").expect("id");
    let artifact = store.read_artifact(&id).expect("read");
    assert!(artifact.is_error);
    assert_eq!(artifact.error_message(), Some("Locked"));
    assert_eq!(artifact.data.get("errorCode").map(String::as_str), Some("7"));
}
