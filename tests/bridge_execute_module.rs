use serde_json::{json, Map, Value};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::{tempdir, TempDir};
use ulysses_bridge::actions::InputError;
use ulysses_bridge::config::{Settings, StatePaths};
use ulysses_bridge::store::load_access_token;
use ulysses_bridge::{Bridge, BridgeError, ExecuteOutcome};

fn write_script(path: &Path, body: &str) {
    fs::write(path, body).expect("write script");
    let mut perms = fs::metadata(path).expect("metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).expect("chmod");
}

/// Opener that records each URL and answers through the store the way the
/// receiver would.
fn responder(record: &Path, store: &Path, is_error: bool, data: &str) -> String {
    format!(
        r#"#!/bin/sh
umask 077
printf '%s\n' "$1" >> '{record}'
id=$(printf '%s' "$1" | sed -n 's/.*callbackId%3D\([A-Za-z0-9_-]*\).*/\1/p')
if [ -n "$id" ]; then
  printf '{{"callbackId":"%s","isError":{is_error},"data":{data}}}' "$id" > '{store}/.'"$id"'.tmp'
  mv '{store}/.'"$id"'.tmp' '{store}/'"$id"'.json'
fi
exit 0
"#,
        record = record.display(),
        store = store.display(),
    )
}

fn recorder(record: &Path) -> String {
    format!(
        "#!/bin/sh\nprintf '%s\\n' \"$1\" >> '{}'\nexit 0\n",
        record.display()
    )
}

struct Harness {
    dir: TempDir,
    paths: StatePaths,
    record: PathBuf,
    opener: PathBuf,
}

impl Harness {
    fn new() -> Self {
        let dir = tempdir().expect("tempdir");
        let paths = StatePaths::new(dir.path().join(".ulysses-bridge"));
        let record = dir.path().join("opened.log");
        let opener = dir.path().join("fake-open");
        Self {
            dir,
            paths,
            record,
            opener,
        }
    }

    fn settings(&self) -> Settings {
        let mut settings = Settings::default();
        settings.opener = self.opener.display().to_string();
        settings.timeouts.callback_timeout_ms = 2_000;
        settings.timeouts.poll_interval_ms = 20;
        settings.timeouts.open_timeout_ms = 2_000;
        settings.access_token = Some("test-token".to_string());
        settings
    }

    fn open(&self, settings: Settings) -> Bridge {
        let bridge = Bridge::open(self.paths.clone(), settings).expect("open bridge");
        // The test process stands in for a live receiver.
        fs::write(
            self.paths.receiver_pid_path(),
            std::process::id().to_string(),
        )
        .expect("pid marker");
        bridge
    }

    fn answer_with(&self, is_error: bool, data: &str) {
        write_script(
            &self.opener,
            &responder(&self.record, &self.paths.callbacks_dir(), is_error, data),
        );
    }

    fn opened_urls(&self) -> Vec<String> {
        fs::read_to_string(&self.record)
            .map(|raw| raw.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    fn stored_files(&self) -> Vec<String> {
        fs::read_dir(self.paths.callbacks_dir())
            .expect("read callbacks")
            .filter_map(Result::ok)
            .map(|entry| entry.file_name().to_string_lossy().to_string())
            .collect()
    }
}

fn params(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

#[test]
fn response_round_trip_returns_payload_and_deletes_artifact() {
    let harness = Harness::new();
    harness.answer_with(false, r#"{"apiVersion":"2","buildNumber":"33000"}"#);
    let bridge = harness.open(harness.settings());

    let outcome = bridge
        .execute("get-version", &Map::new())
        .expect("get-version");
    let ExecuteOutcome::Response(data) = outcome else {
        panic!("expected a response");
    };
    assert_eq!(data.get("apiVersion").map(String::as_str), Some("2"));
    assert_eq!(data.get("buildNumber").map(String::as_str), Some("33000"));

    assert!(harness.stored_files().is_empty());
    assert_eq!(bridge.correlator().pending_count(), 0);

    let urls = harness.opened_urls();
    assert_eq!(urls.len(), 1);
    assert!(urls[0].starts_with("ulysses://x-callback-url/get-version?x-success="));
    assert!(urls[0].contains("&x-error="));
}

#[test]
fn unknown_action_fails_before_any_invocation() {
    let harness = Harness::new();
    harness.answer_with(false, "{}");
    let bridge = harness.open(harness.settings());

    let err = bridge
        .execute("format-disk", &params(json!({"id": "abc"})))
        .expect_err("unknown");
    assert!(matches!(
        err,
        BridgeError::InvalidInput(InputError::UnknownAction { .. })
    ));
    assert!(!harness.record.exists());
}

#[test]
fn fire_and_forget_action_never_touches_the_store() {
    let harness = Harness::new();
    harness.answer_with(false, "{}");
    let bridge = harness.open(harness.settings());

    let outcome = bridge
        .execute("new-sheet", &params(json!({"text": "# Title; rm -rf / `x` $(y)"})))
        .expect("new-sheet");
    assert_eq!(outcome, ExecuteOutcome::Dispatched);

    let urls = harness.opened_urls();
    assert_eq!(urls.len(), 1);
    assert_eq!(
        urls[0],
        "ulysses://x-callback-url/new-sheet?text=%23%20Title%3B%20rm%20-rf%20%2F%20%60x%60%20%24%28y%29"
    );
    assert!(harness.stored_files().is_empty());
    assert_eq!(bridge.correlator().pending_count(), 0);
}

#[test]
fn silence_times_out_within_bound_and_leaves_no_pending_entry() {
    let harness = Harness::new();
    write_script(&harness.opener, &recorder(&harness.record));
    let mut settings = harness.settings();
    settings.timeouts.callback_timeout_ms = 300;
    let bridge = harness.open(settings);

    let started = Instant::now();
    let err = bridge
        .execute("get-version", &Map::new())
        .expect_err("timeout");
    let elapsed = started.elapsed();

    assert!(matches!(
        err,
        BridgeError::CallbackTimeout {
            timeout_ms: 300,
            ..
        }
    ));
    assert!(err.to_string().contains("receiver status"));
    assert!(elapsed >= Duration::from_millis(300), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(1_500), "{elapsed:?}");
    assert_eq!(bridge.correlator().pending_count(), 0);
}

#[test]
fn symlink_at_artifact_path_is_never_read() {
    let harness = Harness::new();
    let target = harness.dir.path().join("planted.json");
    let store = harness.paths.callbacks_dir();
    write_script(
        &harness.opener,
        &format!(
            r#"#!/bin/sh
id=$(printf '%s' "$1" | sed -n 's/.*callbackId%3D\([A-Za-z0-9_-]*\).*/\1/p')
printf '{{"callbackId":"%s","isError":false,"data":{{"planted":"yes"}}}}' "$id" > '{target}'
ln -s '{target}' '{store}/'"$id"'.json'
exit 0
"#,
            target = target.display(),
            store = store.display(),
        ),
    );
    let mut settings = harness.settings();
    settings.timeouts.callback_timeout_ms = 300;
    let bridge = harness.open(settings);

    let err = bridge
        .execute("get-version", &Map::new())
        .expect_err("symlink must not resolve");
    assert_eq!(err.code(), "callback_timeout");
    assert!(target.exists());
}

#[test]
fn receiver_that_never_reports_a_pid_fails_before_dispatch() {
    let harness = Harness::new();
    harness.answer_with(false, "{}");
    let receiver = harness.dir.path().join("silent-receiver");
    write_script(&receiver, "#!/bin/sh\nexit 0\n");
    let mut settings = harness.settings();
    settings.receiver.program = Some(receiver);
    settings.receiver.start_attempts = 3;
    settings.receiver.start_interval_ms = 20;
    let bridge = Bridge::open(harness.paths.clone(), settings).expect("open bridge");

    let err = bridge
        .execute("get-version", &Map::new())
        .expect_err("no receiver");
    assert_eq!(err.code(), "helper_start_failure");
    assert!(err.is_retryable());
    assert!(harness.opened_urls().is_empty());
    assert_eq!(bridge.correlator().pending_count(), 0);
    assert!(!harness.paths.receiver_pid_path().exists());
}

#[test]
fn eleventh_destructive_call_in_window_is_rate_limited() {
    let harness = Harness::new();
    harness.answer_with(false, r#"{"trashed":"yes"}"#);
    let bridge = harness.open(harness.settings());

    for n in 0..10 {
        bridge
            .execute("trash", &params(json!({"id": format!("sheet-{n}")})))
            .expect("within ceiling");
    }
    let err = bridge
        .execute("trash", &params(json!({"id": "sheet-10"})))
        .expect_err("11th call");
    assert!(matches!(err, BridgeError::RateLimited { limit: 10, .. }));
    assert!(err.is_retryable());
    assert_eq!(harness.opened_urls().len(), 10);

    // Other actions keep their own budget.
    bridge
        .execute("get-item", &params(json!({"id": "abc"})))
        .expect("reads are unlimited");
}

#[test]
fn error_callback_surfaces_sanitized_external_error() {
    let harness = Harness::new();
    harness.answer_with(
        true,
        r#"{"errorCode":"3","errorMessage":"No such item at /Users/me/Library/db.sqlite"}"#,
    );
    let bridge = harness.open(harness.settings());

    let err = bridge
        .execute("trash", &params(json!({"id": "missing"})))
        .expect_err("external error");
    match err {
        BridgeError::ExternalError { action, message } => {
            assert_eq!(action, "trash");
            assert_eq!(message, "No such item at <path> (code 3)");
        }
        other => panic!("expected external error, got {other:?}"),
    }
    assert!(harness.stored_files().is_empty());
}

#[test]
fn failed_dispatch_cleans_up_pending_request() {
    let harness = Harness::new();
    write_script(
        &harness.opener,
        "#!/bin/sh\necho 'no handler for scheme' >&2\nexit 3\n",
    );
    let bridge = harness.open(harness.settings());

    let started = Instant::now();
    let err = bridge
        .execute("get-version", &Map::new())
        .expect_err("opener failure");
    assert_eq!(err.code(), "invocation_failure");
    assert!(err.to_string().contains("exited with code 3"));
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(bridge.correlator().pending_count(), 0);
}

#[test]
fn authorize_persists_token_and_strips_it_from_payload() {
    let harness = Harness::new();
    harness.answer_with(false, r#"{"access-token":"tok-from-app"}"#);
    let mut settings = harness.settings();
    settings.access_token = None;
    let bridge = harness.open(settings);

    let err = bridge
        .execute("get-item", &params(json!({"id": "abc"})))
        .expect_err("no token yet");
    assert!(matches!(
        err,
        BridgeError::InvalidInput(InputError::MissingAccessToken { .. })
    ));
    assert!(harness.opened_urls().is_empty());

    let outcome = bridge
        .execute("authorize", &params(json!({"appname": "Bridge Tests"})))
        .expect("authorize");
    assert_eq!(outcome, ExecuteOutcome::Response(Default::default()));
    assert_eq!(
        load_access_token(&harness.paths).as_deref(),
        Some("tok-from-app")
    );

    bridge
        .execute("get-item", &params(json!({"id": "abc"})))
        .expect("token now available");
    let urls = harness.opened_urls();
    assert!(urls
        .last()
        .expect("get-item url")
        .contains("&access-token=tok-from-app&x-success="));
}

#[test]
fn concurrent_requests_resolve_independently() {
    let harness = Harness::new();
    harness.answer_with(false, r#"{"ok":"1"}"#);
    let bridge = harness.open(harness.settings());

    thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|n| {
                let bridge = &bridge;
                scope.spawn(move || {
                    bridge.execute("get-item", &params(json!({"id": format!("item-{n}")})))
                })
            })
            .collect();
        for handle in handles {
            let outcome = handle.join().expect("join").expect("resolved");
            assert!(matches!(outcome, ExecuteOutcome::Response(_)));
        }
    });

    let urls = harness.opened_urls();
    let mut ids: Vec<String> = urls
        .iter()
        .filter_map(|url| url.split("callbackId%3D").nth(1))
        .map(|rest| rest.split('&').next().unwrap_or_default().to_string())
        .collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 4);
    assert_eq!(bridge.correlator().pending_count(), 0);
}
