use crate::config::StatePaths;
use std::fs;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

pub const LOG_FILTER_ENV: &str = "ULYSSES_BRIDGE_LOG";

/// Installs the process-wide JSON-lines subscriber writing to
/// `logs/bridge.log`. A second call is a no-op.
pub fn init_file_logging(paths: &StatePaths) -> std::io::Result<()> {
    let path = paths.log_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = fs::OpenOptions::new().create(true).append(true).open(&path)?;
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_current_span(false)
        .with_target(false)
        .with_writer(Mutex::new(file))
        .try_init();
    Ok(())
}

/// Elides query values from an invocation URL so tokens and document
/// text never reach the log file.
pub fn redact_url(url: &str) -> String {
    let Some((base, query)) = url.split_once('?') else {
        return url.to_string();
    };
    let keys: Vec<&str> = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| pair.split_once('=').map(|(k, _)| k).unwrap_or(pair))
        .collect();
    let redacted: Vec<String> = keys.iter().map(|k| format!("{k}=…")).collect();
    format!("{base}?{}", redacted.join("&"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redact_url_keeps_keys_and_drops_values() {
        let url = "ulysses://x-callback-url/trash?id=abc&access-token=secret123";
        let redacted = redact_url(url);
        assert_eq!(
            redacted,
            "ulysses://x-callback-url/trash?id=…&access-token=…"
        );
        assert!(!redacted.contains("secret123"));
    }

    #[test]
    fn redact_url_without_query_is_unchanged() {
        assert_eq!(
            redact_url("ulysses://x-callback-url/open-all"),
            "ulysses://x-callback-url/open-all"
        );
    }
}
