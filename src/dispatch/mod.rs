pub mod opener;
pub mod url;

use crate::config::Settings;
use crate::shared::ids::CorrelationId;
use crate::shared::logging::redact_url;
use std::time::Duration;

pub use opener::open_url;
pub use url::{build_invocation_url, callback_addresses, CallbackAddresses};

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("url opener `{opener}` was not found")]
    MissingOpener { opener: String },
    #[error("failed to spawn url opener `{opener}`: {source}")]
    Spawn {
        opener: String,
        #[source]
        source: std::io::Error,
    },
    #[error("url opener `{opener}` exited with code {exit_code}: {stderr}")]
    NonZeroExit {
        opener: String,
        exit_code: i32,
        stderr: String,
    },
    #[error("url opener `{opener}` did not finish within {timeout_ms}ms")]
    Timeout { opener: String, timeout_ms: u64 },
    #[error("failed to wait for url opener `{opener}`: {source}")]
    Wait {
        opener: String,
        #[source]
        source: std::io::Error,
    },
}

/// Composes invocation URLs for the application and hands them to the OS.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    app_scheme: String,
    callback_scheme: String,
    opener: String,
    open_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        app_scheme: impl Into<String>,
        callback_scheme: impl Into<String>,
        opener: impl Into<String>,
        open_timeout: Duration,
    ) -> Self {
        Self {
            app_scheme: app_scheme.into(),
            callback_scheme: callback_scheme.into(),
            opener: opener.into(),
            open_timeout,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.app_scheme.clone(),
            settings.callback_scheme.clone(),
            settings.opener.clone(),
            settings.timeouts.open_timeout(),
        )
    }

    pub fn build(
        &self,
        action: &str,
        params: &[(String, String)],
        correlation_id: Option<&CorrelationId>,
    ) -> String {
        let addresses = correlation_id.map(|id| callback_addresses(&self.callback_scheme, id));
        build_invocation_url(&self.app_scheme, action, params, addresses.as_ref())
    }

    pub fn dispatch(&self, url: &str) -> Result<(), DispatchError> {
        tracing::info!(event = "dispatch.open", url = %redact_url(url), opener = %self.opener);
        open_url(&self.opener, url, self.open_timeout).inspect_err(|err| {
            tracing::warn!(event = "dispatch.failed", url = %redact_url(url), error = %err);
        })
    }
}
