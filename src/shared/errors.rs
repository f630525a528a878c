use crate::actions::InputError;
use crate::config::ConfigError;
use crate::dispatch::DispatchError;
use crate::receiver::ReceiverError;
use crate::store::StoreError;

/// Failure surfaced to the caller of [`crate::bridge::Bridge::execute`].
///
/// Nothing here is retried by the bridge itself; retry policy belongs to
/// the caller.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InputError),
    #[error(
        "rate limit exceeded for `{action}`: at most {limit} calls per {window_ms}ms; retry in {retry_after_ms}ms"
    )]
    RateLimited {
        action: String,
        limit: u32,
        window_ms: u64,
        retry_after_ms: u64,
    },
    #[error("callback receiver failed to start: {0}")]
    HelperStartFailure(#[source] ReceiverError),
    #[error("callback receiver cannot be configured: {0}")]
    ReceiverSetup(#[source] ReceiverError),
    #[error("failed to invoke `{action}`: {source}")]
    InvocationFailure {
        action: String,
        #[source]
        source: DispatchError,
    },
    #[error(
        "no response to `{action}` within {timeout_ms}ms; check that the application is running and that the callback receiver is running (`ulysses-bridge receiver status`)"
    )]
    CallbackTimeout { action: String, timeout_ms: u64 },
    #[error("`{action}` failed in the application: {message}")]
    ExternalError { action: String, message: String },
    #[error("callback artifact for `{action}` could not be parsed: {reason}")]
    ArtifactCorruption { action: String, reason: String },
    #[error("callback `{callback_id}` was cancelled before a response arrived")]
    Cancelled { callback_id: String },
    #[error("failed to generate callback id: {reason}")]
    IdGeneration { reason: String },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl BridgeError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::RateLimited { .. } => "rate_limited",
            Self::HelperStartFailure(_) => "helper_start_failure",
            Self::ReceiverSetup(_) => "receiver_setup",
            Self::InvocationFailure { .. } => "invocation_failure",
            Self::CallbackTimeout { .. } => "callback_timeout",
            Self::ExternalError { .. } => "external_error",
            Self::ArtifactCorruption { .. } => "artifact_corruption",
            Self::Cancelled { .. } => "cancelled",
            Self::IdGeneration { .. } => "internal",
            Self::Store(_) => "store_failure",
            Self::Config(_) => "config_invalid",
        }
    }

    /// Classifies a receiver error raised while wiring the bridge, before
    /// any start was attempted.
    pub fn receiver_setup(err: ReceiverError) -> Self {
        match err {
            ReceiverError::Store(err) => Self::Store(err),
            ReceiverError::Config(err) => Self::Config(err),
            other => Self::ReceiverSetup(other),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::CallbackTimeout { .. } | Self::HelperStartFailure(_)
        )
    }
}
