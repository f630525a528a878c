use crate::actions::{action_names, Action, ActionRegistry, InputError};
use crate::config::{bootstrap_state_root, load_settings, Settings, StatePaths};
use crate::correlator::{CallbackCorrelator, CallbackPayload};
use crate::dispatch::Dispatcher;
use crate::rate_limit::RateLimiter;
use crate::receiver::ReceiverSupervisor;
use crate::shared::errors::BridgeError;
use crate::store::{load_access_token, save_access_token, SecureStore};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::{Mutex, PoisonError};

pub const ACCESS_TOKEN_PARAM: &str = "access-token";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum ExecuteOutcome {
    /// Payload delivered through the callback artifact.
    Response(CallbackPayload),
    /// Fire-and-forget action handed to the OS.
    Dispatched,
}

/// Entry point for callers: validates, rate-limits, dispatches, and for
/// response-needing actions waits for the correlated callback.
#[derive(Debug)]
pub struct Bridge {
    paths: StatePaths,
    settings: Settings,
    registry: ActionRegistry,
    limiter: Mutex<RateLimiter>,
    dispatcher: Dispatcher,
    supervisor: ReceiverSupervisor,
    correlator: CallbackCorrelator,
}

impl Bridge {
    pub fn open(paths: StatePaths, settings: Settings) -> Result<Self, BridgeError> {
        bootstrap_state_root(&paths)?;
        let store = SecureStore::open(paths.callbacks_dir())?;
        let supervisor = ReceiverSupervisor::from_settings(&paths, &settings)
            .map_err(BridgeError::receiver_setup)?;
        Ok(Self {
            registry: ActionRegistry::new(&settings.disabled_actions),
            limiter: Mutex::new(RateLimiter::from_config(&settings.rate_limit)),
            dispatcher: Dispatcher::from_settings(&settings),
            correlator: CallbackCorrelator::new(
                store,
                settings.timeouts.callback_timeout(),
                settings.timeouts.poll_interval(),
            ),
            supervisor,
            paths,
            settings,
        })
    }

    /// Loads `config.yaml` (plus env overrides) under `paths` and opens.
    pub fn from_state_root(paths: StatePaths) -> Result<Self, BridgeError> {
        bootstrap_state_root(&paths)?;
        let settings = load_settings(&paths)?;
        Self::open(paths, settings)
    }

    pub fn paths(&self) -> &StatePaths {
        &self.paths
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    pub fn correlator(&self) -> &CallbackCorrelator {
        &self.correlator
    }

    pub fn supervisor(&self) -> &ReceiverSupervisor {
        &self.supervisor
    }

    pub fn execute(
        &self,
        action_name: &str,
        params: &Map<String, Value>,
    ) -> Result<ExecuteOutcome, BridgeError> {
        let action = self.registry.validate_action(action_name)?;
        let mut pairs = crate::actions::validate_params(action.def, params)?;
        if action.needs_access_token {
            let token = self.access_token().ok_or_else(|| InputError::MissingAccessToken {
                action: action.name.to_string(),
            })?;
            pairs.push((ACCESS_TOKEN_PARAM.to_string(), token));
        }
        self.consume_rate_limit(action)?;

        if !action.needs_response {
            let url = self.dispatcher.build(action.name, &pairs, None);
            self.dispatcher
                .dispatch(&url)
                .map_err(|source| BridgeError::InvocationFailure {
                    action: action.name.to_string(),
                    source,
                })?;
            return Ok(ExecuteOutcome::Dispatched);
        }

        self.supervisor
            .ensure_running()
            .map_err(BridgeError::HelperStartFailure)?;
        let pending = self.correlator.register(action.name)?;
        let url = self.dispatcher.build(action.name, &pairs, Some(pending.id()));
        if let Err(source) = self.dispatcher.dispatch(&url) {
            self.correlator.cancel(pending.id());
            return Err(BridgeError::InvocationFailure {
                action: action.name.to_string(),
                source,
            });
        }

        let mut payload = self.correlator.wait(pending)?;
        if action.name == action_names::AUTHORIZE {
            if let Some(token) = payload.remove(ACCESS_TOKEN_PARAM) {
                save_access_token(&self.paths, &token)?;
                tracing::info!(event = "credentials.saved", "stored access token from authorize");
            }
        }
        Ok(ExecuteOutcome::Response(payload))
    }

    /// Settles a pending request as cancelled.
    pub fn cancel(&self, callback_id: &crate::shared::ids::CorrelationId) -> bool {
        self.correlator.cancel(callback_id)
    }

    fn access_token(&self) -> Option<String> {
        self.settings
            .access_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .or_else(|| load_access_token(&self.paths))
    }

    fn consume_rate_limit(&self, action: &Action) -> Result<(), BridgeError> {
        let mut limiter = self.limiter.lock().unwrap_or_else(PoisonError::into_inner);
        limiter.check_and_consume(action).map_err(|limited| {
            tracing::warn!(
                event = "rate_limit.rejected",
                action = action.name,
                limit = limited.limit,
                retry_after_ms = limited.retry_after.as_millis() as u64
            );
            BridgeError::RateLimited {
                action: action.name.to_string(),
                limit: limited.limit,
                window_ms: limited.window.as_millis() as u64,
                retry_after_ms: limited.retry_after.as_millis() as u64,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn outcome_serializes_with_status_tag() {
        let mut data = CallbackPayload::new();
        data.insert("apiVersion".to_string(), "2".to_string());
        assert_eq!(
            serde_json::to_value(ExecuteOutcome::Response(data)).expect("json"),
            json!({"status": "response", "data": {"apiVersion": "2"}})
        );
        assert_eq!(
            serde_json::to_value(ExecuteOutcome::Dispatched).expect("json"),
            json!({"status": "dispatched"})
        );
    }

    #[test]
    fn token_actions_fail_fast_without_a_token() {
        let dir = tempdir().expect("tempdir");
        let mut settings = Settings::default();
        settings.opener = dir.path().join("missing-opener").display().to_string();
        let bridge = Bridge::open(StatePaths::new(dir.path()), settings).expect("open");

        let params = json!({"id": "abc"});
        let err = bridge
            .execute("trash", params.as_object().expect("object"))
            .expect_err("no token");
        assert!(matches!(
            err,
            BridgeError::InvalidInput(InputError::MissingAccessToken { .. })
        ));
        assert!(bridge.limiter.lock().expect("lock").window("trash").is_none());
    }

    #[test]
    fn configured_token_wins_over_persisted_one() {
        let dir = tempdir().expect("tempdir");
        let paths = StatePaths::new(dir.path());
        bootstrap_state_root(&paths).expect("bootstrap");
        save_access_token(&paths, "from-disk").expect("save");

        let mut settings = Settings::default();
        settings.access_token = Some(" from-config ".to_string());
        let bridge = Bridge::open(paths.clone(), settings).expect("open");
        assert_eq!(bridge.access_token().as_deref(), Some("from-config"));

        let bridge = Bridge::open(paths, Settings::default()).expect("open");
        assert_eq!(bridge.access_token().as_deref(), Some("from-disk"));
    }
}
