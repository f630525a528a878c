use super::ReceiverError;
use crate::dispatch::url::{CALLBACK_ID_PARAM, ERROR_PATH, SUCCESS_PATH, X_CALLBACK_HOST};
use crate::shared::ids::CorrelationId;
use crate::store::{CallbackArtifact, SecureStore};
use std::collections::BTreeMap;
use std::path::PathBuf;

fn invalid(reason: impl Into<String>) -> ReceiverError {
    ReceiverError::InvalidCallbackUrl {
        reason: reason.into(),
    }
}

/// Parses `<scheme>://x-callback-url/{success|error}?callbackId=..&k=v`
/// into an artifact. Every pair other than `callbackId` lands in `data`.
pub fn parse_callback_url(callback_scheme: &str, url: &str) -> Result<CallbackArtifact, ReceiverError> {
    let rest = url
        .strip_prefix(callback_scheme)
        .and_then(|rest| rest.strip_prefix("://"))
        .ok_or_else(|| invalid(format!("expected scheme `{callback_scheme}`")))?;
    let (path, query) = rest.split_once('?').unwrap_or((rest, ""));
    let outcome = path
        .strip_prefix(X_CALLBACK_HOST)
        .and_then(|path| path.strip_prefix('/'))
        .map(|path| path.trim_end_matches('/'))
        .ok_or_else(|| invalid(format!("expected host `{X_CALLBACK_HOST}`")))?;
    let is_error = match outcome {
        SUCCESS_PATH => false,
        ERROR_PATH => true,
        other => return Err(invalid(format!("unexpected callback path `{other}`"))),
    };

    let mut callback_id = None;
    let mut data = BTreeMap::new();
    for pair in query.split('&').filter(|pair| !pair.is_empty()) {
        let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = decode(raw_key)?;
        let value = decode(raw_value)?;
        if key == CALLBACK_ID_PARAM {
            if callback_id.is_some() {
                return Err(invalid("duplicate callbackId"));
            }
            callback_id = Some(CorrelationId::parse(&value).map_err(invalid)?);
        } else {
            data.insert(key, value);
        }
    }

    let callback_id = callback_id.ok_or_else(|| invalid("missing callbackId"))?;
    Ok(if is_error {
        CallbackArtifact::error(callback_id, data)
    } else {
        CallbackArtifact::success(callback_id, data)
    })
}

/// URL-handler entry: parse the callback and persist it for the waiting
/// correlator.
pub fn handle_callback_url(
    store: &SecureStore,
    callback_scheme: &str,
    url: &str,
) -> Result<PathBuf, ReceiverError> {
    let artifact = match parse_callback_url(callback_scheme, url) {
        Ok(artifact) => artifact,
        Err(err) => {
            tracing::warn!(event = "receiver.callback_rejected", error = %err);
            return Err(err);
        }
    };
    let path = store.write_artifact(&artifact)?;
    tracing::info!(
        event = "receiver.callback_stored",
        callback_id = %artifact.callback_id,
        is_error = artifact.is_error,
        fields = artifact.data.len()
    );
    Ok(path)
}

fn decode(raw: &str) -> Result<String, ReceiverError> {
    urlencoding::decode(raw)
        .map(|value| value.into_owned())
        .map_err(|err| invalid(format!("bad percent-encoding: {err}")))
}
