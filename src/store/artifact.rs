use crate::shared::ids::CorrelationId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const ERROR_MESSAGE_KEY: &str = "errorMessage";
pub const ERROR_CODE_KEY: &str = "errorCode";

/// On-disk record proving the application answered a dispatched request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackArtifact {
    pub callback_id: CorrelationId,
    pub is_error: bool,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

impl CallbackArtifact {
    pub fn success(callback_id: CorrelationId, data: BTreeMap<String, String>) -> Self {
        Self {
            callback_id,
            is_error: false,
            data,
        }
    }

    pub fn error(callback_id: CorrelationId, data: BTreeMap<String, String>) -> Self {
        Self {
            callback_id,
            is_error: true,
            data,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        self.data
            .get(ERROR_MESSAGE_KEY)
            .map(String::as_str)
            .filter(|message| !message.trim().is_empty())
    }
}
