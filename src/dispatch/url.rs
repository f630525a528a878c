use crate::shared::ids::CorrelationId;

pub const X_CALLBACK_HOST: &str = "x-callback-url";
pub const CALLBACK_ID_PARAM: &str = "callbackId";
pub const SUCCESS_PATH: &str = "success";
pub const ERROR_PATH: &str = "error";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackAddresses {
    pub success: String,
    pub error: String,
}

/// Addresses the application invokes on completion, both carrying the
/// correlation id on the receiver's private scheme.
pub fn callback_addresses(callback_scheme: &str, id: &CorrelationId) -> CallbackAddresses {
    let encoded = urlencoding::encode(id.as_str());
    CallbackAddresses {
        success: format!(
            "{callback_scheme}://{X_CALLBACK_HOST}/{SUCCESS_PATH}?{CALLBACK_ID_PARAM}={encoded}"
        ),
        error: format!(
            "{callback_scheme}://{X_CALLBACK_HOST}/{ERROR_PATH}?{CALLBACK_ID_PARAM}={encoded}"
        ),
    }
}

/// Renders `scheme://x-callback-url/{action}?{params}[&x-success=..&x-error=..]`.
/// Every key and value is percent-encoded, so quotes, shell metacharacters,
/// and control characters reach the application as inert data.
pub fn build_invocation_url(
    app_scheme: &str,
    action: &str,
    params: &[(String, String)],
    callback: Option<&CallbackAddresses>,
) -> String {
    let mut pairs: Vec<String> = params
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                urlencoding::encode(key),
                urlencoding::encode(value)
            )
        })
        .collect();
    if let Some(callback) = callback {
        pairs.push(format!("x-success={}", urlencoding::encode(&callback.success)));
        pairs.push(format!("x-error={}", urlencoding::encode(&callback.error)));
    }

    let base = format!(
        "{app_scheme}://{X_CALLBACK_HOST}/{}",
        urlencoding::encode(action)
    );
    if pairs.is_empty() {
        base
    } else {
        format!("{base}?{}", pairs.join("&"))
    }
}
