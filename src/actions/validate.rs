use super::catalog::{ActionDef, ParamKind, MAX_IDENTIFIER_CHARS};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("unknown or disabled action `{action}`")]
    UnknownAction { action: String },
    #[error("missing required field `{field}`")]
    MissingField { field: String },
    #[error("field `{field}` must be one of [{allowed}], got `{value}`")]
    InvalidEnum {
        field: String,
        value: String,
        allowed: String,
    },
    #[error("field `{field}` exceeds {max} characters (got {actual})")]
    TooLong {
        field: String,
        max: usize,
        actual: usize,
    },
    #[error("field `{field}` must be {expected}")]
    InvalidType {
        field: String,
        expected: &'static str,
    },
    #[error("action `{action}` does not accept field `{field}`")]
    UnknownParameter { action: String, field: String },
    #[error(
        "action `{action}` requires an access token; run `authorize` first or set access_token"
    )]
    MissingAccessToken { action: String },
}

/// Presence check: absent, non-string, or whitespace-only values fail.
/// Returns the trimmed value.
pub fn validate_required(value: Option<&str>, field: &str) -> Result<String, InputError> {
    match value.map(str::trim) {
        Some(trimmed) if !trimmed.is_empty() => Ok(trimmed.to_string()),
        _ => Err(InputError::MissingField {
            field: field.to_string(),
        }),
    }
}

/// Case-sensitive membership check. `None` passes through for optional
/// fields.
pub fn validate_enum<'a>(
    value: Option<&'a str>,
    allowed: &[&str],
    field: &str,
) -> Result<Option<&'a str>, InputError> {
    let Some(value) = value else {
        return Ok(None);
    };
    if allowed.contains(&value) {
        return Ok(Some(value));
    }
    Err(InputError::InvalidEnum {
        field: field.to_string(),
        value: value.to_string(),
        allowed: allowed.join(", "),
    })
}

/// Rejects values whose character count is strictly greater than `max`.
pub fn validate_length<'a>(value: &'a str, max: usize, field: &str) -> Result<&'a str, InputError> {
    let actual = value.chars().count();
    if actual > max {
        return Err(InputError::TooLong {
            field: field.to_string(),
            max,
            actual,
        });
    }
    Ok(value)
}

/// Validates caller-supplied parameters against the action's schema and
/// renders them as ordered `(name, value)` pairs ready for encoding.
///
/// Text bodies keep their original whitespace; identifiers are trimmed.
pub fn validate_params(
    def: &ActionDef,
    params: &Map<String, Value>,
) -> Result<Vec<(String, String)>, InputError> {
    for key in params.keys() {
        if def.param(key).is_none() {
            return Err(InputError::UnknownParameter {
                action: def.name.to_string(),
                field: key.clone(),
            });
        }
    }

    let mut rendered = Vec::with_capacity(def.params.len());
    for param in def.params {
        let value = match params.get(param.name) {
            None | Some(Value::Null) => None,
            Some(value) => Some(value),
        };
        let Some(value) = value else {
            if param.required {
                return Err(InputError::MissingField {
                    field: param.name.to_string(),
                });
            }
            continue;
        };

        let rendered_value = match param.kind {
            ParamKind::Text { max_chars } => {
                let raw = expect_str(value, param.name)?;
                if raw.trim().is_empty() {
                    if param.required {
                        validate_required(Some(raw), param.name)?;
                    }
                    continue;
                }
                validate_length(raw, max_chars, param.name)?.to_string()
            }
            ParamKind::Identifier => {
                let raw = expect_str(value, param.name)?;
                if raw.trim().is_empty() && !param.required {
                    continue;
                }
                let trimmed = validate_required(Some(raw), param.name)?;
                validate_length(&trimmed, MAX_IDENTIFIER_CHARS, param.name)?;
                trimmed
            }
            ParamKind::Enum(allowed) => {
                let raw = expect_str(value, param.name)?;
                match validate_enum(Some(raw), allowed, param.name)? {
                    Some(valid) => valid.to_string(),
                    None => continue,
                }
            }
            ParamKind::Flag => match value {
                Value::Bool(true) => "YES".to_string(),
                Value::Bool(false) => "NO".to_string(),
                _ => {
                    return Err(InputError::InvalidType {
                        field: param.name.to_string(),
                        expected: "a boolean",
                    })
                }
            },
            ParamKind::Index => match value.as_u64() {
                Some(index) => index.to_string(),
                None => {
                    return Err(InputError::InvalidType {
                        field: param.name.to_string(),
                        expected: "a non-negative integer",
                    })
                }
            },
        };
        rendered.push((param.name.to_string(), rendered_value));
    }
    Ok(rendered)
}

fn expect_str<'a>(value: &'a Value, field: &str) -> Result<&'a str, InputError> {
    value.as_str().ok_or_else(|| InputError::InvalidType {
        field: field.to_string(),
        expected: "a string",
    })
}
