use crate::actions::{find_action_def, ParamKind};
use crate::config::{
    bootstrap_state_root, default_state_root_path, load_settings as load_settings_at, Settings,
    StatePaths,
};
use crate::receiver::supervisor::RECEIVER_VERB;
use serde_json::{Map, Value};
use std::path::PathBuf;

pub fn ensure_state_root() -> Result<StatePaths, String> {
    let root = default_state_root_path().map_err(|e| e.to_string())?;
    let paths = StatePaths::new(root);
    bootstrap_state_root(&paths).map_err(|e| e.to_string())?;
    Ok(paths)
}

pub fn load_settings(paths: &StatePaths) -> Result<Settings, String> {
    load_settings_at(paths).map_err(|e| e.to_string())
}

pub fn parse_state_root_flag(verb: &str, args: &[String]) -> Result<PathBuf, String> {
    if args.len() == 2 && args[0] == "--state-root" {
        return Ok(PathBuf::from(&args[1]));
    }
    Err(format!("usage: {verb} --state-root <path>"))
}

/// State root a command line will operate on, used to place the log file
/// before the command runs.
pub fn state_paths_for_args(args: &[String]) -> Result<StatePaths, String> {
    match args.split_first() {
        Some((verb, rest)) if verb == RECEIVER_VERB => {
            parse_state_root_flag(RECEIVER_VERB, rest).map(StatePaths::new)
        }
        _ => default_state_root_path()
            .map(StatePaths::new)
            .map_err(|e| e.to_string()),
    }
}

/// Turns `key=value` words into action parameters. Values stay strings
/// except where the action declares a flag (`true`/`false`) or an index
/// (decimal digits); anything else is left for the validator to reject.
pub fn parse_exec_params(action: &str, words: &[String]) -> Result<Map<String, Value>, String> {
    let def = find_action_def(action);
    let mut params = Map::new();
    for word in words {
        let Some((key, raw)) = word.split_once('=') else {
            return Err(format!("invalid argument `{word}`; expected key=value"));
        };
        if key.is_empty() {
            return Err(format!("invalid argument `{word}`; key must be non-empty"));
        }
        let kind = def.and_then(|def| def.param(key)).map(|param| param.kind);
        let value = match (kind, raw) {
            (Some(ParamKind::Flag), "true") => Value::Bool(true),
            (Some(ParamKind::Flag), "false") => Value::Bool(false),
            (Some(ParamKind::Index), digits)
                if !digits.is_empty() && digits.chars().all(|ch| ch.is_ascii_digit()) =>
            {
                match digits.parse::<u64>() {
                    Ok(index) => Value::from(index),
                    Err(_) => Value::String(raw.to_string()),
                }
            }
            _ => Value::String(raw.to_string()),
        };
        if params.insert(key.to_string(), value).is_some() {
            return Err(format!("duplicate argument `{key}`"));
        }
    }
    Ok(params)
}
