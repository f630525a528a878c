use crate::app::command_support::{ensure_state_root, parse_exec_params};
use crate::bridge::Bridge;

pub fn cmd_exec(args: &[String]) -> Result<String, String> {
    let Some((action, words)) = args.split_first() else {
        return Err("usage: exec <action> [key=value ...]".to_string());
    };
    let params = parse_exec_params(action, words)?;
    let paths = ensure_state_root()?;
    let bridge = Bridge::from_state_root(paths).map_err(|e| e.to_string())?;
    let outcome = bridge
        .execute(action, &params)
        .map_err(|err| format!("error[{}]: {err}", err.code()))?;
    serde_json::to_string_pretty(&outcome).map_err(|e| format!("failed to encode result: {e}"))
}
