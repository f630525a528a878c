use crate::app::command_support::{ensure_state_root, load_settings, parse_state_root_flag};
use crate::config::StatePaths;
use crate::receiver::supervisor::RECEIVER_VERB;
use crate::receiver::{
    receiver_state, run_receiver, stop_receiver, ReceiverError, ReceiverState, ReceiverSupervisor,
};
use std::time::Duration;

const STOP_TIMEOUT: Duration = Duration::from_secs(5);

pub fn cmd_receiver(args: &[String]) -> Result<String, String> {
    let paths = ensure_state_root()?;
    match args.first().map(String::as_str) {
        Some("start") => cmd_start(&paths),
        Some("stop") => cmd_stop(&paths),
        Some("status") => cmd_status(&paths),
        _ => Err("usage: receiver start|stop|status".to_string()),
    }
}

fn cmd_start(paths: &StatePaths) -> Result<String, String> {
    let settings = load_settings(paths)?;
    let supervisor = ReceiverSupervisor::from_settings(paths, &settings).map_err(|e| e.to_string())?;
    let pid = supervisor.ensure_running().map_err(|e| e.to_string())?;
    Ok(format!("running\npid={pid}"))
}

fn cmd_stop(paths: &StatePaths) -> Result<String, String> {
    match stop_receiver(paths, STOP_TIMEOUT) {
        Ok(result) => Ok(format!(
            "stopped\npid={}\nforced={}",
            result.pid, result.forced
        )),
        Err(ReceiverError::NotRunning) => Ok("stopped\nrunning=false".to_string()),
        Err(err) => Err(err.to_string()),
    }
}

fn cmd_status(paths: &StatePaths) -> Result<String, String> {
    let state = receiver_state(paths).map_err(|e| e.to_string())?;
    Ok(render_status(paths, state))
}

pub fn render_status(paths: &StatePaths, state: ReceiverState) -> String {
    let mut lines = match state {
        ReceiverState::Running { pid } => vec!["receiver=running".to_string(), format!("pid={pid}")],
        ReceiverState::Stale { pid } => vec!["receiver=stale".to_string(), format!("pid={pid}")],
        ReceiverState::NotRunning => vec!["receiver=not_running".to_string()],
    };
    lines.push(format!("state_root={}", paths.root.display()));
    lines.join("\n")
}

pub fn cmd_receiver_daemon(args: &[String]) -> Result<String, String> {
    let root = parse_state_root_flag(RECEIVER_VERB, args)?;
    let paths = StatePaths::new(root);
    let settings = load_settings(&paths)?;
    run_receiver(&paths, &settings).map_err(|e| e.to_string())?;
    Ok("receiver exited".to_string())
}
