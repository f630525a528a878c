use crate::actions::ACTIONS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliVerb {
    Exec,
    Actions,
    Receiver,
    Callback,
    Sweep,
    Help,
    ReceiverDaemon,
    Unknown,
}

pub fn parse_cli_verb(input: &str) -> CliVerb {
    match input {
        "exec" => CliVerb::Exec,
        "actions" => CliVerb::Actions,
        "receiver" => CliVerb::Receiver,
        "callback" => CliVerb::Callback,
        "sweep" => CliVerb::Sweep,
        "help" | "--help" | "-h" => CliVerb::Help,
        crate::receiver::supervisor::RECEIVER_VERB => CliVerb::ReceiverDaemon,
        _ => CliVerb::Unknown,
    }
}

pub fn cli_help_lines() -> Vec<String> {
    vec![
        "Commands:".to_string(),
        "  exec <action> [key=value ...]        Run an application action and print the JSON result"
            .to_string(),
        "  actions                              List actions with their classification".to_string(),
        "  receiver start|stop|status           Manage the callback receiver".to_string(),
        "  callback <url>                       Store a callback delivered by the application"
            .to_string(),
        "  sweep                                Remove callback artifacts past retention"
            .to_string(),
    ]
}

pub fn action_help_lines() -> Vec<String> {
    let mut defs: Vec<_> = ACTIONS.iter().collect();
    defs.sort_by(|a, b| a.name.cmp(b.name));
    defs.into_iter()
        .map(|def| format!("  {0:36} {1}", def.name, def.description))
        .collect()
}

pub(crate) fn help_text() -> String {
    let mut lines = cli_help_lines();
    lines.push(String::new());
    lines.push("Actions:".to_string());
    lines.extend(action_help_lines());
    lines.join("\n")
}
