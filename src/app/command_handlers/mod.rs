use crate::app::cli::{help_text, parse_cli_verb, CliVerb};

pub mod actions;
pub mod callback;
pub mod exec;
pub mod receiver;

pub fn run_cli(args: Vec<String>) -> Result<String, String> {
    if args.is_empty() {
        return Ok(help_text());
    }

    match parse_cli_verb(args[0].as_str()) {
        CliVerb::Exec => exec::cmd_exec(&args[1..]),
        CliVerb::Actions => actions::cmd_actions(),
        CliVerb::Receiver => receiver::cmd_receiver(&args[1..]),
        CliVerb::Callback => callback::cmd_callback(&args[1..]),
        CliVerb::Sweep => callback::cmd_sweep(),
        CliVerb::Help => Ok(help_text()),
        CliVerb::ReceiverDaemon => receiver::cmd_receiver_daemon(&args[1..]),
        CliVerb::Unknown => Err(format!("unknown command `{}`", args[0])),
    }
}
