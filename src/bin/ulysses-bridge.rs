use ulysses_bridge::app::command_handlers;
use ulysses_bridge::app::command_support::state_paths_for_args;
use ulysses_bridge::shared::logging::init_file_logging;

fn run() -> Result<(), String> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Ok(paths) = state_paths_for_args(&args) {
        if let Err(err) = init_file_logging(&paths) {
            eprintln!("warning: logging disabled: {err}");
        }
    }
    let output = command_handlers::run_cli(args)?;
    println!("{output}");
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
