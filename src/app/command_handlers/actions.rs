use crate::app::command_support::{ensure_state_root, load_settings};
use crate::actions::{Action, ActionRegistry};

pub fn cmd_actions() -> Result<String, String> {
    let paths = ensure_state_root()?;
    let settings = load_settings(&paths)?;
    let registry = ActionRegistry::new(&settings.disabled_actions);
    Ok(render_actions(&registry))
}

fn flags(action: &Action) -> String {
    let mut flags = Vec::new();
    if !action.is_whitelisted {
        flags.push("disabled");
    }
    if action.is_destructive {
        flags.push("destructive");
    }
    if action.needs_response {
        flags.push("response");
    }
    if action.needs_access_token {
        flags.push("token");
    }
    flags.join(",")
}

pub fn render_actions(registry: &ActionRegistry) -> String {
    registry
        .iter()
        .map(|action| {
            let params = action
                .def
                .params
                .iter()
                .map(|param| {
                    if param.required {
                        format!("{}*", param.name)
                    } else {
                        param.name.to_string()
                    }
                })
                .collect::<Vec<_>>()
                .join(" ");
            format!("{:20} [{}] {}", action.name, flags(action), params)
                .trim_end()
                .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}
