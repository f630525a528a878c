use super::catalog::{ActionDef, ACTIONS};
use super::InputError;
use std::collections::BTreeMap;

/// Static classification of one action, fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Action {
    pub name: &'static str,
    pub is_whitelisted: bool,
    pub is_destructive: bool,
    pub needs_response: bool,
    pub needs_access_token: bool,
    pub def: &'static ActionDef,
}

#[derive(Debug, Clone)]
pub struct ActionRegistry {
    actions: BTreeMap<&'static str, Action>,
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new(&[])
    }
}

impl ActionRegistry {
    pub fn new(disabled: &[String]) -> Self {
        let actions = ACTIONS
            .iter()
            .map(|def| {
                let action = Action {
                    name: def.name,
                    is_whitelisted: !disabled.iter().any(|name| name == def.name),
                    is_destructive: def.destructive,
                    needs_response: def.needs_response,
                    needs_access_token: def.needs_access_token,
                    def,
                };
                (def.name, action)
            })
            .collect();
        Self { actions }
    }

    /// Resolves a whitelisted action; unknown and disabled names fail the
    /// same way so callers cannot probe the disabled set.
    pub fn validate_action(&self, name: &str) -> Result<&Action, InputError> {
        match self.actions.get(name) {
            Some(action) if action.is_whitelisted => Ok(action),
            _ => Err(InputError::UnknownAction {
                action: name.to_string(),
            }),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.actions.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_and_disabled_actions_fail_identically() {
        let registry = ActionRegistry::new(&["trash".to_string()]);
        let unknown = registry.validate_action("format-disk").expect_err("unknown");
        let disabled = registry.validate_action("trash").expect_err("disabled");
        assert!(matches!(unknown, InputError::UnknownAction { .. }));
        assert!(matches!(disabled, InputError::UnknownAction { .. }));
    }

    #[test]
    fn lookup_is_exact() {
        let registry = ActionRegistry::default();
        assert!(registry.validate_action("new-sheet").is_ok());
        assert!(registry.validate_action("New-Sheet").is_err());
        assert!(registry.validate_action(" new-sheet").is_err());
        let trash = registry.validate_action("trash").expect("trash");
        assert!(trash.is_destructive && trash.needs_response && trash.is_whitelisted);
    }
}
