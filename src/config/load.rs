use super::{Settings, StatePaths};
use crate::config::ConfigError;

/// Loads `config.yaml` under the state root, applies environment
/// overrides, and validates the result.
pub fn load_settings(paths: &StatePaths) -> Result<Settings, ConfigError> {
    let mut settings = Settings::from_path(&paths.settings_file())?;
    settings.apply_env_overrides(|name| std::env::var(name).ok())?;
    settings.validate()?;
    Ok(settings)
}
