pub mod error;
pub mod load;
pub mod paths;
pub mod settings;

pub use error::ConfigError;
pub use load::load_settings;
pub use paths::{
    bootstrap_state_root, default_state_root_path, StatePaths, GLOBAL_SETTINGS_FILE_NAME,
    GLOBAL_STATE_DIR,
};
pub use settings::{RateLimitConfig, ReceiverConfig, Settings, StoreConfig, Timeouts};

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn load_settings_reads_yaml_under_state_root() {
        let dir = tempdir().expect("tempdir");
        let paths = StatePaths::new(dir.path());
        fs::write(
            paths.settings_file(),
            "app_scheme: ulysses\nrate_limit:\n  max_destructive_calls: 3\n",
        )
        .expect("write config");

        let settings = load_settings(&paths).expect("load");
        assert_eq!(settings.rate_limit.max_destructive_calls, 3);
    }

    #[test]
    fn load_settings_reports_invalid_yaml_path() {
        let dir = tempdir().expect("tempdir");
        let paths = StatePaths::new(dir.path());
        fs::write(paths.settings_file(), "timeouts: [not, a, map]\n").expect("write config");

        let err = load_settings(&paths).expect_err("invalid yaml");
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("config.yaml"));
    }
}
