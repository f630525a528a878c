#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to prepare state directory {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid yaml in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid bridge settings: {0}")]
    Settings(String),
    #[error("environment override {name} has invalid value `{value}`")]
    EnvOverride { name: String, value: String },
    #[error("HOME is not set; cannot locate the bridge state root")]
    HomeDirectoryUnavailable,
}
