pub mod artifact;
pub mod credentials;
pub mod secure;

pub use artifact::CallbackArtifact;
pub use credentials::{load_access_token, save_access_token};
pub use secure::SecureStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no callback artifact at {path}")]
    NotFound { path: String },
    #[error("refusing to follow symbolic link at {path}")]
    SymlinkRejected { path: String },
    #[error("{path} is not a regular file")]
    NotRegularFile { path: String },
    #[error("path {path} resolves outside the store root")]
    OutsideRoot { path: String },
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to prepare store directory {path}: {source}")]
    Setup {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode callback artifact for {path}: {source}")]
    Encode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("malformed callback artifact at {path}: {reason}")]
    Corrupt { path: String, reason: String },
}
