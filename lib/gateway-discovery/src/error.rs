use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DiscoveryError>;

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Failed to read discovery document {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode discovery document {path}: {reason}")]
    Decode { path: String, reason: String },

    #[error("Invalid discovery config for source {source_id}: {reason}")]
    Config { source_id: String, reason: String },

    #[error("Discovery source {0} used before initialize")]
    NotInitialized(String),

    #[error("Kubernetes error: {0}")]
    Kubernetes(#[from] kube::Error),
}
