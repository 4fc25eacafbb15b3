use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// The service's identity is too short to be addressable. This is a
    /// configuration defect and must abort startup.
    #[error("Service identity too short: {id:?} (interface={interface:?}, method={method:?})")]
    ServiceIdentity {
        id: String,
        interface: String,
        method: String,
    },

    #[error("Endpoint not found: {0}")]
    EndpointNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}
