use crate::scope::Scope;
use thiserror::Error;

/// Failure while resolving an argument from the request
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolveError {
    #[error("Empty lookup key for scope {0}")]
    EmptyKey(Scope),

    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    #[error("Cannot convert argument {name} to {class}: {reason}")]
    Conversion {
        name: String,
        class: String,
        reason: String,
    },

    #[error("Argument lookup failed: {0}")]
    Lookup(String),
}
