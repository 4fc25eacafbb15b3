//! Discovery sources for endpoint and service definitions
pub mod error;
pub mod kubernetes;
pub mod manager;
pub mod resource;
pub mod source;
pub mod verify;

pub use error::{DiscoveryError, Result};
pub use kubernetes::{KubernetesDiscovery, KUBERNETES_SOURCE_ID};
pub use manager::{DiscoveryManager, DiscoveryStreams, DEFAULT_CHANNEL_CAPACITY};
pub use resource::{decode_document, ResourceDiscovery, Resources, RESOURCE_SOURCE_ID};
pub use source::DiscoverySource;
pub use verify::verify_payload;
