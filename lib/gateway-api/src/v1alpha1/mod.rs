/// API version v1alpha1 for gateway discovery CRDs

pub mod http_endpoint;
pub mod backend_service;

pub use http_endpoint::{HttpEndpoint, HttpEndpointSpec};
pub use backend_service::{BackendService, BackendServiceSpec};

/// API group for gateway resources
pub const API_GROUP: &str = "gateway.flux.dev";
/// API version for gateway resources
pub const API_VERSION: &str = "v1alpha1";
