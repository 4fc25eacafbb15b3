use crate::endpoint::Endpoint;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// HttpEndpoint publishes one versioned endpoint to gateways watching the cluster
#[derive(CustomResource, Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "gateway.flux.dev",
    version = "v1alpha1",
    kind = "HttpEndpoint",
    plural = "httpendpoints",
    namespaced,
    derive = "Default",
    printcolumn = r#"{"name":"Method","type":"string","jsonPath":".spec.httpMethod"}"#,
    printcolumn = r#"{"name":"Pattern","type":"string","jsonPath":".spec.httpPattern"}"#,
    printcolumn = r#"{"name":"Version","type":"string","jsonPath":".spec.version"}"#,
)]
pub struct HttpEndpointSpec {
    #[serde(flatten)]
    pub endpoint: Endpoint,
}

impl HttpEndpoint {
    /// The endpoint definition carried by this resource
    pub fn endpoint(&self) -> Endpoint {
        self.spec.endpoint.clone()
    }
}
