use crate::service::TransporterService;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// BackendService publishes a reusable backend call target, referenced by service id
#[derive(CustomResource, Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "gateway.flux.dev",
    version = "v1alpha1",
    kind = "BackendService",
    plural = "backendservices",
    namespaced,
    derive = "Default",
    printcolumn = r#"{"name":"Interface","type":"string","jsonPath":".spec.interface"}"#,
    printcolumn = r#"{"name":"Method","type":"string","jsonPath":".spec.method"}"#,
)]
pub struct BackendServiceSpec {
    #[serde(flatten)]
    pub service: TransporterService,
}

impl BackendService {
    pub fn service(&self) -> TransporterService {
        self.spec.service.clone()
    }
}
