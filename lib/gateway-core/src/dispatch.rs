//! Request dispatch: route key -> endpoint -> transporter -> backend call

use crate::registry::EndpointRegistry;
use crate::transporter::{InvokeError, ServeResponse, TransporterRegistry};
use gateway_api::{Endpoint, RequestContext};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    #[error("Endpoint not found: key={key}, version={version:?}")]
    EndpointNotFound { key: String, version: String },

    /// Configuration-class failure: no transporter serves the protocol
    #[error("Transporter not found: proto={proto:?}, service={service_id}")]
    TransporterNotFound { proto: String, service_id: String },

    #[error(transparent)]
    Invocation(#[from] InvokeError),
}

impl DispatchError {
    pub fn status_code(&self) -> u16 {
        match self {
            DispatchError::EndpointNotFound { .. } => 404,
            DispatchError::TransporterNotFound { .. } => 500,
            DispatchError::Invocation(e) => e.status_code,
        }
    }

    pub fn error_code(&self) -> &str {
        match self {
            DispatchError::EndpointNotFound { .. } => "GATEWAY:ENDPOINT/NOT_FOUND",
            DispatchError::TransporterNotFound { .. } => "GATEWAY:TRANSPORTER/NOT_FOUND",
            DispatchError::Invocation(e) => &e.error_code,
        }
    }
}

/// Dispatcher selects endpoints and hands them to the matching transporter.
///
/// It applies no retry or timeout of its own.
#[derive(Clone)]
pub struct Dispatcher {
    endpoints: Arc<EndpointRegistry>,
    transporters: Arc<TransporterRegistry>,
}

impl Dispatcher {
    pub fn new(endpoints: Arc<EndpointRegistry>, transporters: Arc<TransporterRegistry>) -> Self {
        Self {
            endpoints,
            transporters,
        }
    }

    pub fn endpoints(&self) -> &Arc<EndpointRegistry> {
        &self.endpoints
    }

    pub fn transporters(&self) -> &Arc<TransporterRegistry> {
        &self.transporters
    }

    pub fn select(&self, key: &str, version: &str) -> Result<Endpoint, DispatchError> {
        self.endpoints
            .lookup(key, version)
            .ok_or_else(|| DispatchError::EndpointNotFound {
                key: key.to_string(),
                version: version.to_string(),
            })
    }

    /// Invoke the endpoint's service through the transporter bound to its protocol
    pub async fn invoke(
        &self,
        endpoint: &Endpoint,
        ctx: &RequestContext,
    ) -> Result<ServeResponse, DispatchError> {
        let service = &endpoint.service;
        let proto = service.rpc_proto();
        let transporter = match self.transporters.get(&proto) {
            Some(t) => t,
            None => {
                warn!(proto = %proto, service_id = %service.service_id(), "No transporter for protocol");
                return Err(DispatchError::TransporterNotFound {
                    proto,
                    service_id: service.service_id(),
                });
            }
        };
        debug!(
            request_id = %ctx.request_id,
            proto = %proto,
            service_id = %service.service_id(),
            "Invoking backend"
        );
        Ok(transporter.invoke(ctx, service).await?)
    }

    pub async fn dispatch(
        &self,
        key: &str,
        version: &str,
        ctx: &RequestContext,
    ) -> Result<ServeResponse, DispatchError> {
        let endpoint = self.select(key, version)?;
        self.invoke(&endpoint, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transporter::{ResponseBody, Transporter};
    use async_trait::async_trait;
    use gateway_api::TransporterService;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Echoes the service method and counts calls
    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Transporter for Counting {
        async fn invoke(
            &self,
            _ctx: &RequestContext,
            service: &TransporterService,
        ) -> Result<ServeResponse, InvokeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if service.method == "fail" {
                return Err(InvokeError::new(502, "BACKEND:FAILED", "backend down"));
            }
            Ok(ServeResponse::json(200, json!(service.method)))
        }
    }

    fn endpoint(version: &str, method: &str, proto: &str) -> Endpoint {
        Endpoint::new(
            "GET",
            "/users",
            version,
            TransporterService::new("com.example.UserService", method).with_attr("rpcproto", proto),
        )
    }

    fn dispatcher(counting: Arc<Counting>) -> Dispatcher {
        let transporters = Arc::new(TransporterRegistry::new());
        transporters.register("ECHO", counting);
        Dispatcher::new(Arc::new(EndpointRegistry::new()), transporters)
    }

    #[tokio::test]
    async fn test_dispatch_by_version() {
        let counting = Arc::new(Counting::default());
        let dispatcher = dispatcher(counting.clone());
        // two sources contribute v1 and v2 of the same key
        dispatcher
            .endpoints()
            .upsert("GET#/users", "v1", endpoint("v1", "fromA", "ECHO"));
        dispatcher
            .endpoints()
            .upsert("GET#/users", "v2", endpoint("v2", "fromB", "ECHO"));

        let ctx = RequestContext::default();
        let response = dispatcher.dispatch("GET#/users", "v1", &ctx).await.unwrap();
        assert_eq!(response.body, ResponseBody::Json(json!("fromA")));
        let response = dispatcher.dispatch("GET#/users", "v2", &ctx).await.unwrap();
        assert_eq!(response.body, ResponseBody::Json(json!("fromB")));

        let err = dispatcher.dispatch("GET#/users", "v3", &ctx).await.unwrap_err();
        assert_eq!(err.status_code(), 404);

        dispatcher.endpoints().remove("GET#/users", "v2");
        let response = dispatcher.dispatch("GET#/users", "", &ctx).await.unwrap();
        assert_eq!(response.body, ResponseBody::Json(json!("fromA")));
    }

    #[tokio::test]
    async fn test_unknown_protocol_never_invokes() {
        let counting = Arc::new(Counting::default());
        let dispatcher = dispatcher(counting.clone());
        dispatcher
            .endpoints()
            .upsert("GET#/users", "v1", endpoint("v1", "get", "DUBBO"));

        let err = dispatcher
            .dispatch("GET#/users", "", &RequestContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::TransporterNotFound { ref proto, .. } if proto == "DUBBO"));
        assert_eq!(err.error_code(), "GATEWAY:TRANSPORTER/NOT_FOUND");
        assert_eq!(counting.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invocation_error_propagates_unchanged() {
        let counting = Arc::new(Counting::default());
        let dispatcher = dispatcher(counting.clone());
        let ep = endpoint("v1", "fail", "echo");
        let err = dispatcher
            .invoke(&ep, &RequestContext::default())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            DispatchError::Invocation(InvokeError::new(502, "BACKEND:FAILED", "backend down"))
        );
        assert_eq!(counting.calls.load(Ordering::SeqCst), 1);
    }
}
