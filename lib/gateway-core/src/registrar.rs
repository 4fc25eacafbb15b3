//! Registrar applies discovery events to the live registries

use crate::registry::EndpointRegistry;
use crate::services::{ensure_service_id, ServiceRegistry};
use crate::Result;
use gateway_api::{EndpointEvent, EventType, ServiceEvent};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Registration state of one route key
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteState {
    Unregistered,
    Registered,
}

/// Registrar consumes endpoint and service events in arrival order
#[derive(Clone)]
pub struct Registrar {
    endpoints: Arc<EndpointRegistry>,
    services: Arc<ServiceRegistry>,
}

impl Registrar {
    pub fn new(endpoints: Arc<EndpointRegistry>, services: Arc<ServiceRegistry>) -> Self {
        Self {
            endpoints,
            services,
        }
    }

    pub fn endpoints(&self) -> &Arc<EndpointRegistry> {
        &self.endpoints
    }

    pub fn services(&self) -> &Arc<ServiceRegistry> {
        &self.services
    }

    /// Apply one endpoint event and return the key's resulting state
    pub fn apply_endpoint(&self, event: EndpointEvent) -> RouteState {
        let key = event.endpoint.route_key();
        let version = event.endpoint.version.clone();
        match event.event_type {
            EventType::Added | EventType::Updated => {
                if self.endpoints.upsert(&key, &version, event.endpoint) {
                    info!(key = %key, version = %version, "Route registered");
                }
                RouteState::Registered
            }
            EventType::Removed => {
                if self.endpoints.remove(&key, &version) {
                    info!(key = %key, version = %version, "Route unregistered");
                }
                if self.endpoints.contains_key(&key) {
                    RouteState::Registered
                } else {
                    RouteState::Unregistered
                }
            }
        }
    }

    /// Apply one service event.
    ///
    /// An Added or Updated service whose identity is unusable is a fatal
    /// configuration error and is returned to the caller.
    pub fn apply_service(&self, event: ServiceEvent) -> Result<()> {
        match event.event_type {
            EventType::Added | EventType::Updated => {
                let id = self.services.register(event.service)?;
                debug!(service_id = %id, "Service registered");
            }
            EventType::Removed => match ensure_service_id(&event.service) {
                Ok(id) => {
                    self.services.remove(&id);
                }
                Err(e) => warn!("Ignoring removal of unaddressable service: {}", e),
            },
        }
        Ok(())
    }

    /// Drain both event streams until they close or `cancel` fires.
    ///
    /// Returns the first fatal error, after which no further events are applied.
    pub async fn run(
        self,
        mut endpoint_events: mpsc::Receiver<EndpointEvent>,
        mut service_events: mpsc::Receiver<ServiceEvent>,
        cancel: CancellationToken,
    ) -> Result<()> {
        info!("Registrar started");
        let mut endpoints_open = true;
        let mut services_open = true;

        while endpoints_open || services_open {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Registrar cancelled");
                    break;
                }
                event = endpoint_events.recv(), if endpoints_open => match event {
                    Some(event) => {
                        self.apply_endpoint(event);
                    }
                    None => endpoints_open = false,
                },
                event = service_events.recv(), if services_open => match event {
                    Some(event) => {
                        if let Err(e) = self.apply_service(event) {
                            error!("Registrar stopped on fatal service error: {}", e);
                            return Err(e);
                        }
                    }
                    None => services_open = false,
                },
            }
        }

        info!(
            routes = self.endpoints.len(),
            services = self.services.len(),
            "Registrar finished"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CoreError;
    use gateway_api::{Endpoint, TransporterService};

    fn registrar() -> Registrar {
        Registrar::new(
            Arc::new(EndpointRegistry::new()),
            Arc::new(ServiceRegistry::new()),
        )
    }

    fn endpoint(version: &str) -> Endpoint {
        Endpoint::new(
            "GET",
            "/users",
            version,
            TransporterService::new("com.example.UserService", "get"),
        )
    }

    #[test]
    fn test_route_state_machine() {
        let registrar = registrar();
        let added = registrar.apply_endpoint(EndpointEvent::new(EventType::Added, endpoint("v1")));
        assert_eq!(added, RouteState::Registered);
        let updated =
            registrar.apply_endpoint(EndpointEvent::new(EventType::Updated, endpoint("v2")));
        assert_eq!(updated, RouteState::Registered);

        let removed =
            registrar.apply_endpoint(EndpointEvent::new(EventType::Removed, endpoint("v1")));
        assert_eq!(removed, RouteState::Registered);
        let removed =
            registrar.apply_endpoint(EndpointEvent::new(EventType::Removed, endpoint("v2")));
        assert_eq!(removed, RouteState::Unregistered);
        assert!(registrar.endpoints().enumerate().is_empty());
    }

    #[test]
    fn test_duplicate_added_is_idempotent() {
        let registrar = registrar();
        registrar.apply_endpoint(EndpointEvent::new(EventType::Added, endpoint("v1")));
        let once = registrar.endpoints().enumerate();
        registrar.apply_endpoint(EndpointEvent::new(EventType::Added, endpoint("v1")));
        assert_eq!(registrar.endpoints().enumerate(), once);
        assert_eq!(
            registrar.endpoints().lookup("GET#/users", "v1"),
            Some(endpoint("v1"))
        );
    }

    #[test]
    fn test_service_events() {
        let registrar = registrar();
        let service = TransporterService::new("svc", "call");
        registrar
            .apply_service(ServiceEvent::new(EventType::Added, service.clone()))
            .unwrap();
        assert!(registrar.services().contains("svc:call"));
        registrar
            .apply_service(ServiceEvent::new(EventType::Removed, service))
            .unwrap();
        assert!(registrar.services().is_empty());
    }

    #[test]
    fn test_short_service_identity_is_fatal() {
        let registrar = registrar();
        let mut service = TransporterService::new("svc", "call");
        service.service_id = "id".to_string();
        let result = registrar.apply_service(ServiceEvent::new(EventType::Added, service));
        assert!(matches!(result, Err(CoreError::ServiceIdentity { .. })));
    }

    #[tokio::test]
    async fn test_run_applies_in_order_until_closed() {
        let registrar = registrar();
        let (ep_tx, ep_rx) = mpsc::channel(8);
        let (svc_tx, svc_rx) = mpsc::channel(8);
        ep_tx
            .send(EndpointEvent::new(EventType::Added, endpoint("v1")))
            .await
            .unwrap();
        ep_tx
            .send(EndpointEvent::new(EventType::Removed, endpoint("v1")))
            .await
            .unwrap();
        ep_tx
            .send(EndpointEvent::new(EventType::Added, endpoint("v2")))
            .await
            .unwrap();
        svc_tx
            .send(ServiceEvent::new(
                EventType::Added,
                TransporterService::new("svc", "call"),
            ))
            .await
            .unwrap();
        drop(ep_tx);
        drop(svc_tx);

        registrar
            .clone()
            .run(ep_rx, svc_rx, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(
            registrar.endpoints().enumerate(),
            vec![("GET#/users".to_string(), vec!["v2".to_string()])]
        );
        assert!(registrar.services().contains("svc:call"));
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let registrar = registrar();
        let (_ep_tx, ep_rx) = mpsc::channel::<EndpointEvent>(1);
        let (_svc_tx, svc_rx) = mpsc::channel::<ServiceEvent>(1);
        let cancel = CancellationToken::new();
        cancel.cancel();
        registrar.run(ep_rx, svc_rx, cancel).await.unwrap();
    }
}
