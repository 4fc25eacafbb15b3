//! Admin queries over the live registries

use crate::registry::EndpointRegistry;
use crate::services::ServiceRegistry;
use gateway_api::TransporterService;
use serde::Serialize;

/// Query parameter filtering services by identity
pub const QUERY_SERVICE_ID: &str = "serviceId";
/// Query parameter filtering services by interface
pub const QUERY_INTERFACE: &str = "interface";

/// Filters applied to the service listing; each present filter must match exactly
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ServiceQuery {
    pub service_id: Option<String>,
    pub interface: Option<String>,
}

impl ServiceQuery {
    /// Build a query from a parameter accessor; empty values are ignored
    pub fn from_params<F>(param: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| param(key).filter(|v| !v.is_empty());
        Self {
            service_id: non_empty(QUERY_SERVICE_ID),
            interface: non_empty(QUERY_INTERFACE),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.service_id.is_none() && self.interface.is_none()
    }

    fn matches(&self, id: &str, service: &TransporterService) -> bool {
        if self.is_empty() {
            return true;
        }
        if !service.is_valid() {
            return false;
        }
        let id_ok = self
            .service_id
            .as_deref()
            .map_or(true, |q| q == id || q == service.service_id());
        let interface_ok = self
            .interface
            .as_deref()
            .map_or(true, |q| q == service.interface);
        id_ok && interface_ok
    }

    /// Snapshot of the matching services, without pagination
    pub fn run(&self, registry: &ServiceRegistry) -> Vec<TransporterService> {
        registry
            .list()
            .into_iter()
            .filter(|(id, service)| self.matches(id, service))
            .map(|(_, service)| service)
            .collect()
    }
}

/// One route key and its registered versions
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RouteSummary {
    pub key: String,
    pub versions: Vec<String>,
}

pub fn list_routes(registry: &EndpointRegistry) -> Vec<RouteSummary> {
    registry
        .enumerate()
        .into_iter()
        .map(|(key, versions)| RouteSummary { key, versions })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_api::Endpoint;
    use std::collections::HashMap;

    fn registry() -> ServiceRegistry {
        let registry = ServiceRegistry::new();
        registry
            .register(TransporterService::new("com.example.UserService", "get"))
            .unwrap();
        registry
            .register(TransporterService::new("com.example.UserService", "list"))
            .unwrap();
        let mut explicit = TransporterService::new("com.example.OrderService", "get");
        explicit.service_id = "orders.get".to_string();
        registry.register(explicit).unwrap();
        registry
    }

    #[test]
    fn test_unfiltered_lists_all() {
        let query = ServiceQuery::from_params(|_| None);
        assert!(query.is_empty());
        assert_eq!(query.run(&registry()).len(), 3);
    }

    #[test]
    fn test_filters() {
        let params: HashMap<&str, &str> = [("interface", "com.example.UserService")].into();
        let query = ServiceQuery::from_params(|k| params.get(k).map(|v| v.to_string()));
        assert_eq!(query.run(&registry()).len(), 2);

        let query = ServiceQuery {
            service_id: Some("orders.get".to_string()),
            interface: None,
        };
        let found = query.run(&registry());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].interface, "com.example.OrderService");

        let query = ServiceQuery {
            service_id: Some("com.example.UserService:get".to_string()),
            interface: Some("com.example.OrderService".to_string()),
        };
        assert!(query.run(&registry()).is_empty());

        // exact match only
        let query = ServiceQuery {
            service_id: None,
            interface: Some("com.example".to_string()),
        };
        assert!(query.run(&registry()).is_empty());
    }

    #[test]
    fn test_list_routes() {
        let endpoints = EndpointRegistry::new();
        let ep = Endpoint::new("GET", "/a", "v1", TransporterService::new("svc", "m"));
        endpoints.upsert(&ep.route_key(), "v1", ep.clone());
        assert_eq!(
            list_routes(&endpoints),
            vec![RouteSummary {
                key: "GET#/a".to_string(),
                versions: vec!["v1".to_string()]
            }]
        );
    }
}
