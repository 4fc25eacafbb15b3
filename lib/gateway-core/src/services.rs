//! Service registry for backend call targets, keyed by service identity

use crate::{CoreError, Result};
use dashmap::DashMap;
use gateway_api::TransporterService;
use tracing::debug;

/// Shortest addressable identity, e.g. `a:b`
const MIN_SERVICE_ID_LEN: usize = 3;

/// ServiceRegistry maintains every known backend service
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    services: DashMap<String, TransporterService>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self {
            services: DashMap::new(),
        }
    }

    /// Register or replace a service under its ensured identity
    pub fn register(&self, service: TransporterService) -> Result<String> {
        let id = ensure_service_id(&service)?;
        self.register_by_id(&id, service);
        Ok(id)
    }

    pub fn register_by_id(&self, id: &str, service: TransporterService) {
        self.services.insert(id.to_string(), service);
        debug!(service_id = id, "Registered service");
    }

    pub fn get(&self, id: &str) -> Option<TransporterService> {
        self.services.get(id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.services.contains_key(id)
    }

    pub fn remove(&self, id: &str) -> Option<TransporterService> {
        let removed = self.services.remove(id).map(|(_, service)| service);
        if removed.is_some() {
            debug!(service_id = id, "Removed service");
        }
        removed
    }

    /// Snapshot of every registered service, sorted by identity
    pub fn list(&self) -> Vec<(String, TransporterService)> {
        let mut out: Vec<(String, TransporterService)> = self
            .services
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

/// The explicit `service_id` when set, else `interface:method`.
///
/// Identities shorter than three characters are a configuration defect.
pub fn ensure_service_id(service: &TransporterService) -> Result<String> {
    let id = service.registry_id();
    if id.len() < MIN_SERVICE_ID_LEN {
        return Err(CoreError::ServiceIdentity {
            id,
            interface: service.interface.clone(),
            method: service.method.clone(),
        });
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_service_id_prefers_explicit() {
        let mut service = TransporterService::new("com.example.UserService", "get");
        assert_eq!(ensure_service_id(&service).unwrap(), "com.example.UserService:get");
        service.service_id = "users.get".to_string();
        assert_eq!(ensure_service_id(&service).unwrap(), "users.get");
    }

    #[test]
    fn test_identity_too_short_is_error() {
        let mut service = TransporterService::new("a", "b");
        assert_eq!(ensure_service_id(&service).unwrap(), "a:b");
        service.service_id = "ab".to_string();
        assert!(matches!(
            ensure_service_id(&service),
            Err(CoreError::ServiceIdentity { .. })
        ));
        // empty interface and method derive ":"
        assert!(ensure_service_id(&TransporterService::default()).is_err());
    }

    #[test]
    fn test_register_get_remove() {
        let registry = ServiceRegistry::new();
        let id = registry
            .register(TransporterService::new("svc", "call"))
            .unwrap();
        assert_eq!(id, "svc:call");
        assert!(registry.contains("svc:call"));
        assert_eq!(registry.get("svc:call").unwrap().method, "call");
        assert_eq!(registry.list().len(), 1);
        assert!(registry.remove("svc:call").is_some());
        assert!(registry.is_empty());
        assert!(registry.remove("svc:call").is_none());
    }

    #[test]
    fn test_register_rejects_short_identity() {
        let registry = ServiceRegistry::new();
        let mut service = TransporterService::new("svc", "call");
        service.service_id = "x".to_string();
        assert!(registry.register(service).is_err());
        assert!(registry.is_empty());
    }
}
