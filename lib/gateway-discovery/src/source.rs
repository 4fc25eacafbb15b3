//! The discovery source capability and helpers shared by implementations

use crate::Result;
use async_trait::async_trait;
use gateway_api::{Endpoint, TransporterService};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

pub use gateway_api::{EndpointEvent, ServiceEvent};

/// A pluggable provider of endpoint and service definitions.
///
/// `initialize` runs once before any watch. Each watch call is a long-running
/// operation for dynamic sources: it emits an initial snapshot and then keeps
/// emitting changes until `cancel` fires. Static sources emit once and return.
#[async_trait]
pub trait DiscoverySource: Send + Sync {
    /// Stable source id
    fn id(&self) -> &str;

    async fn initialize(&mut self, config: &serde_yaml::Value) -> Result<()>;

    async fn watch_endpoints(
        &self,
        cancel: CancellationToken,
        sink: mpsc::Sender<EndpointEvent>,
    ) -> Result<()>;

    async fn watch_services(
        &self,
        cancel: CancellationToken,
        sink: mpsc::Sender<ServiceEvent>,
    ) -> Result<()>;
}

/// Send one event unless cancelled. Returns false when the watch should stop,
/// either because `cancel` fired or the consumer went away.
pub async fn emit<T: Send>(cancel: &CancellationToken, sink: &mpsc::Sender<T>, event: T) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        sent = sink.send(event) => sent.is_ok(),
    }
}

/// Drops invalid endpoints with a diagnostic
pub fn check_endpoint(source_id: &str, endpoint: &Endpoint) -> bool {
    if endpoint.is_valid() {
        return true;
    }
    warn!(
        source = source_id,
        method = %endpoint.http_method,
        pattern = %endpoint.http_pattern,
        interface = %endpoint.service.interface,
        "Dropping invalid endpoint"
    );
    false
}

/// Drops invalid services with a diagnostic
pub fn check_service(source_id: &str, service: &TransporterService) -> bool {
    if service.is_valid() {
        return true;
    }
    warn!(
        source = source_id,
        service_id = %service.service_id,
        interface = %service.interface,
        method = %service.method,
        "Dropping invalid service"
    );
    false
}
