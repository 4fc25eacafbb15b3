//! Fan-in of every registered discovery source into two event streams

use crate::source::DiscoverySource;
use crate::Result;
use gateway_api::{EndpointEvent, ServiceEvent};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Receiving side of a started manager, plus the source watch tasks
pub struct DiscoveryStreams {
    pub endpoints: mpsc::Receiver<EndpointEvent>,
    pub services: mpsc::Receiver<ServiceEvent>,
    pub tasks: JoinSet<()>,
}

/// DiscoveryManager owns the configured sources and merges their watches.
///
/// Events from different sources interleave arbitrarily; events from one
/// watch of one source keep their order.
pub struct DiscoveryManager {
    sources: Vec<Arc<dyn DiscoverySource>>,
    capacity: usize,
}

impl DiscoveryManager {
    pub fn new(capacity: usize) -> Self {
        Self {
            sources: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Initialize a source with its config section and keep it.
    /// An initialization failure is returned and the source is not kept.
    pub async fn register<S>(&mut self, mut source: S, config: &serde_yaml::Value) -> Result<()>
    where
        S: DiscoverySource + 'static,
    {
        source.initialize(config).await?;
        info!(source = %source.id(), "Discovery source initialized");
        self.sources.push(Arc::new(source));
        Ok(())
    }

    pub fn source_ids(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.id().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Spawn one endpoint watch and one service watch per source. The
    /// returned receivers close once every watch has finished.
    pub fn start(&self, cancel: CancellationToken) -> DiscoveryStreams {
        let (endpoint_tx, endpoints) = mpsc::channel(self.capacity);
        let (service_tx, services) = mpsc::channel(self.capacity);
        let mut tasks = JoinSet::new();

        for source in &self.sources {
            let (src, token, sink) = (source.clone(), cancel.clone(), endpoint_tx.clone());
            tasks.spawn(async move {
                if let Err(e) = src.watch_endpoints(token, sink).await {
                    error!(source = %src.id(), error = %e, "Endpoint watch failed");
                }
            });

            let (src, token, sink) = (source.clone(), cancel.clone(), service_tx.clone());
            tasks.spawn(async move {
                if let Err(e) = src.watch_services(token, sink).await {
                    error!(source = %src.id(), error = %e, "Service watch failed");
                }
            });
        }

        DiscoveryStreams {
            endpoints,
            services,
            tasks,
        }
    }
}

impl Default for DiscoveryManager {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}
