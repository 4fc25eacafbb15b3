//! Static discovery from inline config and included definition documents

use crate::source::{check_endpoint, check_service, emit, DiscoverySource};
use crate::verify::verify_payload;
use crate::{DiscoveryError, Result};
use async_trait::async_trait;
use gateway_api::{Endpoint, EndpointEvent, EventType, ServiceEvent, TransporterService};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Default id of the static source
pub const RESOURCE_SOURCE_ID: &str = "resource";

/// One decoded definition document
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Resources {
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
    #[serde(default)]
    pub services: Vec<TransporterService>,
}

impl Resources {
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty() && self.services.is_empty()
    }
}

/// Config section of the static source
#[derive(Debug, Default, Deserialize)]
struct ResourceConfig {
    #[serde(default)]
    includes: Vec<PathBuf>,
    #[serde(default)]
    endpoints: Vec<Endpoint>,
    #[serde(default)]
    services: Vec<TransporterService>,
}

/// ResourceDiscovery serves a fixed set of definitions loaded at initialize.
///
/// Included documents are applied in listed order, then the inline document.
pub struct ResourceDiscovery {
    id: String,
    resources: Vec<Resources>,
}

impl ResourceDiscovery {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            resources: Vec::new(),
        }
    }

    /// Build a source from already decoded documents
    pub fn with_resources(id: impl Into<String>, resources: Vec<Resources>) -> Self {
        Self {
            id: id.into(),
            resources,
        }
    }

    pub fn resources(&self) -> &[Resources] {
        &self.resources
    }

    async fn include(&self, path: &Path) -> Result<Resources> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| DiscoveryError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        decode_document(&path.display().to_string(), &bytes)
    }
}

impl Default for ResourceDiscovery {
    fn default() -> Self {
        Self::new(RESOURCE_SOURCE_ID)
    }
}

/// Decode a definition document. Documents whose name ends in `.json` are
/// pre-checked and decoded as JSON; everything else is YAML.
pub fn decode_document(name: &str, bytes: &[u8]) -> Result<Resources> {
    let decode_error = |reason: String| DiscoveryError::Decode {
        path: name.to_string(),
        reason,
    };
    if name.ends_with(".json") {
        verify_payload(bytes).map_err(|e| decode_error(e.to_string()))?;
        return serde_json::from_slice(bytes).map_err(|e| decode_error(e.to_string()));
    }
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Resources::default());
    }
    serde_yaml::from_slice(bytes).map_err(|e| decode_error(e.to_string()))
}

#[async_trait]
impl DiscoverySource for ResourceDiscovery {
    fn id(&self) -> &str {
        &self.id
    }

    async fn initialize(&mut self, config: &serde_yaml::Value) -> Result<()> {
        let config: ResourceConfig = if config.is_null() {
            ResourceConfig::default()
        } else {
            serde_yaml::from_value(config.clone()).map_err(|e| DiscoveryError::Config {
                source_id: self.id.clone(),
                reason: e.to_string(),
            })?
        };

        info!(source = %self.id, includes = ?config.includes, "Loading static resources");
        let mut loaded = Vec::with_capacity(config.includes.len() + 1);
        for path in &config.includes {
            // Any failure aborts: partial static state is never served.
            loaded.push(self.include(path).await?);
        }
        let inline = Resources {
            endpoints: config.endpoints,
            services: config.services,
        };
        if !inline.is_empty() {
            loaded.push(inline);
        }

        self.resources.extend(loaded);
        debug!(
            source = %self.id,
            documents = self.resources.len(),
            "Static resources loaded"
        );
        Ok(())
    }

    async fn watch_endpoints(
        &self,
        cancel: CancellationToken,
        sink: mpsc::Sender<EndpointEvent>,
    ) -> Result<()> {
        for endpoint in self.resources.iter().flat_map(|r| r.endpoints.iter()) {
            if !check_endpoint(&self.id, endpoint) {
                continue;
            }
            let event = EndpointEvent::new(EventType::Added, endpoint.clone());
            if !emit(&cancel, &sink, event).await {
                break;
            }
        }
        Ok(())
    }

    async fn watch_services(
        &self,
        cancel: CancellationToken,
        sink: mpsc::Sender<ServiceEvent>,
    ) -> Result<()> {
        for service in self.resources.iter().flat_map(|r| r.services.iter()) {
            if !check_service(&self.id, service) {
                continue;
            }
            let event = ServiceEvent::new(EventType::Added, service.clone());
            if !emit(&cancel, &sink, event).await {
                break;
            }
        }
        Ok(())
    }
}
