//! Dynamic discovery from HttpEndpoint and BackendService custom resources

use crate::source::{check_endpoint, check_service, emit, DiscoverySource};
use crate::{DiscoveryError, Result};
use async_trait::async_trait;
use futures::StreamExt;
use gateway_api::v1alpha1::{BackendService, HttpEndpoint};
use gateway_api::{Endpoint, EndpointEvent, EventType, ServiceEvent, TransporterService};
use k8s_openapi::NamespaceResourceScope;
use kube::runtime::{watcher, WatchStreamExt};
use kube::{Api, Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default id of the Kubernetes source
pub const KUBERNETES_SOURCE_ID: &str = "kubernetes";

#[derive(Debug, Default, Deserialize)]
struct KubernetesConfig {
    /// Watch a single namespace; all namespaces when absent
    #[serde(default)]
    namespace: Option<String>,
}

/// KubernetesDiscovery watches gateway custom resources and turns object
/// changes into discovery events.
pub struct KubernetesDiscovery {
    id: String,
    client: Option<Client>,
    namespace: Option<String>,
}

impl KubernetesDiscovery {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            client: None,
            namespace: None,
        }
    }

    /// Use an existing client instead of the inferred in-cluster/kubeconfig one
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    fn api<K>(&self) -> Result<Api<K>>
    where
        K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>,
    {
        let client = self
            .client
            .clone()
            .ok_or_else(|| DiscoveryError::NotInitialized(self.id.clone()))?;
        Ok(match &self.namespace {
            Some(ns) => Api::namespaced(client, ns),
            None => Api::all(client),
        })
    }

    /// Drive one watch stream until cancelled, translating each watcher
    /// event into zero or more discovery events.
    async fn watch_kind<K, E, F>(
        &self,
        cancel: CancellationToken,
        sink: mpsc::Sender<E>,
        mut translate: F,
    ) -> Result<()>
    where
        K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
            + Clone
            + DeserializeOwned
            + Debug
            + Send
            + 'static,
        E: Send,
        F: FnMut(watcher::Event<K>) -> Vec<E> + Send,
    {
        let api = self.api::<K>()?;
        let kind = K::kind(&());
        info!(source = %self.id, kind = %kind, namespace = ?self.namespace, "Starting watch");

        let mut stream = watcher(api, watcher::Config::default())
            .default_backoff()
            .boxed();
        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => break,
                next = stream.next() => next,
            };
            match next {
                None => break,
                Some(Err(e)) => {
                    warn!(source = %self.id, kind = %kind, error = %e, "Watch error, backing off");
                }
                Some(Ok(event)) => {
                    for out in translate(event) {
                        if !emit(&cancel, &sink, out).await {
                            debug!(source = %self.id, kind = %kind, "Watch stopped");
                            return Ok(());
                        }
                    }
                }
            }
        }
        debug!(source = %self.id, kind = %kind, "Watch stopped");
        Ok(())
    }
}

impl Default for KubernetesDiscovery {
    fn default() -> Self {
        Self::new(KUBERNETES_SOURCE_ID)
    }
}

#[async_trait]
impl DiscoverySource for KubernetesDiscovery {
    fn id(&self) -> &str {
        &self.id
    }

    async fn initialize(&mut self, config: &serde_yaml::Value) -> Result<()> {
        let config: KubernetesConfig = if config.is_null() {
            KubernetesConfig::default()
        } else {
            serde_yaml::from_value(config.clone()).map_err(|e| DiscoveryError::Config {
                source_id: self.id.clone(),
                reason: e.to_string(),
            })?
        };
        self.namespace = config.namespace;
        if self.client.is_none() {
            self.client = Some(Client::try_default().await?);
        }
        Ok(())
    }

    async fn watch_endpoints(
        &self,
        cancel: CancellationToken,
        sink: mpsc::Sender<EndpointEvent>,
    ) -> Result<()> {
        let mut tracker = Tracker::new(self.id.clone(), check_endpoint, Endpoint::route_identity);
        self.watch_kind(cancel, sink, move |event: watcher::Event<HttpEndpoint>| {
            tracker
                .apply(map_event(event, HttpEndpoint::endpoint))
                .into_iter()
                .map(|(event_type, endpoint)| EndpointEvent::new(event_type, endpoint))
                .collect()
        })
        .await
    }

    async fn watch_services(
        &self,
        cancel: CancellationToken,
        sink: mpsc::Sender<ServiceEvent>,
    ) -> Result<()> {
        let mut tracker = Tracker::new(self.id.clone(), check_service, TransporterService::registry_id);
        self.watch_kind(cancel, sink, move |event: watcher::Event<BackendService>| {
            tracker
                .apply(map_event(event, BackendService::service))
                .into_iter()
                .map(|(event_type, service)| ServiceEvent::new(event_type, service))
                .collect()
        })
        .await
    }
}

/// Object-level change, keyed by `namespace/name`
#[derive(Debug, PartialEq)]
enum Change<T> {
    /// A (re)list started
    Relist,
    Initial(String, T),
    /// The (re)list finished; objects not listed since `Relist` are gone
    RelistDone,
    Applied(String, T),
    Deleted(String),
}

fn object_key<K: ResourceExt>(obj: &K) -> String {
    format!("{}/{}", obj.namespace().unwrap_or_default(), obj.name_any())
}

fn map_event<K, T>(event: watcher::Event<K>, extract: fn(&K) -> T) -> Change<T>
where
    K: ResourceExt,
{
    match event {
        watcher::Event::InitApply(obj) => Change::Initial(object_key(&obj), extract(&obj)),
        watcher::Event::Apply(obj) => Change::Applied(object_key(&obj), extract(&obj)),
        watcher::Event::Delete(obj) => Change::Deleted(object_key(&obj)),
        watcher::Event::Init => Change::Relist,
        watcher::Event::InitDone => Change::RelistDone,
    }
}

trait RouteIdentity {
    fn route_identity(&self) -> String;
}

impl RouteIdentity for Endpoint {
    fn route_identity(&self) -> String {
        format!("{}@{}", self.route_key(), self.version)
    }
}

/// Remembers what each object last contributed so that edits which change an
/// entity's identity retract the old registration, and objects that vanish
/// across a relist are retracted.
struct Tracker<T> {
    source_id: String,
    known: HashMap<String, T>,
    /// Keys listed since the last `Relist`, while a relist is in progress
    relisted: Option<HashSet<String>>,
    valid: fn(&str, &T) -> bool,
    identity: fn(&T) -> String,
}

impl<T: Clone> Tracker<T> {
    fn new(source_id: String, valid: fn(&str, &T) -> bool, identity: fn(&T) -> String) -> Self {
        Self {
            source_id,
            known: HashMap::new(),
            relisted: None,
            valid,
            identity,
        }
    }

    fn apply(&mut self, change: Change<T>) -> Vec<(EventType, T)> {
        let (key, entity, event_type) = match change {
            Change::Relist => {
                self.relisted = Some(HashSet::new());
                return Vec::new();
            }
            Change::RelistDone => return self.retract_unlisted(),
            Change::Deleted(key) => {
                return self
                    .known
                    .remove(&key)
                    .map(|prev| vec![(EventType::Removed, prev)])
                    .unwrap_or_default();
            }
            Change::Initial(key, entity) => {
                if let Some(relisted) = self.relisted.as_mut() {
                    relisted.insert(key.clone());
                }
                (key, entity, EventType::Added)
            }
            Change::Applied(key, entity) => (key, entity, EventType::Updated),
        };

        if !(self.valid)(&self.source_id, &entity) {
            return self
                .known
                .remove(&key)
                .map(|prev| vec![(EventType::Removed, prev)])
                .unwrap_or_default();
        }

        let mut out = Vec::with_capacity(2);
        if let Some(prev) = self.known.insert(key, entity.clone()) {
            if (self.identity)(&prev) != (self.identity)(&entity) {
                out.push((EventType::Removed, prev));
            }
        }
        out.push((event_type, entity));
        out
    }

    fn retract_unlisted(&mut self) -> Vec<(EventType, T)> {
        let Some(relisted) = self.relisted.take() else {
            return Vec::new();
        };
        let mut stale: Vec<String> = self
            .known
            .keys()
            .filter(|key| !relisted.contains(*key))
            .cloned()
            .collect();
        stale.sort();
        if !stale.is_empty() {
            debug!(source = %self.source_id, count = stale.len(), "Retracting objects missing from relist");
        }
        stale
            .into_iter()
            .filter_map(|key| self.known.remove(&key))
            .map(|prev| (EventType::Removed, prev))
            .collect()
    }
}
