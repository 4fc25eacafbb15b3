//! Endpoint registry: route key -> version -> endpoint snapshot

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use gateway_api::Endpoint;
use parking_lot::RwLock;
use rand::seq::IteratorRandom;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// MultiEndpoint holds every version of the endpoint routed under one key.
///
/// Each table carries its own lock, so readers of one key never wait on
/// writers of another. Reads always hand out owned copies.
#[derive(Debug, Default)]
pub struct MultiEndpoint {
    versions: RwLock<HashMap<String, Arc<Endpoint>>>,
}

impl MultiEndpoint {
    pub fn new(endpoint: Endpoint) -> Self {
        let mut versions = HashMap::with_capacity(1);
        versions.insert(endpoint.version.clone(), Arc::new(endpoint));
        Self {
            versions: RwLock::new(versions),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.versions.read().is_empty()
    }

    pub fn len(&self) -> usize {
        self.versions.read().len()
    }

    /// Lookup by version.
    ///
    /// An empty version, or a table holding exactly one version, returns that
    /// single entry. Otherwise the version must match exactly.
    pub fn lookup(&self, version: &str) -> Option<Endpoint> {
        let versions = self.versions.read();
        if versions.len() == 1 {
            return versions.values().next().map(|ep| Endpoint::clone(ep));
        }
        if version.is_empty() {
            // Several versions and none requested: lowest version string wins.
            return versions
                .iter()
                .min_by(|a, b| a.0.cmp(b.0))
                .map(|(_, ep)| Endpoint::clone(ep));
        }
        versions.get(version).map(|ep| Endpoint::clone(ep))
    }

    /// Set the snapshot for a version, replacing any previous one
    pub fn update(&self, version: &str, endpoint: Endpoint) {
        self.versions
            .write()
            .insert(version.to_string(), Arc::new(endpoint));
    }

    /// Remove a version; returns true when it was present
    pub fn delete(&self, version: &str) -> bool {
        self.versions.write().remove(version).is_some()
    }

    /// Arbitrary version, with no selection policy.
    ///
    /// Precondition: the table is not empty. The registry never keeps empty
    /// tables, so this only returns `None` when the precondition is broken.
    pub fn random(&self) -> Option<Endpoint> {
        let versions = self.versions.read();
        versions
            .values()
            .choose(&mut rand::thread_rng())
            .map(|ep| Endpoint::clone(ep))
    }

    /// Version strings currently held, sorted
    pub fn versions(&self) -> Vec<String> {
        let mut out: Vec<String> = self.versions.read().keys().cloned().collect();
        out.sort();
        out
    }

    /// Owned copy of every version
    pub fn snapshot(&self) -> HashMap<String, Endpoint> {
        self.versions
            .read()
            .iter()
            .map(|(v, ep)| (v.clone(), Endpoint::clone(ep)))
            .collect()
    }
}

/// EndpointRegistry maps route keys to their version tables
#[derive(Debug, Default)]
pub struct EndpointRegistry {
    tables: DashMap<String, Arc<MultiEndpoint>>,
    /// Method -> registered keys whose path is a pattern, sorted
    patterns: RwLock<HashMap<String, Arc<[String]>>>,
}

impl EndpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the key's table if absent, then set the version's snapshot.
    /// Returns true when the key was newly registered.
    pub fn upsert(&self, key: &str, version: &str, endpoint: Endpoint) -> bool {
        match self.tables.entry(key.to_string()) {
            Entry::Occupied(entry) => {
                entry.get().update(version, endpoint);
                debug!(key, version, "Updated endpoint version");
                false
            }
            Entry::Vacant(entry) => {
                let table = MultiEndpoint::default();
                table.update(version, endpoint);
                entry.insert(Arc::new(table));
                self.index_pattern(key, true);
                debug!(key, version, "Registered endpoint key");
                true
            }
        }
    }

    /// Delete a version, dropping the key entirely once its table is empty.
    /// Returns true when the key was unregistered.
    pub fn remove(&self, key: &str, version: &str) -> bool {
        match self.tables.entry(key.to_string()) {
            Entry::Occupied(entry) => {
                entry.get().delete(version);
                if entry.get().is_empty() {
                    entry.remove();
                    self.index_pattern(key, false);
                    debug!(key, version, "Unregistered endpoint key");
                    true
                } else {
                    debug!(key, version, "Removed endpoint version");
                    false
                }
            }
            Entry::Vacant(_) => false,
        }
    }

    pub fn lookup(&self, key: &str, version: &str) -> Option<Endpoint> {
        self.table(key)?.lookup(version)
    }

    /// Arbitrary version of a key, for callers that accept any version
    pub fn random(&self, key: &str) -> Option<Endpoint> {
        self.table(key)?.random()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.tables.contains_key(key)
    }

    /// Registered keys and their versions, sorted by key
    pub fn enumerate(&self) -> Vec<(String, Vec<String>)> {
        let mut out: Vec<(String, Vec<String>)> = self
            .tables
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().versions()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    pub fn keys(&self) -> Vec<String> {
        self.tables.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Registered keys of `method` whose path holds variables or a wildcard
    pub fn pattern_keys(&self, method: &str) -> Arc<[String]> {
        self.patterns
            .read()
            .get(&method.to_ascii_uppercase())
            .cloned()
            .unwrap_or_else(|| Arc::from(Vec::new()))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    // Called with the key's shard held, so index updates follow table membership.
    fn index_pattern(&self, key: &str, present: bool) {
        let Some((method, path)) = key.split_once('#') else {
            return;
        };
        if !is_pattern(path) {
            return;
        }
        let mut patterns = self.patterns.write();
        let mut keys: Vec<String> = patterns.get(method).map(|k| k.to_vec()).unwrap_or_default();
        keys.retain(|k| k != key);
        if present {
            keys.push(key.to_string());
            keys.sort();
        }
        if keys.is_empty() {
            patterns.remove(method);
        } else {
            patterns.insert(method.to_string(), Arc::from(keys));
        }
    }

    // The shard guard is released before the table's own lock is taken.
    fn table(&self, key: &str) -> Option<Arc<MultiEndpoint>> {
        self.tables.get(key).map(|entry| Arc::clone(entry.value()))
    }
}

/// True when a route path has `{var}`/`:var` segments or a trailing `/*`
pub fn is_pattern(path: &str) -> bool {
    path.ends_with("/*")
        || path
            .split('/')
            .any(|segment| segment.starts_with(':') || (segment.starts_with('{') && segment.ends_with('}')))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_api::TransporterService;
    use std::thread;

    fn endpoint(version: &str, method: &str) -> Endpoint {
        Endpoint::new(
            "GET",
            "/users",
            version,
            TransporterService::new("com.example.UserService", method),
        )
    }

    #[test]
    fn test_upsert_lookup_round_trip() {
        let registry = EndpointRegistry::new();
        let ep = endpoint("v1", "get");
        registry.upsert("GET#/users", "v1", ep.clone());
        assert_eq!(registry.lookup("GET#/users", "v1"), Some(ep));
    }

    #[test]
    fn test_single_version_shortcut() {
        let registry = EndpointRegistry::new();
        let ep = endpoint("v1", "get");
        registry.upsert("k", "v1", ep.clone());
        assert_eq!(registry.lookup("k", ""), Some(ep.clone()));
        // exactly one version: any requested version resolves to it
        assert_eq!(registry.lookup("k", "v9"), Some(ep));
    }

    #[test]
    fn test_multi_version_exact_match() {
        let registry = EndpointRegistry::new();
        let e1 = endpoint("v1", "getV1");
        let e2 = endpoint("v2", "getV2");
        registry.upsert("k", "v1", e1.clone());
        registry.upsert("k", "v2", e2.clone());
        assert_eq!(registry.lookup("k", "v2"), Some(e2));
        assert_eq!(registry.lookup("k", "v1"), Some(e1.clone()));
        assert_eq!(registry.lookup("k", "v3"), None);
        assert_eq!(registry.lookup("k", ""), Some(e1));
    }

    #[test]
    fn test_remove_prunes_empty_key() {
        let registry = EndpointRegistry::new();
        registry.upsert("k", "v1", endpoint("v1", "a"));
        registry.upsert("k", "v2", endpoint("v2", "b"));
        assert!(!registry.remove("k", "v1"));
        assert_eq!(registry.enumerate(), vec![("k".to_string(), vec!["v2".to_string()])]);
        assert!(registry.remove("k", "v2"));
        assert!(registry.enumerate().is_empty());
        assert!(!registry.contains_key("k"));
        assert!(!registry.remove("k", "v2"));
    }

    #[test]
    fn test_pattern_index_follows_membership() {
        let registry = EndpointRegistry::new();
        registry.upsert("GET#/users/{id}", "v1", endpoint("v1", "a"));
        registry.upsert("GET#/users/{id}", "v2", endpoint("v2", "b"));
        registry.upsert("GET#/files/*", "v1", endpoint("v1", "c"));
        registry.upsert("GET#/users", "v1", endpoint("v1", "d"));
        registry.upsert("POST#/users/:id", "v1", endpoint("v1", "e"));

        assert_eq!(&*registry.pattern_keys("get"), ["GET#/files/*", "GET#/users/{id}"]);
        assert_eq!(&*registry.pattern_keys("POST"), ["POST#/users/:id"]);
        assert!(registry.pattern_keys("DELETE").is_empty());

        // the key stays indexed until its last version goes
        registry.remove("GET#/users/{id}", "v1");
        assert_eq!(registry.pattern_keys("GET").len(), 2);
        registry.remove("GET#/users/{id}", "v2");
        assert_eq!(&*registry.pattern_keys("GET"), ["GET#/files/*"]);
        registry.remove("POST#/users/:id", "v1");
        assert!(registry.pattern_keys("POST").is_empty());
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let registry = EndpointRegistry::new();
        assert!(registry.upsert("k", "v1", endpoint("v1", "a")));
        let before = registry.enumerate();
        assert!(!registry.upsert("k", "v1", endpoint("v1", "a")));
        assert_eq!(registry.enumerate(), before);
        assert_eq!(registry.lookup("k", "v1"), Some(endpoint("v1", "a")));
    }

    #[test]
    fn test_lookup_returns_independent_copy() {
        let registry = EndpointRegistry::new();
        registry.upsert("k", "v1", endpoint("v1", "a"));
        let mut copy = registry.lookup("k", "v1").unwrap();
        copy.service.method = "mutated".to_string();
        assert_eq!(registry.lookup("k", "v1").unwrap().service.method, "a");
    }

    #[test]
    fn test_random_picks_existing_version() {
        let registry = EndpointRegistry::new();
        assert!(registry.random("k").is_none());
        registry.upsert("k", "v1", endpoint("v1", "a"));
        registry.upsert("k", "v2", endpoint("v2", "b"));
        let picked = registry.random("k").unwrap();
        assert!(picked.version == "v1" || picked.version == "v2");
    }

    #[test]
    fn test_multi_endpoint_new() {
        let table = MultiEndpoint::new(endpoint("v1", "a"));
        assert_eq!(table.len(), 1);
        assert_eq!(table.versions(), vec!["v1"]);
        assert!(table.delete("v1"));
        assert!(table.is_empty());
        assert!(table.random().is_none());
    }

    #[test]
    fn test_concurrent_writers_on_unrelated_keys() {
        let registry = Arc::new(EndpointRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                thread::spawn(move || {
                    let key = format!("GET#/k{}", i);
                    for v in 0..50 {
                        registry.upsert(&key, &format!("v{}", v), endpoint("v", "m"));
                        assert!(registry.lookup(&key, &format!("v{}", v)).is_some());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.len(), 8);
        assert!(registry.enumerate().iter().all(|(_, versions)| versions.len() == 50));
    }
}
