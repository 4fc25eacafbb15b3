//! Router for matching requests to registered route keys

use gateway_api::route_key;
use gateway_core::EndpointRegistry;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// A matched route: its registry key and the captured path variables
#[derive(Clone, Debug, PartialEq)]
pub struct RouteMatch {
    pub key: String,
    pub path_vars: BTreeMap<String, String>,
}

/// Router for matching HTTP requests against endpoint patterns.
///
/// Patterns support `{name}` and `:name` segment variables and a trailing
/// `/*` prefix wildcard. Exact keys win, then non-wildcard matches with the
/// fewest variables. Only the registry's pattern keys for the request method
/// are scanned.
pub struct Router {
    registry: Arc<EndpointRegistry>,
}

impl Router {
    pub fn new(registry: Arc<EndpointRegistry>) -> Self {
        Self { registry }
    }

    pub fn route(&self, method: &str, path: &str) -> Option<RouteMatch> {
        let exact = route_key(method, path);
        if self.registry.contains_key(&exact) {
            return Some(RouteMatch {
                key: exact,
                path_vars: BTreeMap::new(),
            });
        }

        let prefix = route_key(method, "");
        let mut best: Option<((bool, usize), RouteMatch)> = None;
        for key in self.registry.pattern_keys(method).iter() {
            let Some(pattern) = key.strip_prefix(&prefix) else {
                continue;
            };
            let Some(path_vars) = match_path(path, pattern) else {
                continue;
            };
            let score = (pattern.ends_with("/*"), path_vars.len());
            let better = match &best {
                None => true,
                Some((best_score, current)) => {
                    score < *best_score || (score == *best_score && key.len() > current.key.len())
                }
            };
            if better {
                best = Some((
                    score,
                    RouteMatch {
                        key: key.clone(),
                        path_vars,
                    },
                ));
            }
        }
        if let Some((_, found)) = &best {
            debug!(method, path, key = %found.key, "Matched route pattern");
        }
        best.map(|(_, found)| found)
    }

    pub fn registry(&self) -> &Arc<EndpointRegistry> {
        &self.registry
    }
}

/// Match a request path against one pattern, capturing variables
pub fn match_path(path: &str, pattern: &str) -> Option<BTreeMap<String, String>> {
    let mut vars = BTreeMap::new();
    if pattern == path {
        return Some(vars);
    }

    // Prefix match with wildcard
    if let Some(prefix) = pattern.strip_suffix("/*") {
        let matched = path == prefix || path.starts_with(&format!("{}/", prefix));
        return matched.then_some(vars);
    }

    let mut path_segments = path.trim_matches('/').split('/');
    let mut pattern_segments = pattern.trim_matches('/').split('/');
    loop {
        match (pattern_segments.next(), path_segments.next()) {
            (None, None) => return Some(vars),
            (Some(p), Some(s)) => {
                if let Some(name) = segment_var(p) {
                    if s.is_empty() {
                        return None;
                    }
                    vars.insert(name.to_string(), s.to_string());
                } else if p != s {
                    return None;
                }
            }
            _ => return None,
        }
    }
}

fn segment_var(segment: &str) -> Option<&str> {
    segment
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .or_else(|| segment.strip_prefix(':'))
        .filter(|name| !name.is_empty())
}
