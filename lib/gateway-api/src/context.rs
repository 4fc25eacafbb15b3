//! Read-only view of one inbound request, as seen by argument resolution and transporters

use serde_json::Value;
use std::collections::BTreeMap;

/// Multi-valued string map with insertion order preserved per key
pub type MultiMap = BTreeMap<String, Vec<String>>;

/// Snapshot of an inbound HTTP request.
///
/// Header names are stored lower-cased; all other keys are case-sensitive.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    pub request_id: String,
    pub method: String,
    pub uri: String,
    pub path: String,
    pub host: String,
    pub remote_addr: String,
    pub path_vars: BTreeMap<String, String>,
    pub query: MultiMap,
    pub form: MultiMap,
    pub headers: MultiMap,
    pub attributes: BTreeMap<String, Value>,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl RequestContext {
    pub fn new(method: impl Into<String>, uri: impl Into<String>) -> Self {
        let uri = uri.into();
        let path = uri.split('?').next().unwrap_or_default().to_string();
        Self {
            method: method.into(),
            uri,
            path,
            ..Default::default()
        }
    }

    pub fn path_var(&self, key: &str) -> Option<&str> {
        self.path_vars.get(key).map(String::as_str)
    }

    pub fn query_var(&self, key: &str) -> Option<&str> {
        first(&self.query, key)
    }

    pub fn query_vars(&self, key: &str) -> Option<&[String]> {
        self.query.get(key).map(Vec::as_slice)
    }

    pub fn form_var(&self, key: &str) -> Option<&str> {
        first(&self.form, key)
    }

    pub fn form_vars(&self, key: &str) -> Option<&[String]> {
        self.form.get(key).map(Vec::as_slice)
    }

    pub fn header_var(&self, name: &str) -> Option<&str> {
        first(&self.headers, &name.to_ascii_lowercase())
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Request metadata by name: method, uri, path, host, remoteAddr, requestId
    pub fn metadata(&self, key: &str) -> Option<&str> {
        let value = match key.to_ascii_lowercase().as_str() {
            "method" => &self.method,
            "uri" => &self.uri,
            "path" => &self.path,
            "host" => &self.host,
            "remoteaddr" => &self.remote_addr,
            "requestid" => &self.request_id,
            _ => return None,
        };
        Some(value.as_str())
    }

    // Builder-style setters, used mostly when assembling contexts by hand.

    pub fn with_path_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_vars.insert(key.into(), value.into());
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.entry(key.into()).or_default().push(value.into());
        self
    }

    pub fn with_form(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.entry(key.into()).or_default().push(value.into());
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_body(mut self, content_type: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.content_type = content_type.into();
        self.body = body.into();
        self
    }
}

fn first<'a>(map: &'a MultiMap, key: &str) -> Option<&'a str> {
    map.get(key).and_then(|values| values.first()).map(String::as_str)
}
