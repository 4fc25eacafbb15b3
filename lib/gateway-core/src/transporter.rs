//! Protocol-specific backend call executors and their registry

use async_trait::async_trait;
use gateway_api::{RequestContext, TransporterService};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Response body produced by a transporter
#[derive(Clone, Debug, PartialEq)]
pub enum ResponseBody {
    Empty,
    Json(Value),
    Raw { content_type: String, bytes: Vec<u8> },
}

/// Response produced by a backend call
#[derive(Clone, Debug, PartialEq)]
pub struct ServeResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, Vec<String>>,
    pub body: ResponseBody,
}

impl ServeResponse {
    pub fn json(status_code: u16, body: Value) -> Self {
        Self {
            status_code,
            headers: BTreeMap::new(),
            body: ResponseBody::Json(body),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers
            .entry(name.to_string())
            .or_default()
            .push(value.into());
        self
    }
}

/// Structured error returned by a failed backend call
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{error_code} ({status_code}): {message}")]
pub struct InvokeError {
    pub status_code: u16,
    pub error_code: String,
    pub message: String,
    pub cause: Option<String>,
}

impl InvokeError {
    pub fn new(status_code: u16, error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status_code,
            error_code: error_code.into(),
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: impl ToString) -> Self {
        self.cause = Some(cause.to_string());
        self
    }
}

/// Transporter executes calls against one backend protocol.
///
/// Retry and timeout policies come from the service attributes and are
/// applied by each implementation.
#[async_trait]
pub trait Transporter: Send + Sync {
    async fn invoke(
        &self,
        ctx: &RequestContext,
        service: &TransporterService,
    ) -> Result<ServeResponse, InvokeError>;
}

/// TransporterRegistry maps protocol names to transporters.
///
/// Registration is expected at startup; lookups happen on the request path.
#[derive(Default)]
pub struct TransporterRegistry {
    transporters: RwLock<HashMap<String, Arc<dyn Transporter>>>,
}

impl TransporterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a transporter to a protocol name; the last registration wins.
    /// Protocol names are matched case-insensitively.
    pub fn register(&self, proto: &str, transporter: Arc<dyn Transporter>) {
        let proto = proto.to_ascii_uppercase();
        let replaced = self
            .transporters
            .write()
            .insert(proto.clone(), transporter)
            .is_some();
        info!(proto = %proto, replaced, "Registered transporter");
    }

    pub fn get(&self, proto: &str) -> Option<Arc<dyn Transporter>> {
        self.transporters
            .read()
            .get(&proto.to_ascii_uppercase())
            .cloned()
    }

    pub fn protocols(&self) -> Vec<String> {
        let mut protos: Vec<String> = self.transporters.read().keys().cloned().collect();
        protos.sort();
        protos
    }
}
