//! Backend call targets

use crate::argument::Argument;
use crate::attribute::{Attribute, Attributes};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Reserved service attribute names
pub const ATTR_RPC_PROTO: &str = "rpcproto";
pub const ATTR_RPC_GROUP: &str = "rpcgroup";
pub const ATTR_RPC_VERSION: &str = "rpcversion";
pub const ATTR_RPC_TIMEOUT: &str = "rpctimeout";
pub const ATTR_RPC_RETRIES: &str = "rpcretries";

/// Well-known protocol names
pub const PROTO_DUBBO: &str = "DUBBO";
pub const PROTO_GRPC: &str = "GRPC";
pub const PROTO_HTTP: &str = "HTTP";
pub const PROTO_ECHO: &str = "ECHO";

/// TransporterService identifies one backend call target
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransporterService {
    #[serde(default)]
    pub alias_id: String,

    /// Explicit identity; when empty the identity is derived from interface and method
    #[serde(default)]
    pub service_id: String,

    #[serde(default)]
    pub scheme: String,

    #[serde(default)]
    pub remote_host: String,

    #[serde(default)]
    pub interface: String,

    #[serde(default)]
    pub method: String,

    #[serde(default)]
    pub arguments: Vec<Argument>,

    /// Protocol, group, version, timeout and retries live here as named attributes
    #[serde(default)]
    pub attributes: Attributes,
}

impl TransporterService {
    pub fn new(interface: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            method: method.into(),
            ..Default::default()
        }
    }

    pub fn with_attr(mut self, name: &str, value: impl Into<serde_json::Value>) -> Self {
        self.attributes.push(Attribute::new(name, value));
        self
    }

    /// Valid when both interface and method are set
    pub fn is_valid(&self) -> bool {
        !self.interface.is_empty() && !self.method.is_empty()
    }

    pub fn has_args(&self) -> bool {
        !self.arguments.is_empty()
    }

    /// Derived identity, `interface:method`, regardless of any explicit service id
    pub fn service_id(&self) -> String {
        format!("{}:{}", self.interface, self.method)
    }

    /// Identity the service registry keys by: the explicit service id when
    /// set, else the derived one
    pub fn registry_id(&self) -> String {
        if self.service_id.is_empty() {
            self.service_id()
        } else {
            self.service_id.clone()
        }
    }

    pub fn rpc_proto(&self) -> String {
        self.attributes.get_attr(ATTR_RPC_PROTO).as_string()
    }

    pub fn rpc_group(&self) -> String {
        self.attributes.get_attr(ATTR_RPC_GROUP).as_string()
    }

    pub fn rpc_version(&self) -> String {
        self.attributes.get_attr(ATTR_RPC_VERSION).as_string()
    }

    pub fn rpc_timeout(&self) -> String {
        self.attributes.get_attr(ATTR_RPC_TIMEOUT).as_string()
    }

    pub fn rpc_retries(&self) -> String {
        self.attributes.get_attr(ATTR_RPC_RETRIES).as_string()
    }
}
