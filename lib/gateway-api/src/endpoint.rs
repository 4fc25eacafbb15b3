//! HTTP endpoints mapped onto backend services

use crate::attribute::Attributes;
use crate::service::TransporterService;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Reserved endpoint attribute names
pub const ATTR_AUTHORIZE: &str = "authorize";
pub const ATTR_LISTENER_ID: &str = "listenerid";
pub const ATTR_BIZ_ID: &str = "bizid";

/// Endpoint binds an HTTP method and pattern to one backend service
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    #[serde(default)]
    pub application: String,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub http_method: String,

    #[serde(default)]
    pub http_pattern: String,

    #[serde(default)]
    pub service: TransporterService,

    /// Legacy single permission service
    #[serde(default)]
    pub permission: TransporterService,

    /// Permission service ids
    #[serde(default)]
    pub permissions: Vec<String>,

    #[serde(default)]
    pub attributes: Attributes,
}

impl Endpoint {
    pub fn new(
        http_method: impl Into<String>,
        http_pattern: impl Into<String>,
        version: impl Into<String>,
        service: TransporterService,
    ) -> Self {
        Self {
            http_method: http_method.into(),
            http_pattern: http_pattern.into(),
            version: version.into(),
            service,
            ..Default::default()
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.http_method.is_empty() && !self.http_pattern.is_empty() && self.service.is_valid()
    }

    /// The legacy permission's service id (when valid) followed by `permissions`
    pub fn permission_ids(&self) -> Vec<String> {
        let mut ids = Vec::with_capacity(1 + self.permissions.len());
        if self.permission.is_valid() {
            ids.push(self.permission.service_id.clone());
        }
        ids.extend(self.permissions.iter().cloned());
        ids
    }

    /// Registry key this endpoint is routed under
    pub fn route_key(&self) -> String {
        route_key(&self.http_method, &self.http_pattern)
    }

    pub fn authorize(&self) -> bool {
        self.attributes.get_attr(ATTR_AUTHORIZE).as_bool()
    }

    pub fn listener_id(&self) -> String {
        self.attributes.get_attr(ATTR_LISTENER_ID).as_string()
    }

    pub fn biz_id(&self) -> String {
        self.attributes.get_attr(ATTR_BIZ_ID).as_string()
    }
}

/// Builds the registry key for an HTTP method and pattern
pub fn route_key(method: &str, pattern: &str) -> String {
    format!("{}#{}", method.to_ascii_uppercase(), pattern)
}
