//! Gateway process configuration

use anyhow::{Context, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use tracing_subscriber::EnvFilter;

pub const ENV_CONFIG: &str = "GATEWAY_CONFIG";
pub const ENV_LISTEN: &str = "GATEWAY_LISTEN";
pub const ENV_ADMIN_LISTEN: &str = "GATEWAY_ADMIN_LISTEN";
pub const DEFAULT_CONFIG_PATH: &str = "gateway.yaml";

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub listen: SocketAddr,
    pub admin_listen: SocketAddr,
    /// Request header carrying the requested endpoint version
    pub version_header: String,
    pub channel_capacity: usize,
    pub log: LogConfig,
    pub discovery: DiscoveryConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen: ([0, 0, 0, 0], 8080).into(),
            admin_listen: ([127, 0, 0, 1], 9527).into(),
            version_header: "X-Version".to_string(),
            channel_capacity: 1024,
            log: LogConfig::default(),
            discovery: DiscoveryConfig::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub format: LogFormat,
}

/// Raw per-source sections, decoded by each source
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub resource: serde_yaml::Value,
    /// Kubernetes discovery is enabled only when this section is present
    pub kubernetes: Option<serde_yaml::Value>,
}

impl GatewayConfig {
    /// Load from `$GATEWAY_CONFIG` (or `gateway.yaml`), then apply env overrides.
    /// A missing file yields the defaults.
    pub fn load() -> Result<Self> {
        let path = std::env::var(ENV_CONFIG).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::from_file(Path::new(&path))?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_yaml(&text)
                .with_context(|| format!("Failed to parse config file {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("Failed to read config file {}", path.display())),
        }
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    fn apply_env<F>(&mut self, var: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(listen) = var(ENV_LISTEN) {
            self.listen = listen
                .parse()
                .with_context(|| format!("Invalid {}: {}", ENV_LISTEN, listen))?;
        }
        if let Some(listen) = var(ENV_ADMIN_LISTEN) {
            self.admin_listen = listen
                .parse()
                .with_context(|| format!("Invalid {}: {}", ENV_ADMIN_LISTEN, listen))?;
        }
        Ok(())
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the default level.
pub fn init_logging(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match log.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::from_yaml("").unwrap();
        assert_eq!(config.listen.to_string(), "0.0.0.0:8080");
        assert_eq!(config.admin_listen.to_string(), "127.0.0.1:9527");
        assert_eq!(config.version_header, "X-Version");
        assert_eq!(config.channel_capacity, 1024);
        assert_eq!(config.log.format, LogFormat::Text);
        assert!(config.discovery.resource.is_null());
        assert!(config.discovery.kubernetes.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let config = GatewayConfig::from_yaml(
            r#"
listen: 0.0.0.0:9000
version_header: X-Api-Version
log:
  format: json
discovery:
  resource:
    includes: [/etc/gateway/endpoints.yaml]
  kubernetes:
    namespace: gateway
"#,
        )
        .unwrap();
        assert_eq!(config.listen.port(), 9000);
        assert_eq!(config.version_header, "X-Api-Version");
        assert_eq!(config.log.format, LogFormat::Json);
        assert!(config.discovery.resource.get("includes").is_some());
        let k8s = config.discovery.kubernetes.unwrap();
        assert_eq!(k8s.get("namespace").and_then(|v| v.as_str()), Some("gateway"));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = GatewayConfig::default();
        config
            .apply_env(|key| match key {
                ENV_LISTEN => Some("127.0.0.1:18080".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.listen.port(), 18080);
        assert_eq!(config.admin_listen.port(), 9527);

        assert!(config
            .apply_env(|key| (key == ENV_ADMIN_LISTEN).then(|| "nope".to_string()))
            .is_err());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = GatewayConfig::from_file(Path::new("/nonexistent/gateway.yaml")).unwrap();
        assert_eq!(config.channel_capacity, 1024);
    }
}
