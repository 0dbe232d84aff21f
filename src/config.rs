//! Daemon configuration.
//!
//! Every field has a default, so a config file only needs to list what it
//! changes:
//!
//! ```yaml
//! server:
//!   document_root: /srv/www
//!   operator_id: alice
//! dns:
//!   default_server: 1.1.1.1
//! registration:
//!   url: http://directory.example:3000/servers-alice.txt
//!   advertise_host: files.example
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub dns: DnsConfig,
    pub registration: RegistrationConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address; any interface when unset
    pub listen_host: Option<String>,
    /// Port number or service name
    pub port: String,
    pub document_root: PathBuf,
    /// Sent in the `Iam` header
    pub operator_id: String,
    /// Concurrent connection cap; unbounded when unset
    pub max_connections: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_host: None,
            port: "8080".to_string(),
            document_root: PathBuf::from("."),
            operator_id: "httpdnsd".to_string(),
            max_connections: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DnsConfig {
    /// Resolver used when a query names none
    pub default_server: String,
    pub timeout_ms: u64,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            default_server: "8.8.8.8".to_string(),
            timeout_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    /// Directory-server URL; registration is skipped when unset
    pub url: Option<String>,
    /// Host part of the `host:port` line this server registers
    pub advertise_host: String,
    pub attempts: u32,
    pub retry_delay_secs: u64,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            url: None,
            advertise_host: "localhost".to_string(),
            attempts: 3,
            retry_delay_secs: 5,
        }
    }
}

impl Config {
    /// Defaults, then the optional YAML file, then environment overrides.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut cfg = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                Self::from_yaml(&text).with_context(|| format!("invalid config {}", path.display()))?
            }
            None => Self::default(),
        };
        cfg.apply_env();
        Ok(cfg)
    }

    pub fn from_yaml(text: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    fn apply_env(&mut self) {
        if let Ok(host) = std::env::var("LISTEN_HOST") {
            self.server.listen_host = Some(host).filter(|h| !h.is_empty());
        }
    }
}
