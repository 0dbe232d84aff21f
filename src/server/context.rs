use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use crate::config::Config;
use crate::dns::DnsRelay;

/// Read-only state shared by every worker.
#[derive(Debug, Clone)]
pub struct ServerContext {
    /// Directory GET and PUT paths are resolved against
    pub document_root: PathBuf,
    /// Value of the `Iam` header on every response
    pub operator_id: String,
    pub dns: DnsRelay,
}

impl ServerContext {
    pub fn new(document_root: impl Into<PathBuf>, operator_id: impl Into<String>, dns: DnsRelay) -> Self {
        Self {
            document_root: document_root.into(),
            operator_id: operator_id.into(),
            dns,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(
            cfg.server.document_root.clone(),
            cfg.server.operator_id.clone(),
            DnsRelay::new(
                cfg.dns.default_server.clone(),
                Duration::from_millis(cfg.dns.timeout_ms),
            ),
        )
    }

    /// Maps a request path onto the document root. `/` is the root itself.
    ///
    /// Returns `None` for paths that would climb out of the root.
    pub fn resolve_path(&self, request_path: &str) -> Option<PathBuf> {
        let relative = Path::new(request_path.trim_start_matches('/'));
        let mut resolved = self.document_root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
            }
        }
        Some(resolved)
    }
}
