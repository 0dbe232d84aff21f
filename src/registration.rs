//! Self-registration with the directory server.
//!
//! At startup the server PUTs its own `host:port` line to the directory URL;
//! at shutdown it PUTs an empty body. Both are best effort: a bounded number
//! of attempts with a fixed delay, then a log line, never an abort.

use std::time::Duration;

use tracing::{info, warn};

use crate::config::Config;
use crate::http::client::put_buf;

#[derive(Debug, Clone)]
pub struct Registrar {
    url: String,
    advertised: String,
    operator_id: String,
    attempts: u32,
    retry_delay: Duration,
}

impl Registrar {
    pub fn new(
        url: impl Into<String>,
        advertise_host: &str,
        port: &str,
        operator_id: impl Into<String>,
        attempts: u32,
        retry_delay: Duration,
    ) -> Self {
        Self {
            url: url.into(),
            advertised: format!("{advertise_host}:{port}"),
            operator_id: operator_id.into(),
            attempts: attempts.max(1),
            retry_delay,
        }
    }

    /// `None` when no directory URL is configured.
    pub fn from_config(cfg: &Config) -> Option<Self> {
        let url = cfg.registration.url.as_ref()?;
        Some(Self::new(
            url.clone(),
            &cfg.registration.advertise_host,
            &cfg.server.port,
            cfg.server.operator_id.clone(),
            cfg.registration.attempts,
            Duration::from_secs(cfg.registration.retry_delay_secs),
        ))
    }

    /// The body sent on registration.
    pub fn registration_line(&self) -> String {
        format!("{}\n", self.advertised)
    }

    pub async fn register(&self) -> bool {
        info!(url = %self.url, advertised = %self.advertised, "Registering with directory server");
        self.put_with_retry(self.registration_line().as_bytes(), "register").await
    }

    pub async fn deregister(&self) -> bool {
        info!(url = %self.url, "Deregistering from directory server");
        self.put_with_retry(b"", "deregister").await
    }

    async fn put_with_retry(&self, body: &[u8], action: &str) -> bool {
        for attempt in 1..=self.attempts {
            match put_buf(&self.url, body, &self.operator_id).await {
                Ok(status) if (200..300).contains(&status) => {
                    info!(action, status, attempt, "Directory server accepted");
                    return true;
                }
                Ok(status) => warn!(action, status, attempt, "Directory server refused"),
                Err(e) => warn!(action, error = %e, attempt, "Directory server unreachable"),
            }
            if attempt < self.attempts {
                tokio::time::sleep(self.retry_delay).await;
            }
        }
        warn!(action, attempts = self.attempts, "Giving up on directory server");
        false
    }
}
