use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::{Semaphore, broadcast};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::http::connection::Connection;
use crate::server::context::ServerContext;

/// Pause after a failed accept (e.g. out of descriptors).
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Owns the listening socket and hands each accepted connection to its own
/// task. Workers share nothing mutable; they only read `ctx`.
pub struct Server {
    listener: TcpListener,
    ctx: Arc<ServerContext>,
    limit: Option<Arc<Semaphore>>,
}

impl Server {
    pub async fn bind(cfg: &Config) -> anyhow::Result<Self> {
        let listener = crate::net::socket::tcp_listen(cfg.server.listen_host.as_deref(), &cfg.server.port)
            .await
            .with_context(|| format!("cannot listen on port {}", cfg.server.port))?;
        Ok(Self::with_listener(
            listener,
            ServerContext::from_config(cfg),
            cfg.server.max_connections,
        ))
    }

    pub fn with_listener(listener: TcpListener, ctx: ServerContext, max_connections: Option<usize>) -> Self {
        Self {
            listener,
            ctx: Arc::new(ctx),
            limit: max_connections.map(|n| Arc::new(Semaphore::new(n.max(1)))),
        }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts until `shutdown` fires (or its sender is dropped), then closes
    /// the listening socket. In-flight workers are not waited for.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) -> anyhow::Result<()> {
        info!(address = %self.local_addr()?, "Listening");

        loop {
            let permit = match &self.limit {
                Some(limit) => tokio::select! {
                    biased;
                    _ = shutdown.recv() => break,
                    permit = limit.clone().acquire_owned() => Some(permit.context("connection limiter closed")?),
                },
                None => None,
            };

            let (socket, peer) = tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!(error = %e, "Error accepting connection");
                        if back_off(&mut shutdown).await {
                            continue;
                        }
                        break;
                    }
                },
            };
            info!(peer = %peer, "Accepted connection");

            let ctx = Arc::clone(&self.ctx);
            tokio::spawn(async move {
                let _permit = permit;
                if let Err(e) = Connection::new(socket, peer, ctx).run().await {
                    error!(peer = %peer, error = %e, "Connection error");
                }
            });
        }

        info!("Shutting down listener");
        drop(self.listener);
        Ok(())
    }
}

/// Waits out a failed accept. Returns `false` if shutdown fired meanwhile.
async fn back_off(shutdown: &mut broadcast::Receiver<()>) -> bool {
    tokio::select! {
        _ = shutdown.recv() => false,
        _ = tokio::time::sleep(ACCEPT_RETRY_DELAY) => true,
    }
}
