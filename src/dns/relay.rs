use std::net::SocketAddr;
use std::time::Duration;

use tokio::time::{Instant, timeout_at};
use tracing::{debug, warn};

use super::codec::{decode_reply, encode_query};
use super::{DnsAnswer, DnsError, DnsQuery};
use crate::net::socket::udp_connect;

const DNS_SERVICE: &str = "53";
const MAX_UDP_MESSAGE: usize = 4096;

/// Sends one query per call to a resolver over UDP and waits a bounded time
/// for the matching reply. Holds only read-only settings, so one instance is
/// shared by every worker.
#[derive(Debug, Clone)]
pub struct DnsRelay {
    default_server: String,
    timeout: Duration,
}

impl DnsRelay {
    pub fn new(default_server: impl Into<String>, timeout: Duration) -> Self {
        Self {
            default_server: default_server.into(),
            timeout,
        }
    }

    /// Resolves `query` through `server` (or the default resolver).
    ///
    /// The socket lives only for the duration of this call.
    pub async fn resolve(&self, query: &DnsQuery, server: Option<&str>) -> Result<DnsAnswer, DnsError> {
        let server = server.unwrap_or(&self.default_server);
        let (host, service) = split_server(server);

        let id: u16 = rand::random();
        let message = encode_query(id, query.record_type, &query.name)?;

        let socket = udp_connect(&host, &service)
            .await
            .map_err(DnsError::Unreachable)?;
        socket.send(&message).await?;
        debug!(server = %server, name = %query.name, record_type = %query.record_type, id, "DNS query sent");

        let deadline = Instant::now() + self.timeout;
        let mut buf = vec![0u8; MAX_UDP_MESSAGE];
        loop {
            let n = match timeout_at(deadline, socket.recv(&mut buf)).await {
                Ok(received) => received?,
                Err(_) => return Err(DnsError::Timeout(self.timeout)),
            };
            let reply = decode_reply(&buf[..n], query.record_type)?;
            if reply.id != id {
                warn!(expected = id, got = reply.id, "Ignoring DNS reply with foreign id");
                continue;
            }
            if reply.rcode != 0 {
                debug!(rcode = reply.rcode, name = %query.name, "Resolver returned an error code");
            }
            return Ok(DnsAnswer {
                addresses: reply.addresses,
            });
        }
    }
}

/// Accepts `host`, `ipv4:port` and `[ipv6]:port`; the port defaults to 53.
fn split_server(server: &str) -> (String, String) {
    if let Ok(addr) = server.parse::<SocketAddr>() {
        return (addr.ip().to_string(), addr.port().to_string());
    }
    if server.parse::<std::net::IpAddr>().is_ok() {
        return (server.to_string(), DNS_SERVICE.to_string());
    }
    match server.rsplit_once(':') {
        Some((host, port)) if !host.contains(':') && port.parse::<u16>().is_ok() => {
            (host.to_string(), port.to_string())
        }
        _ => (server.to_string(), DNS_SERVICE.to_string()),
    }
}
