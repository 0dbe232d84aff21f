//! Resolve-and-try-each socket helpers.
//!
//! Hostnames and service names are resolved to a list of candidate
//! addresses; each candidate is tried in order and the first usable one
//! wins. Exhausting the list is reported with the last underlying error.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use anyhow::{Context, Result, anyhow, bail};
use tokio::net::{TcpListener, TcpSocket, TcpStream, UdpSocket, lookup_host};
use tracing::debug;

const LISTEN_BACKLOG: u32 = 128;

/// Maps a numeric port or a well-known service name to a port number.
pub fn resolve_service(service: &str) -> Result<u16> {
    if let Ok(port) = service.parse::<u16>() {
        return Ok(port);
    }
    let port = match service.to_ascii_lowercase().as_str() {
        "http" | "www" => 80,
        "https" => 443,
        "domain" => 53,
        "http-alt" | "webcache" => 8080,
        _ => bail!("unknown service: {service}"),
    };
    Ok(port)
}

/// Resolves `host` + `service` into candidate socket addresses.
pub async fn resolve(host: &str, service: &str) -> Result<Vec<SocketAddr>> {
    let port = resolve_service(service)?;
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(vec![SocketAddr::new(ip, port)]);
    }
    let addrs: Vec<SocketAddr> = lookup_host((host, port))
        .await
        .with_context(|| format!("failed to resolve {host}:{service}"))?
        .collect();
    if addrs.is_empty() {
        bail!("{host}:{service} resolved to no addresses");
    }
    Ok(addrs)
}

/// Opens a listening TCP socket. Without a host, the IPv6 wildcard is tried
/// first (dual-stack, accepting IPv4-mapped peers), then the IPv4 wildcard.
pub async fn tcp_listen(host: Option<&str>, service: &str) -> Result<TcpListener> {
    let candidates = match host {
        Some(h) => resolve(h, service).await?,
        None => {
            let port = resolve_service(service)?;
            vec![
                SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), port),
                SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port),
            ]
        }
    };

    let mut last_err = None;
    for addr in candidates {
        match bind_listener(addr) {
            Ok(listener) => return Ok(listener),
            Err(e) => {
                debug!(address = %addr, error = %e, "Listen candidate failed");
                last_err = Some(e);
            }
        }
    }
    Err(exhausted("listen on", service, last_err))
}

fn bind_listener(addr: SocketAddr) -> std::io::Result<TcpListener> {
    let socket = match addr {
        SocketAddr::V4(_) => TcpSocket::new_v4()?,
        SocketAddr::V6(_) => TcpSocket::new_v6()?,
    };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    socket.listen(LISTEN_BACKLOG)
}

/// Connects a TCP stream to the first reachable candidate address.
pub async fn tcp_connect(host: &str, service: &str) -> Result<TcpStream> {
    let mut last_err = None;
    for addr in resolve(host, service).await? {
        match TcpStream::connect(addr).await {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                debug!(address = %addr, error = %e, "Connect candidate failed");
                last_err = Some(e);
            }
        }
    }
    Err(exhausted("connect to", &format!("{host}:{service}"), last_err))
}

/// Creates a UDP socket connected to the first usable candidate address.
pub async fn udp_connect(host: &str, service: &str) -> Result<UdpSocket> {
    let mut last_err = None;
    for addr in resolve(host, service).await? {
        let local = match addr {
            SocketAddr::V4(_) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
            SocketAddr::V6(_) => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
        };
        let attempt = async {
            let socket = UdpSocket::bind(local).await?;
            socket.connect(addr).await?;
            Ok::<_, std::io::Error>(socket)
        };
        match attempt.await {
            Ok(socket) => return Ok(socket),
            Err(e) => {
                debug!(address = %addr, error = %e, "UDP candidate failed");
                last_err = Some(e);
            }
        }
    }
    Err(exhausted("connect to", &format!("{host}:{service}"), last_err))
}

fn exhausted(action: &str, target: &str, last: Option<std::io::Error>) -> anyhow::Error {
    match last {
        Some(e) => anyhow!(e).context(format!("could not {action} {target}: no usable address")),
        None => anyhow!("could not {action} {target}: no candidate addresses"),
    }
}
