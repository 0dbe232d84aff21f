//! Shared utilities for the integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use httpdnsd::dns::DnsRelay;
use httpdnsd::server::{Server, ServerContext, Shutdown};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};

pub const OPERATOR: &str = "tester";

/// Start a server on an ephemeral loopback port serving `root`.
pub async fn start_server(root: &Path, dns_server: &str, dns_timeout: Duration) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let ctx = ServerContext::new(root, OPERATOR, DnsRelay::new(dns_server, dns_timeout));
    let server = Server::with_listener(listener, ctx, None);
    let addr = server.local_addr().unwrap();
    let shutdown = Shutdown::new();
    tokio::spawn(server.run(shutdown.subscribe()));
    (addr, shutdown)
}

/// Send `request` in one write and read until the server closes.
pub async fn exchange(addr: SocketAddr, request: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    response
}

/// A response split into status code, header block and body.
pub struct RawResponse {
    pub status: u16,
    pub head: String,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn parse(raw: &[u8]) -> Self {
        let split = raw
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .expect("response has no header terminator");
        let head = String::from_utf8(raw[..split].to_vec()).unwrap();
        let status = head
            .split_whitespace()
            .nth(1)
            .and_then(|code| code.parse().ok())
            .expect("no status code");
        Self {
            status,
            head,
            body: raw[split + 4..].to_vec(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.lines().skip(1).find_map(|line| {
            let (k, v) = line.split_once(':')?;
            k.trim().eq_ignore_ascii_case(name).then(|| v.trim())
        })
    }
}

/// Build a DNS reply to `query` carrying `answers` as (type, rdata).
pub fn dns_reply(query: &[u8], id: u16, rcode: u8, answers: &[(u16, Vec<u8>)]) -> Vec<u8> {
    let mut reply = Vec::new();
    reply.extend_from_slice(&id.to_be_bytes());
    reply.extend_from_slice(&(0x8180u16 | rcode as u16).to_be_bytes());
    reply.extend_from_slice(&1u16.to_be_bytes());
    reply.extend_from_slice(&(answers.len() as u16).to_be_bytes());
    reply.extend_from_slice(&[0, 0, 0, 0]);
    reply.extend_from_slice(&query[12..]);
    for (rtype, rdata) in answers {
        reply.extend_from_slice(&[0xc0, 0x0c]);
        reply.extend_from_slice(&rtype.to_be_bytes());
        reply.extend_from_slice(&1u16.to_be_bytes());
        reply.extend_from_slice(&60u32.to_be_bytes());
        reply.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
        reply.extend_from_slice(rdata);
    }
    reply
}

/// Start a fake resolver answering every query with `answers`.
pub async fn start_resolver(answers: Vec<(u16, Vec<u8>)>) -> SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    tokio::spawn(async move {
        let mut buf = [0u8; 512];
        while let Ok((n, peer)) = socket.recv_from(&mut buf).await {
            let id = u16::from_be_bytes([buf[0], buf[1]]);
            let reply = dns_reply(&buf[..n], id, 0, &answers);
            let _ = socket.send_to(&reply, peer).await;
        }
    });
    addr
}

/// Start a resolver that receives queries and never answers.
pub async fn start_silent_resolver() -> SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    tokio::spawn(async move {
        let mut buf = [0u8; 512];
        while socket.recv_from(&mut buf).await.is_ok() {}
    });
    addr
}

/// Read one HTTP request (head plus Content-Length body) from `socket`.
pub async fn read_request(socket: &mut TcpStream) -> (String, Vec<u8>) {
    let mut data = Vec::new();
    let mut chunk = [0u8; 1024];
    let head_end = loop {
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        let n = socket.read(&mut chunk).await.unwrap();
        assert!(n > 0, "client closed before finishing its header");
        data.extend_from_slice(&chunk[..n]);
    };
    let head = String::from_utf8(data[..head_end].to_vec()).unwrap();
    let length = head
        .lines()
        .find_map(|l| {
            let (k, v) = l.split_once(':')?;
            k.trim().eq_ignore_ascii_case("content-length").then(|| v.trim().parse::<usize>().unwrap())
        })
        .unwrap_or(0);
    let mut body = data[head_end + 4..].to_vec();
    while body.len() < length {
        let n = socket.read(&mut chunk).await.unwrap();
        assert!(n > 0, "client closed before finishing its body");
        body.extend_from_slice(&chunk[..n]);
    }
    (head, body)
}

pub fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}
