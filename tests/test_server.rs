//! End-to-end tests against a running server on a loopback port.

mod common;

use std::time::{Duration, Instant};

use common::{OPERATOR, RawResponse, exchange, secs, start_resolver, start_server, start_silent_resolver};
use httpdnsd::dns::DnsRelay;
use httpdnsd::server::{Server, ServerContext, Shutdown};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[tokio::test]
async fn test_get_missing_file_is_not_found() {
    let root = tempfile::tempdir().unwrap();
    let (addr, _shutdown) = start_server(root.path(), "127.0.0.1", secs(2)).await;

    let raw = exchange(addr, b"GET /missing.txt HTTP/1.1\r\nHost: x\r\n\r\n").await;
    let resp = RawResponse::parse(&raw);

    assert_eq!(resp.status, 404);
    assert_eq!(resp.body, b"404 Not Found");
    assert_eq!(resp.header("Iam"), Some(OPERATOR));
    assert_eq!(resp.header("Connection"), Some("close"));
    assert_eq!(resp.header("Content-Type"), Some("text/plain"));
    assert_eq!(resp.header("Content-Length"), Some("13"));
}

#[tokio::test]
async fn test_get_regular_file_is_byte_identical() {
    let root = tempfile::tempdir().unwrap();
    let contents: Vec<u8> = (0..20_000u32).map(|i| (i % 251) as u8).collect();
    std::fs::write(root.path().join("data.bin"), &contents).unwrap();
    let (addr, _shutdown) = start_server(root.path(), "127.0.0.1", secs(2)).await;

    let raw = exchange(addr, b"GET /data.bin HTTP/1.1\r\n\r\n").await;
    let resp = RawResponse::parse(&raw);

    assert_eq!(resp.status, 200);
    assert_eq!(resp.header("Content-Length"), Some("20000"));
    assert_eq!(resp.body, contents);
}

#[tokio::test]
async fn test_get_directory_lists_entries() {
    let root = tempfile::tempdir().unwrap();
    std::fs::write(root.path().join("b.txt"), b"b").unwrap();
    std::fs::write(root.path().join("a.txt"), b"a").unwrap();
    std::fs::create_dir(root.path().join("sub")).unwrap();
    let (addr, _shutdown) = start_server(root.path(), "127.0.0.1", secs(2)).await;

    let raw = exchange(addr, b"GET / HTTP/1.1\r\n\r\n").await;
    let resp = RawResponse::parse(&raw);

    assert_eq!(resp.status, 200);
    assert_eq!(resp.body, b"a.txt\nb.txt\nsub\n");
    assert_eq!(resp.header("Content-Length"), Some("16"));
}

#[tokio::test]
async fn test_get_outside_root_is_forbidden() {
    let root = tempfile::tempdir().unwrap();
    let (addr, _shutdown) = start_server(root.path(), "127.0.0.1", secs(2)).await;

    let raw = exchange(addr, b"GET /../etc/passwd HTTP/1.1\r\n\r\n").await;
    assert_eq!(RawResponse::parse(&raw).status, 403);
}

#[tokio::test]
async fn test_put_creates_file_with_exact_contents() {
    let root = tempfile::tempdir().unwrap();
    let (addr, _shutdown) = start_server(root.path(), "127.0.0.1", secs(2)).await;

    let raw = exchange(addr, b"PUT /out.txt HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello").await;
    let resp = RawResponse::parse(&raw);

    assert_eq!(resp.status, 201);
    assert_eq!(resp.body, b"201 Created");
    assert_eq!(std::fs::read(root.path().join("out.txt")).unwrap(), b"hello");
}

#[tokio::test]
async fn test_put_ignores_bytes_past_content_length() {
    let root = tempfile::tempdir().unwrap();
    let (addr, _shutdown) = start_server(root.path(), "127.0.0.1", secs(2)).await;

    let raw = exchange(addr, b"PUT /out.txt HTTP/1.1\r\nContent-Length: 3\r\n\r\nhello").await;

    assert_eq!(RawResponse::parse(&raw).status, 201);
    assert_eq!(std::fs::read(root.path().join("out.txt")).unwrap(), b"hel");
}

#[tokio::test]
async fn test_put_body_split_across_many_writes() {
    let root = tempfile::tempdir().unwrap();
    let (addr, _shutdown) = start_server(root.path(), "127.0.0.1", secs(2)).await;
    let payload: Vec<u8> = (0..50_000u32).map(|i| (i % 7) as u8 + b'a').collect();

    let mut stream = TcpStream::connect(addr).await.unwrap();
    let head = format!("PUT /big.txt HTTP/1.1\r\nContent-Length: {}\r\n\r\n", payload.len());
    let mut first = head.into_bytes();
    first.extend_from_slice(&payload[..100]);
    stream.write_all(&first).await.unwrap();
    for chunk in payload[100..].chunks(3000) {
        tokio::time::sleep(Duration::from_millis(2)).await;
        stream.write_all(chunk).await.unwrap();
    }
    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();

    assert_eq!(RawResponse::parse(&raw).status, 201);
    assert_eq!(std::fs::read(root.path().join("big.txt")).unwrap(), payload);
}

#[tokio::test]
async fn test_put_with_expect_continue() {
    let root = tempfile::tempdir().unwrap();
    let (addr, _shutdown) = start_server(root.path(), "127.0.0.1", secs(2)).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"PUT /c.txt HTTP/1.1\r\nContent-Length: 4\r\nExpect: 100-continue\r\n\r\n")
        .await
        .unwrap();

    let mut interim = Vec::new();
    let mut byte = [0u8; 1];
    while !interim.ends_with(b"\r\n\r\n") {
        stream.read_exact(&mut byte).await.unwrap();
        interim.push(byte[0]);
    }
    let interim = String::from_utf8(interim).unwrap();
    assert!(interim.starts_with("HTTP/1.1 100 Continue\r\n"));
    assert!(interim.contains("Iam: tester\r\n"));

    stream.write_all(b"data").await.unwrap();
    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();

    assert_eq!(RawResponse::parse(&raw).status, 201);
    assert_eq!(std::fs::read(root.path().join("c.txt")).unwrap(), b"data");
}

#[tokio::test]
async fn test_put_without_content_length_is_bad_request() {
    let root = tempfile::tempdir().unwrap();
    let (addr, _shutdown) = start_server(root.path(), "127.0.0.1", secs(2)).await;

    let raw = exchange(addr, b"PUT /x.txt HTTP/1.1\r\nHost: x\r\n\r\nhello").await;
    assert_eq!(RawResponse::parse(&raw).status, 400);

    let raw = exchange(addr, b"PUT /x.txt HTTP/1.1\r\nContent-Length: -4\r\n\r\n").await;
    assert_eq!(RawResponse::parse(&raw).status, 400);
}

#[tokio::test]
async fn test_put_cut_short_by_peer_is_bad_request() {
    let root = tempfile::tempdir().unwrap();
    let (addr, _shutdown) = start_server(root.path(), "127.0.0.1", secs(2)).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"PUT /short.txt HTTP/1.1\r\nContent-Length: 10\r\n\r\nabc")
        .await
        .unwrap();
    stream.shutdown().await.unwrap();
    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();

    assert_eq!(RawResponse::parse(&raw).status, 400);
}

#[tokio::test]
async fn test_put_onto_directory_is_forbidden() {
    let root = tempfile::tempdir().unwrap();
    std::fs::create_dir(root.path().join("dir")).unwrap();
    let (addr, _shutdown) = start_server(root.path(), "127.0.0.1", secs(2)).await;

    let raw = exchange(addr, b"PUT /dir HTTP/1.1\r\nContent-Length: 1\r\n\r\nx").await;
    assert_eq!(RawResponse::parse(&raw).status, 403);
}

#[tokio::test]
async fn test_put_into_missing_directory_is_server_error() {
    let root = tempfile::tempdir().unwrap();
    let (addr, _shutdown) = start_server(root.path(), "127.0.0.1", secs(2)).await;

    let raw = exchange(addr, b"PUT /no_such_dir/x.txt HTTP/1.1\r\nContent-Length: 2\r\n\r\nhi").await;
    let resp = RawResponse::parse(&raw);

    assert_eq!(resp.status, 503);
    assert_eq!(resp.body, b"503 Internal Server Error");
    assert!(!root.path().join("no_such_dir").exists());
}

#[cfg(unix)]
#[tokio::test]
async fn test_get_special_file_is_forbidden() {
    let root = tempfile::tempdir().unwrap();
    let fifo = root.path().join("pipe");
    let status = std::process::Command::new("mkfifo").arg(&fifo).status().unwrap();
    assert!(status.success());
    let (addr, _shutdown) = start_server(root.path(), "127.0.0.1", secs(2)).await;

    let raw = exchange(addr, b"GET /pipe HTTP/1.1\r\n\r\n").await;
    assert_eq!(RawResponse::parse(&raw).status, 403);
}

#[tokio::test]
async fn test_unknown_method_is_not_allowed() {
    let root = tempfile::tempdir().unwrap();
    let (addr, _shutdown) = start_server(root.path(), "127.0.0.1", secs(2)).await;

    let raw = exchange(addr, b"FOO /x HTTP/1.1\r\n\r\n").await;
    let resp = RawResponse::parse(&raw);
    assert_eq!(resp.status, 405);
    assert_eq!(resp.body, b"405 Method Not Allowed");

    let raw = exchange(addr, b"POST /elsewhere HTTP/1.1\r\nContent-Length: 0\r\n\r\n").await;
    assert_eq!(RawResponse::parse(&raw).status, 405);
}

#[tokio::test]
async fn test_request_without_blank_line_is_bad_request() {
    let root = tempfile::tempdir().unwrap();
    let (addr, _shutdown) = start_server(root.path(), "127.0.0.1", secs(2)).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(b"GET / HTTP/1.1\r\nHost: x").await.unwrap();
    stream.shutdown().await.unwrap();
    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();

    assert_eq!(RawResponse::parse(&raw).status, 400);
}

#[tokio::test]
async fn test_dns_query_relays_a_record() {
    let root = tempfile::tempdir().unwrap();
    let resolver = start_resolver(vec![(1, vec![93, 184, 216, 34])]).await;
    let (addr, _shutdown) = start_server(root.path(), &resolver.to_string(), secs(2)).await;

    let body = b"name=example.com&type=A";
    let request = format!(
        "POST /dns-query HTTP/1.1\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        std::str::from_utf8(body).unwrap()
    );
    let raw = exchange(addr, request.as_bytes()).await;
    let resp = RawResponse::parse(&raw);

    assert_eq!(resp.status, 200);
    assert_eq!(resp.body, b"93.184.216.34\n");
    assert_eq!(resp.header("Content-Length"), Some("14"));
}

#[tokio::test]
async fn test_dns_query_with_server_override() {
    let root = tempfile::tempdir().unwrap();
    let resolver = start_resolver(vec![(28, std::net::Ipv6Addr::LOCALHOST.octets().to_vec())]).await;
    let silent = start_silent_resolver().await;
    let (addr, _shutdown) = start_server(root.path(), &silent.to_string(), secs(2)).await;

    let body = format!("name=localhost&type=AAAA&server={resolver}");
    let request = format!(
        "POST /dns-query HTTP/1.1\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    );
    let raw = exchange(addr, request.as_bytes()).await;
    let resp = RawResponse::parse(&raw);

    assert_eq!(resp.status, 200);
    assert_eq!(resp.body, b"::1\n");
}

#[tokio::test]
async fn test_dns_query_body_arriving_after_header() {
    let root = tempfile::tempdir().unwrap();
    let resolver = start_resolver(vec![(1, vec![10, 0, 0, 1]), (1, vec![10, 0, 0, 2])]).await;
    let (addr, _shutdown) = start_server(root.path(), &resolver.to_string(), secs(2)).await;

    let body = b"name=example.net";
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(format!("POST /dns-query HTTP/1.1\r\nContent-Length: {}\r\n\r\n", body.len()).as_bytes())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    stream.write_all(body).await.unwrap();
    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    let resp = RawResponse::parse(&raw);

    assert_eq!(resp.status, 200);
    assert_eq!(resp.body, b"10.0.0.1\n10.0.0.2\n");
}

#[tokio::test]
async fn test_dns_query_without_name_is_bad_request() {
    let root = tempfile::tempdir().unwrap();
    let (addr, _shutdown) = start_server(root.path(), "127.0.0.1", secs(2)).await;

    let raw = exchange(addr, b"POST /dns-query HTTP/1.1\r\nContent-Length: 6\r\n\r\ntype=A").await;
    assert_eq!(RawResponse::parse(&raw).status, 400);
}

#[tokio::test]
async fn test_dns_query_with_unencodable_name_is_bad_request() {
    let root = tempfile::tempdir().unwrap();
    let silent = start_silent_resolver().await;
    let (addr, _shutdown) = start_server(root.path(), &silent.to_string(), secs(2)).await;

    let long = format!("name={}", "x".repeat(64));
    for body in [long.as_str(), "name=a..b"] {
        let request = format!("POST /dns-query HTTP/1.1\r\nContent-Length: {}\r\n\r\n{body}", body.len());
        let started = Instant::now();
        let raw = exchange(addr, request.as_bytes()).await;

        assert_eq!(RawResponse::parse(&raw).status, 400, "body {body:?}");
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}

#[tokio::test]
async fn test_dns_query_timeout_is_not_found() {
    let root = tempfile::tempdir().unwrap();
    let silent = start_silent_resolver().await;
    let timeout = Duration::from_millis(300);
    let (addr, _shutdown) = start_server(root.path(), &silent.to_string(), timeout).await;

    let started = Instant::now();
    let raw = exchange(addr, b"POST /dns-query HTTP/1.1\r\nContent-Length: 16\r\n\r\nname=example.com").await;
    let elapsed = started.elapsed();

    assert_eq!(RawResponse::parse(&raw).status, 404);
    assert!(elapsed >= timeout, "answered before the wait ran out: {elapsed:?}");
    assert!(elapsed < timeout + Duration::from_secs(1), "relay hung: {elapsed:?}");
}

#[tokio::test]
async fn test_concurrent_requests_are_served_independently() {
    let root = tempfile::tempdir().unwrap();
    std::fs::write(root.path().join("f.txt"), b"shared").unwrap();
    let silent = start_silent_resolver().await;
    let (addr, _shutdown) = start_server(root.path(), &silent.to_string(), Duration::from_millis(500)).await;

    // A slow DNS relay must not hold up other workers.
    let slow = tokio::spawn(exchange(
        addr,
        b"POST /dns-query HTTP/1.1\r\nContent-Length: 6\r\n\r\nname=x",
    ));
    tokio::time::sleep(Duration::from_millis(20)).await;
    let started = Instant::now();
    let raw = exchange(addr, b"GET /f.txt HTTP/1.1\r\n\r\n").await;
    assert!(started.elapsed() < Duration::from_millis(400));
    assert_eq!(RawResponse::parse(&raw).body, b"shared");

    assert_eq!(RawResponse::parse(&slow.await.unwrap()).status, 404);
}

#[tokio::test]
async fn test_shutdown_fired_before_run_stops_at_once() {
    let root = tempfile::tempdir().unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let ctx = ServerContext::new(root.path(), OPERATOR, DnsRelay::new("127.0.0.1", secs(2)));
    let server = Server::with_listener(listener, ctx, Some(4));
    let addr = server.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let stop = shutdown.subscribe();
    shutdown.trigger();

    tokio::time::timeout(Duration::from_secs(1), server.run(stop))
        .await
        .unwrap()
        .unwrap();
    assert!(TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn test_shutdown_closes_listener() {
    let root = tempfile::tempdir().unwrap();
    let (addr, shutdown) = start_server(root.path(), "127.0.0.1", secs(2)).await;

    shutdown.trigger();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(TcpStream::connect(addr).await.is_err());
}
