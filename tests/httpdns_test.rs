//! End-to-end resolver tests against a local HTTP DNS server.
//!
//! Covers:
//! - Primary answers and the on-disk cache
//! - Fallback on error pages, refused connections and stalled servers
//! - The request line sent to the service

use httpdns::dns::{Addrs, Name, PrimaryFailure, Resolve, Resolving};
use httpdns::{HttpDnsConfig, HttpDnsResolver, NetError, Resolution};

use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

struct MockServer {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<String>>>,
}

/// Serves `response` verbatim to every connection.
async fn spawn_server(response: String) -> MockServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let requests = Arc::new(Mutex::new(Vec::new()));

    let hits_clone = hits.clone();
    let requests_clone = requests.clone();
    tokio::spawn(async move {
        loop {
            if let Ok((mut socket, _)) = listener.accept().await {
                hits_clone.fetch_add(1, Ordering::SeqCst);
                let requests = requests_clone.clone();
                let response = response.clone();
                tokio::spawn(async move {
                    let mut buf = [0u8; 4096];
                    let n = socket.read(&mut buf).await.unwrap_or(0);
                    requests
                        .lock()
                        .unwrap()
                        .push(String::from_utf8_lossy(&buf[..n]).into_owned());
                    let _ = socket.write_all(response.as_bytes()).await;
                });
            }
        }
    });

    MockServer {
        addr,
        hits,
        requests,
    }
}

fn http_response(status: &str, extra_headers: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status}\r\nContent-Length: {}\r\n{extra_headers}Connection: close\r\n\r\n{body}",
        body.len()
    )
}

struct CountingFallback {
    answer: Option<Vec<IpAddr>>,
    calls: AtomicUsize,
}

impl CountingFallback {
    fn new(answer: Option<Vec<IpAddr>>) -> Arc<Self> {
        Arc::new(Self {
            answer,
            calls: AtomicUsize::new(0),
        })
    }
}

impl Resolve for CountingFallback {
    fn resolve(&self, _name: Name) -> Resolving {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let answer = self.answer.clone();
        Box::pin(async move {
            match answer {
                Some(ips) => {
                    Ok(Box::new(ips.into_iter().map(|ip| SocketAddr::new(ip, 0))) as Addrs)
                }
                None => Err(NetError::NameNotResolved),
            }
        })
    }
}

fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

fn config_for(addr: SocketAddr, cache_dir: Option<&std::path::Path>) -> HttpDnsConfig {
    let mut config = HttpDnsConfig::new()
        .server(addr.to_string())
        .connect_timeout(Duration::from_secs(2))
        .read_timeout(Duration::from_secs(2));
    if let Some(dir) = cache_dir {
        config = config.cache_dir(dir);
    }
    config
}

#[tokio::test]
async fn test_primary_answer_from_service() {
    let server = spawn_server(http_response("200 OK", "", "93.184.216.34")).await;
    let fallback = CountingFallback::new(Some(vec![ip("10.0.0.1")]));

    let resolver = HttpDnsResolver::builder()
        .config(config_for(server.addr, None))
        .fallback(fallback.clone())
        .build()
        .unwrap();

    let addrs = resolver.resolve("example.com").await.unwrap();
    assert_eq!(addrs, vec![ip("93.184.216.34")]);
    assert_eq!(
        resolver.get_address_string("example.com").await.unwrap(),
        "93.184.216.34"
    );
    assert_eq!(fallback.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_request_line_and_host_header() {
    let server = spawn_server(http_response("200 OK", "", "1.2.3.4")).await;
    let resolver = HttpDnsResolver::from_config(config_for(server.addr, None)).unwrap();

    resolver.resolve("example.com").await.unwrap();

    let requests = server.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    let request = requests[0].to_ascii_lowercase();
    assert!(
        request.starts_with("get /d?dn=example.com http/1.1\r\n"),
        "unexpected request: {request}"
    );
    assert!(request.contains(&format!("host: {}\r\n", server.addr)));
}

#[tokio::test]
async fn test_repeat_lookup_served_from_disk_cache() {
    let cache_dir = tempfile::tempdir().unwrap();
    let server = spawn_server(http_response("200 OK", "", "93.184.216.34")).await;
    let resolver =
        HttpDnsResolver::from_config(config_for(server.addr, Some(cache_dir.path()))).unwrap();

    let first = resolver.resolve("example.com").await.unwrap();
    let second = resolver.resolve("example.com").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(server.hits.load(Ordering::SeqCst), 1);

    let files = std::fs::read_dir(cache_dir.path().join("httpdns"))
        .unwrap()
        .count();
    assert_eq!(files, 1);
}

#[tokio::test]
async fn test_upstream_no_store_is_overridden() {
    let cache_dir = tempfile::tempdir().unwrap();
    let server = spawn_server(http_response(
        "200 OK",
        "Cache-Control: no-store\r\n",
        "93.184.216.34",
    ))
    .await;
    let resolver =
        HttpDnsResolver::from_config(config_for(server.addr, Some(cache_dir.path()))).unwrap();

    resolver.resolve("example.com").await.unwrap();
    resolver.resolve("example.com").await.unwrap();

    assert_eq!(server.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cache_survives_new_resolver() {
    let cache_dir = tempfile::tempdir().unwrap();
    let server = spawn_server(http_response("200 OK", "", "93.184.216.34")).await;

    let config = config_for(server.addr, Some(cache_dir.path()));
    HttpDnsResolver::from_config(config.clone())
        .unwrap()
        .resolve("example.com")
        .await
        .unwrap();

    let resolution = HttpDnsResolver::from_config(config)
        .unwrap()
        .resolve_detailed("example.com")
        .await;

    assert!(matches!(resolution, Resolution::Primary(_)));
    assert_eq!(server.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_different_hosts_are_separate_lookups() {
    let server = spawn_server(http_response("200 OK", "", "1.2.3.4")).await;
    let cache_dir = tempfile::tempdir().unwrap();
    let resolver =
        HttpDnsResolver::from_config(config_for(server.addr, Some(cache_dir.path()))).unwrap();

    resolver.resolve("a.example.com").await.unwrap();
    resolver.resolve("b.example.com").await.unwrap();

    assert_eq!(server.hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_error_page_falls_back() {
    let server = spawn_server(http_response("502 Bad Gateway", "", "<html>error</html>")).await;
    let cache_dir = tempfile::tempdir().unwrap();
    let fallback = CountingFallback::new(Some(vec![ip("93.184.216.34")]));

    let resolver = HttpDnsResolver::builder()
        .config(config_for(server.addr, Some(cache_dir.path())))
        .fallback(fallback.clone())
        .build()
        .unwrap();

    let resolution = resolver.resolve_detailed("example.com").await;
    match resolution {
        Resolution::Fallback { addrs, cause } => {
            assert_eq!(addrs, vec![ip("93.184.216.34")]);
            assert!(matches!(cause, PrimaryFailure::MalformedAnswer(body) if body.contains("error")));
        }
        other => panic!("expected fallback, got {other:?}"),
    }
    assert_eq!(fallback.calls.load(Ordering::SeqCst), 1);

    // Error pages are never cached, so the service is asked again.
    resolver.resolve("example.com").await.unwrap();
    assert_eq!(server.hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_refused_connection_falls_back() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let fallback = CountingFallback::new(Some(vec![ip("10.1.2.3")]));
    let resolver = HttpDnsResolver::builder()
        .config(config_for(addr, None))
        .fallback(fallback.clone())
        .build()
        .unwrap();

    let resolution = resolver.resolve_detailed("example.com").await;
    assert!(matches!(
        resolution,
        Resolution::Fallback {
            cause: PrimaryFailure::Transport(_),
            ..
        }
    ));
    assert_eq!(fallback.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_stalled_server_times_out_and_falls_back() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let fallback = CountingFallback::new(Some(vec![ip("10.1.2.3")]));
    let resolver = HttpDnsResolver::builder()
        .config(config_for(addr, None).read_timeout(Duration::from_millis(200)))
        .fallback(fallback.clone())
        .build()
        .unwrap();

    let resolution = resolver.resolve_detailed("example.com").await;
    assert!(matches!(
        resolution,
        Resolution::Fallback {
            cause: PrimaryFailure::Transport(NetError::TimedOut),
            ..
        }
    ));
}

#[tokio::test]
async fn test_oversized_body_falls_back() {
    let body = "1".repeat(8192);
    let server = spawn_server(http_response("200 OK", "", &body)).await;
    let fallback = CountingFallback::new(Some(vec![ip("10.1.2.3")]));

    let resolver = HttpDnsResolver::builder()
        .config(config_for(server.addr, None))
        .fallback(fallback.clone())
        .build()
        .unwrap();

    let resolution = resolver.resolve_detailed("example.com").await;
    assert!(matches!(
        resolution,
        Resolution::Fallback {
            cause: PrimaryFailure::Transport(NetError::ResponseBodyTooBig),
            ..
        }
    ));
}

#[tokio::test]
async fn test_total_failure_names_host() {
    let server = spawn_server(http_response("200 OK", "", "not-an-ip")).await;
    let resolver = HttpDnsResolver::builder()
        .config(config_for(server.addr, None))
        .fallback(CountingFallback::new(None))
        .build()
        .unwrap();

    let err = resolver.get_address_string("nowhere.invalid").await.unwrap_err();
    assert!(matches!(err, NetError::HostResolutionFailed { ref host } if host == "nowhere.invalid"));
}

#[tokio::test]
async fn test_concurrent_lookups_share_transport() {
    let server = spawn_server(http_response("200 OK", "", "1.2.3.4")).await;
    let resolver = HttpDnsResolver::from_config(config_for(server.addr, None)).unwrap();

    let lookups = (0..16).map(|i| {
        let resolver = resolver.clone();
        tokio::spawn(async move { resolver.resolve(format!("host{i}.example.com")).await })
    });
    let results = futures::future::join_all(lookups).await;

    for result in results {
        assert_eq!(result.unwrap().unwrap(), vec![ip("1.2.3.4")]);
    }
    // No deduplication and no cache configured: one request per lookup.
    assert_eq!(server.hits.load(Ordering::SeqCst), 16);
}
