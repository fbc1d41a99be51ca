//! End-to-end HTTP tests against a running server

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use vastd_core::server::{self, AppState, ServerConfig};
use vastd_core::{MemoryStore, MySqlStore, MySqlStoreConfig, TrackingStore, PIXEL_GIF};

struct TestServer {
    addr: SocketAddr,
    stop: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl TestServer {
    fn start(store: Arc<dyn TrackingStore>) -> Self {
        let listener = server::bind(&"127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(AppState::new(store));
        let config = ServerConfig {
            addr,
            shutdown_timeout: Duration::from_secs(2),
        };
        let (stop, stopped) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            server::serve(listener, state, &config, async {
                let _ = stopped.await;
            })
            .await
            .unwrap();
        });

        Self {
            addr,
            stop: Some(stop),
            handle,
        }
    }

    async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("server stopped in time")
            .unwrap();
    }
}

struct RawResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl RawResponse {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// One request over a fresh connection, read until the server closes it
async fn send(addr: SocketAddr, method: &str, target: &str) -> RawResponse {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "{} {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        method, target, addr
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();

    let split = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("header terminator");
    let head = std::str::from_utf8(&raw[..split]).unwrap();
    let body = raw[split + 4..].to_vec();

    let mut lines = head.split("\r\n");
    let status_line = lines.next().unwrap();
    let status = status_line.split(' ').nth(1).unwrap().parse().unwrap();
    let headers = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    RawResponse {
        status,
        headers,
        body,
    }
}

fn session_id_of(xml: &str) -> String {
    let start = xml.find("session_id=").unwrap() + "session_id=".len();
    xml[start..start + 36].to_string()
}

#[tokio::test]
async fn test_vast_endpoint() {
    let server = TestServer::start(Arc::new(MemoryStore::new()));

    let res = send(server.addr, "GET", "/vast").await;
    assert_eq!(res.status, 200);
    assert!(res.header("content-type").unwrap().starts_with("application/xml"));
    assert!(res.header("x-request-id").is_some());

    let xml = String::from_utf8(res.body).unwrap();
    assert!(xml.starts_with("<?xml"));
    assert_eq!(xml.matches("<Tracking event=").count(), 6);
    assert!(xml.contains("page_url=[PAGEURL]&cb=[CACHEBUSTING]&gdpr=[GDPRCONSENT]"));

    let again = send(server.addr, "GET", "/vast").await;
    let xml_again = String::from_utf8(again.body).unwrap();
    assert_ne!(session_id_of(&xml), session_id_of(&xml_again));

    server.shutdown().await;
}

#[tokio::test]
async fn test_track_endpoint_records_row() {
    let store = MemoryStore::new();
    let server = TestServer::start(Arc::new(store.clone()));

    let res = send(
        server.addr,
        "GET",
        "/track?event=midpoint&session_id=sess-1&page_url=%2Ffoo%3Fbar",
    )
    .await;
    assert_eq!(res.status, 200);
    assert_eq!(res.header("content-type"), Some("image/gif"));
    assert_eq!(res.body, PIXEL_GIF.to_vec());

    let rows = store.events_for_session("sess-1").await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].event.event_type.as_deref(), Some("midpoint"));
    assert_eq!(rows[0].event.page_url, "/foo?bar");

    server.shutdown().await;
}

#[tokio::test]
async fn test_track_endpoint_with_unreachable_database() {
    let store = MySqlStore::connect_lazy(&MySqlStoreConfig {
        host: "127.0.0.1".to_string(),
        port: 1,
        ..MySqlStoreConfig::default()
    });
    let server = TestServer::start(Arc::new(store));

    let started = std::time::Instant::now();
    let res = send(server.addr, "GET", "/track?event=start&session_id=abc").await;
    assert_eq!(res.status, 200);
    assert_eq!(res.header("content-type"), Some("image/gif"));
    assert_eq!(res.body.len(), 43);
    assert!(
        started.elapsed() < Duration::from_secs(5),
        "pixel took {:?} with the database down",
        started.elapsed()
    );

    let ready = send(server.addr, "GET", "/readyz").await;
    assert_eq!(ready.status, 503);

    server.shutdown().await;
}

#[tokio::test]
async fn test_head_and_unknown_routes() {
    let store = MemoryStore::new();
    let server = TestServer::start(Arc::new(store.clone()));

    // HEAD runs the GET handler, so the beacon is recorded
    let res = send(server.addr, "HEAD", "/track?event=start&session_id=head-1").await;
    assert_eq!(res.status, 200);
    assert_eq!(res.header("content-type"), Some("image/gif"));
    assert!(res.body.is_empty());
    assert_eq!(store.len(), 1);
    assert_eq!(store.events_for_session("head-1").await.unwrap().len(), 1);

    let res = send(server.addr, "GET", "/missing").await;
    assert_eq!(res.status, 404);
    assert_eq!(store.len(), 1);

    let res = send(server.addr, "POST", "/vast").await;
    assert_eq!(res.status, 404);

    let res = send(server.addr, "GET", "/healthz").await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body, br#"{"status":"alive"}"#.to_vec());

    server.shutdown().await;
}
