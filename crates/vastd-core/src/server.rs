//! Native HTTP server
//!
//! hyper HTTP/1.1 on a multi-threaded tokio runtime:
//! - One task per connection, no shared mutable state besides the pool
//! - SO_REUSEPORT for load balancing
//! - TCP_NODELAY for low latency
//! - Graceful shutdown that drains open connections

use crate::handlers::{health, track, vast};
use crate::middleware::{MiddlewareChain, RequestLog};
use crate::store::TrackingStore;
use crate::vast::DEFAULT_TRACKING_URL;
use crate::{Method, Request, Response, Result};
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use socket2::{Domain, Protocol, Socket, Type};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use vastd_router::Router;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// Upper bound on the connection drain at shutdown
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            shutdown_timeout: Duration::from_secs(10),
        }
    }
}

/// Routed endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Vast,
    Track,
    Liveness,
    Readiness,
}

/// Routing table for the service
pub fn routes() -> Router<Route> {
    let mut router = Router::new();
    router.insert("GET", "/vast", Route::Vast);
    router.insert("GET", "/track", Route::Track);
    router.insert("GET", "/healthz", Route::Liveness);
    router.insert("GET", "/readyz", Route::Readiness);
    router
}

/// State shared by every connection
pub struct AppState {
    /// Tracking store, built once at startup
    pub store: Arc<dyn TrackingStore>,
    /// Base of the tracking URLs in served documents
    pub tracking_base: String,
    pub router: Router<Route>,
    pub middleware: MiddlewareChain,
}

impl AppState {
    /// State with the default tracking endpoint and request logging
    pub fn new(store: Arc<dyn TrackingStore>) -> Self {
        let mut middleware = MiddlewareChain::new();
        middleware.add(RequestLog::new());
        Self {
            store,
            tracking_base: DEFAULT_TRACKING_URL.to_string(),
            router: routes(),
            middleware,
        }
    }

    pub fn with_tracking_base(mut self, tracking_base: impl Into<String>) -> Self {
        self.tracking_base = tracking_base.into();
        self
    }

    /// Route and handle one request
    pub async fn handle(&self, mut req: Request) -> Response {
        if let Some(res) = self.middleware.run_before(&mut req) {
            return res;
        }

        let mut res = match self.router.find(req.method.as_str(), &req.path) {
            Some(Route::Vast) => vast::serve_document(self),
            Some(Route::Track) => track::track(self, &req).await,
            Some(Route::Liveness) => health::liveness(),
            Some(Route::Readiness) => health::readiness(self).await,
            None => Response::not_found(),
        };

        self.middleware.run_after(&req, &mut res);
        res
    }
}

/// Create a TCP socket with optimizations
pub fn create_optimized_socket(addr: &SocketAddr) -> std::io::Result<Socket> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;

    // SO_REUSEADDR - allow binding to address in TIME_WAIT
    socket.set_reuse_address(true)?;

    // SO_REUSEPORT - enable kernel load balancing across processes
    #[cfg(unix)]
    socket.set_reuse_port(true)?;

    // TCP_NODELAY - disable Nagle's algorithm for lower latency
    socket.set_nodelay(true)?;

    socket.set_nonblocking(true)?;
    socket.bind(&(*addr).into())?;
    socket.listen(1024)?;

    Ok(socket)
}

/// Bind a tokio listener on an optimized socket
pub fn bind(addr: &SocketAddr) -> Result<TcpListener> {
    let socket = create_optimized_socket(addr)?;
    let listener = TcpListener::from_std(socket.into())?;
    Ok(listener)
}

/// Convert hyper request to our Request type
pub fn from_hyper_request<B>(req: &hyper::Request<B>) -> Option<Request> {
    let method = Method::from_str(req.method().as_str()).ok()?;
    let uri = req.uri();

    let mut request = Request::new(method, uri.path());
    request.query = uri.query().map(|s| s.to_string());

    for (name, value) in req.headers() {
        if let Ok(v) = value.to_str() {
            request.headers.push((name.to_string(), v.to_string()));
        }
    }

    Some(request)
}

/// Convert our Response to hyper Response
pub fn to_hyper_response(res: Response) -> Result<hyper::Response<Full<Bytes>>> {
    let mut builder = hyper::Response::builder().status(res.status.as_u16());

    for (name, value) in &res.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }

    Ok(builder.body(Full::new(res.body))?)
}

async fn handle_request(
    state: Arc<AppState>,
    req: hyper::Request<Incoming>,
) -> std::result::Result<hyper::Response<Full<Bytes>>, std::convert::Infallible> {
    let response = match from_hyper_request(&req) {
        Some(request) => state.handle(request).await,
        None => Response::not_found(),
    };

    Ok(to_hyper_response(response).unwrap_or_else(|e| {
        tracing::error!(error = %e, "response conversion failed");
        let mut fallback = hyper::Response::new(Full::new(Bytes::from_static(b"Internal Server Error")));
        *fallback.status_mut() = hyper::StatusCode::INTERNAL_SERVER_ERROR;
        fallback
    }))
}

/// Tracks active connections for graceful shutdown
///
/// Used to:
/// - Count active connections
/// - Signal shutdown to reject new connections
/// - Wait for existing connections to drain
#[derive(Debug, Default)]
pub struct ConnectionTracker {
    active: AtomicU64,
    shutting_down: AtomicBool,
    shutdown: Notify,
    drained: Notify,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn increment(&self) {
        self.active.fetch_add(1, Ordering::SeqCst);
    }

    #[inline]
    pub fn decrement(&self) {
        if self.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.drained.notify_waiters();
        }
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.active.load(Ordering::SeqCst)
    }

    /// Signal that shutdown is in progress
    pub fn start_shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
        self.shutdown.notify_waiters();
    }

    #[inline]
    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    /// Resolves once [`start_shutdown`](Self::start_shutdown) has been called
    pub async fn shutdown_requested(&self) {
        loop {
            let notified = self.shutdown.notified();
            if self.is_shutting_down() {
                return;
            }
            notified.await;
        }
    }

    /// Wait until no connection is open, or `timeout` elapses
    ///
    /// Returns true when fully drained.
    pub async fn wait_drained(&self, timeout: Duration) -> bool {
        let drain = async {
            loop {
                let notified = self.drained.notified();
                if self.count() == 0 {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(timeout, drain).await.is_ok()
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Accept connections until `shutdown` resolves, then drain
///
/// Returns once every connection has closed or `config.shutdown_timeout`
/// has passed.
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    config: &ServerConfig,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    use hyper::server::conn::http1;
    use hyper::service::service_fn;
    use hyper_util::rt::TokioIo;

    let tracker = Arc::new(ConnectionTracker::new());
    let mut shutdown = std::pin::pin!(shutdown);

    loop {
        let (stream, peer) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                    continue;
                }
            },
            _ = &mut shutdown => break,
        };

        let state = state.clone();
        let conn_tracker = tracker.clone();
        conn_tracker.increment();

        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            let service = service_fn(move |req| handle_request(state.clone(), req));
            let conn = http1::Builder::new()
                .keep_alive(true)
                .serve_connection(io, service);
            let mut conn = std::pin::pin!(conn);

            // Idle keep-alive connections close once shutdown starts
            let mut draining = false;
            let result = loop {
                tokio::select! {
                    res = conn.as_mut() => break res,
                    _ = conn_tracker.shutdown_requested(), if !draining => {
                        draining = true;
                        conn.as_mut().graceful_shutdown();
                    }
                }
            };

            if let Err(e) = result {
                // Only log if not a normal connection close
                if !e.is_incomplete_message() {
                    tracing::debug!(%peer, error = %e, "connection error");
                }
            }

            conn_tracker.decrement();
        });
    }

    tracker.start_shutdown();
    drop(listener);
    tracing::info!(open = tracker.count(), "shutting down, draining connections");

    if tracker.wait_drained(config.shutdown_timeout).await {
        tracing::info!("all connections closed");
    } else {
        tracing::warn!(open = tracker.count(), "shutdown timeout reached with open connections");
    }
    Ok(())
}
