//! Event-loop HTTP server
//!
//! [`HttpServer`] is the HTTP transport's [`ServerHandle`]. `start` binds the
//! configured address and spawns an axum event loop on the current tokio
//! runtime; `stop` triggers graceful shutdown and waits for it up to the
//! configured timeout. Requests still in flight when that timeout expires
//! are answered with a 503 and the event loop is aborted.

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::Response;
use axum::Router;
use portal_core::{
    AccessLogEntry, AccessLogger, HealthCheckService, IntGauge, RequestDispatcher, RestRequest,
    RestResponse, ServerError, ServerHandle, HEALTHY_BODY, UNHEALTHY_BODY,
};
use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tower::limit::ConcurrencyLimitLayer;
use tracing::{debug, info, warn};

use crate::config::HttpConfig;
use crate::metrics::HttpMetrics;

/// State read by every request of one server
struct Shared {
    config: HttpConfig,
    metrics: HttpMetrics,
    dispatcher: Arc<dyn RequestDispatcher>,
    access_logger: Arc<dyn AccessLogger>,
    health_check: Arc<dyn HealthCheckService>,
}

/// Router state: the server's shared state plus the abort flag of one run
#[derive(Clone)]
struct RequestState {
    shared: Arc<Shared>,
    abort: watch::Receiver<bool>,
}

/// A started event loop
struct Running {
    local_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    /// Set once the loop is abandoned; dropping it has the same effect
    abort: watch::Sender<bool>,
    task: JoinHandle<std::io::Result<()>>,
}

/// One slot of the in-flight gauge, released on drop
struct InFlight(IntGauge);

impl InFlight {
    fn enter(gauge: &IntGauge) -> Self {
        gauge.inc();
        Self(gauge.clone())
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.dec();
    }
}

/// HTTP transport server
pub struct HttpServer {
    shared: Arc<Shared>,
    running: Option<Running>,
}

impl HttpServer {
    pub fn new(
        config: HttpConfig,
        metrics: HttpMetrics,
        dispatcher: Arc<dyn RequestDispatcher>,
        access_logger: Arc<dyn AccessLogger>,
        health_check: Arc<dyn HealthCheckService>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                metrics,
                dispatcher,
                access_logger,
                health_check,
            }),
            running: None,
        }
    }

    pub fn config(&self) -> &HttpConfig {
        &self.shared.config
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Address actually bound, while running
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.local_addr)
    }
}

#[async_trait]
impl ServerHandle for HttpServer {
    async fn start(&mut self) -> Result<(), ServerError> {
        if self.running.is_some() {
            return Err(ServerError::AlreadyRunning);
        }

        let addr = self.shared.config.bind_addr();
        let bind_error = |source| ServerError::Bind {
            addr: addr.to_string(),
            source,
        };
        let listener = TcpListener::bind(addr).await.map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;

        let (abort, aborted) = watch::channel(false);
        let app = router(RequestState {
            shared: self.shared.clone(),
            abort: aborted,
        });
        let (shutdown, signal) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = signal.await;
                })
                .await
        });

        self.shared.metrics.starts.inc();
        info!("HTTP server listening on {}", local_addr);
        self.running = Some(Running {
            local_addr,
            shutdown,
            abort,
            task,
        });
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), ServerError> {
        let Some(running) = self.running.take() else {
            return Ok(());
        };

        info!("Stopping HTTP server on {}", running.local_addr);
        let _ = running.shutdown.send(());

        let timeout_ms = self.shared.config.shutdown_timeout_ms;
        let mut task = running.task;
        let drained = tokio::time::timeout(self.shared.config.shutdown_timeout(), &mut task).await;
        let result = match drained {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(e))) => Err(ServerError::Serve {
                reason: e.to_string(),
            }),
            Ok(Err(e)) => Err(ServerError::Serve {
                reason: e.to_string(),
            }),
            Err(_) => {
                warn!("HTTP server did not drain within {}ms, aborting", timeout_ms);
                let _ = running.abort.send(true);
                task.abort();
                Err(ServerError::ShutdownTimeout { timeout_ms })
            }
        };

        self.shared.metrics.stops.inc();
        info!("HTTP server on {} stopped", running.local_addr);
        result
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for HttpServer {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            let _ = running.abort.send(true);
            running.task.abort();
        }
    }
}

fn router(state: RequestState) -> Router {
    let max_request_bytes = state.shared.config.max_request_bytes;
    let max_concurrent_requests = state.shared.config.max_concurrent_requests;
    Router::new()
        .fallback(handle)
        .layer(DefaultBodyLimit::max(max_request_bytes))
        .layer(ConcurrencyLimitLayer::new(max_concurrent_requests))
        .with_state(state)
}

/// Resolves once the run is abandoned
async fn aborted(mut abort: watch::Receiver<bool>) {
    loop {
        let set = *abort.borrow_and_update();
        if set || abort.changed().await.is_err() {
            return;
        }
    }
}

async fn handle(
    State(RequestState { shared, abort }): State<RequestState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let started = Instant::now();
    let metrics = &shared.metrics;
    metrics.requests.inc();
    let _in_flight = InFlight::enter(&metrics.active_requests);

    let uri_string = uri
        .path_and_query()
        .map(|pq| pq.to_string())
        .unwrap_or_else(|| uri.path().to_string());
    let request_headers = header_pairs(&headers);
    debug!("{} {}", method, uri_string);

    let mut request_bytes = 0;
    let response = if uri.path() == shared.health_check.health_check_uri() {
        metrics.health_checks.inc();
        health_response(shared.health_check.as_ref())
    } else {
        match body {
            Ok(bytes) => {
                request_bytes = bytes.len();
                let request = RestRequest {
                    method: method.to_string(),
                    uri: uri_string.clone(),
                    headers: request_headers.clone(),
                    body: bytes.to_vec(),
                };
                tokio::select! {
                    response = shared.dispatcher.dispatch(request) => response,
                    _ = aborted(abort) => {
                        warn!("Abandoned {} {}: server stopped", method, uri_string);
                        RestResponse::new(503, "Server stopped\n")
                    }
                }
            }
            Err(rejection) => {
                let status = rejection.status();
                if status == StatusCode::PAYLOAD_TOO_LARGE {
                    metrics.request_too_large.inc();
                }
                debug!("Rejected body of {} {}: {}", method, uri_string, rejection);
                RestResponse::new(status.as_u16(), rejection.body_text())
            }
        }
    };

    shared.access_logger.log(&AccessLogEntry {
        method: method.to_string(),
        uri: uri_string,
        status: response.status,
        request_headers,
        response_headers: response.headers.clone(),
        request_bytes,
        response_bytes: response.body.len(),
        latency: started.elapsed(),
    });
    metrics.record_status(response.status);

    into_response(response)
}

fn health_response(health_check: &dyn HealthCheckService) -> RestResponse {
    let response = if health_check.is_healthy() {
        RestResponse::new(200, HEALTHY_BODY)
    } else {
        RestResponse::new(503, UNHEALTHY_BODY)
    };
    response.with_header("Content-Type", "text/plain")
}

fn header_pairs(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}

fn into_response(response: RestResponse) -> Response {
    let mut out = Response::new(Body::from(response.body));
    *out.status_mut() =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    for (name, value) in response.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            (Ok(name), Ok(value)) => {
                out.headers_mut().append(name, value);
            }
            _ => warn!("Dropping invalid response header {}", name),
        }
    }
    out
}
