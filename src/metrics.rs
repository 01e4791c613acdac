// ===============================
// src/metrics.rs
// ===============================
use once_cell::sync::Lazy;
use prometheus::{
    Encoder, Gauge, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use hyper::header::CONTENT_TYPE;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use std::convert::Infallible;
use tokio::sync::watch;
use tokio::time::Duration;
use tracing::{info, warn};

use crate::domain::msg_type;

const HEADER_READ_TIMEOUT: Duration = Duration::from_secs(5);

// Single custom registry (we register everything here)
pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

// -------- Inbound --------
pub static INBOUND: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("inbound_messages_total", "application messages received (label: msg_type)"),
        &["msg_type"],
    )
    .unwrap()
});

pub static UNHANDLED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("unhandled_messages_total", "messages with no handler (label: msg_type)"),
        &["msg_type"],
    )
    .unwrap()
});

pub static QUOTE_REQUESTS: Lazy<IntCounter> =
    Lazy::new(|| IntCounter::new("quote_requests_total", "quote requests handled").unwrap());

pub static QUOTE_OUTCOMES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("quote_outcomes_total", "terminal state per quote request (responded/declined/errored)"),
        &["outcome"],
    )
    .unwrap()
});

pub static MESSAGE_ERRORS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("message_errors_total", "message-scoped errors (label: kind)"),
        &["kind"],
    )
    .unwrap()
});

// Latency receive -> outcome (microseconds)
pub static HANDLE_LATENCY_US: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new("quote_request_latency_us", "QuoteRequest handling latency (us)")
            .buckets(vec![5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 5000.0]),
    )
    .unwrap()
});

// -------- Outbound / sessions --------
pub static OUTBOUND: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("outbound_messages_total", "messages handed to the session engine (label: msg_type)"),
        &["msg_type"],
    )
    .unwrap()
});

pub static SESSIONS_CONNECTED: Lazy<IntGauge> =
    Lazy::new(|| IntGauge::new("sessions_connected", "sessions currently logged on").unwrap());

// ---- Config visibility ----
pub static CONFIG_QUOTE_MIN_SIZE: Lazy<Gauge> = Lazy::new(|| {
    Gauge::new("config_quote_min_size", "requests must be larger than this to be quoted").unwrap()
});

pub static CONFIG_QUOTE_BID_PX: Lazy<Gauge> =
    Lazy::new(|| Gauge::new("config_quote_bid_px", "fixed bid price quoted").unwrap());

pub fn init() {
    // Register all metrics to the custom registry
    for m in [
        REGISTRY.register(Box::new(INBOUND.clone())),
        REGISTRY.register(Box::new(UNHANDLED.clone())),
        REGISTRY.register(Box::new(QUOTE_REQUESTS.clone())),
        REGISTRY.register(Box::new(QUOTE_OUTCOMES.clone())),
        REGISTRY.register(Box::new(MESSAGE_ERRORS.clone())),
        REGISTRY.register(Box::new(HANDLE_LATENCY_US.clone())),
        REGISTRY.register(Box::new(OUTBOUND.clone())),
        REGISTRY.register(Box::new(SESSIONS_CONNECTED.clone())),
        REGISTRY.register(Box::new(CONFIG_QUOTE_MIN_SIZE.clone())),
        REGISTRY.register(Box::new(CONFIG_QUOTE_BID_PX.clone())),
    ] {
        if let Err(e) = m {
            warn!(?e, "metric registration failed");
        }
    }
}

// Encode all metrics in Prometheus text format
fn encode_metrics() -> Vec<u8> {
    let encoder = TextEncoder::new();
    let families = REGISTRY.gather();
    let mut buf = Vec::new();
    if encoder.encode(&families, &mut buf).is_err() || buf.is_empty() {
        buf.extend_from_slice(b"# no metrics\n");
    }
    buf
}

/// MsgType as a metric label: known types pass through, anything a
/// counterparty invents collapses into "other".
pub fn msg_type_label(raw: &str) -> &'static str {
    match raw {
        msg_type::QUOTE_REQUEST => msg_type::QUOTE_REQUEST,
        msg_type::QUOTE => msg_type::QUOTE,
        msg_type::NEW_ORDER_SINGLE => msg_type::NEW_ORDER_SINGLE,
        msg_type::EXECUTION_REPORT => msg_type::EXECUTION_REPORT,
        _ => "other",
    }
}

// GET / or /metrics -> text exposition, everything else 404
async fn route(req: Request<Body>) -> Result<Response<Body>, Infallible> {
    let resp = match (req.method(), req.uri().path()) {
        (&Method::GET, "/" | "/metrics") => Response::builder()
            .header(CONTENT_TYPE, TextEncoder::new().format_type())
            .body(Body::from(encode_metrics())),
        _ => Response::builder().status(StatusCode::NOT_FOUND).body(Body::empty()),
    };
    Ok(resp.unwrap_or_else(|_| Response::new(Body::empty())))
}

/// Serve the registry over HTTP until `shutdown` flips. Each connection runs
/// on its own task, and a client that never sends a request head is dropped
/// after `HEADER_READ_TIMEOUT`.
pub async fn serve_metrics(
    listener: std::net::TcpListener,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), hyper::Error> {
    let addr = listener.local_addr().ok();
    let make_svc = make_service_fn(|_conn| async { Ok::<_, Infallible>(service_fn(route)) });
    let server = Server::from_tcp(listener)?
        .http1_header_read_timeout(HEADER_READ_TIMEOUT)
        .serve(make_svc)
        .with_graceful_shutdown(async move {
            let _ = shutdown.changed().await;
        });

    info!(?addr, "metrics listening on / and /metrics");
    server.await
}
