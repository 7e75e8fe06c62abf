//! Prometheus metrics for the Discord responder.
//!
//! Exposes:
//! - `discord_responder_messages_sent_total` (counter with channel/status)
//! - `discord_responder_generation_total` (counter with outcome)
//! - `discord_responder_keys_rate_limited_total` (counter)
//! - `discord_responder_deletions_total` (counter with status)
//! - `discord_responder_sessions_active` (gauge)
//! - process metrics via `process` collector

use std::convert::Infallible;
use std::net::SocketAddr;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use once_cell::sync::Lazy;
use prometheus::process_collector::ProcessCollector;
use prometheus::{
    default_registry, register_int_counter, register_int_counter_vec, register_int_gauge,
    Encoder, IntCounter, IntCounterVec, IntGauge, TextEncoder,
};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

static PROCESS_COLLECTOR: Lazy<()> = Lazy::new(|| {
    if let Err(err) = default_registry().register(Box::new(ProcessCollector::for_self())) {
        warn!("Failed to register process collector: {}", err);
    }
});

static MESSAGES_SENT: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "discord_responder_messages_sent_total",
        "Messages posted to Discord by channel and status",
        &["channel", "status"]
    )
    .expect("failed to register messages counter")
});

static GENERATION_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "discord_responder_generation_total",
        "Gemini generation attempts by outcome",
        &["outcome"]
    )
    .expect("failed to register generation counter")
});

static KEYS_RATE_LIMITED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "discord_responder_keys_rate_limited_total",
        "Gemini API keys parked after a 429"
    )
    .expect("failed to register rate-limited counter")
});

static DELETIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "discord_responder_deletions_total",
        "Scheduled message deletions by status",
        &["status"]
    )
    .expect("failed to register deletions counter")
});

static SESSIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "discord_responder_sessions_active",
        "Channel monitor sessions currently running"
    )
    .expect("failed to register sessions gauge")
});

/// Ensure collectors are registered.
fn init_collectors() {
    Lazy::force(&PROCESS_COLLECTOR);
    Lazy::force(&MESSAGES_SENT);
    Lazy::force(&GENERATION_TOTAL);
    Lazy::force(&KEYS_RATE_LIMITED);
    Lazy::force(&DELETIONS);
    Lazy::force(&SESSIONS_ACTIVE);
}

/// Record a send attempt for a channel.
pub fn record_message_sent(channel: &str, success: bool) {
    init_collectors();
    MESSAGES_SENT
        .with_label_values(&[channel, if success { "ok" } else { "error" }])
        .inc();
}

/// Record the outcome of one generation call.
pub fn record_generation(outcome: &str) {
    init_collectors();
    GENERATION_TOTAL.with_label_values(&[outcome]).inc();
}

/// Record a key being parked after a 429.
pub fn record_key_rate_limited() {
    init_collectors();
    KEYS_RATE_LIMITED.inc();
}

/// Record a scheduled deletion result.
pub fn record_deletion(success: bool) {
    init_collectors();
    DELETIONS
        .with_label_values(&[if success { "ok" } else { "error" }])
        .inc();
}

/// A channel session started.
pub fn session_started() {
    init_collectors();
    SESSIONS_ACTIVE.inc();
}

/// A channel session stopped.
pub fn session_stopped() {
    init_collectors();
    SESSIONS_ACTIVE.dec();
}

async fn metrics_response() -> Result<Response<Full<Bytes>>, Infallible> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", err);
        return Ok(Response::builder()
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .body(Full::from("encode error"))
            .unwrap());
    }

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(hyper::header::CONTENT_TYPE, encoder.format_type())
        .body(Full::from(buffer))
        .unwrap())
}

async fn handle_request(req: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
    match req.uri().path() {
        "/metrics" => metrics_response().await,
        _ => Ok(Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::new()))
            .unwrap()),
    }
}

async fn serve(addr: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Prometheus metrics endpoint started");

    loop {
        let (stream, peer) = listener.accept().await?;
        let service = service_fn(handle_request);
        let io = TokioIo::new(stream);

        tokio::spawn(async move {
            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                warn!(?peer, "Metrics connection error: {}", err);
            }
        });
    }
}

/// Spawn the metrics HTTP endpoint on the given address.
pub fn spawn_metrics_server(addr: SocketAddr) {
    init_collectors();
    tokio::spawn(async move {
        if let Err(err) = serve(addr).await {
            error!(%addr, "Metrics server failed: {}", err);
        }
    });
}
