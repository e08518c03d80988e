use actix_web::HttpResponse;
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntGauge, Opts, TextEncoder};

pub static ACTIVE_CONNECTIONS: Lazy<IntGauge> = Lazy::new(|| {
    let gauge = IntGauge::with_opts(Opts::new(
        "sse_service_active_connections",
        "Currently registered SSE client connections",
    ))
    .expect("failed to create sse_service_active_connections");
    prometheus::default_registry()
        .register(Box::new(gauge.clone()))
        .expect("failed to register sse_service_active_connections");
    gauge
});

pub static MESSAGES_DELIVERED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::with_opts(Opts::new(
        "sse_service_messages_delivered_total",
        "Messages enqueued into client mailboxes",
    ))
    .expect("failed to create sse_service_messages_delivered_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register sse_service_messages_delivered_total");
    counter
});

pub static MESSAGES_DROPPED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::with_opts(Opts::new(
        "sse_service_messages_dropped_total",
        "Messages dropped because a client mailbox was full",
    ))
    .expect("failed to create sse_service_messages_dropped_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register sse_service_messages_dropped_total");
    counter
});

pub static DECODE_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::with_opts(Opts::new(
        "sse_service_decode_failures_total",
        "Broker payloads that failed to decode",
    ))
    .expect("failed to create sse_service_decode_failures_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register sse_service_decode_failures_total");
    counter
});

pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
