//! SSE stream endpoint.
//!
//! One session task per connection: it drains the client's mailbox, emits
//! heartbeats, and deregisters the mailbox when the client goes away.

use std::convert::Infallible;
use std::time::Duration;

use actix_web::{web, HttpResponse};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::sse::{ClientRegistry, MAILBOX_CAPACITY};

/// Fallback when the user_id query parameter is absent or unparsable.
const DEFAULT_USER_ID: i64 = 1;

/// Keep-alive period, kept under typical proxy idle timeouts.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    // Kept as a string so a garbage value falls back instead of a 400.
    user_id: Option<String>,
}

impl StreamQuery {
    fn user_id(&self) -> i64 {
        self.user_id
            .as_deref()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(DEFAULT_USER_ID)
    }
}

fn sse_frame(text: &str) -> Bytes {
    Bytes::from(format!("data: {text}\n\n"))
}

/// GET /sse — long-lived event stream for one client.
pub async fn stream_events(
    query: web::Query<StreamQuery>,
    registry: web::Data<ClientRegistry>,
) -> HttpResponse {
    let user_id = query.user_id();
    let (mailbox_id, mut inbox) = registry.add_client(user_id, MAILBOX_CAPACITY).await;
    tracing::info!(user_id, "SSE client connected");

    let (body_tx, body_rx) = mpsc::channel::<Result<Bytes, Infallible>>(8);

    let registry = registry.into_inner();
    actix_web::rt::spawn(async move {
        let _ = body_tx.send(Ok(sse_frame("connection established"))).await;

        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        // The first tick completes immediately; skip it.
        heartbeat.tick().await;

        loop {
            tokio::select! {
                received = inbox.recv() => match received {
                    Some(message) => {
                        if body_tx.send(Ok(sse_frame(&message))).await.is_err() {
                            break;
                        }
                    }
                    // Mailbox retired elsewhere; nothing left to stream.
                    None => break,
                },
                _ = heartbeat.tick() => {
                    if body_tx.send(Ok(sse_frame("ping"))).await.is_err() {
                        break;
                    }
                }
                _ = body_tx.closed() => break,
            }
        }

        registry.remove_client(user_id, mailbox_id).await;
        tracing::info!(user_id, "SSE client disconnected");
    });

    sse_response_headers(HttpResponse::Ok()).streaming(ReceiverStream::new(body_rx))
}

/// OPTIONS /sse — CORS preflight, no body.
pub async fn stream_preflight() -> HttpResponse {
    sse_cors_headers(HttpResponse::NoContent()).finish()
}

/// GET /sse/status/{user_id} — connection diagnostics for one user.
pub async fn stream_status(
    path: web::Path<i64>,
    registry: web::Data<ClientRegistry>,
) -> HttpResponse {
    let user_id = path.into_inner();
    let connection_count = registry.client_count(user_id).await;

    HttpResponse::Ok().json(json!({
        "user_id": user_id,
        "connected": connection_count > 0,
        "connection_count": connection_count,
    }))
}

fn sse_cors_headers(mut builder: actix_web::HttpResponseBuilder) -> actix_web::HttpResponseBuilder {
    builder
        .insert_header(("Access-Control-Allow-Origin", "*"))
        .insert_header(("Access-Control-Allow-Headers", "Cache-Control"));
    builder
}

fn sse_response_headers(
    mut builder: actix_web::HttpResponseBuilder,
) -> actix_web::HttpResponseBuilder {
    builder
        .insert_header(("Content-Type", "text/event-stream"))
        .insert_header(("Cache-Control", "no-cache"))
        .insert_header(("Connection", "keep-alive"));
    sse_cors_headers(builder)
}

pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/sse", web::get().to(stream_events))
        .route("/sse", web::method(actix_web::http::Method::OPTIONS).to(stream_preflight))
        .route("/sse/status/{user_id}", web::get().to(stream_status));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_falls_back_on_missing_or_garbage() {
        let absent = StreamQuery { user_id: None };
        assert_eq!(absent.user_id(), DEFAULT_USER_ID);

        let garbage = StreamQuery {
            user_id: Some("forty-two".into()),
        };
        assert_eq!(garbage.user_id(), DEFAULT_USER_ID);

        let valid = StreamQuery {
            user_id: Some("42".into()),
        };
        assert_eq!(valid.user_id(), 42);
    }

    #[test]
    fn frames_are_sse_shaped() {
        assert_eq!(sse_frame("ping"), Bytes::from_static(b"data: ping\n\n"));
    }
}
