use futures_util::StreamExt;
use redis::Client;

use crate::error::Result;
use crate::metrics;
use crate::models::Notification;
use crate::sse::ClientRegistry;

/// Long-running broker subscription. Spawn exactly once per process; a
/// second instance would deliver every notification twice.
///
/// Returns when the subscription stream ends (broker disconnect). There is
/// no automatic reconnect; the caller logs the termination.
pub async fn run_subscriber(client: Client, channel: String, registry: ClientRegistry) -> Result<()> {
    // Pub/sub requires a dedicated connection, not a multiplexed one.
    let conn = client.get_async_connection().await?;
    let mut pubsub = conn.into_pubsub();
    pubsub.subscribe(&channel).await?;
    tracing::info!(%channel, "subscribed to broker channel");

    let mut stream = pubsub.on_message();
    while let Some(msg) = stream.next().await {
        let payload: String = match msg.get_payload() {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(%err, "failed to read broker payload");
                continue;
            }
        };
        handle_payload(&registry, &payload).await;
    }

    Ok(())
}

/// Decode one raw payload and fan it out. Malformed payloads are logged
/// and skipped; they never terminate the subscription.
pub async fn handle_payload(registry: &ClientRegistry, payload: &str) {
    match Notification::decode(payload) {
        Ok(notification) => {
            tracing::debug!(
                user_id = notification.user_id,
                "dispatching broker notification"
            );
            registry
                .broadcast_to_user(notification.user_id, &notification.message)
                .await;
        }
        Err(err) => {
            metrics::DECODE_FAILURES_TOTAL.inc();
            tracing::warn!(%err, payload, "dropping malformed broker payload");
        }
    }
}
