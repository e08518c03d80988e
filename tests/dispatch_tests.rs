//! Decode-and-dispatch path: the piece of the subscriber loop between a
//! raw broker payload and the client mailboxes.

use sse_service::models::Notification;
use sse_service::sse::{pubsub, ClientRegistry, MAILBOX_CAPACITY};

fn payload(user_id: i64, message: &str) -> String {
    format!(
        r#"{{"user_id":{user_id},"message":"{message}","created_at":"2026-08-23T10:00:00Z"}}"#
    )
}

#[tokio::test]
async fn well_formed_payload_lands_in_the_mailbox() {
    let registry = ClientRegistry::new();
    let (_id, mut rx) = registry.add_client(42, MAILBOX_CAPACITY).await;

    pubsub::handle_payload(&registry, &payload(42, "hi")).await;

    assert_eq!(rx.recv().await.as_deref(), Some("hi"));
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn malformed_payload_is_skipped_not_fatal() {
    let registry = ClientRegistry::new();
    let (_id, mut rx) = registry.add_client(42, MAILBOX_CAPACITY).await;

    pubsub::handle_payload(&registry, "{ not json").await;
    pubsub::handle_payload(&registry, &payload(42, "after the bad one")).await;

    // Exactly one delivery: the malformed payload was dropped.
    assert_eq!(rx.recv().await.as_deref(), Some("after the bad one"));
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn payload_with_wrong_shape_is_rejected() {
    assert!(Notification::decode(r#"{"user_id":"x","message":1}"#).is_err());
    assert!(Notification::decode(r#"{"message":"no user"}"#).is_err());
}

#[tokio::test]
async fn dispatch_only_uses_the_addressed_user() {
    let registry = ClientRegistry::new();
    let (_a, mut rx_a) = registry.add_client(1, MAILBOX_CAPACITY).await;
    let (_b, mut rx_b) = registry.add_client(2, MAILBOX_CAPACITY).await;

    pubsub::handle_payload(&registry, &payload(2, "only for two")).await;

    assert_eq!(rx_b.recv().await.as_deref(), Some("only for two"));
    assert!(rx_a.try_recv().is_err());
}

#[tokio::test]
async fn payload_for_absent_user_is_a_noop() {
    let registry = ClientRegistry::new();
    // No registered mailboxes anywhere; must neither panic nor block.
    pubsub::handle_payload(&registry, &payload(99, "void")).await;
    assert_eq!(registry.total_connections().await, 0);
}
