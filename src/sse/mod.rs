//! SSE fan-out core.
//!
//! `ClientRegistry` tracks which live client mailboxes belong to which
//! user and routes broadcast messages to them. `pubsub` feeds it from the
//! Redis subscription.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{
    mpsc::{channel, error::TrySendError, Receiver, Sender},
    RwLock,
};
use uuid::Uuid;

pub mod pubsub;

use crate::metrics;

/// Default mailbox depth for a client connection.
pub const MAILBOX_CAPACITY: usize = 10;

/// Unique handle for a registered mailbox.
///
/// Handed to the owning stream session when it registers, and required to
/// deregister. Identity-based removal keeps `remove_client` idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MailboxId(Uuid);

impl MailboxId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Sender half of a client mailbox, kept inside the registry.
struct Mailbox {
    id: MailboxId,
    sender: Sender<String>,
}

/// Registry of active client connections, keyed by user id.
///
/// Reads (`client_count`, the lookup inside `broadcast_to_user`) take the
/// read lock; structural changes (`add_client`, `remove_client`) take the
/// write lock. A mailbox is removed from the map before its sender is
/// dropped, so a broadcast can never reach a retired mailbox.
#[derive(Default, Clone)]
pub struct ClientRegistry {
    clients: Arc<RwLock<HashMap<i64, Vec<Mailbox>>>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new mailbox for `user_id`.
    ///
    /// Returns the mailbox id (needed for cleanup) and the receiver half
    /// the session drains. The sender half never leaves the registry.
    pub async fn add_client(&self, user_id: i64, capacity: usize) -> (MailboxId, Receiver<String>) {
        let (tx, rx) = channel(capacity);
        let mailbox = Mailbox {
            id: MailboxId::new(),
            sender: tx,
        };
        let id = mailbox.id;

        let mut guard = self.clients.write().await;
        guard.entry(user_id).or_default().push(mailbox);
        metrics::ACTIVE_CONNECTIONS.inc();

        tracing::debug!(
            user_id,
            connections = guard.get(&user_id).map(|v| v.len()).unwrap_or(0),
            "registered SSE client"
        );

        (id, rx)
    }

    /// Deregister a mailbox. Idempotent: unknown ids are a no-op.
    ///
    /// Dropping the sender here closes the channel, which the owning
    /// session observes as end-of-stream if it is still draining.
    pub async fn remove_client(&self, user_id: i64, mailbox_id: MailboxId) {
        let mut guard = self.clients.write().await;

        if let Some(mailboxes) = guard.get_mut(&user_id) {
            let before = mailboxes.len();
            mailboxes.retain(|m| m.id != mailbox_id);

            if mailboxes.len() != before {
                metrics::ACTIVE_CONNECTIONS.dec();
                tracing::debug!(
                    user_id,
                    remaining = mailboxes.len(),
                    "deregistered SSE client"
                );
            }

            if mailboxes.is_empty() {
                guard.remove(&user_id);
            }
        }
    }

    /// Fan a message out to every mailbox registered for `user_id`.
    ///
    /// Never blocks: a full mailbox drops this one message for that one
    /// connection. A user with no mailboxes is a no-op.
    pub async fn broadcast_to_user(&self, user_id: i64, message: &str) {
        let guard = self.clients.read().await;

        let Some(mailboxes) = guard.get(&user_id) else {
            tracing::debug!(user_id, "no SSE clients registered for user");
            return;
        };

        for mailbox in mailboxes {
            match mailbox.sender.try_send(message.to_owned()) {
                Ok(()) => metrics::MESSAGES_DELIVERED_TOTAL.inc(),
                Err(TrySendError::Full(_)) => {
                    metrics::MESSAGES_DROPPED_TOTAL.inc();
                    tracing::debug!(user_id, mailbox_id = ?mailbox.id, "mailbox full, dropping message");
                }
                // Session is shutting down; removal will follow.
                Err(TrySendError::Closed(_)) => {}
            }
        }
    }

    /// Number of mailboxes registered for a user.
    pub async fn client_count(&self, user_id: i64) -> usize {
        let guard = self.clients.read().await;
        guard.get(&user_id).map(|v| v.len()).unwrap_or(0)
    }

    /// Number of users with at least one live connection.
    pub async fn connected_users(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Total live connections across all users.
    pub async fn total_connections(&self) -> usize {
        let guard = self.clients.read().await;
        guard.values().map(|v| v.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_then_remove_updates_count() {
        let registry = ClientRegistry::new();
        let (id, _rx) = registry.add_client(7, MAILBOX_CAPACITY).await;
        assert_eq!(registry.client_count(7).await, 1);

        registry.remove_client(7, id).await;
        assert_eq!(registry.client_count(7).await, 0);
        assert_eq!(registry.connected_users().await, 0);
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let registry = ClientRegistry::new();
        let (id, _rx) = registry.add_client(7, MAILBOX_CAPACITY).await;

        registry.remove_client(7, id).await;
        registry.remove_client(7, id).await;
        assert_eq!(registry.client_count(7).await, 0);
    }

    #[tokio::test]
    async fn removal_closes_the_mailbox() {
        let registry = ClientRegistry::new();
        let (id, mut rx) = registry.add_client(7, MAILBOX_CAPACITY).await;

        registry.remove_client(7, id).await;
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn broadcast_reaches_registered_mailbox() {
        let registry = ClientRegistry::new();
        let (_id, mut rx) = registry.add_client(42, MAILBOX_CAPACITY).await;

        registry.broadcast_to_user(42, "hi").await;
        assert_eq!(rx.recv().await.as_deref(), Some("hi"));
    }
}
