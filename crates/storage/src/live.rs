//! Live-status push channel.
//!
//! Mirrors a subset of session fields with lower latency than the
//! durable store's own change feed. Delivery is at-least-once and
//! unordered; consumers are expected to reconcile monotonically rather
//! than trust ordering.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

use casebook_core::model::{ReleasedSections, SessionId};

use crate::repository::StorageError;

/// Snapshot of the session fields mirrored over the push channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveStatus {
    pub released_sections: ReleasedSections,
    pub current_section: usize,
}

/// Receiving half of a live-status subscription.
///
/// Wraps a broadcast receiver; a slow consumer that lags simply skips
/// ahead to newer statuses, which the reconciler's monotonic design
/// absorbs without regressing.
pub struct LiveStatusUpdates {
    receiver: broadcast::Receiver<LiveStatus>,
}

impl LiveStatusUpdates {
    /// Waits for the next status. Returns `None` once the channel closes.
    pub async fn recv(&mut self) -> Option<LiveStatus> {
        loop {
            match self.receiver.recv().await {
                Ok(status) => return Some(status),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Push channel contract for live session status.
#[async_trait]
pub trait LiveStatusChannel: Send + Sync {
    /// Publish a status snapshot to all subscribers of a session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` on transport failures.
    async fn publish(&self, session_id: SessionId, status: LiveStatus)
    -> Result<(), StorageError>;

    /// Subscribe to status pushes for one session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` on transport failures.
    async fn subscribe(&self, session_id: SessionId) -> Result<LiveStatusUpdates, StorageError>;
}

/// In-process channel backed by tokio broadcast, for tests and
/// single-host deployments.
#[derive(Clone, Default)]
pub struct InMemoryLiveStatus {
    senders: Arc<Mutex<HashMap<SessionId, broadcast::Sender<LiveStatus>>>>,
}

impl InMemoryLiveStatus {
    const CAPACITY: usize = 16;

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn sender(&self, session_id: SessionId) -> Result<broadcast::Sender<LiveStatus>, StorageError> {
        let mut guard = self
            .senders
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .entry(session_id)
            .or_insert_with(|| broadcast::channel(Self::CAPACITY).0)
            .clone())
    }
}

#[async_trait]
impl LiveStatusChannel for InMemoryLiveStatus {
    async fn publish(
        &self,
        session_id: SessionId,
        status: LiveStatus,
    ) -> Result<(), StorageError> {
        // A send error just means nobody is subscribed right now.
        let _ = self.sender(session_id)?.send(status);
        Ok(())
    }

    async fn subscribe(&self, session_id: SessionId) -> Result<LiveStatusUpdates, StorageError> {
        Ok(LiveStatusUpdates {
            receiver: self.sender(session_id)?.subscribe(),
        })
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn status(indices: &[usize], current: usize) -> LiveStatus {
        LiveStatus {
            released_sections: indices.iter().copied().collect(),
            current_section: current,
        }
    }

    #[tokio::test]
    async fn subscriber_receives_published_status() {
        let channel = InMemoryLiveStatus::new();
        let session = SessionId::new(1);
        let mut updates = channel.subscribe(session).await.unwrap();

        channel.publish(session, status(&[0, 1], 1)).await.unwrap();

        let received = updates.recv().await.unwrap();
        assert_eq!(received, status(&[0, 1], 1));
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let channel = InMemoryLiveStatus::new();
        let mut updates_a = channel.subscribe(SessionId::new(1)).await.unwrap();

        channel
            .publish(SessionId::new(2), status(&[0, 1, 2], 2))
            .await
            .unwrap();
        channel
            .publish(SessionId::new(1), status(&[0], 0))
            .await
            .unwrap();

        let received = updates_a.recv().await.unwrap();
        assert_eq!(received, status(&[0], 0));
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_fine() {
        let channel = InMemoryLiveStatus::new();
        channel
            .publish(SessionId::new(1), status(&[0], 0))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn lagged_subscriber_skips_to_newer_statuses() {
        let channel = InMemoryLiveStatus::new();
        let session = SessionId::new(1);
        let mut updates = channel.subscribe(session).await.unwrap();

        // Overflow the channel capacity; the oldest statuses drop.
        for i in 0..InMemoryLiveStatus::CAPACITY + 4 {
            channel.publish(session, status(&[0, i], i)).await.unwrap();
        }

        let received = updates.recv().await.unwrap();
        assert!(received.current_section >= 4);
    }
}
