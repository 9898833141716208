use crate::error::TransportError;
use crate::signaling::{SignalStore, Subscription};
use async_trait::async_trait;
use dashmap::DashMap;
use meshcall_core::{RoomName, SignalMessage};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Default)]
struct RoomFeed {
    rows: Vec<SignalMessage>,
    subscribers: Vec<mpsc::UnboundedSender<SignalMessage>>,
}

#[derive(Default)]
struct MemoryInner {
    rooms: DashMap<RoomName, RoomFeed>,
    reject_appends: AtomicBool,
    stall_subscriptions: AtomicBool,
}

/// In-process signaling table with a per-room change feed.
///
/// Clones share the same rows, so several participants in one process can
/// talk through a single store.
#[derive(Clone, Default)]
pub struct MemorySignalStore {
    inner: Arc<MemoryInner>,
}

impl MemorySignalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every row ever appended for `room`, in insertion order.
    pub fn rows(&self, room: &RoomName) -> Vec<SignalMessage> {
        self.inner
            .rooms
            .get(room)
            .map(|feed| feed.rows.clone())
            .unwrap_or_default()
    }

    pub fn subscriber_count(&self, room: &RoomName) -> usize {
        self.inner
            .rooms
            .get(room)
            .map(|feed| feed.subscribers.iter().filter(|s| !s.is_closed()).count())
            .unwrap_or(0)
    }

    /// Make `append` fail, as when the backend rejects the insert.
    pub fn set_reject_appends(&self, reject: bool) {
        self.inner.reject_appends.store(reject, Ordering::SeqCst);
    }

    /// Make `subscribe` never confirm, as when the realtime socket is down.
    pub fn set_stall_subscriptions(&self, stall: bool) {
        self.inner.stall_subscriptions.store(stall, Ordering::SeqCst);
    }
}

#[async_trait]
impl SignalStore for MemorySignalStore {
    async fn append(&self, message: SignalMessage) -> Result<(), TransportError> {
        if self.inner.reject_appends.load(Ordering::SeqCst) {
            return Err(TransportError::Send {
                kind: message.kind,
                reason: "insert rejected by store".to_owned(),
            });
        }

        let mut feed = self.inner.rooms.entry(message.room.clone()).or_default();
        feed.subscribers
            .retain(|subscriber| subscriber.send(message.clone()).is_ok());
        debug!(
            "Stored {} from {} ({} listeners)",
            message.kind,
            message.from.short(),
            feed.subscribers.len()
        );
        feed.rows.push(message);
        Ok(())
    }

    async fn subscribe(&self, room: &RoomName) -> Result<Subscription, TransportError> {
        if self.inner.stall_subscriptions.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        self.inner
            .rooms
            .entry(room.clone())
            .or_default()
            .subscribers
            .push(tx);
        Ok(Subscription::new(rx))
    }
}
