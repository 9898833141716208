use crate::error::TransportError;
use async_trait::async_trait;
use meshcall_core::{RoomName, SignalMessage};
use tokio::sync::mpsc;

/// The shared data store that persists signaling rows and notifies
/// subscribers about newly inserted ones.
#[async_trait]
pub trait SignalStore: Send + Sync {
    /// Append one row to the signaling table.
    async fn append(&self, message: SignalMessage) -> Result<(), TransportError>;

    /// Subscribe to rows inserted for `room` from now on. History is not replayed.
    async fn subscribe(&self, room: &RoomName) -> Result<Subscription, TransportError>;
}

/// Change feed of one room. Dropping it ends the subscription.
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<SignalMessage>,
}

impl Subscription {
    pub fn new(rx: mpsc::UnboundedReceiver<SignalMessage>) -> Self {
        Self { rx }
    }

    /// Next inserted row, or `None` once the store closed the feed.
    pub async fn recv(&mut self) -> Option<SignalMessage> {
        self.rx.recv().await
    }
}
