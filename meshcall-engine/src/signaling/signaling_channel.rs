use crate::error::TransportError;
use crate::signaling::{SignalStore, SignalingOutput, Subscription};
use async_trait::async_trait;
use meshcall_core::{RoomName, SessionId, Signal, SignalMessage};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Room-scoped signaling: appends our rows and yields the rows meant for us.
pub struct SignalingChannel {
    sender: SignalSender,
    subscription: Option<Subscription>,
}

impl SignalingChannel {
    /// Subscribe to `room`. The subscription has to be confirmed within
    /// `timeout`, otherwise the whole call initialization fails.
    pub async fn connect(
        store: Arc<dyn SignalStore>,
        room: RoomName,
        me: SessionId,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        info!("Setting up signaling for room '{}'", room);

        let subscription = match tokio::time::timeout(timeout, store.subscribe(&room)).await {
            Ok(subscription) => subscription?,
            Err(_) => {
                warn!("Signaling subscription for '{}' timed out", room);
                return Err(TransportError::SubscribeTimeout(room, timeout));
            }
        };

        info!("Signaling channel ready for room '{}'", room);
        Ok(Self {
            sender: SignalSender {
                store,
                room,
                me,
                closed: Arc::new(AtomicBool::new(false)),
            },
            subscription: Some(subscription),
        })
    }

    pub fn room(&self) -> &RoomName {
        &self.sender.room
    }

    pub fn is_connected(&self) -> bool {
        self.subscription.is_some()
    }

    /// Cloneable handle used to append signals for this room.
    pub fn sender(&self) -> SignalSender {
        self.sender.clone()
    }

    pub async fn send(
        &self,
        signal: Signal,
        target: Option<SessionId>,
    ) -> Result<(), TransportError> {
        self.sender.send_signal(signal, target).await
    }

    /// Next row relevant to us. Rows we sent ourselves, rows addressed to other
    /// sessions and rows of other rooms are skipped. Cancel-safe.
    pub async fn recv(&mut self) -> Option<SignalMessage> {
        loop {
            let subscription = self.subscription.as_mut()?;
            let next = subscription.recv().await;
            let Some(message) = next else {
                warn!("Signaling feed for '{}' closed", self.sender.room);
                self.disconnect();
                return None;
            };

            if message.room != self.sender.room {
                continue;
            }
            if !message.is_relevant_to(&self.sender.me) {
                continue;
            }

            debug!(
                "Received {} from {}",
                message.kind,
                message.from.short()
            );
            return Some(message);
        }
    }

    /// Stop delivering rows and refuse further sends. Safe to call repeatedly.
    pub fn disconnect(&mut self) {
        self.sender.closed.store(true, Ordering::SeqCst);
        if self.subscription.take().is_some() {
            info!("Closed signaling channel for room '{}'", self.sender.room);
        }
    }
}

/// Appending half of a [`SignalingChannel`].
#[derive(Clone)]
pub struct SignalSender {
    store: Arc<dyn SignalStore>,
    room: RoomName,
    me: SessionId,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl SignalingOutput for SignalSender {
    async fn send_signal(
        &self,
        signal: Signal,
        target: Option<SessionId>,
    ) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Disconnected);
        }

        let kind = signal.kind();
        let message = SignalMessage::new(self.room.clone(), self.me.clone(), target, &signal)?;

        debug!(
            "Sending {} to {}",
            kind,
            message.to.as_ref().map(|t| t.short()).unwrap_or("all")
        );

        if let Err(e) = self.store.append(message).await {
            warn!("Signal send failed ({}): {}", kind, e);
            return Err(e);
        }
        Ok(())
    }
}
