use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::media::{LocalMedia, MediaDevices};
use crate::peer::{OfferDelay, PeerManager, RandomJitter};
use crate::session::{CallEvent, CallSession, CallSnapshot, SessionCommand};
use crate::signaling::{SignalStore, SignalingChannel};
use crate::transport::RtcConnector;
use meshcall_core::{Participant, RoomName};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Events kept for a subscriber that falls behind before it starts lagging.
const EVENT_CAPACITY: usize = 256;

struct ActiveSession {
    room: RoomName,
    commands: mpsc::Sender<SessionCommand>,
    task: JoinHandle<()>,
}

/// Follows the local user from room to room: one call session per joined
/// room, torn down completely before the next one starts.
pub struct SessionOrchestrator {
    participant: Participant,
    store: Arc<dyn SignalStore>,
    connector: Arc<dyn RtcConnector>,
    devices: Arc<dyn MediaDevices>,
    offer_delay: Arc<dyn OfferDelay>,
    config: EngineConfig,
    snapshot_tx: Arc<watch::Sender<CallSnapshot>>,
    events_tx: broadcast::Sender<CallEvent>,
    active: Option<ActiveSession>,
}

impl SessionOrchestrator {
    pub fn new(
        participant: Participant,
        store: Arc<dyn SignalStore>,
        connector: Arc<dyn RtcConnector>,
        devices: Arc<dyn MediaDevices>,
        config: EngineConfig,
    ) -> Self {
        let offer_delay = Arc::new(RandomJitter::new(
            Duration::from_millis(config.offer_jitter_min_ms),
            Duration::from_millis(config.offer_jitter_max_ms),
        ));
        let (snapshot_tx, _) = watch::channel(CallSnapshot::default());
        let (events_tx, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            participant,
            store,
            connector,
            devices,
            offer_delay,
            config,
            snapshot_tx: Arc::new(snapshot_tx),
            events_tx,
            active: None,
        }
    }

    /// Replace the jittered wait before offering to a newcomer.
    pub fn with_offer_delay(mut self, offer_delay: Arc<dyn OfferDelay>) -> Self {
        self.offer_delay = offer_delay;
        self
    }

    pub fn participant(&self) -> &Participant {
        &self.participant
    }

    pub fn current_room(&self) -> Option<&RoomName> {
        self.active.as_ref().map(|a| &a.room)
    }

    pub fn snapshot(&self) -> CallSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CallSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Events emitted from now on. Nothing is buffered while nobody listens.
    pub fn subscribe_events(&self) -> broadcast::Receiver<CallEvent> {
        self.events_tx.subscribe()
    }

    /// Apply a room membership change coming from the presence layer.
    pub async fn set_room(&mut self, room: Option<RoomName>) -> Result<(), EngineError> {
        match room {
            Some(room) => self.join_room(room).await,
            None => {
                self.leave_room().await;
                Ok(())
            }
        }
    }

    pub async fn join_room(&mut self, room: RoomName) -> Result<(), EngineError> {
        if self.current_room() == Some(&room) {
            debug!("Already in room '{}'", room);
            return Ok(());
        }
        self.leave_room().await;

        info!(
            "Initializing call for {} in room '{}'",
            self.participant.name(),
            room
        );
        self.participant.set_room(Some(room.clone()));

        let signaling = match SignalingChannel::connect(
            self.store.clone(),
            room.clone(),
            self.participant.session_id().clone(),
            self.config.subscribe_timeout(),
        )
        .await
        {
            Ok(signaling) => signaling,
            Err(e) => {
                error!("Failed to initialize call in '{}': {}", room, e);
                self.snapshot_tx.send_replace(CallSnapshot {
                    room: Some(room),
                    error: Some(e.to_string()),
                    ..Default::default()
                });
                return Err(e.into());
            }
        };

        let manager = PeerManager::new(
            self.participant.session_id().clone(),
            self.connector.clone(),
            Arc::new(signaling.sender()),
            self.offer_delay.clone(),
            &self.config,
            self.events_tx.clone(),
        );
        let media = LocalMedia::new(self.devices.clone(), &self.config);

        let (tx, rx) = mpsc::channel(100);
        let session = CallSession::new(
            self.participant.clone(),
            signaling,
            manager,
            media,
            rx,
            self.snapshot_tx.clone(),
        );
        let task = tokio::spawn(session.run());

        self.active = Some(ActiveSession {
            room,
            commands: tx,
            task,
        });
        Ok(())
    }

    /// Leave the current room and wait until its session is fully gone.
    pub async fn leave_room(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        info!("Leaving call in room '{}'", active.room);

        let (reply_tx, reply_rx) = oneshot::channel();
        if active
            .commands
            .send(SessionCommand::Leave { reply: reply_tx })
            .await
            .is_ok()
        {
            let _ = reply_rx.await;
        }
        if let Err(e) = active.task.await {
            warn!("Call session for '{}' ended abnormally: {}", active.room, e);
        }

        self.participant.set_room(None);
        self.snapshot_tx.send_replace(CallSnapshot::default());
    }

    pub async fn request_permissions(&self) -> Result<bool, EngineError> {
        self.request(|reply| SessionCommand::RequestPermissions { reply })
            .await
    }

    pub async fn toggle_video(&self) -> Result<bool, EngineError> {
        self.request(|reply| SessionCommand::ToggleVideo { reply })
            .await
    }

    pub async fn toggle_audio(&self) -> Result<bool, EngineError> {
        self.request(|reply| SessionCommand::ToggleAudio { reply })
            .await
    }

    async fn request(
        &self,
        command: impl FnOnce(oneshot::Sender<Result<bool, EngineError>>) -> SessionCommand,
    ) -> Result<bool, EngineError> {
        let active = self.active.as_ref().ok_or(EngineError::NotInRoom)?;

        let (reply_tx, reply_rx) = oneshot::channel();
        active
            .commands
            .send(command(reply_tx))
            .await
            .map_err(|_| EngineError::SessionClosed)?;
        reply_rx.await.map_err(|_| EngineError::SessionClosed)?
    }
}
