use crate::error::{DeviceError, EngineError};
use crate::media::{LocalMedia, MediaUpdate};
use crate::peer::PeerManager;
use crate::session::{CallSnapshot, SessionCommand};
use crate::signaling::SignalingChannel;
use meshcall_core::{Participant, RoomName, Signal};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

/// The event loop of one joined room. Owns the peer manager, the local
/// media and the signaling channel, and handles signals, connection events,
/// timers and commands one at a time.
pub struct CallSession {
    participant: Participant,
    room: RoomName,
    signaling: SignalingChannel,
    manager: PeerManager,
    media: LocalMedia,
    command_rx: mpsc::Receiver<SessionCommand>,
    snapshot_tx: Arc<watch::Sender<CallSnapshot>>,
    error: Option<String>,
}

impl CallSession {
    pub fn new(
        participant: Participant,
        signaling: SignalingChannel,
        manager: PeerManager,
        media: LocalMedia,
        command_rx: mpsc::Receiver<SessionCommand>,
        snapshot_tx: Arc<watch::Sender<CallSnapshot>>,
    ) -> Self {
        Self {
            participant,
            room: signaling.room().clone(),
            signaling,
            manager,
            media,
            command_rx,
            snapshot_tx,
            error: None,
        }
    }

    pub async fn run(mut self) {
        info!("Call session for room '{}' started", self.room);

        let announce = Signal::user_joined(self.participant.name());
        match self.signaling.send(announce, None).await {
            Ok(()) => info!(
                "Announced {} ({}) in '{}'",
                self.participant.name(),
                self.participant.session_id().short(),
                self.room
            ),
            Err(e) => warn!("Failed to announce join in '{}': {}", self.room, e),
        }
        self.publish();

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(c) => {
                            if !self.handle_command(c).await {
                                break;
                            }
                        }
                        None => {
                            info!("Command channel closed. Leaving room '{}'.", self.room);
                            self.shutdown().await;
                            break;
                        }
                    }
                }

                msg = self.signaling.recv(), if self.signaling.is_connected() => {
                    match msg {
                        Some(m) => self.manager.handle_signal(m).await,
                        None => {
                            error!("Signaling for '{}' was lost", self.room);
                            self.error = Some("signaling channel closed".to_owned());
                        }
                    }
                }

                Some(input) = self.manager.next_input() => {
                    self.manager.handle_input(input).await;
                }
            }

            self.publish();
        }

        info!("Call session for room '{}' finished", self.room);
    }

    /// Returns false once the session has shut down.
    async fn handle_command(&mut self, cmd: SessionCommand) -> bool {
        match cmd {
            SessionCommand::RequestPermissions { reply } => {
                let result = match self.media.request_permissions().await {
                    Ok(update) => {
                        self.apply_media_update(update).await;
                        Ok(self.media.capture().is_some())
                    }
                    Err(e) => Err(self.device_failure(e)),
                };
                let _ = reply.send(result);
            }

            SessionCommand::ToggleVideo { reply } => {
                let result = match self.media.toggle_video().await {
                    Ok((enabled, updates)) => {
                        for update in updates {
                            self.apply_media_update(Some(update)).await;
                        }
                        Ok(enabled)
                    }
                    Err(e) => Err(self.device_failure(e)),
                };
                let _ = reply.send(result);
            }

            SessionCommand::ToggleAudio { reply } => {
                let result = match self.media.toggle_audio().await {
                    Ok((enabled, update)) => {
                        self.apply_media_update(update).await;
                        Ok(enabled)
                    }
                    Err(e) => Err(self.device_failure(e)),
                };
                let _ = reply.send(result);
            }

            SessionCommand::Leave { reply } => {
                self.shutdown().await;
                let _ = reply.send(());
                return false;
            }
        }
        true
    }

    async fn apply_media_update(&mut self, update: Option<MediaUpdate>) {
        self.error = None;
        match update {
            Some(MediaUpdate::Attached(tracks)) => self.manager.attach_tracks(tracks).await,
            Some(MediaUpdate::Replaced(track)) => self.manager.replace_track(track).await,
            None => {}
        }
    }

    fn device_failure(&mut self, e: DeviceError) -> EngineError {
        warn!("Media device error in '{}': {}", self.room, e);
        self.error = Some(e.to_string());
        EngineError::Device(e)
    }

    fn publish(&self) {
        let snapshot = CallSnapshot {
            room: Some(self.room.clone()),
            initialized: self.signaling.is_connected(),
            video_enabled: self.media.video_enabled(),
            audio_enabled: self.media.audio_enabled(),
            permission_requested: self.media.permission_requested(),
            remote_streams: self.manager.remote_streams(),
            peers: self.manager.peer_statuses(),
            summary: self.manager.summary(),
            error: self.error.clone(),
        };
        self.snapshot_tx.send_replace(snapshot);
    }

    /// Say goodbye, then release connections, devices and the subscription.
    async fn shutdown(&mut self) {
        info!("Leaving room '{}'", self.room);

        if let Err(e) = self.signaling.send(Signal::user_left(), None).await {
            warn!("Failed to announce leave in '{}': {}", self.room, e);
        }

        self.manager.close_all().await;
        self.media.stop();
        self.signaling.disconnect();
        self.snapshot_tx.send_replace(CallSnapshot::default());
    }
}
