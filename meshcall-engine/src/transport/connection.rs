use crate::media::LocalTrack;
use crate::transport::TransportEvent;
use anyhow::Result;
use async_trait::async_trait;
use meshcall_core::{IceCandidate, SessionDescription, SessionId};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Identifies one connection object. A peer that gets a fresh connection
/// gets a fresh generation, so callbacks of the old one can be told apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionTag {
    pub session_id: SessionId,
    pub generation: u64,
}

impl ConnectionTag {
    pub fn new(session_id: SessionId, generation: u64) -> Self {
        Self {
            session_id,
            generation,
        }
    }
}

impl fmt::Display for ConnectionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.session_id.short(), self.generation)
    }
}

/// Offer/answer status of the underlying connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalingState {
    Stable,
    HaveLocalOffer,
    HaveRemoteOffer,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl ConnectionState {
    /// Failed, disconnected or closed.
    pub fn is_down(&self) -> bool {
        matches!(
            self,
            ConnectionState::Disconnected | ConnectionState::Failed | ConnectionState::Closed
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::New => "new",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Failed => "failed",
            ConnectionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// One bidirectional media connection to a remote participant.
#[async_trait]
pub trait RtcConnection: Send + Sync {
    async fn create_offer(&self) -> Result<SessionDescription>;

    async fn create_answer(&self) -> Result<SessionDescription>;

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()>;

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()>;

    /// Discard a local offer that has not been answered yet.
    async fn rollback(&self) -> Result<()>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;

    fn signaling_state(&self) -> SignalingState;

    /// Start sending `track` on a new sender.
    async fn add_track(&self, track: &LocalTrack) -> Result<()>;

    /// Swap `track` into the existing sender of the same kind, without
    /// renegotiation. `Ok(false)` when there is no such sender.
    async fn replace_track(&self, track: &LocalTrack) -> Result<bool>;

    async fn close(&self) -> Result<()>;
}

/// Creates connections. Events of the new connection are tagged with `tag`
/// and pushed into `events`.
#[async_trait]
pub trait RtcConnector: Send + Sync {
    async fn connect(
        &self,
        tag: ConnectionTag,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<dyn RtcConnection>>;
}
