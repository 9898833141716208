use crate::media::RemoteStream;
use crate::peer::NegotiationState;
use crate::transport::ConnectionState;
use meshcall_core::{RoomName, SessionId};
use std::collections::{BTreeMap, HashMap};

/// Aggregate health of the mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectionSummary {
    pub total_connections: usize,
    pub connected_peers: usize,
    pub connecting_peers: usize,
    /// Failed, disconnected or closed, waiting for teardown.
    pub failed_peers: usize,
    pub remote_streams: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerStatus {
    pub negotiation: NegotiationState,
    pub connection: ConnectionState,
}

/// What the UI renders. Republished after every event the session handles.
#[derive(Debug, Clone, Default)]
pub struct CallSnapshot {
    pub room: Option<RoomName>,
    /// Signaling is subscribed and the session loop runs.
    pub initialized: bool,
    pub video_enabled: bool,
    pub audio_enabled: bool,
    pub permission_requested: bool,
    pub remote_streams: HashMap<SessionId, RemoteStream>,
    pub peers: BTreeMap<SessionId, PeerStatus>,
    pub summary: ConnectionSummary,
    pub error: Option<String>,
}

impl CallSnapshot {
    pub fn has_stream_from(&self, session_id: &SessionId) -> bool {
        self.remote_streams.contains_key(session_id)
    }
}
