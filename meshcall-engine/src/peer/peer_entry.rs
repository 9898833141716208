use crate::peer::NegotiationState;
use crate::transport::{ConnectionState, ConnectionTag, RtcConnection};
use meshcall_core::IceCandidate;
use std::sync::Arc;

/// Why a teardown was scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownReason {
    /// The peer announced that it left.
    PeerLeft,
    /// The connection reported failed, disconnected or closed.
    ConnectionLost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTeardown {
    pub reason: TeardownReason,
    pub token: u64,
}

/// Everything the manager knows about one remote participant.
pub struct PeerEntry {
    pub tag: ConnectionTag,
    pub connection: Arc<dyn RtcConnection>,
    pub negotiation: NegotiationState,
    pub connection_state: ConnectionState,
    pub remote_description_set: bool,
    /// Candidates that arrived before the remote description, in receipt order.
    pub pending_candidates: Vec<IceCandidate>,
    pub renegotiation_pending: bool,
    /// Our offer was rolled back during glare and the peer's answer to it is
    /// still on its way. No offer may go out before it has been dropped.
    pub awaiting_stale_answer: bool,
    /// SDP of the last offer we answered, to spot redelivered offers.
    pub last_remote_offer: Option<String>,
    pub teardown: Option<PendingTeardown>,
}

impl PeerEntry {
    pub fn new(tag: ConnectionTag, connection: Arc<dyn RtcConnection>) -> Self {
        Self {
            tag,
            connection,
            negotiation: NegotiationState::New,
            connection_state: ConnectionState::New,
            remote_description_set: false,
            pending_candidates: Vec::new(),
            renegotiation_pending: false,
            awaiting_stale_answer: false,
            last_remote_offer: None,
            teardown: None,
        }
    }

    /// Leaving, failed or closed: not worth negotiating on anymore.
    pub fn is_winding_down(&self) -> bool {
        self.negotiation.is_terminal() || self.teardown.is_some()
    }
}
