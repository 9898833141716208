use crate::transport::ConnectionState;
use meshcall_core::SessionId;

/// Notifications for the UI layer, emitted by the call session loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallEvent {
    /// First inbound track of a peer arrived; its tile can be shown.
    StreamAdded(SessionId),

    StreamRemoved(SessionId),

    PeerStateChanged(SessionId, ConnectionState),

    /// The peer's connection was closed and forgotten.
    PeerRemoved(SessionId),
}
