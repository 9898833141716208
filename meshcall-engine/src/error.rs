use crate::media::MediaKind;
use meshcall_core::{RoomName, SignalKind};
use std::time::Duration;
use thiserror::Error;

/// Failures of the signaling store or of the room subscription.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("subscription to room '{0}' was not confirmed within {1:?}")]
    SubscribeTimeout(RoomName, Duration),

    #[error("subscription to room '{room}' failed: {reason}")]
    Subscribe { room: RoomName, reason: String },

    #[error("failed to append {kind} signal: {reason}")]
    Send { kind: SignalKind, reason: String },

    #[error("signaling channel is disconnected")]
    Disconnected,

    #[error("failed to encode signal payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Camera/microphone acquisition failures. The local media state stays
/// unacquired, so the toggle that hit one can simply be retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeviceError {
    #[error("permission to use camera and microphone was denied")]
    PermissionDenied,

    #[error("no {0} device available")]
    NotFound(MediaKind),

    #[error("media device error: {0}")]
    Other(String),
}

/// Errors surfaced to the UI layer.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error("not in a room")]
    NotInRoom,

    #[error("call session has shut down")]
    SessionClosed,
}
