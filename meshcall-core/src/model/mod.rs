mod ice;
mod participant;
mod room;
mod session;
mod signaling;

pub use ice::IceServerConfig;
pub use participant::Participant;
pub use room::RoomName;
pub use session::SessionId;
pub use signaling::{
    IceCandidate, SdpType, SessionDescription, Signal, SignalKind, SignalMessage, UserJoined,
    UserLeft,
};
