use crate::model::room::RoomName;
use crate::model::session::SessionId;
use crate::utils::now_millis;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum SignalKind {
    UserJoined,
    UserLeft,
    Offer,
    Answer,
    IceCandidate,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SignalKind::UserJoined => "user-joined",
            SignalKind::UserLeft => "user-left",
            SignalKind::Offer => "offer",
            SignalKind::Answer => "answer",
            SignalKind::IceCandidate => "ice-candidate",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
}

/// Offer or answer body, shaped like the browser's `RTCSessionDescriptionInit`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Answer,
            sdp: sdp.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default)]
    pub sdp_mid: Option<String>,
    #[serde(default, rename = "sdpMLineIndex")]
    pub sdp_m_line_index: Option<u16>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserJoined {
    pub user_name: String,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserLeft {
    pub timestamp: u64,
}

/// Typed view of a signal payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    UserJoined(UserJoined),
    UserLeft(UserLeft),
    Offer(SessionDescription),
    Answer(SessionDescription),
    IceCandidate(IceCandidate),
}

impl Signal {
    pub fn user_joined(user_name: impl Into<String>) -> Self {
        Signal::UserJoined(UserJoined {
            user_name: user_name.into(),
            timestamp: now_millis(),
        })
    }

    pub fn user_left() -> Self {
        Signal::UserLeft(UserLeft {
            timestamp: now_millis(),
        })
    }

    pub fn kind(&self) -> SignalKind {
        match self {
            Signal::UserJoined(_) => SignalKind::UserJoined,
            Signal::UserLeft(_) => SignalKind::UserLeft,
            Signal::Offer(_) => SignalKind::Offer,
            Signal::Answer(_) => SignalKind::Answer,
            Signal::IceCandidate(_) => SignalKind::IceCandidate,
        }
    }

    pub fn to_payload(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            Signal::UserJoined(p) => serde_json::to_value(p),
            Signal::UserLeft(p) => serde_json::to_value(p),
            Signal::Offer(p) | Signal::Answer(p) => serde_json::to_value(p),
            Signal::IceCandidate(p) => serde_json::to_value(p),
        }
    }
}

/// One row of the room's signaling table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignalMessage {
    #[serde(rename = "room_name")]
    pub room: RoomName,
    #[serde(rename = "from_session_id")]
    pub from: SessionId,
    #[serde(rename = "to_session_id", default)]
    pub to: Option<SessionId>,
    #[serde(rename = "signal_type")]
    pub kind: SignalKind,
    #[serde(rename = "signal_data")]
    pub payload: serde_json::Value,
    pub created_at: u64,
}

impl SignalMessage {
    pub fn new(
        room: RoomName,
        from: SessionId,
        to: Option<SessionId>,
        signal: &Signal,
    ) -> serde_json::Result<Self> {
        Ok(Self {
            room,
            from,
            to,
            kind: signal.kind(),
            payload: signal.to_payload()?,
            created_at: now_millis(),
        })
    }

    /// A row is for `me` when someone else sent it and it is either
    /// broadcast or addressed to `me`.
    pub fn is_relevant_to(&self, me: &SessionId) -> bool {
        if &self.from == me {
            return false;
        }
        match &self.to {
            Some(target) => target == me,
            None => true,
        }
    }

    pub fn decode(&self) -> serde_json::Result<Signal> {
        let payload = self.payload.clone();
        Ok(match self.kind {
            SignalKind::UserJoined => Signal::UserJoined(serde_json::from_value(payload)?),
            SignalKind::UserLeft => Signal::UserLeft(serde_json::from_value(payload)?),
            SignalKind::Offer => Signal::Offer(serde_json::from_value(payload)?),
            SignalKind::Answer => Signal::Answer(serde_json::from_value(payload)?),
            SignalKind::IceCandidate => Signal::IceCandidate(serde_json::from_value(payload)?),
        })
    }
}
