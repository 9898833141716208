use crate::model::room::RoomName;
use crate::model::session::SessionId;
use serde::{Deserialize, Serialize};

/// Identity assigned at login. Session id and name never change afterwards;
/// only the room moves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Participant {
    session_id: SessionId,
    name: String,
    room: Option<RoomName>,
}

impl Participant {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_session(SessionId::new(), name)
    }

    pub fn with_session(session_id: SessionId, name: impl Into<String>) -> Self {
        Self {
            session_id,
            name: name.into(),
            room: None,
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn room(&self) -> Option<&RoomName> {
        self.room.as_ref()
    }

    pub fn set_room(&mut self, room: Option<RoomName>) {
        self.room = room;
    }
}
