use crate::media::{RemoteStream, RemoteTrack};
use meshcall_core::SessionId;
use std::collections::HashMap;

/// Remote session id → the media it sends us.
#[derive(Debug, Default)]
pub struct RemoteStreamRegistry {
    streams: HashMap<SessionId, RemoteStream>,
}

impl RemoteStreamRegistry {
    /// Record a received track. Returns true when this created the peer's entry.
    pub fn add_track(&mut self, session_id: &SessionId, track: RemoteTrack) -> bool {
        let created = !self.streams.contains_key(session_id);
        self.streams
            .entry(session_id.clone())
            .or_insert_with(|| RemoteStream::new(session_id.clone()))
            .add_track(track);
        created
    }

    pub fn remove(&mut self, session_id: &SessionId) -> Option<RemoteStream> {
        self.streams.remove(session_id)
    }

    pub fn get(&self, session_id: &SessionId) -> Option<&RemoteStream> {
        self.streams.get(session_id)
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn clear(&mut self) {
        self.streams.clear();
    }

    pub fn to_map(&self) -> HashMap<SessionId, RemoteStream> {
        self.streams.clone()
    }
}
