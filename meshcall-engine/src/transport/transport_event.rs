use crate::media::RemoteTrack;
use crate::transport::{ConnectionState, ConnectionTag};
use meshcall_core::IceCandidate;

/// События, которые соединение отправляет в цикл сессии звонка.
#[derive(Debug)]
pub enum TransportEvent {
    /// Изменилось общее состояние соединения.
    StateChanged(ConnectionTag, ConnectionState),

    /// Собран локальный ICE-кандидат, его нужно переслать пиру.
    CandidateGenerated(ConnectionTag, IceCandidate),

    /// Пир начал отправлять медиатрек.
    TrackReceived(ConnectionTag, RemoteTrack),
}

impl TransportEvent {
    pub fn tag(&self) -> &ConnectionTag {
        match self {
            TransportEvent::StateChanged(tag, _)
            | TransportEvent::CandidateGenerated(tag, _)
            | TransportEvent::TrackReceived(tag, _) => tag,
        }
    }
}
