use crate::error::TransportError;
use async_trait::async_trait;
use meshcall_core::{IceCandidate, SessionDescription, SessionId, Signal};

/// Исходящая часть сигнального канала, как её видит менеджер пиров.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    /// Добавить сигнал для `target` или для всей комнаты, если `None`.
    async fn send_signal(
        &self,
        signal: Signal,
        target: Option<SessionId>,
    ) -> Result<(), TransportError>;

    async fn send_offer(
        &self,
        peer_id: &SessionId,
        offer: SessionDescription,
    ) -> Result<(), TransportError> {
        self.send_signal(Signal::Offer(offer), Some(peer_id.clone()))
            .await
    }

    async fn send_answer(
        &self,
        peer_id: &SessionId,
        answer: SessionDescription,
    ) -> Result<(), TransportError> {
        self.send_signal(Signal::Answer(answer), Some(peer_id.clone()))
            .await
    }

    async fn send_ice(
        &self,
        peer_id: &SessionId,
        candidate: IceCandidate,
    ) -> Result<(), TransportError> {
        self.send_signal(Signal::IceCandidate(candidate), Some(peer_id.clone()))
            .await
    }
}
