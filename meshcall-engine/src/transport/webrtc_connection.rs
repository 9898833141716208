use crate::media::{LocalTrack, MediaKind, RemoteTrack};
use crate::transport::{
    ConnectionState, ConnectionTag, RtcConnection, RtcConnector, SignalingState, TransportConfig,
    TransportEvent,
};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use meshcall_core::{IceCandidate, SdpType, SessionDescription};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::signaling_state::RTCSignalingState;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::RTCRtpTransceiverInit;
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;

/// Создаёт соединения webrtc-rs.
#[derive(Clone, Default)]
pub struct WebrtcConnector {
    config: TransportConfig,
}

impl WebrtcConnector {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl RtcConnector for WebrtcConnector {
    async fn connect(
        &self,
        tag: ConnectionTag,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<dyn RtcConnection>> {
        let connection = WebrtcConnection::new(tag, &self.config, events).await?;
        Ok(Arc::new(connection))
    }
}

/// [`RtcConnection`] backed by an `RTCPeerConnection`.
///
/// У каждого соединения с самого начала есть аудио- и видеотрансивер, поэтому
/// offer без захваченных устройств всё равно содержит обе m-line. Локальные
/// треки подставляются в отправители этих трансиверов.
pub struct WebrtcConnection {
    tag: ConnectionTag,
    peer_connection: Arc<RTCPeerConnection>,
    senders: Vec<(MediaKind, Arc<RTCRtpSender>)>,
    /// Kinds that carry one of our tracks rather than the placeholder.
    attached: Mutex<Vec<MediaKind>>,
}

impl WebrtcConnection {
    pub async fn new(
        tag: ConnectionTag,
        config: &TransportConfig,
        event_tx: mpsc::Sender<TransportEvent>,
    ) -> Result<Self> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: config
                .ice_servers
                .iter()
                .map(|server| RTCIceServer {
                    urls: server.urls.clone(),
                    username: server.username.clone().unwrap_or_default(),
                    credential: server.credential.clone().unwrap_or_default(),
                    ..Default::default()
                })
                .collect(),
            ice_candidate_pool_size: config.ice_candidate_pool_size,
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);

        let state_tx = event_tx.clone();
        let state_tag = tag.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();
                let tag = state_tag.clone();

                Box::pin(async move {
                    info!("{} connection state: {:?}", tag, s);
                    let state = match s {
                        RTCPeerConnectionState::Connecting => ConnectionState::Connecting,
                        RTCPeerConnectionState::Connected => ConnectionState::Connected,
                        RTCPeerConnectionState::Disconnected => ConnectionState::Disconnected,
                        RTCPeerConnectionState::Failed => ConnectionState::Failed,
                        RTCPeerConnectionState::Closed => ConnectionState::Closed,
                        _ => ConnectionState::New,
                    };
                    let _ = tx.send(TransportEvent::StateChanged(tag, state)).await;
                })
            },
        ));

        let ice_tx = event_tx.clone();
        let ice_tag = tag.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            let tag = ice_tag.clone();

            Box::pin(async move {
                let Some(candidate) = c else {
                    debug!("ICE gathering complete for {}", tag);
                    return;
                };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let candidate = IceCandidate {
                    candidate: init.candidate,
                    sdp_mid: init.sdp_mid,
                    sdp_m_line_index: init.sdp_mline_index,
                };
                let _ = tx
                    .send(TransportEvent::CandidateGenerated(tag, candidate))
                    .await;
            })
        }));

        let track_tx = event_tx;
        let track_tag = tag.clone();
        peer_connection.on_track(Box::new(move |track, _receiver, _transceiver| {
            let tx = track_tx.clone();
            let tag = track_tag.clone();

            Box::pin(async move {
                let kind = match track.kind() {
                    RTPCodecType::Audio => MediaKind::Audio,
                    _ => MediaKind::Video,
                };
                info!("Remote {} track received from {}", kind, tag);
                let remote = RemoteTrack::new(track.id(), kind, track.stream_id())
                    .with_handle(track.clone());
                let _ = tx.send(TransportEvent::TrackReceived(tag, remote)).await;
            })
        }));

        let mut senders = Vec::new();
        for (kind, codec_type) in [
            (MediaKind::Audio, RTPCodecType::Audio),
            (MediaKind::Video, RTPCodecType::Video),
        ] {
            let transceiver = peer_connection
                .add_transceiver_from_kind(
                    codec_type,
                    Some(RTCRtpTransceiverInit {
                        direction: RTCRtpTransceiverDirection::Sendrecv,
                        send_encodings: vec![],
                    }),
                )
                .await
                .with_context(|| format!("Failed to add {} transceiver", kind))?;
            let sender = transceiver.sender().await;

            // RTCP нужно вычитывать, иначе интерсепторы не работают.
            let rtcp_sender = sender.clone();
            tokio::spawn(async move {
                let mut buf = vec![0u8; 1500];
                while rtcp_sender.read(&mut buf).await.is_ok() {}
            });

            senders.push((kind, sender));
        }

        Ok(Self {
            tag,
            peer_connection,
            senders,
            attached: Mutex::new(Vec::new()),
        })
    }

    fn sender(&self, kind: MediaKind) -> Result<&Arc<RTCRtpSender>> {
        self.senders
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, sender)| sender)
            .ok_or_else(|| anyhow!("no {} transceiver on {}", kind, self.tag))
    }

    fn to_rtc(desc: SessionDescription) -> Result<RTCSessionDescription> {
        let rtc = match desc.sdp_type {
            SdpType::Offer => RTCSessionDescription::offer(desc.sdp)?,
            SdpType::Answer => RTCSessionDescription::answer(desc.sdp)?,
        };
        Ok(rtc)
    }
}

#[async_trait]
impl RtcConnection for WebrtcConnection {
    async fn create_offer(&self) -> Result<SessionDescription> {
        let offer = self.peer_connection.create_offer(None).await?;
        Ok(SessionDescription::offer(offer.sdp))
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        let answer = self.peer_connection.create_answer(None).await?;
        Ok(SessionDescription::answer(answer.sdp))
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()> {
        let desc = Self::to_rtc(desc)?;
        self.peer_connection.set_local_description(desc).await?;
        Ok(())
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        let desc = Self::to_rtc(desc)?;
        self.peer_connection.set_remote_description(desc).await?;
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        let pending = self
            .peer_connection
            .pending_local_description()
            .await
            .ok_or_else(|| anyhow!("no local offer to roll back on {}", self.tag))?;

        let mut desc = RTCSessionDescription::default();
        desc.sdp_type = RTCSdpType::Rollback;
        desc.sdp = pending.sdp;
        self.peer_connection
            .set_local_description(desc)
            .await
            .context("Failed to roll back local offer")?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_m_line_index,
            ..Default::default()
        };
        self.peer_connection.add_ice_candidate(init).await?;
        Ok(())
    }

    fn signaling_state(&self) -> SignalingState {
        match self.peer_connection.signaling_state() {
            RTCSignalingState::HaveLocalOffer | RTCSignalingState::HaveLocalPranswer => {
                SignalingState::HaveLocalOffer
            }
            RTCSignalingState::HaveRemoteOffer | RTCSignalingState::HaveRemotePranswer => {
                SignalingState::HaveRemoteOffer
            }
            RTCSignalingState::Closed => SignalingState::Closed,
            _ => SignalingState::Stable,
        }
    }

    async fn add_track(&self, track: &LocalTrack) -> Result<()> {
        self.sender(track.kind())?
            .replace_track(Some(track.rtp_track()))
            .await?;

        let mut attached = self.attached.lock().await;
        if !attached.contains(&track.kind()) {
            attached.push(track.kind());
        }
        debug!("Added local {} track to {}", track.kind(), self.tag);
        Ok(())
    }

    async fn replace_track(&self, track: &LocalTrack) -> Result<bool> {
        if !self.attached.lock().await.contains(&track.kind()) {
            return Ok(false);
        }
        self.sender(track.kind())?
            .replace_track(Some(track.rtp_track()))
            .await?;
        debug!("Replaced local {} track on {}", track.kind(), self.tag);
        Ok(true)
    }

    async fn close(&self) -> Result<()> {
        self.peer_connection.close().await?;
        Ok(())
    }
}
