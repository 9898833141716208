use crate::config::EngineConfig;
use crate::media::{LocalTrack, RemoteStream};
use crate::peer::{
    NegotiationState, OfferDelay, PeerEntry, PendingTeardown, RemoteStreamRegistry,
    TeardownReason,
};
use crate::session::{CallEvent, ConnectionSummary, PeerStatus};
use crate::signaling::SignalingOutput;
use crate::transport::{
    ConnectionState, ConnectionTag, RtcConnection, RtcConnector, SignalingState, TransportEvent,
};
use anyhow::{Result, anyhow};
use meshcall_core::{IceCandidate, SdpType, SessionDescription, SessionId, Signal, SignalMessage};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Deferred work the manager scheduled for itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerTimer {
    /// The jitter wait before offering to a newly announced peer is over.
    OfferDue(SessionId, u64),
    /// The grace period of a scheduled teardown is over.
    TeardownDue(ConnectionTag, u64),
}

/// Input for the manager that originates from itself or its connections.
#[derive(Debug)]
pub enum PeerInput {
    Transport(TransportEvent),
    Timer(PeerTimer),
}

/// Owns one connection per remote participant and drives offer/answer/ICE
/// for all of them. Every method runs on the call session loop, so state is
/// only ever touched from one task.
pub struct PeerManager {
    me: SessionId,
    connector: Arc<dyn RtcConnector>,
    signaling: Arc<dyn SignalingOutput>,
    offer_delay: Arc<dyn OfferDelay>,
    grace: Duration,
    peers: HashMap<SessionId, PeerEntry>,
    streams: RemoteStreamRegistry,
    pending_offers: HashMap<SessionId, (u64, JoinHandle<()>)>,
    local_tracks: Vec<LocalTrack>,
    next_generation: u64,
    next_token: u64,
    transport_tx: mpsc::Sender<TransportEvent>,
    transport_rx: mpsc::Receiver<TransportEvent>,
    timer_tx: mpsc::UnboundedSender<PeerTimer>,
    timer_rx: mpsc::UnboundedReceiver<PeerTimer>,
    events: broadcast::Sender<CallEvent>,
}

impl PeerManager {
    pub fn new(
        me: SessionId,
        connector: Arc<dyn RtcConnector>,
        signaling: Arc<dyn SignalingOutput>,
        offer_delay: Arc<dyn OfferDelay>,
        config: &EngineConfig,
        events: broadcast::Sender<CallEvent>,
    ) -> Self {
        let (transport_tx, transport_rx) = mpsc::channel(256);
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();

        Self {
            me,
            connector,
            signaling,
            offer_delay,
            grace: config.teardown_grace(),
            peers: HashMap::new(),
            streams: RemoteStreamRegistry::default(),
            pending_offers: HashMap::new(),
            local_tracks: Vec::new(),
            next_generation: 0,
            next_token: 0,
            transport_tx,
            transport_rx,
            timer_tx,
            timer_rx,
            events,
        }
    }

    /// Next connection event or expired timer. Cancel-safe.
    pub async fn next_input(&mut self) -> Option<PeerInput> {
        tokio::select! {
            Some(event) = self.transport_rx.recv() => Some(PeerInput::Transport(event)),
            Some(timer) = self.timer_rx.recv() => Some(PeerInput::Timer(timer)),
            else => None,
        }
    }

    pub async fn handle_input(&mut self, input: PeerInput) {
        match input {
            PeerInput::Transport(event) => self.handle_transport_event(event).await,
            PeerInput::Timer(PeerTimer::OfferDue(peer_id, token)) => {
                self.offer_due(peer_id, token).await
            }
            PeerInput::Timer(PeerTimer::TeardownDue(tag, token)) => {
                self.teardown_due(tag, token).await
            }
        }
    }

    pub async fn handle_signal(&mut self, message: SignalMessage) {
        let from = message.from.clone();
        let signal = match message.decode() {
            Ok(signal) => signal,
            Err(e) => {
                warn!(
                    "Dropping malformed {} from {}: {}",
                    message.kind,
                    from.short(),
                    e
                );
                return;
            }
        };

        match signal {
            Signal::UserJoined(joined) => self.on_user_joined(from, joined.user_name).await,
            Signal::UserLeft(_) => self.on_user_left(&from),
            Signal::Offer(offer) => self.on_offer(from, offer).await,
            Signal::Answer(answer) => self.on_answer(&from, answer).await,
            Signal::IceCandidate(candidate) => self.on_ice_candidate(&from, candidate).await,
        }
    }

    async fn on_user_joined(&mut self, peer_id: SessionId, user_name: String) {
        info!("User joined: {} ({})", user_name, peer_id.short());

        if let Some(entry) = self.peers.get(&peer_id) {
            if !entry.is_winding_down() {
                debug!("Already connected to {}, ignoring announcement", entry.tag);
                return;
            }
            debug!("Dropping leftover connection {} before reconnecting", entry.tag);
            self.remove_peer(&peer_id).await;
        }
        if self.pending_offers.contains_key(&peer_id) {
            debug!("Offer to {} already scheduled", peer_id.short());
            return;
        }

        let delay = self.offer_delay.next_delay();
        let token = self.token();
        let timer_tx = self.timer_tx.clone();
        let peer = peer_id.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = timer_tx.send(PeerTimer::OfferDue(peer, token));
        });

        debug!("Offering to {} in {:?}", peer_id.short(), delay);
        self.pending_offers.insert(peer_id, (token, handle));
    }

    async fn offer_due(&mut self, peer_id: SessionId, token: u64) {
        match self.pending_offers.get(&peer_id) {
            Some((pending, _)) if *pending == token => {
                self.pending_offers.remove(&peer_id);
            }
            _ => return,
        }

        if self.peers.contains_key(&peer_id) {
            debug!(
                "Connection with {} already exists, skipping offer",
                peer_id.short()
            );
            return;
        }

        if let Err(e) = self.ensure_peer(&peer_id).await {
            warn!("Error creating connection for {}: {:#}", peer_id.short(), e);
            return;
        }

        info!("Sending offer to new user {}", peer_id.short());
        self.start_offer(&peer_id).await;
    }

    /// Reuse the peer's connection, or build one carrying every local track.
    async fn ensure_peer(&mut self, peer_id: &SessionId) -> Result<()> {
        if let Some(entry) = self.peers.get(peer_id) {
            debug!("Reusing existing connection {}", entry.tag);
            return Ok(());
        }

        self.next_generation += 1;
        let tag = ConnectionTag::new(peer_id.clone(), self.next_generation);
        info!("Creating new peer connection {}", tag);

        let connection = self
            .connector
            .connect(tag.clone(), self.transport_tx.clone())
            .await?;

        for track in &self.local_tracks {
            if let Err(e) = connection.add_track(track).await {
                let _ = connection.close().await;
                return Err(e.context(format!("Failed to add local {} track", track.kind())));
            }
        }

        self.peers
            .insert(peer_id.clone(), PeerEntry::new(tag, connection));
        Ok(())
    }

    /// Offer on the peer's connection, or remember to do so once the
    /// negotiation in flight has settled.
    async fn start_offer(&mut self, peer_id: &SessionId) {
        let Some(entry) = self.peers.get_mut(peer_id) else {
            return;
        };
        if entry.is_winding_down() {
            return;
        }
        if entry.negotiation.awaiting_answer()
            || entry.awaiting_stale_answer
            || entry.connection.signaling_state() != SignalingState::Stable
        {
            debug!("Negotiation with {} in flight, deferring offer", entry.tag);
            entry.renegotiation_pending = true;
            return;
        }

        entry.negotiation = NegotiationState::OfferSent;
        entry.renegotiation_pending = false;
        let connection = entry.connection.clone();
        let tag = entry.tag.clone();

        let offer = match create_local_offer(connection.as_ref()).await {
            Ok(offer) => offer,
            Err(e) => {
                warn!("Error creating offer for {}: {:#}", tag, e);
                self.remove_peer(peer_id).await;
                return;
            }
        };

        if let Err(e) = self.signaling.send_offer(peer_id, offer).await {
            warn!("Offer to {} was not delivered: {}", tag, e);
        }
    }

    async fn on_offer(&mut self, peer_id: SessionId, offer: SessionDescription) {
        if offer.sdp_type != SdpType::Offer {
            warn!("Offer from {} carries a {:?} description", peer_id.short(), offer.sdp_type);
            return;
        }
        info!("Handling offer from {}", peer_id.short());

        if let Some(entry) = self.peers.get(&peer_id) {
            if entry.last_remote_offer.as_deref() == Some(offer.sdp.as_str()) {
                debug!("Duplicate offer from {}, already answered", entry.tag);
                return;
            }
            if entry.is_winding_down() {
                debug!("Replacing stale connection {}", entry.tag);
                self.remove_peer(&peer_id).await;
            }
        }

        self.cancel_pending_offer(&peer_id);
        if let Err(e) = self.ensure_peer(&peer_id).await {
            warn!("Error creating connection for {}: {:#}", peer_id.short(), e);
            return;
        }

        let glare = self
            .peers
            .get(&peer_id)
            .is_some_and(|e| e.connection.signaling_state() == SignalingState::HaveLocalOffer);
        if glare {
            info!("Offer collision with {}, answering theirs", peer_id.short());
            if let Err(e) = self.rollback(&peer_id).await {
                warn!(
                    "Rollback failed for {}: {:#}, recreating connection",
                    peer_id.short(),
                    e
                );
                self.remove_peer(&peer_id).await;
                if let Err(e) = self.ensure_peer(&peer_id).await {
                    warn!("Error creating connection for {}: {:#}", peer_id.short(), e);
                    return;
                }
            }
        }

        let Some(entry) = self.peers.get_mut(&peer_id) else {
            return;
        };
        entry.last_remote_offer = Some(offer.sdp.clone());
        if glare {
            entry.awaiting_stale_answer = true;
        }
        let connection = entry.connection.clone();
        let tag = entry.tag.clone();

        if let Err(e) = self.apply_remote_description(&peer_id, offer).await {
            warn!("Error handling offer from {}: {:#}", tag, e);
            self.remove_peer(&peer_id).await;
            return;
        }

        let answer = match create_local_answer(connection.as_ref()).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!("Error creating answer for {}: {:#}", tag, e);
                self.remove_peer(&peer_id).await;
                return;
            }
        };

        if let Some(entry) = self.peers.get_mut(&peer_id) {
            if entry.connection_state != ConnectionState::Connected {
                entry.negotiation = NegotiationState::AnswerSent;
            }
        }

        match self.signaling.send_answer(&peer_id, answer).await {
            Ok(()) => info!("Answer sent to {}", tag),
            Err(e) => warn!("Answer to {} was not delivered: {}", tag, e),
        }

        self.run_pending_renegotiation(&peer_id).await;
    }

    async fn rollback(&mut self, peer_id: &SessionId) -> Result<()> {
        let entry = self
            .peers
            .get_mut(peer_id)
            .ok_or_else(|| anyhow!("no connection to roll back"))?;
        entry.connection.rollback().await?;
        entry.negotiation = NegotiationState::New;
        Ok(())
    }

    async fn on_answer(&mut self, peer_id: &SessionId, answer: SessionDescription) {
        let Some(entry) = self.peers.get_mut(peer_id) else {
            debug!("Answer from {} without a connection, dropping", peer_id.short());
            return;
        };

        if entry.awaiting_stale_answer {
            debug!("Dropping answer from {} to our rolled back offer", entry.tag);
            entry.awaiting_stale_answer = false;
            // Both sides answered each other; the larger id offers once more
            // so the two ends agree on one description pair.
            if self.me > *peer_id {
                entry.renegotiation_pending = true;
            }
            self.run_pending_renegotiation(peer_id).await;
            return;
        }

        let signaling_state = entry.connection.signaling_state();
        if !entry.negotiation.awaiting_answer() || signaling_state != SignalingState::HaveLocalOffer
        {
            warn!(
                "No pending offer for answer from {} ({}, {:?}), dropping",
                entry.tag, entry.negotiation, signaling_state
            );
            return;
        }

        let tag = entry.tag.clone();
        if let Err(e) = self.apply_remote_description(peer_id, answer).await {
            warn!("Error handling answer from {}: {:#}", tag, e);
            self.remove_peer(peer_id).await;
            return;
        }

        if let Some(entry) = self.peers.get_mut(peer_id) {
            entry.negotiation = if entry.connection_state == ConnectionState::Connected {
                NegotiationState::Connected
            } else {
                NegotiationState::AnswerReceived
            };
        }
        info!("Answer from {} applied", tag);

        self.run_pending_renegotiation(peer_id).await;
    }

    /// Set the remote description, then apply queued candidates in the
    /// order they arrived.
    async fn apply_remote_description(
        &mut self,
        peer_id: &SessionId,
        desc: SessionDescription,
    ) -> Result<()> {
        let entry = self
            .peers
            .get_mut(peer_id)
            .ok_or_else(|| anyhow!("no connection"))?;

        entry.connection.set_remote_description(desc).await?;
        entry.remote_description_set = true;

        let queued = std::mem::take(&mut entry.pending_candidates);
        if !queued.is_empty() {
            debug!("Applying {} queued candidates for {}", queued.len(), entry.tag);
        }
        for candidate in queued {
            if let Err(e) = entry.connection.add_ice_candidate(candidate).await {
                warn!("Error adding queued ICE candidate for {}: {:#}", entry.tag, e);
            }
        }
        Ok(())
    }

    async fn on_ice_candidate(&mut self, peer_id: &SessionId, candidate: IceCandidate) {
        let Some(entry) = self.peers.get_mut(peer_id) else {
            debug!("ICE candidate from {} without a connection, dropping", peer_id.short());
            return;
        };

        if !entry.remote_description_set {
            debug!("Queueing ICE candidate for {}", entry.tag);
            entry.pending_candidates.push(candidate);
            return;
        }

        if let Err(e) = entry.connection.add_ice_candidate(candidate).await {
            warn!("Error adding ICE candidate for {}: {:#}", entry.tag, e);
        }
    }

    async fn run_pending_renegotiation(&mut self, peer_id: &SessionId) {
        let pending = self
            .peers
            .get(peer_id)
            .is_some_and(|e| e.renegotiation_pending);
        if pending {
            debug!("Running deferred renegotiation with {}", peer_id.short());
            self.start_offer(peer_id).await;
        }
    }

    fn on_user_left(&mut self, peer_id: &SessionId) {
        info!("User left: {}", peer_id.short());
        self.cancel_pending_offer(peer_id);
        self.schedule_teardown(peer_id, TeardownReason::PeerLeft);
    }

    fn cancel_pending_offer(&mut self, peer_id: &SessionId) {
        if let Some((_, handle)) = self.pending_offers.remove(peer_id) {
            debug!("Cancelled scheduled offer to {}", peer_id.short());
            handle.abort();
        }
    }

    fn token(&mut self) -> u64 {
        self.next_token += 1;
        self.next_token
    }

    fn schedule_teardown(&mut self, peer_id: &SessionId, reason: TeardownReason) {
        let token = self.next_token + 1;
        let Some(entry) = self.peers.get_mut(peer_id) else {
            return;
        };

        if let Some(pending) = entry.teardown.as_mut() {
            if reason == TeardownReason::PeerLeft {
                pending.reason = reason;
            }
            return;
        }

        self.next_token = token;
        entry.teardown = Some(PendingTeardown { reason, token });
        let tag = entry.tag.clone();
        debug!("Tearing down {} in {:?} ({:?})", tag, self.grace, reason);

        let grace = self.grace;
        let timer_tx = self.timer_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            let _ = timer_tx.send(PeerTimer::TeardownDue(tag, token));
        });
    }

    async fn teardown_due(&mut self, tag: ConnectionTag, token: u64) {
        let due = self.peers.get(&tag.session_id).is_some_and(|entry| {
            entry.tag == tag && entry.teardown.is_some_and(|pending| pending.token == token)
        });
        if due {
            self.remove_peer(&tag.session_id).await;
        }
    }

    async fn handle_transport_event(&mut self, event: TransportEvent) {
        let tag = event.tag().clone();
        let current = self
            .peers
            .get(&tag.session_id)
            .is_some_and(|entry| entry.tag == tag);
        if !current {
            debug!("Ignoring event from stale connection {}", tag);
            return;
        }

        match event {
            TransportEvent::StateChanged(_, state) => self.on_connection_state(&tag, state),
            TransportEvent::CandidateGenerated(_, candidate) => {
                if let Err(e) = self.signaling.send_ice(&tag.session_id, candidate).await {
                    warn!("ICE candidate for {} was not delivered: {}", tag, e);
                }
            }
            TransportEvent::TrackReceived(_, track) => {
                debug!("Received {} track {} from {}", track.kind, track.id, tag);
                if self.streams.add_track(&tag.session_id, track) {
                    info!("Remote stream added for {}", tag);
                    let _ = self
                        .events
                        .send(CallEvent::StreamAdded(tag.session_id.clone()));
                }
            }
        }
    }

    fn on_connection_state(&mut self, tag: &ConnectionTag, state: ConnectionState) {
        let Some(entry) = self.peers.get_mut(&tag.session_id) else {
            return;
        };
        entry.connection_state = state;

        match state {
            ConnectionState::Connected => {
                if matches!(
                    entry.negotiation,
                    NegotiationState::AnswerReceived | NegotiationState::AnswerSent
                ) {
                    entry.negotiation = NegotiationState::Connected;
                }
            }
            ConnectionState::Failed => entry.negotiation = NegotiationState::Failed,
            ConnectionState::Closed => entry.negotiation = NegotiationState::Closed,
            _ => {}
        }

        let recovered = matches!(
            state,
            ConnectionState::Connected | ConnectionState::Connecting
        );
        if recovered
            && entry
                .teardown
                .is_some_and(|pending| pending.reason == TeardownReason::ConnectionLost)
        {
            info!("{} recovered, keeping it", tag);
            entry.teardown = None;
        }

        let _ = self
            .events
            .send(CallEvent::PeerStateChanged(tag.session_id.clone(), state));

        if state.is_down() {
            self.schedule_teardown(&tag.session_id, TeardownReason::ConnectionLost);
        }
    }

    /// Close and forget the peer's connection and stream.
    async fn remove_peer(&mut self, peer_id: &SessionId) {
        self.cancel_pending_offer(peer_id);

        if self.streams.remove(peer_id).is_some() {
            info!("Removing remote stream of {}", peer_id.short());
            let _ = self.events.send(CallEvent::StreamRemoved(peer_id.clone()));
        }

        if let Some(entry) = self.peers.remove(peer_id) {
            info!("Removing peer connection {}", entry.tag);
            if let Err(e) = entry.connection.close().await {
                warn!("Error closing connection {}: {:#}", entry.tag, e);
            }
            let _ = self.events.send(CallEvent::PeerRemoved(peer_id.clone()));
        }
    }

    /// A new capture exists. Its tracks go to every connection, which
    /// renegotiates where a track family is new to it.
    pub async fn attach_tracks(&mut self, tracks: Vec<LocalTrack>) {
        if self.peers.is_empty() {
            debug!("No connections yet, tracks will be added on connect");
        } else {
            info!(
                "Adding {} local tracks to {} existing connections",
                tracks.len(),
                self.peers.len()
            );
        }
        self.distribute(tracks).await;
    }

    /// A device track was swapped for a new one of the same kind. Senders
    /// swap it in place; only a connection without such a sender renegotiates.
    pub async fn replace_track(&mut self, track: LocalTrack) {
        info!("Replacing local {} track {}", track.kind(), track.id());
        self.distribute(vec![track]).await;
    }

    async fn distribute(&mut self, tracks: Vec<LocalTrack>) {
        for track in &tracks {
            self.local_tracks.retain(|t| t.kind() != track.kind());
            self.local_tracks.push(track.clone());
        }

        let peer_ids: Vec<SessionId> = self.peers.keys().cloned().collect();
        for peer_id in peer_ids {
            let Some(entry) = self.peers.get(&peer_id) else {
                continue;
            };
            if entry.is_winding_down() {
                continue;
            }

            let mut renegotiate = false;
            for track in &tracks {
                match send_track(entry.connection.as_ref(), track).await {
                    Ok(added) => renegotiate |= added,
                    Err(e) => warn!(
                        "Error sending local {} track to {}: {:#}",
                        track.kind(),
                        entry.tag,
                        e
                    ),
                }
            }

            if renegotiate {
                self.start_offer(&peer_id).await;
            }
        }
    }

    /// Close every connection and cancel every scheduled offer.
    pub async fn close_all(&mut self) {
        for (_, (_, handle)) in self.pending_offers.drain() {
            handle.abort();
        }

        let peer_ids: Vec<SessionId> = self.peers.keys().cloned().collect();
        for peer_id in peer_ids {
            self.remove_peer(&peer_id).await;
        }
        self.streams.clear();
        self.local_tracks.clear();
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    pub fn remote_streams(&self) -> HashMap<SessionId, RemoteStream> {
        self.streams.to_map()
    }

    pub fn peer_statuses(&self) -> BTreeMap<SessionId, PeerStatus> {
        self.peers
            .iter()
            .map(|(id, entry)| {
                (
                    id.clone(),
                    PeerStatus {
                        negotiation: entry.negotiation,
                        connection: entry.connection_state,
                    },
                )
            })
            .collect()
    }

    pub fn summary(&self) -> ConnectionSummary {
        let mut summary = ConnectionSummary {
            total_connections: self.peers.len(),
            remote_streams: self.streams.len(),
            ..Default::default()
        };

        for entry in self.peers.values() {
            match entry.connection_state {
                ConnectionState::Connected => summary.connected_peers += 1,
                ConnectionState::New | ConnectionState::Connecting => {
                    summary.connecting_peers += 1
                }
                _ => summary.failed_peers += 1,
            }
        }
        summary
    }
}

async fn create_local_offer(connection: &dyn RtcConnection) -> Result<SessionDescription> {
    let offer = connection.create_offer().await?;
    connection.set_local_description(offer.clone()).await?;
    Ok(offer)
}

async fn create_local_answer(connection: &dyn RtcConnection) -> Result<SessionDescription> {
    let answer = connection.create_answer().await?;
    connection.set_local_description(answer.clone()).await?;
    Ok(answer)
}

/// Swap `track` into an existing sender, or add it. Returns true when it was
/// added, which means the connection has to renegotiate.
async fn send_track(connection: &dyn RtcConnection, track: &LocalTrack) -> Result<bool> {
    if connection.replace_track(track).await? {
        return Ok(false);
    }
    connection.add_track(track).await?;
    Ok(true)
}
