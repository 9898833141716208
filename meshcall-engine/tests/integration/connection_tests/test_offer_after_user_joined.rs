use meshcall_core::RoomName;
use meshcall_engine::{MemorySignalStore, NegotiationState, SignalingState};

use crate::integration::{OFFER_DELAY_MS, init_tracing, join_test_session};
use crate::utils::{RemotePeer, advance, eventually};

#[tokio::test(start_paused = true)]
async fn test_offer_after_user_joined() {
    init_tracing();

    let store = MemorySignalStore::new();
    let room = RoomName::from("Lobby");
    let session = join_test_session(&store, &room, "session-a").await;
    let bob = RemotePeer::new(&store, &room, "session-b");

    bob.join("bob").await;
    // Redelivered announcement must not schedule a second offer
    bob.join("bob").await;

    advance(OFFER_DELAY_MS / 2).await;
    assert!(
        session.connector.connections_for(&bob.id).is_empty(),
        "No connection before the offer delay is over"
    );

    eventually("an offer to bob", || bob.received_offers().len() == 1).await;
    advance(OFFER_DELAY_MS * 5).await;

    assert_eq!(bob.received_offers().len(), 1, "Exactly one offer expected");
    assert_eq!(session.connector.connections_for(&bob.id).len(), 1);

    let connection = session.connection_to(&bob.id).await;
    assert_eq!(
        connection.current_signaling_state(),
        SignalingState::HaveLocalOffer
    );
    assert_eq!(
        session.snapshot().peers[&bob.id].negotiation,
        NegotiationState::OfferSent
    );
}
