use meshcall_core::{RoomName, SignalKind};
use meshcall_engine::{MemorySignalStore, NegotiationState};

use crate::integration::{OFFER_DELAY_MS, init_tracing, join_test_session};
use crate::utils::{RemotePeer, advance, eventually};

#[tokio::test(start_paused = true)]
async fn test_offer_racing_user_joined() {
    init_tracing();

    let store = MemorySignalStore::new();
    let room = RoomName::from("Lobby");
    let session = join_test_session(&store, &room, "session-a").await;
    let bob = RemotePeer::new(&store, &room, "session-b");

    // Bob announces himself and offers right away
    bob.join("bob").await;
    bob.offer(&session.me, "bob-offer-1").await;

    eventually("an answer to bob", || {
        bob.received(SignalKind::Answer).len() == 1
    })
    .await;

    // Outlive the offer timer that the announcement scheduled
    advance(OFFER_DELAY_MS * 5).await;

    assert_eq!(
        session.connector.connections_for(&bob.id).len(),
        1,
        "Announcement and offer must share one connection"
    );
    assert!(
        bob.received_offers().is_empty(),
        "No offer of our own once theirs was answered"
    );
    assert_eq!(
        session.snapshot().peers[&bob.id].negotiation,
        NegotiationState::AnswerSent
    );
}
