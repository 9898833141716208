use meshcall_core::{RoomName, SignalKind};
use meshcall_engine::MemorySignalStore;

use crate::integration::{OFFER_DELAY_MS, init_tracing, join_test_session};
use crate::utils::{RemotePeer, advance};

#[tokio::test(start_paused = true)]
async fn test_user_left_cancels_scheduled_offer() {
    init_tracing();

    let store = MemorySignalStore::new();
    let room = RoomName::from("Lobby");
    let session = join_test_session(&store, &room, "session-a").await;
    let bob = RemotePeer::new(&store, &room, "session-b");

    bob.join("bob").await;
    advance(OFFER_DELAY_MS / 2).await;
    bob.leave().await;
    advance(OFFER_DELAY_MS * 5).await;

    assert_eq!(session.connector.count(), 0);
    assert!(bob.received(SignalKind::Offer).is_empty());
    assert!(session.snapshot().peers.is_empty());

    // A later announcement schedules a fresh offer
    bob.join("bob").await;
    advance(OFFER_DELAY_MS * 2).await;
    assert_eq!(bob.received_offers().len(), 1);
    assert_eq!(session.connector.count(), 1);
}
