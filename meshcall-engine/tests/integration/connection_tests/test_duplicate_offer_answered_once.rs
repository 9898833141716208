use meshcall_core::{RoomName, SignalKind};
use meshcall_engine::MemorySignalStore;

use crate::integration::{init_tracing, join_test_session};
use crate::utils::{RemotePeer, advance, eventually};

#[tokio::test(start_paused = true)]
async fn test_duplicate_offer_answered_once() {
    init_tracing();

    let store = MemorySignalStore::new();
    let room = RoomName::from("Lobby");
    let session = join_test_session(&store, &room, "session-a").await;
    let bob = RemotePeer::new(&store, &room, "session-b");

    bob.offer(&session.me, "bob-offer-1").await;
    bob.offer(&session.me, "bob-offer-1").await;

    eventually("an answer to bob", || {
        bob.received(SignalKind::Answer).len() == 1
    })
    .await;
    advance(500).await;

    let connection = session.connection_to(&bob.id).await;
    assert_eq!(bob.received(SignalKind::Answer).len(), 1);
    assert_eq!(connection.answers_created(), 1);
    assert_eq!(connection.remote_offers(), vec!["bob-offer-1".to_owned()]);

    // A different offer is a renegotiation and gets its own answer
    bob.offer(&session.me, "bob-offer-2").await;
    eventually("a second answer", || {
        bob.received(SignalKind::Answer).len() == 2
    })
    .await;
    assert_eq!(session.connector.connections_for(&bob.id).len(), 1);
}
