use meshcall_core::{RoomName, SignalKind};
use meshcall_engine::MemorySignalStore;

use crate::integration::{init_tracing, join_test_session};
use crate::utils::{RemotePeer, advance, eventually, rows_from};

#[tokio::test(start_paused = true)]
async fn test_leave_then_join_does_not_leak() {
    init_tracing();

    let store = MemorySignalStore::new();
    let lobby = RoomName::from("Lobby");
    let kitchen = RoomName::from("Kitchen");
    let mut session = join_test_session(&store, &lobby, "session-a").await;
    let bob = RemotePeer::new(&store, &lobby, "session-b");
    let carol = RemotePeer::new(&store, &kitchen, "session-c");

    bob.offer(&session.me, "bob-offer-1").await;
    eventually("an answer to bob", || {
        bob.received(SignalKind::Answer).len() == 1
    })
    .await;
    let bob_connection = session.connection_to(&bob.id).await;

    session.orchestrator.leave_room().await;

    assert_eq!(
        rows_from(&store, &lobby, &session.me, SignalKind::UserLeft).len(),
        1
    );
    assert!(bob_connection.is_closed());
    assert_eq!(store.subscriber_count(&lobby), 0);
    let snapshot = session.snapshot();
    assert!(snapshot.room.is_none());
    assert!(snapshot.peers.is_empty());
    assert!(session.orchestrator.participant().room().is_none());

    session
        .orchestrator
        .join_room(kitchen.clone())
        .await
        .expect("Failed to join kitchen");
    eventually("the kitchen session", || session.snapshot().initialized).await;

    // Lobby keeps talking to us after we left
    bob.offer(&session.me, "bob-offer-2").await;
    bob.join("bob").await;
    advance(2000).await;
    assert_eq!(
        session.connector.connections_for(&bob.id).len(),
        1,
        "No new connection from the old room"
    );
    assert_eq!(bob.received(SignalKind::Answer).len(), 1);

    carol.offer(&session.me, "carol-offer-1").await;
    eventually("an answer to carol", || {
        carol.received(SignalKind::Answer).len() == 1
    })
    .await;
    assert_eq!(session.snapshot().room, Some(kitchen));
    assert_eq!(session.snapshot().peers.len(), 1);
}
