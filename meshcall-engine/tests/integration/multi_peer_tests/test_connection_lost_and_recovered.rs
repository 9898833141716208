use meshcall_core::{RoomName, SignalKind};
use meshcall_engine::{ConnectionState, MemorySignalStore, NegotiationState};

use crate::integration::{init_tracing, join_test_session};
use crate::utils::{RemotePeer, advance, eventually};

#[tokio::test(start_paused = true)]
async fn test_connection_lost_and_recovered() {
    init_tracing();

    let store = MemorySignalStore::new();
    let room = RoomName::from("Lobby");
    let session = join_test_session(&store, &room, "session-a").await;
    let bob = RemotePeer::new(&store, &room, "session-b");

    bob.offer(&session.me, "bob-offer-1").await;
    eventually("an answer to bob", || {
        bob.received(SignalKind::Answer).len() == 1
    })
    .await;
    let connection = session.connection_to(&bob.id).await;
    connection.emit_state(ConnectionState::Connected).await;
    eventually("bob to connect", || {
        session.snapshot().summary.connected_peers == 1
    })
    .await;
    assert_eq!(
        session.snapshot().peers[&bob.id].negotiation,
        NegotiationState::Connected
    );

    // A blip that heals inside the grace period
    connection.emit_state(ConnectionState::Disconnected).await;
    advance(500).await;
    assert_eq!(session.snapshot().summary.failed_peers, 1);
    connection.emit_state(ConnectionState::Connected).await;
    advance(1500).await;

    assert!(!connection.is_closed(), "Recovered connection must survive");
    assert_eq!(session.snapshot().summary.connected_peers, 1);

    // A real failure
    connection.emit_state(ConnectionState::Failed).await;
    advance(100).await;
    assert_eq!(
        session.snapshot().peers[&bob.id].negotiation,
        NegotiationState::Failed
    );

    advance(1000).await;
    eventually("bob's teardown", || session.snapshot().peers.is_empty()).await;
    assert!(connection.is_closed());
    assert_eq!(session.snapshot().summary.total_connections, 0);
}
