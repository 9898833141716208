use meshcall_core::RoomName;
use meshcall_engine::{ConnectionState, MemorySignalStore, SignalingState};

use crate::integration::{create_test_session, init_tracing};
use crate::utils::{advance, eventually};

#[tokio::test(start_paused = true)]
async fn test_simultaneous_joins_converge() {
    init_tracing();

    let store = MemorySignalStore::new();
    let room = RoomName::from("Lobby");
    let mut alice = create_test_session(&store, "session-a");
    let mut bob = create_test_session(&store, "session-b");

    // Both subscribe before either announces, so each hears the other and
    // both offer after the same delay
    alice
        .orchestrator
        .join_room(room.clone())
        .await
        .expect("alice failed to join");
    bob.orchestrator
        .join_room(room.clone())
        .await
        .expect("bob failed to join");

    eventually("both sides to hold a connection", || {
        alice.connector.open_for(&bob.me).len() == 1 && bob.connector.open_for(&alice.me).len() == 1
    })
    .await;
    advance(3000).await;

    assert_eq!(alice.connector.connections_for(&bob.me).len(), 1);
    assert_eq!(bob.connector.connections_for(&alice.me).len(), 1);

    let alice_side = alice.connection_to(&bob.me).await;
    let bob_side = bob.connection_to(&alice.me).await;

    // Whichever way the race went, exactly one side ends up holding an
    // answer, and it is the answer to that side's latest offer. Answers to
    // rolled back offers are never applied.
    eventually("one answer to apply", || {
        alice_side.remote_answers().len() + bob_side.remote_answers().len() == 1
    })
    .await;
    let (offerer, answerer) = if bob_side.remote_answers().is_empty() {
        (&alice_side, &bob_side)
    } else {
        (&bob_side, &alice_side)
    };
    assert_eq!(
        offerer.remote_answers(),
        vec![format!("answer {} #{}", answerer.tag, answerer.answers_created())]
    );
    assert_eq!(
        answerer.remote_offers().last(),
        Some(&format!("offer {} #{}", offerer.tag, offerer.offers_created()))
    );
    assert_eq!(alice_side.current_signaling_state(), SignalingState::Stable);
    assert_eq!(bob_side.current_signaling_state(), SignalingState::Stable);

    alice_side.emit_state(ConnectionState::Connected).await;
    bob_side.emit_state(ConnectionState::Connected).await;

    eventually("both sides connected", || {
        alice.snapshot().summary.connected_peers == 1 && bob.snapshot().summary.connected_peers == 1
    })
    .await;
    assert_eq!(alice.snapshot().summary.total_connections, 1);
    assert_eq!(bob.snapshot().summary.total_connections, 1);

    futures::future::join_all([alice.orchestrator.leave_room(), bob.orchestrator.leave_room()])
        .await;
    assert!(alice_side.is_closed());
    assert!(bob_side.is_closed());
}
