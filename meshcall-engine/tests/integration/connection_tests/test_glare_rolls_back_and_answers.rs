use meshcall_core::{RoomName, SignalKind};
use meshcall_engine::{MemorySignalStore, NegotiationState, SignalingState};

use crate::integration::{init_tracing, join_test_session};
use crate::utils::{RemotePeer, advance, eventually};

#[tokio::test(start_paused = true)]
async fn test_glare_rolls_back_and_answers() {
    init_tracing();

    let store = MemorySignalStore::new();
    let room = RoomName::from("Lobby");
    let session = join_test_session(&store, &room, "session-a").await;
    let bob = RemotePeer::new(&store, &room, "session-b");

    bob.join("bob").await;
    eventually("our offer to bob", || bob.received_offers().len() == 1).await;
    let connection = session.connection_to(&bob.id).await;

    // Bob offered at the same time
    bob.offer(&session.me, "bob-offer-1").await;
    eventually("an answer to bob", || {
        bob.received(SignalKind::Answer).len() == 1
    })
    .await;

    assert_eq!(connection.rollbacks(), 1);
    assert_eq!(connection.current_signaling_state(), SignalingState::Stable);
    assert_eq!(
        session.connector.connections_for(&bob.id).len(),
        1,
        "The connection object is reused"
    );

    // Bob's answer to our discarded offer
    bob.answer(&session.me, "answer-to-rolled-back-offer").await;
    advance(500).await;

    assert!(connection.remote_answers().is_empty());
    assert_eq!(bob.received_offers().len(), 1);
    assert_eq!(
        session.snapshot().peers[&bob.id].negotiation,
        NegotiationState::AnswerSent
    );
}

#[tokio::test(start_paused = true)]
async fn test_glare_recreates_connection_when_rollback_fails() {
    init_tracing();

    let store = MemorySignalStore::new();
    let room = RoomName::from("Lobby");
    let session = join_test_session(&store, &room, "session-a").await;
    session.connector.set_fail_rollback(true);
    let bob = RemotePeer::new(&store, &room, "session-b");

    bob.join("bob").await;
    eventually("our offer to bob", || bob.received_offers().len() == 1).await;
    let first = session.connection_to(&bob.id).await;

    bob.offer(&session.me, "bob-offer-1").await;
    eventually("an answer to bob", || {
        bob.received(SignalKind::Answer).len() == 1
    })
    .await;

    assert!(first.is_closed());
    assert_eq!(session.connector.connections_for(&bob.id).len(), 2);
    let second = session.connection_to(&bob.id).await;
    assert_eq!(second.remote_offers(), vec!["bob-offer-1".to_owned()]);
    assert_eq!(second.tag.generation, first.tag.generation + 1);
}

#[tokio::test(start_paused = true)]
async fn test_glare_larger_id_reoffers_after_stale_answer() {
    init_tracing();

    let store = MemorySignalStore::new();
    let room = RoomName::from("Lobby");
    let session = join_test_session(&store, &room, "session-b").await;
    let alice = RemotePeer::new(&store, &room, "session-a");

    alice.join("alice").await;
    eventually("our offer to alice", || alice.received_offers().len() == 1).await;
    let connection = session.connection_to(&alice.id).await;

    alice.offer(&session.me, "alice-offer-1").await;
    eventually("an answer to alice", || {
        alice.received(SignalKind::Answer).len() == 1
    })
    .await;
    assert_eq!(connection.rollbacks(), 1);

    // No new offer while alice's answer to the discarded one is pending
    advance(500).await;
    assert_eq!(alice.received_offers().len(), 1);

    alice
        .answer(&session.me, "answer-to-rolled-back-offer")
        .await;
    eventually("a fresh offer to alice", || {
        alice.received_offers().len() == 2
    })
    .await;

    assert!(connection.remote_answers().is_empty());
    assert_eq!(
        session.snapshot().peers[&alice.id].negotiation,
        NegotiationState::OfferSent
    );

    let fresh = alice.received_offers()[1].clone();
    alice.answer(&session.me, "answer-to-fresh-offer").await;
    eventually("the fresh answer to apply", || {
        connection.remote_answers().len() == 1
    })
    .await;

    assert_eq!(connection.remote_answers(), vec!["answer-to-fresh-offer".to_owned()]);
    assert_eq!(fresh, format!("offer {} #2", connection.tag));
    assert_eq!(connection.current_signaling_state(), SignalingState::Stable);
    assert_eq!(
        session.snapshot().peers[&alice.id].negotiation,
        NegotiationState::AnswerReceived
    );
    assert_eq!(session.connector.connections_for(&alice.id).len(), 1);
}
