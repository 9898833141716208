use meshcall_core::{RoomName, SignalKind};
use meshcall_engine::{MemorySignalStore, NegotiationState};

use crate::integration::{init_tracing, join_test_session};
use crate::utils::{RemotePeer, advance, eventually};

#[tokio::test(start_paused = true)]
async fn test_send_failure_is_non_fatal() {
    init_tracing();

    let store = MemorySignalStore::new();
    let room = RoomName::from("Lobby");
    let session = join_test_session(&store, &room, "session-a").await;
    let bob = RemotePeer::new(&store, &room, "session-b");

    bob.offer(&session.me, "bob-offer-1").await;
    store.set_reject_appends(true);

    let connection = session.connection_to(&bob.id).await;
    eventually("our answer attempt", || connection.answers_created() == 1).await;
    advance(200).await;

    assert!(bob.received(SignalKind::Answer).is_empty());
    assert!(!connection.is_closed());
    let snapshot = session.snapshot();
    assert!(snapshot.initialized);
    assert_eq!(
        snapshot.peers[&bob.id].negotiation,
        NegotiationState::AnswerSent
    );

    store.set_reject_appends(false);
    bob.candidate(&session.me, "candidate-1").await;
    eventually("the candidate to be applied", || {
        connection.applied_candidates().len() == 1
    })
    .await;
}
