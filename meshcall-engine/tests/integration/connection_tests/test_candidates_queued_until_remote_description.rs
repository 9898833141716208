use meshcall_core::{RoomName, SignalKind};
use meshcall_engine::MemorySignalStore;

use crate::integration::{init_tracing, join_test_session};
use crate::utils::{RemotePeer, advance, eventually};

#[tokio::test(start_paused = true)]
async fn test_candidates_queued_until_remote_description() {
    init_tracing();

    let store = MemorySignalStore::new();
    let room = RoomName::from("Lobby");
    let session = join_test_session(&store, &room, "session-a").await;
    let bob = RemotePeer::new(&store, &room, "session-b");
    let carol = RemotePeer::new(&store, &room, "session-c");

    bob.join("bob").await;
    eventually("an offer to bob", || bob.received_offers().len() == 1).await;
    let connection = session.connection_to(&bob.id).await;

    // Candidates overtaking the answer
    bob.candidate(&session.me, "candidate-1").await;
    bob.candidate(&session.me, "candidate-2").await;
    advance(200).await;
    assert!(
        connection.applied_candidates().is_empty(),
        "Candidates must wait for the remote description"
    );

    bob.answer(&session.me, "bob-answer-1").await;
    eventually("queued candidates to be applied", || {
        connection.applied_candidates().len() == 2
    })
    .await;
    assert_eq!(
        connection.applied_candidates(),
        vec!["candidate-1".to_owned(), "candidate-2".to_owned()]
    );

    bob.candidate(&session.me, "candidate-3").await;
    eventually("a direct candidate", || {
        connection.applied_candidates().len() == 3
    })
    .await;
    advance(200).await;
    assert_eq!(
        connection.applied_candidates(),
        vec![
            "candidate-1".to_owned(),
            "candidate-2".to_owned(),
            "candidate-3".to_owned()
        ],
        "Every candidate is applied exactly once, in order"
    );

    // Candidate from someone we have no connection with
    carol.candidate(&session.me, "candidate-x").await;
    advance(200).await;
    assert!(session.connector.connections_for(&carol.id).is_empty());

    // Our own candidates go to bob only
    connection.emit_candidate("local-1").await;
    eventually("our candidate to reach bob", || {
        bob.received(SignalKind::IceCandidate).len() == 1
    })
    .await;
    assert!(carol.received(SignalKind::IceCandidate).is_empty());
}
