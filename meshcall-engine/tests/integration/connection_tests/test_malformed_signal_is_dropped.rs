use meshcall_core::{RoomName, SignalKind};
use meshcall_engine::MemorySignalStore;
use serde_json::json;

use crate::integration::{init_tracing, join_test_session};
use crate::utils::{RemotePeer, advance, eventually};

#[tokio::test(start_paused = true)]
async fn test_malformed_signal_is_dropped() {
    init_tracing();

    let store = MemorySignalStore::new();
    let room = RoomName::from("Lobby");
    let session = join_test_session(&store, &room, "session-a").await;
    let bob = RemotePeer::new(&store, &room, "session-b");

    bob.send_raw(SignalKind::Offer, json!({ "unexpected": true }), &session.me)
        .await;
    bob.send_raw(
        SignalKind::IceCandidate,
        json!({ "sdpMid": 0 }),
        &session.me,
    )
    .await;
    advance(200).await;

    assert_eq!(session.connector.count(), 0);
    assert!(session.snapshot().initialized, "Session keeps running");

    bob.offer(&session.me, "bob-offer-1").await;
    eventually("an answer to bob", || {
        bob.received(SignalKind::Answer).len() == 1
    })
    .await;
}
