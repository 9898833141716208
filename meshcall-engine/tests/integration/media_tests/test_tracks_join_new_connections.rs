use meshcall_core::{RoomName, SignalKind};
use meshcall_engine::{MediaKind, MemorySignalStore};

use crate::integration::{init_tracing, join_test_session};
use crate::utils::{RemotePeer, advance, eventually};

#[tokio::test(start_paused = true)]
async fn test_tracks_join_new_connections() {
    init_tracing();

    let store = MemorySignalStore::new();
    let room = RoomName::from("Lobby");
    let session = join_test_session(&store, &room, "session-a").await;
    let bob = RemotePeer::new(&store, &room, "session-b");

    assert!(
        session
            .orchestrator
            .request_permissions()
            .await
            .expect("permissions")
    );

    // Bob arrives after our capture exists
    bob.offer(&session.me, "bob-offer-1").await;
    eventually("an answer to bob", || {
        bob.received(SignalKind::Answer).len() == 1
    })
    .await;
    advance(500).await;

    let connection = session.connection_to(&bob.id).await;
    let mut kinds = connection.sender_kinds();
    kinds.sort_by_key(|kind| *kind == MediaKind::Video);
    assert_eq!(kinds, vec![MediaKind::Audio, MediaKind::Video]);
    assert!(
        bob.received_offers().is_empty(),
        "Tracks present at creation need no renegotiation"
    );
}
