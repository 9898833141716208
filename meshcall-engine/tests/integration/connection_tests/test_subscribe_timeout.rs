use meshcall_core::RoomName;
use meshcall_engine::{EngineError, MemorySignalStore, TransportError};

use crate::integration::{create_test_session, init_tracing};
use crate::utils::eventually;

#[tokio::test(start_paused = true)]
async fn test_subscribe_timeout() {
    init_tracing();

    let store = MemorySignalStore::new();
    let room = RoomName::from("Lobby");
    let mut session = create_test_session(&store, "session-a");

    store.set_stall_subscriptions(true);
    let result = session.orchestrator.join_room(room.clone()).await;
    assert!(
        matches!(
            result,
            Err(EngineError::Transport(TransportError::SubscribeTimeout(_, _)))
        ),
        "Unexpected join result: {:?}",
        result
    );

    let snapshot = session.snapshot();
    assert!(!snapshot.initialized);
    assert!(snapshot.error.is_some());
    assert!(matches!(
        session.orchestrator.toggle_video().await,
        Err(EngineError::NotInRoom)
    ));

    // Retrying the whole join works once the store answers again
    store.set_stall_subscriptions(false);
    session
        .orchestrator
        .join_room(room)
        .await
        .expect("Retry should succeed");
    eventually("the session to initialize", || {
        session.snapshot().initialized
    })
    .await;
    assert!(session.snapshot().error.is_none());
}
