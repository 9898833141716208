use meshcall_core::RoomName;
use meshcall_engine::MemorySignalStore;

use crate::integration::{init_tracing, join_test_session};
use crate::utils::{advance, eventually};

#[tokio::test(start_paused = true)]
async fn test_audio_round_trip_keeps_capture() {
    init_tracing();

    let store = MemorySignalStore::new();
    let room = RoomName::from("Lobby");
    let session = join_test_session(&store, &room, "session-a").await;

    let audio = &session.orchestrator;
    assert!(audio.toggle_audio().await.expect("audio on"));
    assert!(!audio.toggle_audio().await.expect("audio off"));
    advance(50).await;
    assert!(audio.toggle_audio().await.expect("audio on again"));

    assert_eq!(
        session.devices.acquisitions(),
        1,
        "Muting must not release the microphone"
    );
    eventually("audio on in the snapshot", || session.snapshot().audio_enabled).await;
    assert!(!session.snapshot().video_enabled);
}
