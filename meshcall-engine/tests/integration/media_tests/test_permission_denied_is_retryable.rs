use meshcall_core::RoomName;
use meshcall_engine::{DeviceError, EngineError, MemorySignalStore};

use crate::integration::{create_test_session, init_tracing, join_test_session};
use crate::utils::eventually;

#[tokio::test(start_paused = true)]
async fn test_permission_denied_is_retryable() {
    init_tracing();

    let store = MemorySignalStore::new();
    let room = RoomName::from("Lobby");
    let session = join_test_session(&store, &room, "session-a").await;

    session.devices.set_deny(true);
    let result = session.orchestrator.request_permissions().await;
    assert!(matches!(
        result,
        Err(EngineError::Device(DeviceError::PermissionDenied))
    ));
    let result = session.orchestrator.toggle_video().await;
    assert!(matches!(
        result,
        Err(EngineError::Device(DeviceError::PermissionDenied))
    ));

    eventually("the error in the snapshot", || {
        session.snapshot().error.is_some()
    })
    .await;
    let snapshot = session.snapshot();
    assert!(!snapshot.video_enabled);
    assert!(!snapshot.audio_enabled);
    assert_eq!(session.devices.acquisitions(), 0);

    session.devices.set_deny(false);
    let granted = session
        .orchestrator
        .request_permissions()
        .await
        .expect("Retry should succeed");
    assert!(granted);
    eventually("the error to clear", || session.snapshot().error.is_none()).await;

    let snapshot = session.snapshot();
    assert!(snapshot.permission_requested);
    assert!(!snapshot.video_enabled, "Fresh tracks start disabled");
    assert!(!snapshot.audio_enabled, "Fresh tracks start disabled");
    assert_eq!(session.devices.acquisitions(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_toggle_outside_room() {
    init_tracing();

    let store = MemorySignalStore::new();
    let session = create_test_session(&store, "session-a");

    assert!(matches!(
        session.orchestrator.toggle_audio().await,
        Err(EngineError::NotInRoom)
    ));
    assert_eq!(session.devices.acquisitions(), 0);
}
