use anyhow::Result;
use colored::*;
use futures::future::join_all;
use meshcall_core::{Participant, RoomName};
use meshcall_engine::{
    CallSnapshot, EngineConfig, MemorySignalStore, SessionOrchestrator, SyntheticDevices,
    WebrtcConnector,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// A participant wired to the shared in-process store and the real
/// webrtc-rs backend.
pub fn participant(
    store: &MemorySignalStore,
    config: &EngineConfig,
    name: impl Into<String>,
) -> SessionOrchestrator {
    SessionOrchestrator::new(
        Participant::new(name),
        Arc::new(store.clone()),
        Arc::new(WebrtcConnector::new(config.transport.clone())),
        Arc::new(SyntheticDevices::new()),
        config.clone(),
    )
}

/// Join, grant media and switch camera and microphone on.
pub async fn join_with_media(orchestrator: &mut SessionOrchestrator, room: &RoomName) -> Result<()> {
    orchestrator.join_room(room.clone()).await?;
    orchestrator.request_permissions().await?;
    orchestrator.toggle_audio().await?;
    orchestrator.toggle_video().await?;
    Ok(())
}

pub async fn run(config: EngineConfig, room: String, peers: usize, seconds: u64) -> Result<()> {
    let store = MemorySignalStore::new();
    let room = RoomName::new(room);
    let mut participants = Vec::with_capacity(peers);

    for i in 0..peers {
        let mut orchestrator = participant(&store, &config, format!("peer-{}", i + 1));
        join_with_media(&mut orchestrator, &room).await?;
        println!(
            "  {} {} joined '{}'",
            "→".cyan(),
            orchestrator.participant().name(),
            room
        );
        participants.push(orchestrator);
        tokio::time::sleep(Duration::from_millis(500)).await;
    }

    let deadline = Instant::now() + Duration::from_secs(seconds);
    let mut ticker = tokio::time::interval(Duration::from_secs(2));
    while Instant::now() < deadline {
        ticker.tick().await;
        println!("{}", "── mesh status ──".dimmed());
        for orchestrator in &participants {
            print_status(orchestrator.participant().name(), &orchestrator.snapshot());
        }
    }

    println!("{}", "👋 Everyone leaves".yellow());
    join_all(participants.iter_mut().map(|p| p.leave_room())).await;
    Ok(())
}

pub fn print_status(name: &str, snapshot: &CallSnapshot) {
    let summary = snapshot.summary;
    let health = format!("{}/{} connected", summary.connected_peers, summary.total_connections);
    let health = if summary.failed_peers > 0 {
        health.red()
    } else if summary.connecting_peers > 0 {
        health.yellow()
    } else {
        health.green()
    };

    let flag = |on: bool| if on { "on".green() } else { "off".dimmed() };
    println!(
        "  {:<10} {}  streams: {}  video: {}  audio: {}{}",
        name.bold(),
        health,
        summary.remote_streams,
        flag(snapshot.video_enabled),
        flag(snapshot.audio_enabled),
        snapshot
            .error
            .as_ref()
            .map(|e| format!("  error: {}", e.red()))
            .unwrap_or_default()
    );
}
