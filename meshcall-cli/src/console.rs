use crate::simulation::{join_with_media, participant, print_status};
use anyhow::Result;
use colored::*;
use dialoguer::{Input, Select};
use meshcall_core::RoomName;
use meshcall_engine::{CallEvent, EngineConfig, MemorySignalStore};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

const ACTIONS: [&str; 6] = [
    "Toggle video",
    "Toggle audio",
    "Request permissions",
    "Show status",
    "Switch room",
    "Quit",
];

async fn choose_action() -> Result<usize> {
    let choice = tokio::task::spawn_blocking(|| {
        Select::new()
            .with_prompt("What now?")
            .items(&ACTIONS)
            .default(3)
            .interact()
    })
    .await??;
    Ok(choice)
}

async fn ask_room() -> Result<String> {
    let room = tokio::task::spawn_blocking(|| {
        Input::<String>::new()
            .with_prompt("Room")
            .interact_text()
    })
    .await??;
    Ok(room)
}

pub async fn run(config: EngineConfig, room: String, name: String, peers: usize) -> Result<()> {
    let store = MemorySignalStore::new();
    let room = RoomName::new(room);

    let mut colleagues = Vec::with_capacity(peers);
    for i in 0..peers {
        let mut colleague = participant(&store, &config, format!("colleague-{}", i + 1));
        join_with_media(&mut colleague, &room).await?;
        colleagues.push(colleague);
    }
    info!("{} simulated colleagues are in '{}'", colleagues.len(), room);

    let mut me = participant(&store, &config, name);
    let mut events = me.subscribe_events();
    tokio::spawn(async move {
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(missed)) => {
                    warn!("Skipped {} call events", missed);
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            match event {
                CallEvent::StreamAdded(id) => {
                    println!("{} stream from {}", "+".green(), id.short())
                }
                CallEvent::StreamRemoved(id) => {
                    println!("{} stream from {}", "-".red(), id.short())
                }
                CallEvent::PeerStateChanged(id, state) => {
                    info!("Connection to {} is {}", id.short(), state)
                }
                CallEvent::PeerRemoved(id) => info!("Connection to {} removed", id.short()),
            }
        }
    });

    me.join_room(room).await?;
    println!("{}", "📞 Joined. Use the menu to control your media.".green().bold());

    loop {
        match choose_action().await? {
            0 => match me.toggle_video().await {
                Ok(on) => println!("Video is now {}", if on { "on" } else { "off" }),
                Err(e) => println!("{} {}", "Video toggle failed:".red(), e),
            },
            1 => match me.toggle_audio().await {
                Ok(on) => println!("Audio is now {}", if on { "on" } else { "off" }),
                Err(e) => println!("{} {}", "Audio toggle failed:".red(), e),
            },
            2 => match me.request_permissions().await {
                Ok(_) => println!("Camera and microphone ready, both off"),
                Err(e) => println!("{} {}", "Permission request failed:".red(), e),
            },
            3 => {
                print_status(me.participant().name(), &me.snapshot());
                for colleague in &colleagues {
                    print_status(colleague.participant().name(), &colleague.snapshot());
                }
            }
            4 => {
                let room = RoomName::new(ask_room().await?);
                if let Err(e) = me.join_room(room).await {
                    println!("{} {}", "Could not join:".red(), e);
                }
            }
            _ => break,
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    println!("{}", "👋 Leaving".yellow());
    me.leave_room().await;
    for colleague in &mut colleagues {
        colleague.leave_room().await;
    }
    Ok(())
}
