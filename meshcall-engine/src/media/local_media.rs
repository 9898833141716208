use crate::config::EngineConfig;
use crate::error::DeviceError;
use crate::media::{
    LocalTrack, MediaCapture, MediaConstraints, MediaDevices, MediaKind, VideoConstraints,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// What the connections have to do after a local media change.
#[derive(Debug, Clone)]
pub enum MediaUpdate {
    /// A new capture exists: its tracks are a new family for every connection.
    Attached(Vec<LocalTrack>),

    /// A device track was swapped for a new one of the same kind.
    Replaced(LocalTrack),
}

/// Lazily acquired camera/microphone capture and its enabled flags.
pub struct LocalMedia {
    devices: Arc<dyn MediaDevices>,
    video: VideoConstraints,
    debounce: Duration,
    capture: Option<MediaCapture>,
    video_enabled: bool,
    audio_enabled: bool,
    permission_requested: bool,
    last_video_toggle: Option<Instant>,
}

impl LocalMedia {
    pub fn new(devices: Arc<dyn MediaDevices>, config: &EngineConfig) -> Self {
        Self {
            devices,
            video: VideoConstraints {
                width: config.video_width,
                height: config.video_height,
            },
            debounce: config.video_toggle_debounce(),
            capture: None,
            video_enabled: false,
            audio_enabled: false,
            permission_requested: false,
            last_video_toggle: None,
        }
    }

    pub fn video_enabled(&self) -> bool {
        self.video_enabled
    }

    pub fn audio_enabled(&self) -> bool {
        self.audio_enabled
    }

    pub fn permission_requested(&self) -> bool {
        self.permission_requested
    }

    pub fn capture(&self) -> Option<&MediaCapture> {
        self.capture.as_ref()
    }

    /// Tracks every connection should currently be sending.
    pub fn tracks(&self) -> Vec<LocalTrack> {
        self.capture
            .as_ref()
            .map(|c| c.tracks.clone())
            .unwrap_or_default()
    }

    /// Acquire camera and microphone unless a capture already exists. Fresh
    /// tracks start disabled so nobody is broadcast the moment permission
    /// is granted.
    pub async fn request_permissions(&mut self) -> Result<Option<MediaUpdate>, DeviceError> {
        if self.capture.is_some() {
            debug!("Media already available");
            return Ok(None);
        }

        info!("Requesting camera and microphone permissions");
        self.permission_requested = true;
        let capture = self
            .devices
            .get_user_media(MediaConstraints::camera_and_microphone(self.video))
            .await
            .inspect_err(|e| warn!("Failed to get media permissions: {}", e))?;

        for track in &capture.tracks {
            track.set_enabled(false);
        }
        info!(
            "Got media stream {} with {} tracks, all disabled",
            capture.stream_id,
            capture.tracks.len()
        );

        let tracks = capture.tracks.clone();
        self.capture = Some(capture);
        self.video_enabled = false;
        self.audio_enabled = false;
        Ok(Some(MediaUpdate::Attached(tracks)))
    }

    /// Flip the camera. Turning it off releases the device so its indicator
    /// goes dark; turning it on brings a live device track back.
    pub async fn toggle_video(&mut self) -> Result<(bool, Vec<MediaUpdate>), DeviceError> {
        let mut updates = Vec::new();
        if let Some(update) = self.request_permissions().await? {
            updates.push(update);
        } else if let Some(last) = self.last_video_toggle {
            if last.elapsed() < self.debounce {
                debug!("Ignoring video toggle inside debounce window");
                return Ok((self.video_enabled, updates));
            }
        }

        if self.video_enabled {
            if let Some(update) = self.disable_video().await {
                updates.push(update);
            }
        } else if let Some(update) = self.enable_video().await? {
            updates.push(update);
        }

        self.last_video_toggle = Some(Instant::now());
        info!("Video enabled: {}", self.video_enabled);
        Ok((self.video_enabled, updates))
    }

    async fn disable_video(&mut self) -> Option<MediaUpdate> {
        self.video_enabled = false;
        let capture = self.capture.as_mut()?;
        let current = capture.video()?.clone();
        current.set_enabled(false);
        current.stop();

        let replacement = match self
            .devices
            .get_user_media(MediaConstraints::camera_only(self.video))
            .await
        {
            Ok(fresh) => fresh.video().cloned(),
            Err(e) => {
                warn!("Could not acquire a replacement video track: {}", e);
                None
            }
        };

        let replacement = replacement?;
        replacement.set_enabled(false);
        capture.replace(replacement.clone());
        Some(MediaUpdate::Replaced(replacement))
    }

    async fn enable_video(&mut self) -> Result<Option<MediaUpdate>, DeviceError> {
        let Some(capture) = self.capture.as_mut() else {
            return Ok(None);
        };

        let held = capture.video().cloned();
        let update = match held {
            Some(track) if !track.is_stopped() => {
                track.set_enabled(true);
                None
            }
            _ => {
                let fresh = self
                    .devices
                    .get_user_media(MediaConstraints::camera_only(self.video))
                    .await?;
                let track = fresh
                    .video()
                    .cloned()
                    .ok_or(DeviceError::NotFound(MediaKind::Video))?;
                track.set_enabled(true);
                capture.replace(track.clone());
                Some(MediaUpdate::Replaced(track))
            }
        };

        self.video_enabled = true;
        Ok(update)
    }

    /// Mute or unmute the microphone. The device itself stays acquired.
    pub async fn toggle_audio(&mut self) -> Result<(bool, Option<MediaUpdate>), DeviceError> {
        let update = self.request_permissions().await?;

        let Some(track) = self.capture.as_ref().and_then(|c| c.audio()) else {
            warn!("No audio track to toggle");
            return Ok((false, update));
        };
        let enabled = !self.audio_enabled;
        track.set_enabled(enabled);
        self.audio_enabled = enabled;

        info!("Audio enabled: {}", enabled);
        Ok((enabled, update))
    }

    /// Stop every held track and forget the capture.
    pub fn stop(&mut self) {
        if let Some(capture) = self.capture.take() {
            for track in &capture.tracks {
                debug!("Stopping {} track {}", track.kind(), track.id());
            }
            capture.stop_all();
        }
        self.video_enabled = false;
        self.audio_enabled = false;
        self.permission_requested = false;
        self.last_video_toggle = None;
    }
}
