use crate::error::DeviceError;
use crate::media::{LocalTrack, MediaCapture, MediaConstraints, MediaDevices, MediaKind};
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;
use webrtc::media::Sample;

static PLACEHOLDER_FRAME: [u8; 160] = [0; 160];

const AUDIO_FRAME: Duration = Duration::from_millis(20);
const VIDEO_FRAME: Duration = Duration::from_millis(33);

/// Devices that produce placeholder frames instead of real capture. Useful
/// on headless machines and in simulations.
#[derive(Debug, Clone, Default)]
pub struct SyntheticDevices {
    deny: bool,
}

impl SyntheticDevices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Devices whose permission prompt is always refused.
    pub fn denying() -> Self {
        Self { deny: true }
    }

    fn spawn_pump(track: LocalTrack) {
        let frame = match track.kind() {
            MediaKind::Audio => AUDIO_FRAME,
            MediaKind::Video => VIDEO_FRAME,
        };

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(frame);
            loop {
                ticker.tick().await;
                if track.is_stopped() {
                    debug!("Synthetic {} track {} released", track.kind(), track.id());
                    break;
                }
                if !track.is_enabled() {
                    continue;
                }

                let sample = Sample {
                    data: Bytes::from_static(&PLACEHOLDER_FRAME),
                    duration: frame,
                    ..Default::default()
                };
                if let Err(e) = track.sample_track().write_sample(&sample).await {
                    debug!("Synthetic {} sample dropped: {}", track.kind(), e);
                }
            }
        });
    }
}

#[async_trait]
impl MediaDevices for SyntheticDevices {
    async fn get_user_media(
        &self,
        constraints: MediaConstraints,
    ) -> Result<MediaCapture, DeviceError> {
        if self.deny {
            return Err(DeviceError::PermissionDenied);
        }

        let stream_id = Uuid::new_v4().to_string();
        let mut tracks = Vec::new();
        if constraints.audio {
            tracks.push(LocalTrack::new(MediaKind::Audio, &stream_id));
        }
        if constraints.video.is_some() {
            tracks.push(LocalTrack::new(MediaKind::Video, &stream_id));
        }

        for track in &tracks {
            Self::spawn_pump(track.clone());
        }
        Ok(MediaCapture::new(stream_id, tracks))
    }
}
