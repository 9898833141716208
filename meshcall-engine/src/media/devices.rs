use crate::error::DeviceError;
use crate::media::MediaCapture;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoConstraints {
    pub width: u32,
    pub height: u32,
}

/// What to ask the devices for. Mirrors `getUserMedia` constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaConstraints {
    pub video: Option<VideoConstraints>,
    pub audio: bool,
}

impl MediaConstraints {
    pub fn camera_and_microphone(video: VideoConstraints) -> Self {
        Self {
            video: Some(video),
            audio: true,
        }
    }

    pub fn camera_only(video: VideoConstraints) -> Self {
        Self {
            video: Some(video),
            audio: false,
        }
    }
}

/// Access to the local camera and microphone.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Acquire live device tracks matching `constraints`. May prompt the user.
    async fn get_user_media(
        &self,
        constraints: MediaConstraints,
    ) -> Result<MediaCapture, DeviceError>;
}
