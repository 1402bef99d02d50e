//! Capture sources
//!
//! The platform's camera, microphone and screen capture live behind
//! [`MediaSource`]. Failures come back as [`DeviceError`] so the caller can
//! tell a denied permission from a missing device.

use async_trait::async_trait;

use super::stream::MediaStream;
use crate::error::DeviceError;

/// Audio processing constraints for microphone capture
#[derive(Debug, Clone, PartialEq)]
pub struct AudioConstraints {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
    /// Preferred capture sample rate; the platform may pick another
    pub sample_rate: Option<u32>,
}

impl Default for AudioConstraints {
    fn default() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
            sample_rate: None,
        }
    }
}

impl AudioConstraints {
    /// Unprocessed microphone audio, as speech recognizers prefer it
    pub fn raw(sample_rate: u32) -> Self {
        Self {
            echo_cancellation: false,
            noise_suppression: false,
            auto_gain_control: false,
            sample_rate: Some(sample_rate),
        }
    }
}

/// Constraints for camera/microphone capture
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureConstraints {
    /// Capture a camera track
    pub video: bool,
    /// Capture a microphone track
    pub audio: Option<AudioConstraints>,
}

impl CaptureConstraints {
    /// Camera plus microphone with default processing
    pub fn camera_and_microphone() -> Self {
        Self {
            video: true,
            audio: Some(AudioConstraints::default()),
        }
    }

    /// Microphone only
    pub fn microphone(audio: AudioConstraints) -> Self {
        Self {
            video: false,
            audio: Some(audio),
        }
    }
}

/// Constraints for screen capture
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayConstraints {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    /// Also capture system/tab audio
    pub audio: bool,
}

impl Default for DisplayConstraints {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            frame_rate: 30,
            audio: true,
        }
    }
}

/// Platform capture provider
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Open camera and/or microphone
    async fn user_media(&self, constraints: &CaptureConstraints)
        -> Result<MediaStream, DeviceError>;

    /// Open a screen capture
    async fn display_media(
        &self,
        constraints: &DisplayConstraints,
    ) -> Result<MediaStream, DeviceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_audio_disables_processing() {
        let raw = AudioConstraints::raw(16_000);

        assert!(!raw.echo_cancellation);
        assert!(!raw.noise_suppression);
        assert!(!raw.auto_gain_control);
        assert_eq!(raw.sample_rate, Some(16_000));
    }

    #[test]
    fn test_display_defaults() {
        let display = DisplayConstraints::default();

        assert_eq!((display.width, display.height, display.frame_rate), (1920, 1080, 30));
        assert!(display.audio);
    }
}
