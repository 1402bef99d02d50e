//! Session and capture configuration

use std::time::Duration;

use crate::media::{CaptureConstraints, DisplayConstraints};
use crate::rtc::RtpCapabilities;

/// Rate expected by the transcription service
pub const TRANSCRIPTION_SAMPLE_RATE: u32 = 16_000;

/// Capture pipeline configuration
#[derive(Debug, Clone)]
pub struct AudioConfig {
    /// Output sample rate of every chunk
    pub target_sample_rate: u32,

    /// Duration of one chunk at the native rate
    pub window: Duration,

    /// Native rate assumed when the track does not report one
    pub fallback_sample_rate: u32,

    /// Chunks buffered between the capture callback and the forwarder
    pub chunk_capacity: usize,

    /// Log the audio level every N chunks (0 = never)
    pub level_log_interval: u64,

    /// Warn about a too-quiet microphone every N chunks (0 = never)
    pub quiet_warn_interval: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: TRANSCRIPTION_SAMPLE_RATE,
            window: Duration::from_millis(100),
            fallback_sample_rate: 48_000,
            chunk_capacity: 64,
            level_log_interval: 50,
            quiet_warn_interval: 100,
        }
    }
}

impl AudioConfig {
    /// Set the output sample rate
    pub fn target_sample_rate(mut self, rate: u32) -> Self {
        self.target_sample_rate = rate;
        self
    }

    /// Set the chunk duration
    pub fn window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Set the chunk port capacity
    pub fn chunk_capacity(mut self, capacity: usize) -> Self {
        self.chunk_capacity = capacity.max(1);
        self
    }

    /// Disable level logging
    pub fn disable_level_log(mut self) -> Self {
        self.level_log_interval = 0;
        self.quiet_warn_interval = 0;
        self
    }
}

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Capacity of the driver command channel
    pub command_capacity: usize,

    /// Language announced when the caller gives none
    pub default_language: String,

    /// Codecs this endpoint can send and receive
    pub local_capabilities: RtpCapabilities,

    /// Camera/microphone capture constraints
    pub capture: CaptureConstraints,

    /// Screen capture constraints
    pub display: DisplayConstraints,

    /// Transcription capture settings
    pub audio: AudioConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            command_capacity: 64,
            default_language: "en".to_string(),
            local_capabilities: RtpCapabilities::browser_default(),
            capture: CaptureConstraints::camera_and_microphone(),
            display: DisplayConstraints::default(),
            audio: AudioConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Set the command channel capacity
    pub fn command_capacity(mut self, capacity: usize) -> Self {
        self.command_capacity = capacity.max(1);
        self
    }

    /// Set the default language
    pub fn default_language(mut self, language: impl Into<String>) -> Self {
        self.default_language = language.into();
        self
    }

    /// Set the local codec capabilities
    pub fn local_capabilities(mut self, capabilities: RtpCapabilities) -> Self {
        self.local_capabilities = capabilities;
        self
    }

    /// Set the camera/microphone constraints
    pub fn capture(mut self, constraints: CaptureConstraints) -> Self {
        self.capture = constraints;
        self
    }

    /// Set the screen capture constraints
    pub fn display(mut self, constraints: DisplayConstraints) -> Self {
        self.display = constraints;
        self
    }

    /// Set the transcription capture settings
    pub fn audio(mut self, audio: AudioConfig) -> Self {
        self.audio = audio;
        self
    }
}
