//! Statistics and metrics for conferencing sessions

use std::time::{Duration, Instant};

/// Loudness classification used for capture telemetry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioLevel {
    /// RMS above 0.01
    Good,
    /// RMS above 0.001
    Okay,
    /// Anything quieter
    TooQuiet,
}

impl AudioLevel {
    /// Classify a window by RMS amplitude
    pub fn classify(rms: f32) -> Self {
        if rms > 0.01 {
            AudioLevel::Good
        } else if rms > 0.001 {
            AudioLevel::Okay
        } else {
            AudioLevel::TooQuiet
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AudioLevel::Good => "good",
            AudioLevel::Okay => "okay",
            AudioLevel::TooQuiet => "too quiet",
        }
    }
}

impl std::fmt::Display for AudioLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session-level statistics
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    /// Producers published through the send transport
    pub producers_created: u64,
    /// Producers that failed to publish
    pub produce_failures: u64,
    /// Consumers created through the recv transport
    pub consumers_created: u64,
    /// Announcements that failed to consume
    pub consume_failures: u64,
    /// Announcements held before the session was ready
    pub announcements_queued: u64,
    /// Peers torn down
    pub peers_removed: u64,
    /// Time from join to ready
    pub time_to_ready: Option<Duration>,
}

impl SessionStats {
    /// Create new stats tracker
    pub fn new() -> Self {
        Self::default()
    }
}

/// Capture tally kept by the forwarder
///
/// Produced and dropped counts come from the chunks themselves, so they lag
/// by whatever the worklet lost after the last delivered chunk.
#[derive(Debug)]
pub struct CaptureCounters {
    started_at: Instant,
    chunks_produced: u64,
    chunks_dropped: u64,
    chunks_forwarded: u64,
    bytes_forwarded: u64,
}

impl Default for CaptureCounters {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureCounters {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            chunks_produced: 0,
            chunks_dropped: 0,
            chunks_forwarded: 0,
            bytes_forwarded: 0,
        }
    }

    /// Take the worklet's running counts from a received chunk
    pub(crate) fn record_received(&mut self, chunk_count: u64, dropped_before: u64) {
        self.chunks_produced = chunk_count;
        self.chunks_dropped = dropped_before;
    }

    pub(crate) fn record_forwarded(&mut self, bytes: usize) {
        self.chunks_forwarded += 1;
        self.bytes_forwarded += bytes as u64;
    }

    /// Point-in-time copy of the counters
    pub fn snapshot(&self) -> CaptureStats {
        CaptureStats {
            chunks_produced: self.chunks_produced,
            chunks_dropped: self.chunks_dropped,
            chunks_forwarded: self.chunks_forwarded,
            bytes_forwarded: self.bytes_forwarded,
            duration: self.started_at.elapsed(),
        }
    }
}

/// Capture pipeline statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptureStats {
    /// Windows completed by the processor
    pub chunks_produced: u64,
    /// Windows dropped because the port was full or closed
    pub chunks_dropped: u64,
    /// Windows sent to the signaling channel
    pub chunks_forwarded: u64,
    /// Payload bytes sent
    pub bytes_forwarded: u64,
    /// Time since capture started
    pub duration: Duration,
}

impl CaptureStats {
    /// Forwarded payload bitrate in bits per second
    pub fn bitrate(&self) -> u64 {
        let secs = self.duration.as_secs();
        if secs > 0 {
            (self.bytes_forwarded * 8) / secs
        } else {
            0
        }
    }
}
