//! Transcription controller
//!
//! Opens an unprocessed microphone, builds the capture worklet for it and
//! forwards every chunk to the signaling channel as a binary `audio-data`
//! message, in the order the worklet produced them. Capture statistics are
//! built by the forwarder from the chunks it receives.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::processor::AudioChunk;
use super::transcript::recognizer_locale;
use super::worklet::{AudioWorklet, ChunkReceiver};
use crate::config::AudioConfig;
use crate::error::{DeviceError, Result};
use crate::media::{AudioConstraints, CaptureConstraints, MediaSource, MediaStream, MediaTrack};
use crate::signaling::protocol::StartTranscription;
use crate::signaling::{events, notify, SignalingChannel};
use crate::stats::{AudioLevel, CaptureCounters, CaptureStats};

/// Below this RMS the microphone is reported as too quiet
const QUIET_RMS: f32 = 0.001;

/// Running transcription
#[derive(Debug)]
pub struct Transcriber {
    room_id: String,
    locale: &'static str,
    mic: MediaStream,
    stats: watch::Receiver<CaptureStats>,
    forwarder: JoinHandle<()>,
}

impl Transcriber {
    /// Open the microphone and start forwarding
    ///
    /// Returns the worklet the host audio thread must drive with the
    /// microphone's samples. The service is told to start only once the
    /// forwarder is running.
    pub async fn start(
        signaling: Arc<dyn SignalingChannel>,
        source: &dyn MediaSource,
        config: &AudioConfig,
        room_id: &str,
        language: &str,
    ) -> Result<(Self, AudioWorklet)> {
        let constraints =
            CaptureConstraints::microphone(AudioConstraints::raw(config.target_sample_rate));
        let mic = source.user_media(&constraints).await?;

        let Some(track) = mic.audio_track() else {
            mic.stop();
            return Err(DeviceError::NotFound.into());
        };

        let native_rate = match track.settings_sample_rate() {
            Some(rate) => rate,
            None => {
                tracing::debug!(
                    fallback = config.fallback_sample_rate,
                    "Microphone reports no sample rate"
                );
                config.fallback_sample_rate
            }
        };

        tracing::info!(
            track = %track.label(),
            sample_rate = native_rate,
            target_rate = config.target_sample_rate,
            "Microphone opened for transcription"
        );

        let (worklet, rx) = AudioWorklet::new(config, native_rate);
        let (stats_tx, stats) = watch::channel(CaptureStats::default());
        let forwarder = tokio::spawn(forward(rx, signaling.clone(), stats_tx, config.clone()));

        let locale = recognizer_locale(language);
        let request = StartTranscription {
            room_id: room_id.to_string(),
            language_code: locale.to_string(),
        };
        if let Err(e) = notify(signaling.as_ref(), events::START_TRANSCRIPTION, &request) {
            forwarder.abort();
            mic.stop();
            return Err(e.into());
        }

        tracing::info!(
            room = %room_id,
            locale = locale,
            language = %language,
            "Transcription started"
        );

        let transcriber = Self {
            room_id: room_id.to_string(),
            locale,
            mic,
            stats,
            forwarder,
        };
        Ok((transcriber, worklet))
    }

    /// Stop forwarding, release the microphone and tell the service
    pub fn stop(self, signaling: &dyn SignalingChannel) -> Result<CaptureStats> {
        self.forwarder.abort();

        let failures = self.mic.stop();
        if failures > 0 {
            tracing::warn!(failures = failures, "Microphone failed to stop");
        }

        let stats = self.stats.borrow().clone();
        tracing::info!(
            room = %self.room_id,
            forwarded = stats.chunks_forwarded,
            dropped = stats.chunks_dropped,
            "Transcription stopped"
        );

        signaling.notify(events::STOP_TRANSCRIPTION, serde_json::Value::Null)?;
        Ok(stats)
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// Recognizer locale sent to the service
    pub fn locale(&self) -> &'static str {
        self.locale
    }

    pub fn microphone(&self) -> Option<MediaTrack> {
        self.mic.audio_track()
    }

    /// Statistics as of the last forwarded chunk
    pub fn stats(&self) -> CaptureStats {
        self.stats.borrow().clone()
    }

    /// Whether chunks are still being forwarded
    pub fn is_forwarding(&self) -> bool {
        !self.forwarder.is_finished()
    }
}

/// Forward chunks until the worklet goes away or the channel closes
async fn forward(
    mut rx: ChunkReceiver,
    signaling: Arc<dyn SignalingChannel>,
    stats: watch::Sender<CaptureStats>,
    config: AudioConfig,
) {
    let mut counters = CaptureCounters::new();

    while let Some(chunk) = rx.recv().await {
        log_level(&chunk, &config);
        counters.record_received(chunk.chunk_count, chunk.dropped_before);

        let size = chunk.data.len();
        if let Err(e) = signaling.send_binary(events::AUDIO_DATA, chunk.data) {
            tracing::warn!(error = %e, chunk = chunk.chunk_count, "Audio forwarding stopped");
            stats.send_replace(counters.snapshot());
            break;
        }
        counters.record_forwarded(size);
        stats.send_replace(counters.snapshot());
    }

    tracing::debug!("Audio forwarder finished");
}

fn log_level(chunk: &AudioChunk, config: &AudioConfig) {
    let n = chunk.chunk_count;

    if n == 1 {
        tracing::info!(
            sample_rate = chunk.sample_rate,
            resampled = chunk.resampled,
            samples = chunk.samples,
            "Audio pipeline initialized"
        );
    }

    if config.level_log_interval > 0 && n % config.level_log_interval == 0 {
        tracing::info!(
            dbfs = format_args!("{:.2}", chunk.dbfs),
            rms = format_args!("{:.4}", chunk.rms),
            level = %AudioLevel::classify(chunk.rms),
            "Audio level"
        );
    }

    if config.quiet_warn_interval > 0 && chunk.rms < QUIET_RMS && n % config.quiet_warn_interval == 0
    {
        tracing::warn!(
            dbfs = format_args!("{:.2}", chunk.dbfs),
            "Audio level very low, check microphone volume"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::dsp;
    use crate::error::Error;
    use crate::testing::{FakeSfu, FakeSource};

    #[tokio::test]
    async fn test_start_announces_locale() {
        let sfu = Arc::new(FakeSfu::new());
        let source = FakeSource::new().with_mic_rate(48_000);

        let (transcriber, worklet) =
            Transcriber::start(sfu.clone(), &source, &AudioConfig::default(), "room-1", "pt")
                .await
                .unwrap();

        assert_eq!(transcriber.locale(), "pt-BR");
        assert_eq!(worklet.native_rate(), 48_000);

        let starts = sfu.notifications(events::START_TRANSCRIPTION);
        assert_eq!(starts.len(), 1);
        assert_eq!(starts[0]["roomId"], "room-1");
        assert_eq!(starts[0]["languageCode"], "pt-BR");
    }

    #[tokio::test]
    async fn test_stop_releases_microphone() {
        let sfu = Arc::new(FakeSfu::new());
        let source = FakeSource::new();

        let (transcriber, _worklet) =
            Transcriber::start(sfu.clone(), &source, &AudioConfig::default(), "room-1", "en")
                .await
                .unwrap();
        let mic = transcriber.microphone().unwrap();

        tokio_test::assert_ok!(transcriber.stop(sfu.as_ref()));

        assert!(mic.is_ended());
        assert_eq!(sfu.notifications(events::STOP_TRANSCRIPTION).len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_rate_uses_fallback() {
        let sfu = Arc::new(FakeSfu::new());
        let source = FakeSource::new();

        let (_t, worklet) =
            Transcriber::start(sfu, &source, &AudioConfig::default(), "room-1", "en")
                .await
                .unwrap();

        assert_eq!(worklet.native_rate(), 48_000);
    }

    #[tokio::test]
    async fn test_permission_denied() {
        let sfu = Arc::new(FakeSfu::new());
        let source = FakeSource::new();
        source.fail_user_media(DeviceError::PermissionDenied);

        let result =
            Transcriber::start(sfu.clone(), &source, &AudioConfig::default(), "room-1", "en").await;

        let err = tokio_test::assert_err!(result);
        assert!(matches!(err, Error::Device(DeviceError::PermissionDenied)));
        assert!(sfu.notifications(events::START_TRANSCRIPTION).is_empty());
    }

    #[tokio::test]
    async fn test_forwarder_preserves_order() {
        let sfu = Arc::new(FakeSfu::new());
        let config = AudioConfig::default().disable_level_log();
        let (mut worklet, rx) = AudioWorklet::new(&config, 16_000);
        let (stats_tx, stats) = watch::channel(CaptureStats::default());

        let levels = [0.1f32, -0.2, 0.3];
        for level in levels {
            worklet.process(&vec![level; 1600]);
        }
        drop(worklet);

        forward(rx, sfu.clone(), stats_tx, config).await;

        let sent = sfu.binaries(events::AUDIO_DATA);
        assert_eq!(sent.len(), 3);
        for (data, level) in sent.iter().zip(levels) {
            assert_eq!(data.len(), 3200);
            let first = i16::from_le_bytes([data[0], data[1]]);
            assert_eq!(first, dsp::quantize(level));
        }
        let stats = stats.borrow().clone();
        assert_eq!(stats.chunks_forwarded, 3);
        assert_eq!(stats.chunks_produced, 3);
        assert_eq!(stats.bytes_forwarded, 9600);
    }

    #[tokio::test]
    async fn test_stats_built_from_chunks() {
        let sfu = Arc::new(FakeSfu::new());
        let config = AudioConfig::default().chunk_capacity(1).disable_level_log();
        let (mut worklet, rx) = AudioWorklet::new(&config, 16_000);
        let (stats_tx, mut stats) = watch::channel(CaptureStats::default());

        // One queued, two lost to the full port
        worklet.process(&vec![0.1; 1600 * 3]);
        let task = tokio::spawn(forward(rx, sfu.clone(), stats_tx, config));
        stats.wait_for(|s| s.chunks_forwarded == 1).await.unwrap();
        assert_eq!(stats.borrow().chunks_dropped, 0);

        worklet.process(&vec![0.1; 1600]);
        drop(worklet);
        task.await.unwrap();

        let stats = stats.borrow().clone();
        assert_eq!(stats.chunks_produced, 4);
        assert_eq!(stats.chunks_dropped, 2);
        assert_eq!(stats.chunks_forwarded, 2);
        assert_eq!(sfu.binaries(events::AUDIO_DATA).len(), 2);
    }
}
