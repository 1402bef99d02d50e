//! Real-time capture callback
//!
//! [`AudioWorklet`] is what the host's audio thread owns. It runs the
//! processor and hands each chunk to the main context over a bounded port.
//! Nothing here blocks: a full port drops the chunk and counts it. The port is
//! the only thing shared with the main context, so drop counts travel on the
//! next chunk that makes it through.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::processor::{AudioChunk, AudioProcessor};
use crate::config::AudioConfig;

/// Receiving end of the chunk port
pub type ChunkReceiver = mpsc::Receiver<AudioChunk>;

/// Capture callback state
#[derive(Debug)]
pub struct AudioWorklet {
    processor: AudioProcessor,
    native_rate: u32,
    port: mpsc::Sender<AudioChunk>,
    dropped: u64,
}

impl AudioWorklet {
    /// Create a worklet for a track capturing at `native_rate`
    pub fn new(config: &AudioConfig, native_rate: u32) -> (Self, ChunkReceiver) {
        let (port, rx) = mpsc::channel(config.chunk_capacity.max(1));
        let worklet = Self {
            processor: AudioProcessor::new(config.target_sample_rate, config.window),
            native_rate,
            port,
            dropped: 0,
        };
        (worklet, rx)
    }

    /// Process one render quantum
    ///
    /// Returns false once the receiving side is gone; the host should stop
    /// calling after that.
    pub fn process(&mut self, input: &[f32]) -> bool {
        let port = &self.port;
        let dropped = &mut self.dropped;
        let mut open = !port.is_closed();

        self.processor.process(input, self.native_rate, |mut chunk| {
            chunk.dropped_before = *dropped;
            match port.try_send(chunk) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => *dropped += 1,
                Err(TrySendError::Closed(_)) => {
                    *dropped += 1;
                    open = false;
                }
            }
        });

        open
    }

    pub fn native_rate(&self) -> u32 {
        self.native_rate
    }

    pub fn chunk_count(&self) -> u64 {
        self.processor.chunk_count()
    }

    /// Chunks lost to a full or closed port
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worklet(capacity: usize) -> (AudioWorklet, ChunkReceiver) {
        let config = AudioConfig::default().chunk_capacity(capacity);
        AudioWorklet::new(&config, 48_000)
    }

    #[tokio::test]
    async fn test_chunks_arrive_in_order() {
        let (mut w, mut rx) = worklet(8);

        for _ in 0..3 {
            assert!(w.process(&vec![0.2; 4800]));
        }

        for expected in 1..=3 {
            let chunk = rx.recv().await.unwrap();
            assert_eq!(chunk.chunk_count, expected);
            assert_eq!(chunk.samples, 1600);
            assert_eq!(chunk.dropped_before, 0);
        }
    }

    #[tokio::test]
    async fn test_full_port_drops_and_counts() {
        let (mut w, mut rx) = worklet(1);

        w.process(&vec![0.2; 4800 * 3]);
        assert_eq!(w.chunk_count(), 3);
        assert_eq!(w.dropped(), 2);

        let first = rx.recv().await.unwrap();
        assert_eq!(first.chunk_count, 1);
        assert_eq!(first.dropped_before, 0);

        // The next delivered chunk reports what was lost in between
        w.process(&vec![0.2; 4800]);
        let next = rx.recv().await.unwrap();
        assert_eq!(next.chunk_count, 4);
        assert_eq!(next.dropped_before, 2);
    }

    #[test]
    fn test_closed_port_reports_done() {
        let (mut w, rx) = worklet(4);
        drop(rx);

        assert!(!w.process(&vec![0.2; 4800]));
        assert_eq!(w.dropped(), 1);
    }
}
