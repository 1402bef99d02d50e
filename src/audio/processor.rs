//! Windowed capture processor
//!
//! Accumulates mono input into fixed windows of 100 ms at the native rate.
//! Each full window is measured (RMS, dBFS), resampled to the target rate if
//! needed, quantized to PCM16 and emitted as one [`AudioChunk`].
//!
//! All buffers are sized on the first callback, once the native rate is known.
//! After that the only allocation per window is the chunk's own copy of the
//! encoded bytes, which the receiver then owns outright.

use std::time::Duration;

use bytes::Bytes;

use super::dsp;

/// One encoded window
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    /// Little-endian PCM16 samples at `output_sample_rate`
    pub data: Bytes,

    /// Number of samples in `data`
    pub samples: usize,

    /// 1-based running counter
    pub chunk_count: u64,

    /// Chunks the capture side dropped before this one
    pub dropped_before: u64,

    /// RMS of the native window
    pub rms: f32,

    /// Loudness of the native window
    pub dbfs: f32,

    /// Capture rate
    pub sample_rate: u32,

    /// Rate of `data`
    pub output_sample_rate: u32,

    /// Whether `data` was resampled
    pub resampled: bool,
}

impl AudioChunk {
    /// Duration covered by this chunk
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples as f64 / f64::from(self.output_sample_rate))
    }
}

/// Buffers sized once the native rate is known
#[derive(Debug)]
struct Buffers {
    native_rate: u32,
    window: Vec<f32>,
    filled: usize,
    resampled: Vec<f32>,
    pcm: Vec<u8>,
}

/// Real-time window processor
#[derive(Debug)]
pub struct AudioProcessor {
    target_rate: u32,
    window_duration: Duration,
    buffers: Option<Buffers>,
    chunk_count: u64,
}

impl AudioProcessor {
    /// Create a processor producing `target_rate` output in windows of `window_duration`
    pub fn new(target_rate: u32, window_duration: Duration) -> Self {
        Self {
            target_rate,
            window_duration,
            buffers: None,
            chunk_count: 0,
        }
    }

    /// Window length in samples, once initialized
    pub fn window_len(&self) -> Option<usize> {
        self.buffers.as_ref().map(|b| b.window.len())
    }

    /// Chunks emitted so far
    pub fn chunk_count(&self) -> u64 {
        self.chunk_count
    }

    fn init(&mut self, native_rate: u32) -> &mut Buffers {
        let target_rate = self.target_rate;
        let window_duration = self.window_duration;

        self.buffers.get_or_insert_with(|| {
            let window_len =
                ((f64::from(native_rate) * window_duration.as_secs_f64()).floor() as usize).max(1);
            let out_len = dsp::resampled_len(window_len, native_rate, target_rate);

            tracing::debug!(
                native_rate = native_rate,
                target_rate = target_rate,
                window_len = window_len,
                output_len = out_len,
                "Audio processor initialized"
            );

            Buffers {
                native_rate,
                window: vec![0.0; window_len],
                filled: 0,
                resampled: Vec::with_capacity(out_len),
                pcm: Vec::with_capacity(out_len * 2),
            }
        })
    }

    /// Feed one callback's worth of samples
    ///
    /// `native_rate` is read on the first call only; the window is fixed from
    /// then on. `emit` runs once per completed window, in order.
    pub fn process<F>(&mut self, input: &[f32], native_rate: u32, mut emit: F)
    where
        F: FnMut(AudioChunk),
    {
        if input.is_empty() {
            return;
        }

        let target_rate = self.target_rate;
        let mut remaining = input;

        while !remaining.is_empty() {
            let next_count = self.chunk_count + 1;
            let buffers = self.init(native_rate);
            let space = buffers.window.len() - buffers.filled;
            let take = space.min(remaining.len());

            buffers.window[buffers.filled..buffers.filled + take]
                .copy_from_slice(&remaining[..take]);
            buffers.filled += take;
            remaining = &remaining[take..];

            if buffers.filled == buffers.window.len() {
                let chunk = Self::flush(buffers, target_rate, next_count);
                self.chunk_count = next_count;
                emit(chunk);
            }
        }
    }

    fn flush(buffers: &mut Buffers, target_rate: u32, chunk_count: u64) -> AudioChunk {
        let rms = dsp::rms(&buffers.window);
        let dbfs = dsp::dbfs(rms);
        let resampled = buffers.native_rate != target_rate;

        dsp::resample_linear(
            &buffers.window,
            buffers.native_rate,
            target_rate,
            &mut buffers.resampled,
        );
        dsp::encode_pcm16(&buffers.resampled, &mut buffers.pcm);
        buffers.filled = 0;

        AudioChunk {
            // Independent copy: the scratch buffer is reused for the next window
            data: Bytes::copy_from_slice(&buffers.pcm),
            samples: buffers.resampled.len(),
            chunk_count,
            dropped_before: 0,
            rms,
            dbfs,
            sample_rate: buffers.native_rate,
            output_sample_rate: target_rate,
            resampled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processor() -> AudioProcessor {
        AudioProcessor::new(16_000, Duration::from_millis(100))
    }

    #[test]
    fn test_48k_constant_half_scale() {
        let mut proc = processor();
        let mut chunks = Vec::new();

        proc.process(&vec![0.5; 4800], 48_000, |c| chunks.push(c));

        assert_eq!(chunks.len(), 1);
        let chunk = &chunks[0];
        assert_eq!(chunk.samples, 1600);
        assert_eq!(chunk.data.len(), 3200);
        assert!(chunk.resampled);
        assert!((chunk.rms - 0.5).abs() < 1e-6);
        assert!((chunk.dbfs - (-6.02)).abs() < 0.01);

        for pair in chunk.data.chunks_exact(2) {
            let sample = i16::from_le_bytes([pair[0], pair[1]]);
            assert!((sample as f32 / 32767.0 - 0.5).abs() < 1e-3);
        }
    }

    #[test]
    fn test_windows_span_callbacks() {
        let mut proc = processor();
        let mut chunks = Vec::new();

        // 128-sample render quanta, like a browser audio worklet
        for _ in 0..100 {
            proc.process(&[0.1; 128], 48_000, |c| chunks.push(c));
        }

        // 12800 samples = 2 full windows of 4800, 3200 left over
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chunk_count, 1);
        assert_eq!(chunks[1].chunk_count, 2);
        assert_eq!(proc.window_len(), Some(4800));
    }

    #[test]
    fn test_native_target_rate_no_resample() {
        let mut proc = processor();
        let mut chunks = Vec::new();

        proc.process(&vec![0.0; 1600], 16_000, |c| chunks.push(c));

        let chunk = &chunks[0];
        assert!(!chunk.resampled);
        assert_eq!(chunk.samples, 1600);
        assert_eq!(chunk.rms, 0.0);
        assert_eq!(chunk.dbfs, dsp::DBFS_FLOOR);
        assert_eq!(chunk.duration(), Duration::from_millis(100));
    }

    #[test]
    fn test_window_fixed_at_first_callback() {
        let mut proc = processor();
        let mut chunks = Vec::new();

        proc.process(&[0.0; 10], 44_100, |c| chunks.push(c));
        // A later rate change does not resize the window
        proc.process(&vec![0.0; 4400], 48_000, |c| chunks.push(c));

        assert_eq!(proc.window_len(), Some(4410));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].sample_rate, 44_100);
        assert_eq!(chunks[0].samples, 1600);
    }

    #[test]
    fn test_chunk_data_is_independent() {
        let mut proc = processor();
        let mut chunks = Vec::new();

        proc.process(&vec![0.25; 1600], 16_000, |c| chunks.push(c));
        proc.process(&vec![-0.25; 1600], 16_000, |c| chunks.push(c));

        let first = i16::from_le_bytes([chunks[0].data[0], chunks[0].data[1]]);
        let second = i16::from_le_bytes([chunks[1].data[0], chunks[1].data[1]]);
        assert!(first > 0);
        assert!(second < 0);
    }

    #[test]
    fn test_empty_input_does_not_initialize() {
        let mut proc = processor();
        proc.process(&[], 48_000, |_| panic!("no chunk expected"));

        assert_eq!(proc.window_len(), None);
    }
}
