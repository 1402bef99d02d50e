//! Audio capture pipeline for transcription
//!
//! ```text
//!   host audio thread                 main context
//!   ─────────────────                 ────────────
//!   samples ─► AudioWorklet ─ chunk port ─► forwarder ─► audio-data
//!              (AudioProcessor)  (bounded)    (Transcriber)
//! ```
//!
//! The processor windows, measures, resamples and quantizes; the worklet is
//! the only piece that runs on the real-time thread.

pub mod dsp;
pub mod processor;
pub mod transcriber;
pub mod transcript;
pub mod worklet;

pub use processor::{AudioChunk, AudioProcessor};
pub use transcriber::Transcriber;
pub use transcript::{recognizer_locale, TranscriptEntry, TranscriptLog};
pub use worklet::{AudioWorklet, ChunkReceiver};
