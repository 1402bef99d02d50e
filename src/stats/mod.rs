//! Session and capture statistics

pub mod metrics;

pub use metrics::{AudioLevel, CaptureCounters, CaptureStats, SessionStats};
