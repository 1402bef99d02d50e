//! Media track handle
//!
//! A [`MediaTrack`] stands in for a capture or playback track owned by the
//! platform media stack. Handles are cheap to clone; every clone refers to
//! the same underlying track.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::DeviceError;

/// Kind of media carried by a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Audio track
    Audio,
    /// Video track
    Video,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Audio => write!(f, "audio"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// Hook run once when a track is stopped, releasing the platform resource
pub type StopHook = Box<dyn FnOnce() -> Result<(), DeviceError> + Send>;

struct TrackInner {
    id: String,
    kind: MediaKind,
    label: String,
    sample_rate: Option<u32>,
    enabled: AtomicBool,
    ended: watch::Sender<bool>,
    on_stop: Mutex<Option<StopHook>>,
}

/// Shared handle to a single audio or video track
#[derive(Clone)]
pub struct MediaTrack {
    inner: Arc<TrackInner>,
}

impl MediaTrack {
    /// Create a live, enabled track with a random id
    pub fn new(kind: MediaKind, label: impl Into<String>) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), kind, label)
    }

    /// Create a live, enabled track with a known id
    pub fn with_id(id: impl Into<String>, kind: MediaKind, label: impl Into<String>) -> Self {
        let (ended, _) = watch::channel(false);
        Self {
            inner: Arc::new(TrackInner {
                id: id.into(),
                kind,
                label: label.into(),
                sample_rate: None,
                enabled: AtomicBool::new(true),
                ended,
                on_stop: Mutex::new(None),
            }),
        }
    }

    /// Record the capture sample rate reported by the platform (audio only)
    ///
    /// Must be called before the handle is cloned.
    pub fn sample_rate(mut self, rate: u32) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.sample_rate = Some(rate);
        }
        self
    }

    /// Attach a hook that releases the underlying device on stop
    pub fn on_stop(self, hook: StopHook) -> Self {
        *self.inner.on_stop.lock() = Some(hook);
        self
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn kind(&self) -> MediaKind {
        self.inner.kind
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Capture sample rate, if known
    pub fn settings_sample_rate(&self) -> Option<u32> {
        self.inner.sample_rate
    }

    /// Whether the track currently carries media (false = muted)
    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.inner.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Whether the track has been stopped
    pub fn is_ended(&self) -> bool {
        *self.inner.ended.borrow()
    }

    /// Stop the track
    ///
    /// Idempotent. The track is marked ended even when the release hook fails.
    pub fn stop(&self) -> Result<(), DeviceError> {
        if self.inner.ended.send_replace(true) {
            return Ok(());
        }
        let hook = self.inner.on_stop.lock().take();
        match hook {
            Some(hook) => hook(),
            None => Ok(()),
        }
    }

    /// Resolves once the track has ended
    pub async fn ended(&self) {
        let mut rx = self.inner.ended.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|ended| *ended).await;
    }

    /// Whether two handles refer to the same track
    pub fn same_track(&self, other: &MediaTrack) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for MediaTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaTrack")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("enabled", &self.is_enabled())
            .field("ended", &self.is_ended())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[test]
    fn test_stop_is_idempotent() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let track = MediaTrack::new(MediaKind::Video, "camera").on_stop(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));

        assert!(!track.is_ended());
        track.stop().unwrap();
        track.stop().unwrap();

        assert!(track.is_ended());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_hook_still_ends_track() {
        let track = MediaTrack::new(MediaKind::Audio, "mic")
            .on_stop(Box::new(|| Err(DeviceError::Other("driver hung".into()))));

        assert!(track.stop().is_err());
        assert!(track.is_ended());
    }

    #[test]
    fn test_enabled_shared_across_clones() {
        let track = MediaTrack::new(MediaKind::Audio, "mic");
        let clone = track.clone();

        clone.set_enabled(false);
        assert!(!track.is_enabled());
        assert!(track.same_track(&clone));
    }

    #[tokio::test]
    async fn test_ended_resolves_after_stop() {
        let track = MediaTrack::new(MediaKind::Video, "screen");
        let waiter = track.clone();
        let handle = tokio::spawn(async move { waiter.ended().await });

        track.stop().unwrap();
        handle.await.unwrap();
    }

    #[test]
    fn test_sample_rate_setting() {
        let track = MediaTrack::new(MediaKind::Audio, "mic").sample_rate(48_000);
        assert_eq!(track.settings_sample_rate(), Some(48_000));
    }
}
