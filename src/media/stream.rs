//! Media stream (track bundle)
//!
//! A [`MediaStream`] groups tracks that render together. The handle keeps a
//! stable identity while tracks are added, so anything holding a clone (a
//! renderer, a peer snapshot) sees new tracks without resubscribing.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use super::track::{MediaKind, MediaTrack};

struct StreamInner {
    id: String,
    tracks: Mutex<Vec<MediaTrack>>,
}

/// Shared, growable set of tracks
#[derive(Clone)]
pub struct MediaStream {
    inner: Arc<StreamInner>,
}

impl MediaStream {
    /// Create an empty stream
    pub fn new() -> Self {
        Self::from_tracks(Vec::new())
    }

    /// Create a stream holding the given tracks
    pub fn from_tracks(tracks: Vec<MediaTrack>) -> Self {
        Self {
            inner: Arc::new(StreamInner {
                id: uuid::Uuid::new_v4().to_string(),
                tracks: Mutex::new(tracks),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Add a track; adding the same track twice is a no-op
    pub fn add_track(&self, track: MediaTrack) {
        let mut tracks = self.inner.tracks.lock();
        if !tracks.iter().any(|t| t.same_track(&track)) {
            tracks.push(track);
        }
    }

    /// Remove a track by id
    pub fn remove_track(&self, track_id: &str) -> Option<MediaTrack> {
        let mut tracks = self.inner.tracks.lock();
        let pos = tracks.iter().position(|t| t.id() == track_id)?;
        Some(tracks.remove(pos))
    }

    /// Snapshot of all tracks
    pub fn tracks(&self) -> Vec<MediaTrack> {
        self.inner.tracks.lock().clone()
    }

    /// First track of the given kind
    pub fn first(&self, kind: MediaKind) -> Option<MediaTrack> {
        self.inner
            .tracks
            .lock()
            .iter()
            .find(|t| t.kind() == kind)
            .cloned()
    }

    pub fn audio_track(&self) -> Option<MediaTrack> {
        self.first(MediaKind::Audio)
    }

    pub fn video_track(&self) -> Option<MediaTrack> {
        self.first(MediaKind::Video)
    }

    pub fn track_count(&self) -> usize {
        self.inner.tracks.lock().len()
    }

    /// Stop every track
    ///
    /// Keeps going when a track fails to stop. Returns the number of failures.
    pub fn stop(&self) -> usize {
        let mut failures = 0;
        for track in self.tracks() {
            if let Err(e) = track.stop() {
                failures += 1;
                tracing::warn!(
                    stream = %self.inner.id,
                    track = %track.id(),
                    error = %e,
                    "Failed to stop track"
                );
            }
        }
        failures
    }

    /// Whether two handles refer to the same stream
    pub fn same_stream(&self, other: &MediaStream) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for MediaStream {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaStream")
            .field("id", &self.inner.id)
            .field("tracks", &*self.inner.tracks.lock())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeviceError;

    #[test]
    fn test_add_track_keeps_identity() {
        let stream = MediaStream::new();
        let view = stream.clone();

        stream.add_track(MediaTrack::new(MediaKind::Video, "cam"));
        stream.add_track(MediaTrack::new(MediaKind::Audio, "mic"));

        assert!(view.same_stream(&stream));
        assert_eq!(view.track_count(), 2);
        assert!(view.audio_track().is_some());
        assert!(view.video_track().is_some());
    }

    #[test]
    fn test_duplicate_track_ignored() {
        let stream = MediaStream::new();
        let track = MediaTrack::new(MediaKind::Audio, "mic");

        stream.add_track(track.clone());
        stream.add_track(track);

        assert_eq!(stream.track_count(), 1);
    }

    #[test]
    fn test_stop_continues_past_failure() {
        let bad = MediaTrack::new(MediaKind::Video, "cam")
            .on_stop(Box::new(|| Err(DeviceError::Other("busy".into()))));
        let good = MediaTrack::new(MediaKind::Audio, "mic");
        let stream = MediaStream::from_tracks(vec![bad.clone(), good.clone()]);

        assert_eq!(stream.stop(), 1);
        assert!(bad.is_ended());
        assert!(good.is_ended());
    }

    #[test]
    fn test_remove_track() {
        let track = MediaTrack::with_id("t1", MediaKind::Audio, "mic");
        let stream = MediaStream::from_tracks(vec![track]);

        assert!(stream.remove_track("t1").is_some());
        assert!(stream.remove_track("t1").is_none());
        assert_eq!(stream.track_count(), 0);
    }
}
