//! Remote peer records

use crate::media::MediaStream;
use crate::rtc::MediaClass;

/// Display name used until the peer's status arrives
pub const UNKNOWN_PEER_NAME: &str = "Unknown";

/// A remote participant and its inbound bundles
#[derive(Debug)]
pub struct RemotePeer {
    /// Signaling session id
    pub id: String,

    pub display_name: String,

    pub audio_muted: bool,

    pub video_muted: bool,

    /// Spoken-language code, if announced
    pub language: Option<String>,

    /// Camera + microphone bundle
    camera: Option<MediaStream>,

    /// Screen video + screen audio bundle
    screen: Option<MediaStream>,
}

impl RemotePeer {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: UNKNOWN_PEER_NAME.to_string(),
            audio_muted: false,
            video_muted: false,
            language: None,
            camera: None,
            screen: None,
        }
    }

    pub fn camera(&self) -> Option<&MediaStream> {
        self.camera.as_ref()
    }

    pub fn screen(&self) -> Option<&MediaStream> {
        self.screen.as_ref()
    }

    /// Bundle for a class, created on first use
    pub(crate) fn bundle(&mut self, class: MediaClass) -> MediaStream {
        let slot = match class {
            MediaClass::Camera => &mut self.camera,
            MediaClass::Screen => &mut self.screen,
        };
        slot.get_or_insert_with(MediaStream::new).clone()
    }

    /// Fill in the name unless a real one is already known
    pub(crate) fn learn_name(&mut self, name: Option<&str>) {
        if let Some(name) = name.filter(|n| !n.is_empty()) {
            if self.display_name == UNKNOWN_PEER_NAME {
                self.display_name = name.to_string();
            }
        }
    }

    /// Stop every track in both bundles and drop them
    ///
    /// Returns the number of tracks that failed to stop.
    pub(crate) fn release_bundles(&mut self) -> usize {
        let mut failures = 0;
        if let Some(stream) = self.camera.take() {
            failures += stream.stop();
        }
        if let Some(stream) = self.screen.take() {
            failures += stream.stop();
        }
        failures
    }

    pub fn view(&self) -> PeerView {
        PeerView {
            id: self.id.clone(),
            display_name: self.display_name.clone(),
            audio_muted: self.audio_muted,
            video_muted: self.video_muted,
            language: self.language.clone(),
            camera: self.camera.clone(),
            screen: self.screen.clone(),
        }
    }
}

/// Snapshot of a peer handed to the UI layer
///
/// The bundles are shared handles: tracks added later show up in them.
#[derive(Debug, Clone)]
pub struct PeerView {
    pub id: String,
    pub display_name: String,
    pub audio_muted: bool,
    pub video_muted: bool,
    pub language: Option<String>,
    pub camera: Option<MediaStream>,
    pub screen: Option<MediaStream>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundle_created_once() {
        let mut peer = RemotePeer::new("a");

        let first = peer.bundle(MediaClass::Camera);
        let second = peer.bundle(MediaClass::Camera);

        assert!(first.same_stream(&second));
        assert!(peer.screen().is_none());
    }

    #[test]
    fn test_learn_name_only_replaces_unknown() {
        let mut peer = RemotePeer::new("a");

        peer.learn_name(Some(""));
        assert_eq!(peer.display_name, UNKNOWN_PEER_NAME);

        peer.learn_name(Some("Ana"));
        peer.learn_name(Some("Bob"));
        assert_eq!(peer.display_name, "Ana");
    }
}
