//! Remote peer and consumer store
//!
//! Owns every consumer and every inbound bundle of the session. Consumers are
//! grouped by peer so a departing peer can be torn down in one call.

use std::collections::HashMap;

use super::peer::{PeerView, RemotePeer};
use crate::media::MediaStream;
use crate::rtc::Consumer;
use crate::signaling::protocol::{PeerJoined, PeerStatus};

/// Aggregates consumed tracks into per-peer bundles
#[derive(Debug, Default)]
pub struct RemotePeers {
    /// Peers by session id
    peers: HashMap<String, RemotePeer>,

    /// Consumers by peer id, then consumer id
    consumers: HashMap<String, HashMap<String, Consumer>>,
}

impl RemotePeers {
    pub fn new() -> Self {
        Self::default()
    }

    fn peer_entry(&mut self, peer_id: &str) -> &mut RemotePeer {
        self.peers
            .entry(peer_id.to_string())
            .or_insert_with(|| RemotePeer::new(peer_id))
    }

    /// Record a peer that joined the room
    pub fn on_joined(&mut self, joined: &PeerJoined) {
        let peer = self.peer_entry(&joined.socket_id);
        peer.learn_name(joined.display_name.as_deref().or(joined.username.as_deref()));
        if joined.language.is_some() {
            peer.language = joined.language.clone();
        }

        tracing::debug!(peer = %joined.socket_id, "Peer joined");
    }

    /// Apply a status from the room snapshot, creating the peer if needed
    pub fn apply_status(&mut self, status: &PeerStatus) {
        let peer = self.peer_entry(&status.socket_id);
        Self::set_status(peer, status);
    }

    /// Apply a live mute status update to a known peer
    ///
    /// Statuses for peers that already left are dropped. Returns whether the
    /// peer exists.
    pub fn update_status(&mut self, status: &PeerStatus) -> bool {
        match self.peers.get_mut(&status.socket_id) {
            Some(peer) => {
                Self::set_status(peer, status);
                true
            }
            None => {
                tracing::debug!(peer = %status.socket_id, "Status for unknown peer ignored");
                false
            }
        }
    }

    fn set_status(peer: &mut RemotePeer, status: &PeerStatus) {
        peer.audio_muted = status.is_audio_muted;
        peer.video_muted = status.is_video_muted;
        peer.learn_name(status.username.as_deref());

        tracing::debug!(
            peer = %status.socket_id,
            audio_muted = status.is_audio_muted,
            video_muted = status.is_video_muted,
            "Peer media status"
        );
    }

    /// Whether a producer is already being consumed
    pub fn is_consuming(&self, producer_id: &str) -> bool {
        self.consumers
            .values()
            .flat_map(|by_id| by_id.values())
            .any(|c| c.producer_id() == producer_id)
    }

    /// Route a consumer's track into its peer's bundle and keep the consumer
    ///
    /// Returns the bundle the track was added to. The bundle handle is the
    /// same for every track of that (peer, class) pair.
    pub fn add_consumer(&mut self, consumer: Consumer) -> MediaStream {
        let peer_id = consumer.peer_id().to_string();
        let class = consumer.tag().class();

        let bundle = self.peer_entry(&peer_id).bundle(class);
        bundle.add_track(consumer.track().clone());

        tracing::debug!(
            peer = %peer_id,
            consumer = %consumer.id(),
            class = ?class,
            tracks = bundle.track_count(),
            "Track added to bundle"
        );

        self.consumers
            .entry(peer_id)
            .or_default()
            .insert(consumer.id().to_string(), consumer);

        bundle
    }

    /// Tear down a peer: close its consumers, stop its tracks, forget it
    ///
    /// Safe to call for unknown or already removed peers. Returns whether
    /// anything was removed.
    pub fn remove_peer(&mut self, peer_id: &str) -> bool {
        let mut removed = false;

        if let Some(consumers) = self.consumers.remove(peer_id) {
            for (_, mut consumer) in consumers {
                consumer.close();
            }
            removed = true;
        }

        if let Some(mut peer) = self.peers.remove(peer_id) {
            let failures = peer.release_bundles();
            if failures > 0 {
                tracing::warn!(peer = %peer_id, failures = failures, "Some remote tracks failed to stop");
            }
            removed = true;
        }

        if removed {
            tracing::info!(peer = %peer_id, "Remote peer removed");
        }
        removed
    }

    /// Tear down every peer
    pub fn close_all(&mut self) {
        let ids: Vec<String> = self
            .peers
            .keys()
            .chain(self.consumers.keys())
            .cloned()
            .collect();
        for id in ids {
            self.remove_peer(&id);
        }
    }

    pub fn peer(&self, peer_id: &str) -> Option<&RemotePeer> {
        self.peers.get(peer_id)
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    pub fn consumer_count(&self) -> usize {
        self.consumers.values().map(HashMap::len).sum()
    }

    /// Consumers of one peer
    pub fn consumers_of(&self, peer_id: &str) -> Vec<&Consumer> {
        self.consumers
            .get(peer_id)
            .map(|by_id| by_id.values().collect())
            .unwrap_or_default()
    }

    /// Snapshot of all peers, ordered by id
    pub fn snapshot(&self) -> Vec<PeerView> {
        let mut views: Vec<PeerView> = self.peers.values().map(RemotePeer::view).collect();
        views.sort_by(|a, b| a.id.cmp(&b.id));
        views
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaKind;
    use crate::rtc::{MediaTypeTag, RtpParameters};

    fn consumer(id: &str, peer: &str, kind: MediaKind, tag: MediaTypeTag) -> Consumer {
        Consumer::new(
            id.into(),
            format!("prod-{}", id),
            peer.into(),
            kind,
            tag,
            RtpParameters::default(),
        )
    }

    #[test]
    fn test_tracks_routed_by_class() {
        let mut store = RemotePeers::new();

        let cam = store.add_consumer(consumer("c1", "a", MediaKind::Video, MediaTypeTag::Camera));
        let mic = store.add_consumer(consumer("c2", "a", MediaKind::Audio, MediaTypeTag::Microphone));
        let screen = store.add_consumer(consumer("c3", "a", MediaKind::Video, MediaTypeTag::Screen));
        let screen_audio =
            store.add_consumer(consumer("c4", "a", MediaKind::Audio, MediaTypeTag::ScreenAudio));

        // Bundle identity is stable across additions
        assert!(cam.same_stream(&mic));
        assert!(screen.same_stream(&screen_audio));
        assert!(!cam.same_stream(&screen));

        let peer = store.peer("a").unwrap();
        assert_eq!(peer.camera().unwrap().track_count(), 2);
        assert_eq!(peer.screen().unwrap().track_count(), 2);
        assert_eq!(store.consumer_count(), 4);
    }

    #[test]
    fn test_remove_peer_is_idempotent() {
        let mut store = RemotePeers::new();
        let bundle = store.add_consumer(consumer("c1", "a", MediaKind::Video, MediaTypeTag::Camera));
        let track = bundle.tracks()[0].clone();

        assert!(store.remove_peer("a"));
        assert!(!store.remove_peer("a"));
        assert!(!store.remove_peer("never-seen"));

        assert!(track.is_ended());
        assert!(store.peer("a").is_none());
        assert_eq!(store.consumer_count(), 0);
    }

    #[test]
    fn test_status_before_tracks() {
        let mut store = RemotePeers::new();
        store.apply_status(&PeerStatus {
            socket_id: "a".into(),
            username: Some("Ana".into()),
            is_audio_muted: true,
            is_video_muted: false,
        });

        store.add_consumer(consumer("c1", "a", MediaKind::Audio, MediaTypeTag::Microphone));

        let view = &store.snapshot()[0];
        assert_eq!(view.display_name, "Ana");
        assert!(view.audio_muted);
        assert!(view.camera.is_some());
    }

    #[test]
    fn test_status_after_removal_is_ignored() {
        let mut store = RemotePeers::new();
        store.add_consumer(consumer("c1", "a", MediaKind::Video, MediaTypeTag::Camera));
        let status = PeerStatus {
            socket_id: "a".into(),
            username: None,
            is_audio_muted: true,
            is_video_muted: true,
        };
        assert!(store.update_status(&status));
        assert!(store.peer("a").unwrap().audio_muted);

        store.remove_peer("a");

        assert!(!store.update_status(&status));
        assert!(store.peer("a").is_none());
        assert_eq!(store.peer_count(), 0);
    }

    #[test]
    fn test_joined_sets_language() {
        let mut store = RemotePeers::new();
        store.on_joined(&PeerJoined {
            socket_id: "a".into(),
            username: Some("ana".into()),
            display_name: Some("Ana".into()),
            language: Some("pt".into()),
        });

        let peer = store.peer("a").unwrap();
        assert_eq!(peer.display_name, "Ana");
        assert_eq!(peer.language.as_deref(), Some("pt"));
    }

    #[test]
    fn test_is_consuming() {
        let mut store = RemotePeers::new();
        store.add_consumer(consumer("c1", "a", MediaKind::Video, MediaTypeTag::Camera));

        assert!(store.is_consuming("prod-c1"));
        assert!(!store.is_consuming("prod-c2"));
    }

    #[test]
    fn test_close_all() {
        let mut store = RemotePeers::new();
        store.add_consumer(consumer("c1", "a", MediaKind::Video, MediaTypeTag::Camera));
        store.add_consumer(consumer("c2", "b", MediaKind::Video, MediaTypeTag::Screen));

        store.close_all();

        assert_eq!(store.peer_count(), 0);
        assert_eq!(store.consumer_count(), 0);
    }
}
