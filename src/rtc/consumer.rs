//! Remote consumers

use super::capabilities::RtpParameters;
use super::tag::MediaTypeTag;
use crate::media::{MediaKind, MediaTrack};

/// A remote producer's track delivered through the recv transport
///
/// Consumers start paused; the SFU only forwards media after an explicit
/// resume.
#[derive(Debug)]
pub struct Consumer {
    /// SFU-assigned consumer id
    id: String,

    /// Remote producer being consumed
    producer_id: String,

    /// Peer owning the remote producer
    peer_id: String,

    tag: MediaTypeTag,

    /// Playback track
    track: MediaTrack,

    rtp_parameters: RtpParameters,

    paused: bool,
    closed: bool,
}

impl Consumer {
    pub(crate) fn new(
        id: String,
        producer_id: String,
        peer_id: String,
        kind: MediaKind,
        tag: MediaTypeTag,
        rtp_parameters: RtpParameters,
    ) -> Self {
        let track = MediaTrack::with_id(id.clone(), kind, format!("remote-{}", tag));
        Self {
            id,
            producer_id,
            peer_id,
            tag,
            track,
            rtp_parameters,
            paused: true,
            closed: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn producer_id(&self) -> &str {
        &self.producer_id
    }

    pub fn peer_id(&self) -> &str {
        &self.peer_id
    }

    pub fn kind(&self) -> MediaKind {
        self.track.kind()
    }

    pub fn tag(&self) -> MediaTypeTag {
        self.tag
    }

    pub fn track(&self) -> &MediaTrack {
        &self.track
    }

    pub fn rtp_parameters(&self) -> &RtpParameters {
        &self.rtp_parameters
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub(crate) fn mark_resumed(&mut self) {
        self.paused = false;
    }

    /// Close the consumer and stop its track
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.track.stop() {
            tracing::warn!(consumer = %self.id, error = %e, "Failed to stop consumer track");
        }
        tracing::debug!(consumer = %self.id, peer = %self.peer_id, "Consumer closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consumer_lifecycle() {
        let mut consumer = Consumer::new(
            "c1".into(),
            "p1".into(),
            "peer-a".into(),
            MediaKind::Audio,
            MediaTypeTag::Microphone,
            RtpParameters::default(),
        );

        assert!(consumer.is_paused());
        consumer.mark_resumed();
        assert!(!consumer.is_paused());

        let track = consumer.track().clone();
        consumer.close();
        assert!(consumer.is_closed());
        assert!(track.is_ended());
        assert_eq!(track.id(), "c1");
    }
}
