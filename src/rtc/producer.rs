//! Local producers

use super::capabilities::RtpParameters;
use super::tag::MediaTypeTag;
use crate::media::{MediaKind, MediaTrack};

/// A local track published through the send transport
#[derive(Debug)]
pub struct Producer {
    /// SFU-assigned producer id
    id: String,

    /// Track being sent
    track: MediaTrack,

    /// What the track represents
    tag: MediaTypeTag,

    /// Parameters sent with the produce request
    rtp_parameters: RtpParameters,

    closed: bool,
}

impl Producer {
    pub(crate) fn new(
        id: String,
        track: MediaTrack,
        tag: MediaTypeTag,
        rtp_parameters: RtpParameters,
    ) -> Self {
        Self {
            id,
            track,
            tag,
            rtp_parameters,
            closed: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
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

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Stop publishing
    ///
    /// The track itself keeps running; it belongs to whoever captured it.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        tracing::debug!(producer = %self.id, tag = %self.tag, "Producer closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_leaves_track_running() {
        let track = MediaTrack::new(MediaKind::Video, "cam");
        let mut producer = Producer::new(
            "p1".into(),
            track.clone(),
            MediaTypeTag::Camera,
            RtpParameters::default(),
        );

        producer.close();
        producer.close();

        assert!(producer.is_closed());
        assert!(!track.is_ended());
        assert_eq!(producer.kind(), MediaKind::Video);
    }
}
