//! Local tracks and their producers
//!
//! Camera and microphone come from one capture stream and have one producer
//! slot each. A screen share is a separate stream with its own producers,
//! started and stopped on demand.

use crate::media::{MediaKind, MediaStream, MediaTrack};
use crate::rtc::{MediaTypeTag, Producer};

/// An active screen share
#[derive(Debug)]
pub struct ScreenShare {
    stream: MediaStream,
    video: Option<Producer>,
    audio: Option<Producer>,
}

impl ScreenShare {
    pub fn new(stream: MediaStream) -> Self {
        Self {
            stream,
            video: None,
            audio: None,
        }
    }

    pub fn stream(&self) -> &MediaStream {
        &self.stream
    }

    pub fn video_track(&self) -> Option<MediaTrack> {
        self.stream.video_track()
    }

    pub fn audio_track(&self) -> Option<MediaTrack> {
        self.stream.audio_track()
    }

    pub fn video_producer(&self) -> Option<&Producer> {
        self.video.as_ref()
    }

    pub fn audio_producer(&self) -> Option<&Producer> {
        self.audio.as_ref()
    }

    pub(crate) fn set_producer(&mut self, producer: Producer) {
        match producer.kind() {
            MediaKind::Video => self.video = Some(producer),
            MediaKind::Audio => self.audio = Some(producer),
        }
    }

    /// Close exactly the screen producers and stop the screen tracks
    ///
    /// Returns the number of tracks that failed to stop.
    pub(crate) fn stop(mut self) -> usize {
        for producer in [self.video.take(), self.audio.take()].into_iter().flatten() {
            let mut producer = producer;
            producer.close();
        }
        self.stream.stop()
    }
}

/// Tracks and producers owned by the local participant
#[derive(Debug, Default)]
pub struct LocalMedia {
    stream: Option<MediaStream>,
    camera: Option<Producer>,
    microphone: Option<Producer>,
    screen: Option<ScreenShare>,
}

impl LocalMedia {
    pub fn new() -> Self {
        Self::default()
    }

    /// The camera/microphone stream, once captured
    pub fn stream(&self) -> Option<&MediaStream> {
        self.stream.as_ref()
    }

    pub fn has_stream(&self) -> bool {
        self.stream.is_some()
    }

    /// Take ownership of the capture stream
    ///
    /// Returns false, leaving the current one in place, if a stream is
    /// already attached.
    pub(crate) fn attach(&mut self, stream: MediaStream) -> bool {
        if self.stream.is_some() {
            return false;
        }
        self.stream = Some(stream);
        true
    }

    pub fn audio_track(&self) -> Option<MediaTrack> {
        self.stream.as_ref().and_then(MediaStream::audio_track)
    }

    pub fn video_track(&self) -> Option<MediaTrack> {
        self.stream.as_ref().and_then(MediaStream::video_track)
    }

    /// Producer in a camera or microphone slot
    pub fn producer(&self, tag: MediaTypeTag) -> Option<&Producer> {
        match tag {
            MediaTypeTag::Camera => self.camera.as_ref(),
            MediaTypeTag::Microphone => self.microphone.as_ref(),
            MediaTypeTag::Screen => self.screen.as_ref().and_then(ScreenShare::video_producer),
            MediaTypeTag::ScreenAudio => {
                self.screen.as_ref().and_then(ScreenShare::audio_producer)
            }
        }
    }

    /// Fill the camera or microphone slot
    ///
    /// A slot holds at most one producer; a second one for the same slot is
    /// closed and dropped.
    pub(crate) fn set_producer(&mut self, mut producer: Producer) {
        let slot = match producer.tag() {
            MediaTypeTag::Camera => &mut self.camera,
            MediaTypeTag::Microphone => &mut self.microphone,
            tag => {
                tracing::warn!(tag = %tag, "Screen producer outside a screen share");
                producer.close();
                return;
            }
        };

        if slot.is_some() {
            tracing::warn!(producer = %producer.id(), tag = %producer.tag(), "Slot already produced");
            producer.close();
            return;
        }
        *slot = Some(producer);
    }

    pub fn is_audio_muted(&self) -> bool {
        self.audio_track().map(|t| !t.is_enabled()).unwrap_or(false)
    }

    pub fn is_video_muted(&self) -> bool {
        self.video_track().map(|t| !t.is_enabled()).unwrap_or(false)
    }

    /// Flip the enabled flag of the first track of `kind`
    ///
    /// Returns the new muted state, or `None` without a track of that kind.
    pub(crate) fn toggle(&self, kind: MediaKind) -> Option<bool> {
        let track = self.stream.as_ref()?.first(kind)?;
        let enabled = !track.is_enabled();
        track.set_enabled(enabled);
        Some(!enabled)
    }

    pub fn screen(&self) -> Option<&ScreenShare> {
        self.screen.as_ref()
    }

    pub fn is_sharing_screen(&self) -> bool {
        self.screen.is_some()
    }

    pub(crate) fn set_screen(&mut self, share: ScreenShare) {
        self.screen = Some(share);
    }

    pub(crate) fn take_screen(&mut self) -> Option<ScreenShare> {
        self.screen.take()
    }

    /// Close camera/microphone producers and stop the capture stream
    ///
    /// Returns the number of tracks that failed to stop.
    pub(crate) fn release(&mut self) -> usize {
        for producer in [self.camera.take(), self.microphone.take()].into_iter().flatten() {
            let mut producer = producer;
            producer.close();
        }
        self.stream.take().map(|s| s.stop()).unwrap_or(0)
    }
}
