//! Session orchestrator
//!
//! [`Session`] owns every piece of per-call state: the device, both
//! transports, local tracks and producers, remote peers and consumers, the
//! producer gate and the transcript. All mutation goes through `&mut self`,
//! so one task drives it (see [`SessionDriver`](super::SessionDriver)).
//!
//! ```text
//! join ─► Joining ─(router caps)─► NegotiatingCapabilities
//!            │                          │ device.load
//!            │ (local stream attached)  ▼
//!            └─► join-room        CreatingTransports
//!                                   │ send transport, camera, mic, recv transport
//!                                   ▼
//!                                 Ready ─► drain gate backlog
//! ```

use std::sync::Arc;

use tokio::sync::mpsc;

use super::context::JoinRequest;
use super::gate::{Admission, ProducerGate};
use super::local::{LocalMedia, ScreenShare};
use super::state::{SessionPhase, SessionState};
use crate::audio::{AudioWorklet, TranscriptLog, Transcriber};
use crate::config::SessionConfig;
use crate::error::{DeviceError, Error, NegotiationError, Result, SessionError};
use crate::media::{MediaKind, MediaSource, MediaStream};
use crate::remote::{PeerView, RemotePeers};
use crate::rtc::{Device, Direction, DtlsParameters, MediaTypeTag, RtpCapabilities, Transport};
use crate::signaling::protocol::MediaStatusUpdate;
use crate::signaling::{
    events, notify, InboundEvent, ProducerAnnouncement, SignalMessage, SignalingChannel,
};
use crate::stats::SessionStats;

/// Notifications for the layer above the session
#[derive(Debug)]
pub enum SessionEvent {
    /// Phase changed
    Phase(SessionPhase),
    /// Camera/microphone stream is available
    LocalStreamReady(MediaStream),
    /// Camera/microphone capture failed; the session has no local tracks
    LocalMediaFailed(DeviceError),
    /// Both transports exist
    Ready,
    /// A local track could not be published
    ProduceFailed { tag: MediaTypeTag, error: Error },
    /// A remote producer could not be consumed
    ConsumeFailed { producer_id: String, error: Error },
    /// A remote track was added to a peer's bundle
    TrackAdded {
        peer_id: String,
        tag: MediaTypeTag,
        bundle: MediaStream,
    },
    /// A peer's name, mute state or bundles changed
    PeerUpdated(PeerView),
    /// A peer left and was torn down
    PeerRemoved(String),
    ScreenShareStarted(MediaStream),
    ScreenShareStopped,
    /// The transcript log changed
    TranscriptUpdated,
    TranscriptionError(String),
    SpeakingChanged(bool),
    /// The join failed; the session is terminated
    Error(Error),
    /// Session torn down
    Terminated,
}

/// Conferencing session against one SFU room
pub struct Session {
    config: SessionConfig,
    signaling: Arc<dyn SignalingChannel>,
    source: Arc<dyn MediaSource>,
    state: SessionState,
    join: Option<JoinRequest>,
    device: Device,
    send_transport: Option<Transport>,
    recv_transport: Option<Transport>,
    local: LocalMedia,
    remote: RemotePeers,
    gate: ProducerGate,
    transcript: TranscriptLog,
    transcriber: Option<Transcriber>,
    stats: SessionStats,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl Session {
    /// Create an idle session
    ///
    /// Events are unbounded so a slow reader never stalls the session task.
    pub fn new(
        config: SessionConfig,
        signaling: Arc<dyn SignalingChannel>,
        source: Arc<dyn MediaSource>,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let device = Device::new(config.local_capabilities.clone(), DtlsParameters::random());

        let session = Self {
            config,
            signaling,
            source,
            state: SessionState::new(),
            join: None,
            device,
            send_transport: None,
            recv_transport: None,
            local: LocalMedia::new(),
            remote: RemotePeers::new(),
            gate: ProducerGate::new(),
            transcript: TranscriptLog::new(),
            transcriber: None,
            stats: SessionStats::new(),
            events,
        };
        (session, rx)
    }

    fn emit(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            tracing::trace!("Session event receiver dropped");
        }
    }

    fn set_phase(&mut self, next: SessionPhase) -> bool {
        if !self.state.transition(next) {
            return false;
        }
        self.emit(SessionEvent::Phase(next));
        true
    }

    // === Join ===

    /// Ask to join a room
    ///
    /// `join-room` goes out as soon as the local stream exists; until then
    /// the session waits in `Joining` and holds producer announcements.
    pub async fn join(&mut self, request: JoinRequest) -> Result<()> {
        if self.state.phase != SessionPhase::Idle {
            return Err(SessionError::InvalidPhase(self.state.phase).into());
        }

        tracing::info!(
            room = %request.room_id,
            username = %request.username,
            "Joining room"
        );
        self.join = Some(request);
        self.set_phase(SessionPhase::Joining);

        if self.local.has_stream() {
            self.send_join()?;
        } else {
            tracing::debug!("Join deferred until the local stream is attached");
        }
        Ok(())
    }

    fn send_join(&mut self) -> Result<()> {
        if self.state.join_sent {
            return Ok(());
        }
        let Some(request) = self.join.as_ref() else {
            return Ok(());
        };

        let message = request.to_message(&self.config.default_language);
        notify(self.signaling.as_ref(), events::JOIN_ROOM, &message)?;
        self.state.join_sent = true;

        tracing::info!(room = %message.room_id, language = %message.language, "Join sent");
        Ok(())
    }

    /// Open the camera and microphone with the configured constraints
    pub async fn acquire_local_media(&mut self) -> Result<()> {
        let constraints = self.config.capture.clone();
        let result = self.source.user_media(&constraints).await;
        self.on_local_media(result).await
    }

    /// Feed the outcome of a capture request
    pub async fn on_local_media(
        &mut self,
        result: std::result::Result<MediaStream, DeviceError>,
    ) -> Result<()> {
        match result {
            Ok(stream) => self.attach_local_stream(stream).await,
            Err(e) => {
                self.local_media_failed(e).await;
                Ok(())
            }
        }
    }

    /// Hand the session its camera/microphone stream
    ///
    /// Releases a deferred join.
    pub async fn attach_local_stream(&mut self, stream: MediaStream) -> Result<()> {
        if self.state.is_terminated() {
            stream.stop();
            return Err(SessionError::InvalidPhase(self.state.phase).into());
        }
        if !self.local.attach(stream.clone()) {
            tracing::warn!(stream = %stream.id(), "Local stream already attached");
            return Ok(());
        }

        tracing::info!(
            stream = %stream.id(),
            tracks = stream.track_count(),
            "Local stream attached"
        );
        let joined = if self.state.phase == SessionPhase::Joining {
            self.send_join()
        } else {
            Ok(())
        };
        self.emit(SessionEvent::LocalStreamReady(stream));
        joined
    }

    /// Record a capture failure; the session carries on without local tracks
    pub async fn local_media_failed(&mut self, error: DeviceError) {
        tracing::warn!(error = %error, "Local media unavailable");
        self.emit(SessionEvent::LocalMediaFailed(error));
    }

    // === Inbound ===

    /// Decode and handle a raw signaling message
    pub async fn handle_message(&mut self, message: SignalMessage) -> Result<()> {
        let event_name = message.event.clone();
        match InboundEvent::decode(message)? {
            Some(event) => self.handle_event(event).await,
            None => {
                tracing::trace!(event = %event_name, "Unhandled signaling event");
                Ok(())
            }
        }
    }

    /// Handle a decoded inbound event
    pub async fn handle_event(&mut self, event: InboundEvent) -> Result<()> {
        match event {
            InboundEvent::RouterCapabilities(caps) => {
                self.on_router_capabilities(caps.rtp_capabilities).await;
            }
            InboundEvent::ExistingProducers(list) => {
                tracing::debug!(count = list.len(), "Existing producers");
                for announcement in list {
                    self.on_producer(announcement).await;
                }
            }
            InboundEvent::NewProducer(announcement) => {
                self.on_producer(announcement).await;
            }
            InboundEvent::PeerJoined(joined) => {
                self.remote.on_joined(&joined);
                self.emit_peer(&joined.socket_id);
            }
            InboundEvent::PeerLeft(left) => {
                self.remove_peer(&left.socket_id).await;
            }
            InboundEvent::PeerMediaStatus(status) => {
                if self.remote.update_status(&status) {
                    self.emit_peer(&status.socket_id);
                }
            }
            InboundEvent::ExistingPeerStatuses(statuses) => {
                for status in statuses {
                    self.remote.apply_status(&status);
                    self.emit_peer(&status.socket_id);
                }
            }
            InboundEvent::TranscriptionResult(result) => {
                self.transcript.apply_result(result);
                self.emit(SessionEvent::TranscriptUpdated);
            }
            InboundEvent::TranslationComplete(translation) => {
                if self.transcript.apply_translation(translation) {
                    self.emit(SessionEvent::TranscriptUpdated);
                }
            }
            InboundEvent::TranscriptionError(failure) => {
                tracing::warn!(error = %failure.error, "Transcription error");
                self.emit(SessionEvent::TranscriptionError(failure.error));
            }
            InboundEvent::SpeakingStatus(status) => {
                self.transcript.set_speaking(status.is_speaking);
                self.emit(SessionEvent::SpeakingChanged(status.is_speaking));
            }
        }
        Ok(())
    }

    fn emit_peer(&self, peer_id: &str) {
        if let Some(peer) = self.remote.peer(peer_id) {
            self.emit(SessionEvent::PeerUpdated(peer.view()));
        }
    }

    // === Negotiation ===

    /// Load router capabilities, create transports and become ready
    ///
    /// Any failure here terminates the session and is reported once as
    /// [`SessionEvent::Error`].
    pub async fn on_router_capabilities(&mut self, router: RtpCapabilities) {
        if self.state.phase != SessionPhase::Joining || !self.state.join_sent {
            tracing::warn!(phase = %self.state.phase, "Unexpected router capabilities");
            return;
        }

        self.set_phase(SessionPhase::NegotiatingCapabilities);
        if let Err(e) = self.device.load(&router) {
            return self.join_failed(e.into()).await;
        }

        self.set_phase(SessionPhase::CreatingTransports);

        match Transport::create(self.signaling.as_ref(), Direction::Send, &self.device).await {
            Ok(transport) => self.send_transport = Some(transport),
            Err(e) => return self.join_failed(e).await,
        }

        self.produce_local().await;

        match Transport::create(self.signaling.as_ref(), Direction::Recv, &self.device).await {
            Ok(transport) => self.recv_transport = Some(transport),
            Err(e) => return self.join_failed(e).await,
        }

        self.mark_ready().await;
    }

    async fn join_failed(&mut self, error: Error) {
        tracing::error!(error = %error, phase = %self.state.phase, "Join failed");
        self.emit(SessionEvent::Error(error));
        self.teardown().await;
    }

    /// Publish camera then microphone; each failure affects its track only
    async fn produce_local(&mut self) {
        let slots = [
            (MediaTypeTag::Camera, self.local.video_track()),
            (MediaTypeTag::Microphone, self.local.audio_track()),
        ];

        for (tag, track) in slots {
            let Some(track) = track else {
                tracing::debug!(tag = %tag, "No local track to produce");
                continue;
            };
            if self.local.producer(tag).is_some() {
                continue;
            }

            let kind = track.kind();
            let result = if !self.device.can_produce(kind) {
                Err(NegotiationError::CannotProduce(kind).into())
            } else {
                match self.send_transport.as_mut() {
                    Some(transport) => {
                        transport
                            .produce(self.signaling.as_ref(), &self.device, track, tag)
                            .await
                    }
                    None => Err(SessionError::NoSendTransport.into()),
                }
            };

            match result {
                Ok(producer) => {
                    self.stats.producers_created += 1;
                    self.local.set_producer(producer);
                }
                Err(e) => self.produce_failed(tag, e).await,
            }
        }
    }

    async fn produce_failed(&mut self, tag: MediaTypeTag, error: Error) {
        tracing::warn!(tag = %tag, error = %error, "Failed to produce track");
        self.stats.produce_failures += 1;
        self.emit(SessionEvent::ProduceFailed { tag, error });
    }

    /// Flip to ready and consume the backlog in arrival order
    async fn mark_ready(&mut self) {
        if !self.set_phase(SessionPhase::Ready) {
            return;
        }
        if let (Some(joined), Some(ready)) = (self.state.joined_at, self.state.ready_at) {
            self.stats.time_to_ready = Some(ready.duration_since(joined));
        }

        let backlog = self.gate.open();
        tracing::info!(pending = backlog.len(), "Session ready");
        self.emit(SessionEvent::Ready);

        for announcement in backlog {
            self.consume(announcement).await;
        }
    }

    // === Remote media ===

    async fn on_producer(&mut self, announcement: ProducerAnnouncement) {
        match self.gate.admit(announcement) {
            Admission::Consume(announcement) => self.consume(announcement).await,
            Admission::Queued => self.stats.announcements_queued += 1,
            Admission::Rejected => {
                tracing::debug!("Producer announcement after termination ignored");
            }
        }
    }

    /// Consume one remote producer into its peer's bundle
    pub async fn consume(&mut self, announcement: ProducerAnnouncement) {
        if self.remote.is_consuming(&announcement.producer_id) {
            tracing::debug!(producer = %announcement.producer_id, "Producer already consumed");
            return;
        }

        let result = match self.recv_transport.as_mut() {
            Some(transport) => {
                transport
                    .consume(self.signaling.as_ref(), &self.device, &announcement)
                    .await
            }
            None => Err(SessionError::NoRecvTransport.into()),
        };

        match result {
            Ok(consumer) => {
                self.stats.consumers_created += 1;
                let peer_id = consumer.peer_id().to_string();
                let tag = consumer.tag();
                let bundle = self.remote.add_consumer(consumer);

                self.emit(SessionEvent::TrackAdded {
                    peer_id: peer_id.clone(),
                    tag,
                    bundle,
                });
                self.emit_peer(&peer_id);
            }
            Err(e) => {
                tracing::warn!(
                    producer = %announcement.producer_id,
                    peer = %announcement.socket_id,
                    error = %e,
                    "Failed to consume producer"
                );
                self.stats.consume_failures += 1;
                self.emit(SessionEvent::ConsumeFailed {
                    producer_id: announcement.producer_id,
                    error: e,
                });
            }
        }
    }

    /// Tear down a remote peer, including announcements still queued for it
    pub async fn remove_peer(&mut self, peer_id: &str) {
        let discarded = self.gate.discard_peer(peer_id);
        let removed = self.remote.remove_peer(peer_id);

        if discarded > 0 {
            tracing::debug!(peer = %peer_id, discarded = discarded, "Dropped queued producers");
        }
        if removed || discarded > 0 {
            self.stats.peers_removed += 1;
            self.emit(SessionEvent::PeerRemoved(peer_id.to_string()));
        }
    }

    // === Local controls ===

    /// Mute or unmute the microphone
    ///
    /// Returns the new muted state, or `None` without a microphone. The room
    /// only hears about it once `join-room` went out.
    pub fn toggle_audio(&mut self) -> Result<Option<bool>> {
        self.toggle(MediaKind::Audio)
    }

    /// Turn the camera off or on
    pub fn toggle_video(&mut self) -> Result<Option<bool>> {
        self.toggle(MediaKind::Video)
    }

    fn toggle(&mut self, kind: MediaKind) -> Result<Option<bool>> {
        let Some(muted) = self.local.toggle(kind) else {
            return Ok(None);
        };
        if !self.state.join_sent || !self.state.phase.is_active() {
            return Ok(Some(muted));
        }

        let update = MediaStatusUpdate {
            is_audio_muted: self.local.is_audio_muted(),
            is_video_muted: self.local.is_video_muted(),
        };
        tracing::debug!(
            audio_muted = update.is_audio_muted,
            video_muted = update.is_video_muted,
            "Local media status"
        );
        notify(self.signaling.as_ref(), events::UPDATE_MEDIA_STATUS, &update)?;
        Ok(Some(muted))
    }

    /// Capture the screen and publish it
    ///
    /// The screen video must publish or the share is abandoned; screen audio
    /// is best effort.
    pub async fn start_screen_share(&mut self) -> Result<MediaStream> {
        if self.local.is_sharing_screen() {
            return Err(SessionError::AlreadySharing.into());
        }
        if self.send_transport.is_none() {
            return Err(SessionError::NoSendTransport.into());
        }

        let constraints = self.config.display.clone();
        let stream = self.source.display_media(&constraints).await?;
        let mut share = ScreenShare::new(stream.clone());

        for (tag, track) in [
            (MediaTypeTag::Screen, share.video_track()),
            (MediaTypeTag::ScreenAudio, share.audio_track()),
        ] {
            let Some(track) = track else { continue };

            let result = match self.send_transport.as_mut() {
                Some(transport) => {
                    transport
                        .produce(self.signaling.as_ref(), &self.device, track, tag)
                        .await
                }
                None => Err(SessionError::NoSendTransport.into()),
            };

            match result {
                Ok(producer) => {
                    self.stats.producers_created += 1;
                    share.set_producer(producer);
                }
                Err(e) if tag == MediaTypeTag::Screen => {
                    self.stats.produce_failures += 1;
                    tracing::warn!(error = %e, "Screen share failed");
                    share.stop();
                    return Err(e);
                }
                Err(e) => self.produce_failed(tag, e).await,
            }
        }

        tracing::info!(stream = %stream.id(), tracks = stream.track_count(), "Screen share started");
        self.local.set_screen(share);
        self.emit(SessionEvent::ScreenShareStarted(stream.clone()));
        Ok(stream)
    }

    /// Stop the screen share; camera and microphone are untouched
    ///
    /// Returns false when no share was running.
    pub async fn stop_screen_share(&mut self) -> bool {
        let Some(share) = self.local.take_screen() else {
            return false;
        };

        let failures = share.stop();
        if failures > 0 {
            tracing::warn!(failures = failures, "Some screen tracks failed to stop");
        }
        tracing::info!("Screen share stopped");
        self.emit(SessionEvent::ScreenShareStopped);
        true
    }

    /// The screen video track ended on its own (e.g. the OS "stop sharing")
    pub async fn on_screen_track_ended(&mut self, track_id: &str) {
        let current = self
            .local
            .screen()
            .and_then(|s| s.video_track())
            .map(|t| t.id() == track_id)
            .unwrap_or(false);

        if current {
            tracing::info!(track = %track_id, "Screen track ended");
            self.stop_screen_share().await;
        }
    }

    // === Transcription ===

    /// Start transcribing the local user's speech
    ///
    /// Returns the worklet the host audio thread must drive.
    pub async fn start_transcription(&mut self) -> Result<AudioWorklet> {
        if self.transcriber.is_some() {
            return Err(SessionError::AlreadyTranscribing.into());
        }
        let Some(request) = self.join.as_ref().filter(|_| self.state.phase.is_active()) else {
            return Err(SessionError::InvalidPhase(self.state.phase).into());
        };

        let language = request.language_or(&self.config.default_language).to_string();
        let room_id = request.room_id.clone();

        let (transcriber, worklet) = Transcriber::start(
            self.signaling.clone(),
            self.source.as_ref(),
            &self.config.audio,
            &room_id,
            &language,
        )
        .await?;

        self.transcriber = Some(transcriber);
        Ok(worklet)
    }

    /// Stop transcribing; no-op when not running
    pub fn stop_transcription(&mut self) -> Result<()> {
        let Some(transcriber) = self.transcriber.take() else {
            return Ok(());
        };
        self.transcript.set_speaking(false);
        transcriber.stop(self.signaling.as_ref())?;
        Ok(())
    }

    // === Teardown ===

    /// Leave the room and release everything
    pub async fn leave(&mut self) {
        if self.state.is_terminated() {
            return;
        }
        tracing::info!("Leaving session");
        self.teardown().await;
    }

    /// Transports first, then local, screen and remote tracks
    async fn teardown(&mut self) {
        if let Some(transport) = self.send_transport.as_mut() {
            transport.close();
        }
        if let Some(transport) = self.recv_transport.as_mut() {
            transport.close();
        }

        let failures = self.local.release();
        if failures > 0 {
            tracing::warn!(failures = failures, "Some local tracks failed to stop");
        }

        if let Some(share) = self.local.take_screen() {
            let failures = share.stop();
            if failures > 0 {
                tracing::warn!(failures = failures, "Some screen tracks failed to stop");
            }
        }

        self.remote.close_all();

        if let Err(e) = self.stop_transcription() {
            tracing::warn!(error = %e, "Failed to stop transcription");
        }

        let dropped = self.gate.close();
        if dropped > 0 {
            tracing::debug!(dropped = dropped, "Queued producers dropped");
        }

        self.set_phase(SessionPhase::Terminated);
        tracing::info!(
            consumers = self.stats.consumers_created,
            producers = self.stats.producers_created,
            "Session terminated"
        );
        self.emit(SessionEvent::Terminated);
    }

    // === Accessors ===

    pub fn phase(&self) -> SessionPhase {
        self.state.phase
    }

    pub fn is_ready(&self) -> bool {
        self.state.is_ready()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Capture source, for callers opening media off the session task
    pub fn media_source(&self) -> Arc<dyn MediaSource> {
        self.source.clone()
    }

    pub fn local(&self) -> &LocalMedia {
        &self.local
    }

    pub fn local_stream(&self) -> Option<&MediaStream> {
        self.local.stream()
    }

    pub fn remote(&self) -> &RemotePeers {
        &self.remote
    }

    /// All remote peers, ordered by id
    pub fn peers(&self) -> Vec<PeerView> {
        self.remote.snapshot()
    }

    pub fn send_transport(&self) -> Option<&Transport> {
        self.send_transport.as_ref()
    }

    pub fn recv_transport(&self) -> Option<&Transport> {
        self.recv_transport.as_ref()
    }

    /// Announcements held until ready
    pub fn pending_producers(&self) -> usize {
        self.gate.pending()
    }

    pub fn transcript(&self) -> &TranscriptLog {
        &self.transcript
    }

    pub fn is_transcribing(&self) -> bool {
        self.transcriber.is_some()
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("phase", &self.state.phase)
            .field("local", &self.local)
            .field("peers", &self.remote.peer_count())
            .field("pending", &self.gate.pending())
            .finish()
    }
}
