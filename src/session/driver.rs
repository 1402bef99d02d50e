//! Session task
//!
//! [`SessionDriver`] is the single task that owns a [`Session`]. It
//! multiplexes inbound signaling, commands from [`SessionHandle`]s, the
//! initial camera/microphone capture and the end of a screen share onto the
//! session, one at a time.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::{mpsc, oneshot};

use super::context::JoinRequest;
use super::orchestrator::Session;
use super::state::SessionPhase;
use crate::audio::AudioWorklet;
use crate::error::{Result, SessionError};
use crate::media::MediaStream;
use crate::remote::PeerView;
use crate::signaling::SignalMessage;

type Reply<T> = oneshot::Sender<Result<T>>;

type TrackEnded = Pin<Box<dyn Future<Output = String> + Send>>;

/// Request sent to the session task
#[derive(Debug)]
pub enum SessionCommand {
    Join(JoinRequest, Reply<()>),
    ToggleAudio(Reply<Option<bool>>),
    ToggleVideo(Reply<Option<bool>>),
    StartScreenShare(Reply<MediaStream>),
    StopScreenShare(Reply<bool>),
    StartTranscription(Reply<AudioWorklet>),
    StopTranscription(Reply<()>),
    Peers(Reply<Vec<PeerView>>),
    Leave(Reply<()>),
}

/// Cloneable handle to a running session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    async fn request<T>(&self, command: impl FnOnce(Reply<T>) -> SessionCommand) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(command(reply))
            .await
            .map_err(|_| SessionError::Stopped)?;
        rx.await.map_err(|_| SessionError::Stopped)?
    }

    pub async fn join(&self, request: JoinRequest) -> Result<()> {
        self.request(|reply| SessionCommand::Join(request, reply)).await
    }

    pub async fn toggle_audio(&self) -> Result<Option<bool>> {
        self.request(SessionCommand::ToggleAudio).await
    }

    pub async fn toggle_video(&self) -> Result<Option<bool>> {
        self.request(SessionCommand::ToggleVideo).await
    }

    pub async fn start_screen_share(&self) -> Result<MediaStream> {
        self.request(SessionCommand::StartScreenShare).await
    }

    pub async fn stop_screen_share(&self) -> Result<bool> {
        self.request(SessionCommand::StopScreenShare).await
    }

    pub async fn start_transcription(&self) -> Result<AudioWorklet> {
        self.request(SessionCommand::StartTranscription).await
    }

    pub async fn stop_transcription(&self) -> Result<()> {
        self.request(SessionCommand::StopTranscription).await
    }

    pub async fn peers(&self) -> Result<Vec<PeerView>> {
        self.request(SessionCommand::Peers).await
    }

    /// Leave and wait for teardown to finish
    pub async fn leave(&self) -> Result<()> {
        self.request(SessionCommand::Leave).await
    }

    /// Whether the session task is still running
    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }
}

/// Owns the session and runs its event loop
pub struct SessionDriver {
    session: Session,
    inbound: mpsc::UnboundedReceiver<SignalMessage>,
    commands: mpsc::Receiver<SessionCommand>,
}

impl SessionDriver {
    /// Wrap a session fed by `inbound` signaling messages
    pub fn new(
        session: Session,
        inbound: mpsc::UnboundedReceiver<SignalMessage>,
    ) -> (Self, SessionHandle) {
        let (tx, commands) = mpsc::channel(session.config().command_capacity.max(1));
        let driver = Self {
            session,
            inbound,
            commands,
        };
        (driver, SessionHandle { tx })
    }

    /// Run until the session terminates, the signaling channel closes or
    /// every handle is dropped
    ///
    /// Captures the camera and microphone concurrently with everything else,
    /// so a `join` issued early is sent once the capture completes. Returns
    /// the terminated session.
    pub async fn run(mut self) -> Session {
        let source = self.session.media_source();
        let constraints = self.session.config().capture.clone();
        let capture = async move { source.user_media(&constraints).await };
        tokio::pin!(capture);

        let mut captured = false;
        let mut screen_ended: Option<TrackEnded> = None;

        tracing::debug!("Session driver started");

        loop {
            tokio::select! {
                result = &mut capture, if !captured => {
                    captured = true;
                    if let Err(e) = self.session.on_local_media(result).await {
                        tracing::warn!(error = %e, "Failed to attach local stream");
                    }
                }

                message = self.inbound.recv() => {
                    let Some(message) = message else {
                        tracing::info!("Signaling channel closed");
                        self.session.leave().await;
                        break;
                    };
                    let event = message.event.clone();
                    if let Err(e) = self.session.handle_message(message).await {
                        tracing::warn!(event = %event, error = %e, "Failed to handle signaling event");
                    }
                }

                command = self.commands.recv() => {
                    let Some(command) = command else {
                        tracing::debug!("All session handles dropped");
                        self.session.leave().await;
                        break;
                    };
                    self.handle_command(command, &mut screen_ended).await;
                }

                track_id = wait_ended(&mut screen_ended) => {
                    screen_ended = None;
                    self.session.on_screen_track_ended(&track_id).await;
                }
            }

            if self.session.phase() == SessionPhase::Terminated {
                break;
            }
        }

        tracing::debug!("Session driver finished");
        self.session
    }

    async fn handle_command(
        &mut self,
        command: SessionCommand,
        screen_ended: &mut Option<TrackEnded>,
    ) {
        let session = &mut self.session;

        // A dropped reply receiver only means the caller stopped waiting
        match command {
            SessionCommand::Join(request, reply) => {
                let _ = reply.send(session.join(request).await);
            }
            SessionCommand::ToggleAudio(reply) => {
                let _ = reply.send(session.toggle_audio());
            }
            SessionCommand::ToggleVideo(reply) => {
                let _ = reply.send(session.toggle_video());
            }
            SessionCommand::StartScreenShare(reply) => {
                let result = session.start_screen_share().await;
                if let Ok(stream) = &result {
                    *screen_ended = stream.video_track().map(|track| {
                        Box::pin(async move {
                            track.ended().await;
                            track.id().to_string()
                        }) as TrackEnded
                    });
                }
                let _ = reply.send(result);
            }
            SessionCommand::StopScreenShare(reply) => {
                *screen_ended = None;
                let _ = reply.send(Ok(session.stop_screen_share().await));
            }
            SessionCommand::StartTranscription(reply) => {
                let _ = reply.send(session.start_transcription().await);
            }
            SessionCommand::StopTranscription(reply) => {
                let _ = reply.send(session.stop_transcription());
            }
            SessionCommand::Peers(reply) => {
                let _ = reply.send(Ok(session.peers()));
            }
            SessionCommand::Leave(reply) => {
                session.leave().await;
                let _ = reply.send(Ok(()));
            }
        }
    }
}

async fn wait_ended(watch: &mut Option<TrackEnded>) -> String {
    match watch {
        Some(ended) => ended.await,
        None => std::future::pending().await,
    }
}
