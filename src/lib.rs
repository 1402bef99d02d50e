//! # sfu-rs
//!
//! Client core for joining a conference room on a selective forwarding unit
//! (SFU) and for streaming microphone audio to a transcription service.
//!
//! ## Architecture
//!
//! ```text
//!        SessionHandle ──commands──┐
//!                                  ▼
//!   signaling ──SignalMessage──► SessionDriver ──owns──► Session
//!                                                          │
//!            ┌──────────────┬──────────────┬───────────────┼──────────────┐
//!            ▼              ▼              ▼               ▼              ▼
//!         Device      send Transport  recv Transport   RemotePeers    Transcriber
//!     (capabilities)   (producers)     (consumers)    (peer bundles)  (AudioWorklet)
//! ```
//!
//! The [`Session`] joins a room, negotiates capabilities, creates one send and
//! one receive transport, publishes the local camera and microphone and
//! consumes every remote producer. Producer announcements that arrive before
//! both transports exist are held and consumed in arrival order once ready.
//!
//! The [`audio`] pipeline cuts raw microphone samples into fixed windows,
//! resamples them to 16 kHz and ships them as 16-bit PCM chunks.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use sfu_rs::{JoinRequest, Session, SessionConfig, SessionDriver};
//! use sfu_rs::media::MediaSource;
//! use sfu_rs::signaling::{ChannelSignaling, SignalMessage};
//!
//! # async fn run(source: Arc<dyn MediaSource>) -> sfu_rs::Result<()> {
//! let (signaling, mut outbound) = ChannelSignaling::new();
//! let (inbound, inbound_rx) = tokio::sync::mpsc::unbounded_channel::<SignalMessage>();
//!
//! let (session, mut events) = Session::new(SessionConfig::default(), Arc::new(signaling), source);
//! let (driver, handle) = SessionDriver::new(session, inbound_rx);
//! tokio::spawn(driver.run());
//!
//! handle.join(JoinRequest::new("standup", "ana")).await?;
//! while let Some(event) = events.recv().await {
//!     println!("{event:?}");
//! }
//! # drop((inbound, &mut outbound));
//! # Ok(())
//! # }
//! ```

pub mod audio;
pub mod config;
pub mod error;
pub mod media;
pub mod remote;
pub mod rtc;
pub mod session;
pub mod signaling;
pub mod stats;

#[cfg(test)]
mod testing;

pub use config::{AudioConfig, SessionConfig, TRANSCRIPTION_SAMPLE_RATE};
pub use error::{Error, Result};
pub use session::{
    JoinRequest, Session, SessionCommand, SessionDriver, SessionEvent, SessionHandle, SessionPhase,
};
