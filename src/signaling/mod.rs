//! SFU signaling
//!
//! Outbound emits go through [`SignalingChannel`]; inbound messages arrive as
//! [`SignalMessage`]s and are decoded into [`InboundEvent`]s by the session
//! driver.

pub mod channel;
pub mod protocol;

pub use channel::{call, check_ack, notify, ChannelSignaling, OutboundMessage, SignalingChannel};
pub use protocol::{events, AppData, InboundEvent, ProducerAnnouncement, SignalMessage};
