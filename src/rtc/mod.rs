//! SFU media plumbing
//!
//! Capability negotiation ([`Device`]), the two transports, and the
//! producers and consumers that flow through them.

pub mod capabilities;
pub mod consumer;
pub mod device;
pub mod producer;
pub mod tag;
pub mod transport;

pub use capabilities::{RtpCapabilities, RtpCodecCapability, RtpParameters};
pub use consumer::Consumer;
pub use device::Device;
pub use producer::Producer;
pub use tag::{MediaClass, MediaTypeTag};
pub use transport::{
    ConnectionState, Direction, DtlsParameters, IceParameters, Transport, TransportOptions,
};
