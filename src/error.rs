//! Error types
//!
//! Every fallible operation in the crate returns [`Result`]. Each layer has its
//! own error enum so callers can tell a rejected signaling request apart from
//! a capability mismatch or a missing camera.

use std::fmt;

use crate::media::MediaKind;
use crate::rtc::Direction;
use crate::session::SessionPhase;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug)]
pub enum Error {
    /// Signaling round trip failed
    Signaling(SignalingError),
    /// Capability negotiation failed
    Negotiation(NegotiationError),
    /// Transport negotiation or usage failed
    Transport(TransportError),
    /// Local capture device failed
    Device(DeviceError),
    /// Operation not valid for the current session state
    Session(SessionError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Signaling(e) => write!(f, "Signaling error: {}", e),
            Error::Negotiation(e) => write!(f, "Negotiation error: {}", e),
            Error::Transport(e) => write!(f, "Transport error: {}", e),
            Error::Device(e) => write!(f, "Device error: {}", e),
            Error::Session(e) => write!(f, "Session error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Signaling(e) => Some(e),
            Error::Negotiation(e) => Some(e),
            Error::Transport(e) => Some(e),
            Error::Device(e) => Some(e),
            Error::Session(e) => Some(e),
        }
    }
}

impl From<SignalingError> for Error {
    fn from(e: SignalingError) -> Self {
        Error::Signaling(e)
    }
}

impl From<NegotiationError> for Error {
    fn from(e: NegotiationError) -> Self {
        Error::Negotiation(e)
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Error::Transport(e)
    }
}

impl From<DeviceError> for Error {
    fn from(e: DeviceError) -> Self {
        Error::Device(e)
    }
}

impl From<SessionError> for Error {
    fn from(e: SessionError) -> Self {
        Error::Session(e)
    }
}

/// Errors from the signaling channel
#[derive(Debug, Clone, PartialEq)]
pub enum SignalingError {
    /// The SFU answered with an `error` field
    Rejected { event: String, message: String },
    /// The channel is gone (disconnected or dropped)
    Closed,
    /// A payload could not be decoded into the expected shape
    InvalidPayload { event: String, reason: String },
}

impl SignalingError {
    pub(crate) fn invalid(event: &str, err: serde_json::Error) -> Self {
        SignalingError::InvalidPayload {
            event: event.to_string(),
            reason: err.to_string(),
        }
    }
}

impl fmt::Display for SignalingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalingError::Rejected { event, message } => {
                write!(f, "{} rejected: {}", event, message)
            }
            SignalingError::Closed => write!(f, "Signaling channel closed"),
            SignalingError::InvalidPayload { event, reason } => {
                write!(f, "Invalid {} payload: {}", event, reason)
            }
        }
    }
}

impl std::error::Error for SignalingError {}

/// Errors from loading router capabilities into the local device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NegotiationError {
    /// Device was already loaded
    AlreadyLoaded,
    /// Device has not been loaded yet
    NotLoaded,
    /// Router announced no codecs at all
    NoRouterCodecs,
    /// No codec is supported by both sides
    NoCommonCodecs,
    /// Nothing negotiated for this media kind
    CannotProduce(MediaKind),
}

impl fmt::Display for NegotiationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NegotiationError::AlreadyLoaded => write!(f, "Device already loaded"),
            NegotiationError::NotLoaded => write!(f, "Device not loaded"),
            NegotiationError::NoRouterCodecs => write!(f, "Router announced no codecs"),
            NegotiationError::NoCommonCodecs => {
                write!(f, "No codec in common with the router")
            }
            NegotiationError::CannotProduce(kind) => write!(f, "Cannot produce {}", kind),
        }
    }
}

impl std::error::Error for NegotiationError {}

/// Errors from transport negotiation and usage
#[derive(Debug, Clone, PartialEq)]
pub enum TransportError {
    /// DTLS connect was rejected; the transport is unusable from now on
    ConnectFailed { transport_id: String, reason: String },
    /// Transport was closed
    Closed(String),
    /// Operation requires the other direction
    WrongDirection { expected: Direction, actual: Direction },
    /// Produce request failed for a single track
    ProduceFailed { kind: MediaKind, reason: String },
    /// Consume request failed for a single producer
    ConsumeFailed { producer_id: String, reason: String },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::ConnectFailed { transport_id, reason } => {
                write!(f, "Transport {} failed to connect: {}", transport_id, reason)
            }
            TransportError::Closed(id) => write!(f, "Transport {} is closed", id),
            TransportError::WrongDirection { expected, actual } => {
                write!(f, "Expected {} transport, got {}", expected, actual)
            }
            TransportError::ProduceFailed { kind, reason } => {
                write!(f, "Failed to produce {}: {}", kind, reason)
            }
            TransportError::ConsumeFailed { producer_id, reason } => {
                write!(f, "Failed to consume {}: {}", producer_id, reason)
            }
        }
    }
}

impl std::error::Error for TransportError {}

/// Errors from local capture devices
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// User or OS denied access
    PermissionDenied,
    /// No matching device found
    NotFound,
    /// Anything else
    Other(String),
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::PermissionDenied => write!(f, "Device access denied"),
            DeviceError::NotFound => write!(f, "No capture device found"),
            DeviceError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for DeviceError {}

/// Errors from invoking session operations at the wrong time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Operation not valid in this phase
    InvalidPhase(SessionPhase),
    /// Send transport has not been created
    NoSendTransport,
    /// Recv transport has not been created
    NoRecvTransport,
    /// No local stream to operate on
    NoLocalStream,
    /// Screen share already running
    AlreadySharing,
    /// Transcription already running
    AlreadyTranscribing,
    /// The task driving the session has exited
    Stopped,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::InvalidPhase(phase) => {
                write!(f, "Operation not valid in phase {:?}", phase)
            }
            SessionError::NoSendTransport => write!(f, "No send transport"),
            SessionError::NoRecvTransport => write!(f, "No recv transport"),
            SessionError::NoLocalStream => write!(f, "No local stream"),
            SessionError::AlreadySharing => write!(f, "Screen share already active"),
            SessionError::AlreadyTranscribing => write!(f, "Transcription already active"),
            SessionError::Stopped => write!(f, "Session driver stopped"),
        }
    }
}

impl std::error::Error for SessionError {}
