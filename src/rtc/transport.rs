//! Send and receive transports
//!
//! A session owns exactly one transport per direction. Each transport is
//! created with one signaling round trip and connected (DTLS parameters
//! handed to the SFU) lazily, on its first produce or consume. The connect
//! exchange happens at most once per transport: after a rejected connect the
//! transport stays failed.

use std::fmt;

use rand::RngCore;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::consumer::Consumer;
use super::device::Device;
use super::producer::Producer;
use super::tag::MediaTypeTag;
use crate::error::{Result, SignalingError, TransportError};
use crate::media::MediaTrack;
use crate::signaling::protocol::{
    events, AppData, ConnectTransportRequest, ConsumeRequest, ConsumeResponse,
    CreateTransportRequest, ProduceRequest, ProduceResponse, ProducerAnnouncement,
    ResumeConsumerRequest,
};
use crate::signaling::{call, SignalingChannel};

/// Media flow direction of a transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Local tracks to the SFU
    Send,
    /// SFU to local playback
    Recv,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Send => write!(f, "send"),
            Direction::Recv => write!(f, "recv"),
        }
    }
}

/// Connection state of a transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Created, connect not yet fired
    New,
    /// Connect sent, waiting for the SFU
    Connecting,
    /// SFU acknowledged connect
    Connected,
    /// SFU rejected connect
    Failed,
    /// Closed locally
    Closed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DtlsRole {
    #[default]
    Auto,
    Client,
    Server,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DtlsFingerprint {
    pub algorithm: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DtlsParameters {
    #[serde(default)]
    pub role: DtlsRole,
    pub fingerprints: Vec<DtlsFingerprint>,
}

impl DtlsParameters {
    /// Parameters with a freshly generated sha-256 style fingerprint
    pub fn random() -> Self {
        let mut digest = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut digest);
        let value = digest
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(":");

        Self {
            role: DtlsRole::Auto,
            fingerprints: vec![DtlsFingerprint {
                algorithm: "sha-256".into(),
                value,
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceParameters {
    pub username_fragment: String,
    pub password: String,
    #[serde(default)]
    pub ice_lite: bool,
}

/// Server-side transport description returned by `create-webrtc-transport`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportOptions {
    pub id: String,
    pub ice_parameters: IceParameters,
    /// Passed through to the network stack untouched
    #[serde(default)]
    pub ice_candidates: Vec<Value>,
    pub dtls_parameters: DtlsParameters,
}

/// One direction of the session's media path
#[derive(Debug)]
pub struct Transport {
    direction: Direction,

    /// Remote (SFU) side parameters
    options: TransportOptions,

    /// Local DTLS parameters sent on connect
    local_dtls: DtlsParameters,

    state: ConnectionState,

    /// Next media section id for produced tracks
    next_mid: u32,
}

impl Transport {
    /// Ask the SFU for a transport and build the local side
    pub async fn create<C>(channel: &C, direction: Direction, device: &Device) -> Result<Self>
    where
        C: SignalingChannel + ?Sized,
    {
        let options: TransportOptions = call(
            channel,
            events::CREATE_TRANSPORT,
            &CreateTransportRequest { direction },
        )
        .await?;

        tracing::info!(
            transport = %options.id,
            direction = %direction,
            candidates = options.ice_candidates.len(),
            "Transport created"
        );

        Ok(Self::from_options(
            direction,
            options,
            device.dtls_parameters().clone(),
        ))
    }

    pub fn from_options(
        direction: Direction,
        options: TransportOptions,
        local_dtls: DtlsParameters,
    ) -> Self {
        Self {
            direction,
            options,
            local_dtls,
            state: ConnectionState::New,
            next_mid: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.options.id
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn options(&self) -> &TransportOptions {
        &self.options
    }

    pub fn is_closed(&self) -> bool {
        self.state == ConnectionState::Closed
    }

    fn expect_direction(&self, expected: Direction) -> std::result::Result<(), TransportError> {
        if self.state == ConnectionState::Closed {
            return Err(TransportError::Closed(self.options.id.clone()));
        }
        if self.direction != expected {
            return Err(TransportError::WrongDirection {
                expected,
                actual: self.direction,
            });
        }
        Ok(())
    }

    /// Fire the connect exchange if it has not fired yet
    async fn ensure_connected<C>(&mut self, channel: &C) -> std::result::Result<(), TransportError>
    where
        C: SignalingChannel + ?Sized,
    {
        match self.state {
            ConnectionState::Connected => return Ok(()),
            ConnectionState::Closed => return Err(TransportError::Closed(self.options.id.clone())),
            ConnectionState::Failed | ConnectionState::Connecting => {
                // Connect already fired; it never fires twice
                return Err(TransportError::ConnectFailed {
                    transport_id: self.options.id.clone(),
                    reason: "transport did not connect".into(),
                });
            }
            ConnectionState::New => {}
        }

        self.state = ConnectionState::Connecting;
        let request = ConnectTransportRequest {
            transport_id: self.options.id.clone(),
            dtls_parameters: self.local_dtls.clone(),
        };

        match call::<_, _, IgnoredAny>(channel, events::CONNECT_TRANSPORT, &request).await {
            Ok(_) => {
                self.state = ConnectionState::Connected;
                tracing::info!(transport = %self.options.id, direction = %self.direction, "Transport connected");
                Ok(())
            }
            Err(e) => {
                self.state = ConnectionState::Failed;
                tracing::warn!(transport = %self.options.id, error = %e, "Transport connect failed");
                Err(TransportError::ConnectFailed {
                    transport_id: self.options.id.clone(),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Publish a local track
    ///
    /// Connects the transport first if needed. A failure here only affects
    /// this track.
    pub async fn produce<C>(
        &mut self,
        channel: &C,
        device: &Device,
        track: MediaTrack,
        tag: MediaTypeTag,
    ) -> Result<Producer>
    where
        C: SignalingChannel + ?Sized,
    {
        self.expect_direction(Direction::Send)?;

        let kind = track.kind();
        if track.is_ended() {
            return Err(TransportError::ProduceFailed {
                kind,
                reason: "track already ended".into(),
            }
            .into());
        }

        let rtp_parameters = device.send_parameters(kind, self.next_mid.to_string())?;
        self.ensure_connected(channel).await?;

        let request = ProduceRequest {
            transport_id: self.options.id.clone(),
            kind,
            rtp_parameters: rtp_parameters.clone(),
            app_data: AppData::tagged(tag),
        };

        let response: ProduceResponse = call(channel, events::PRODUCE, &request)
            .await
            .map_err(|e| TransportError::ProduceFailed {
                kind,
                reason: e.to_string(),
            })?;

        self.next_mid += 1;

        tracing::info!(
            transport = %self.options.id,
            producer = %response.id,
            kind = %kind,
            tag = %tag,
            "Producer created"
        );

        Ok(Producer::new(response.id, track, tag, rtp_parameters))
    }

    /// Receive a remote producer
    ///
    /// The consumer is created paused and resumed right away; a failed resume
    /// is logged and the (paused) consumer is still returned.
    pub async fn consume<C>(
        &mut self,
        channel: &C,
        device: &Device,
        announcement: &ProducerAnnouncement,
    ) -> Result<Consumer>
    where
        C: SignalingChannel + ?Sized,
    {
        self.expect_direction(Direction::Recv)?;

        let request = ConsumeRequest {
            producer_id: announcement.producer_id.clone(),
            rtp_capabilities: device.rtp_capabilities()?.clone(),
        };

        let response: ConsumeResponse = call(channel, events::CONSUME, &request)
            .await
            .map_err(|e| TransportError::ConsumeFailed {
                producer_id: announcement.producer_id.clone(),
                reason: e.to_string(),
            })?;

        self.ensure_connected(channel).await?;

        let tag = response
            .app_data
            .tag()
            .or_else(|| announcement.app_data.tag())
            .unwrap_or(MediaTypeTag::Camera);

        let mut consumer = Consumer::new(
            response.id,
            response.producer_id,
            announcement.socket_id.clone(),
            response.kind,
            tag,
            response.rtp_parameters,
        );

        let resume = ResumeConsumerRequest {
            consumer_id: consumer.id().to_string(),
        };
        match call::<_, _, IgnoredAny>(channel, events::RESUME_CONSUMER, &resume).await {
            Ok(_) => consumer.mark_resumed(),
            Err(e) => log_resume_failure(consumer.id(), &e),
        }

        tracing::info!(
            transport = %self.options.id,
            consumer = %consumer.id(),
            producer = %consumer.producer_id(),
            peer = %consumer.peer_id(),
            tag = %tag,
            "Consumer created"
        );

        Ok(consumer)
    }

    /// Close the transport; further produce/consume calls fail
    pub fn close(&mut self) {
        if self.state == ConnectionState::Closed {
            return;
        }
        self.state = ConnectionState::Closed;
        tracing::info!(transport = %self.options.id, direction = %self.direction, "Transport closed");
    }
}

fn log_resume_failure(consumer_id: &str, error: &SignalingError) {
    tracing::warn!(consumer = %consumer_id, error = %error, "Failed to resume consumer");
}
