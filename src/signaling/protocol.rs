//! Signaling protocol types
//!
//! Event names and payload shapes exchanged with the SFU. Payloads travel as
//! JSON objects with camelCase keys.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SignalingError;
use crate::media::MediaKind;
use crate::rtc::{Direction, DtlsParameters, MediaTypeTag, RtpCapabilities, RtpParameters};

/// Event names
pub mod events {
    // Inbound
    pub const ROUTER_RTP_CAPABILITIES: &str = "router-rtp-capabilities";
    pub const EXISTING_PRODUCERS: &str = "existing-producers";
    pub const NEW_PRODUCER: &str = "new-producer";
    pub const PEER_JOINED: &str = "peer-joined";
    pub const PEER_LEFT: &str = "peer-left";
    pub const PEER_MEDIA_STATUS: &str = "peer-media-status";
    pub const EXISTING_PEER_STATUSES: &str = "existing-peer-statuses";
    pub const TRANSCRIPTION_RESULT: &str = "transcription-result";
    pub const TRANSLATION_COMPLETE: &str = "translation-complete";
    pub const TRANSCRIPTION_ERROR: &str = "transcription-error";
    pub const SPEAKING_STATUS: &str = "speaking-status";

    // Outbound requests
    pub const CREATE_TRANSPORT: &str = "create-webrtc-transport";
    pub const CONNECT_TRANSPORT: &str = "connect-transport";
    pub const PRODUCE: &str = "produce";
    pub const CONSUME: &str = "consume";
    pub const RESUME_CONSUMER: &str = "resume-consumer";

    // Outbound notifications
    pub const JOIN_ROOM: &str = "join-room";
    pub const UPDATE_MEDIA_STATUS: &str = "update-media-status";
    pub const START_TRANSCRIPTION: &str = "start-transcription";
    pub const STOP_TRANSCRIPTION: &str = "stop-transcription";
    pub const AUDIO_DATA: &str = "audio-data";
}

/// Raw inbound message as delivered by the transport
#[derive(Debug, Clone, PartialEq)]
pub struct SignalMessage {
    pub event: String,
    pub payload: Value,
}

impl SignalMessage {
    pub fn new(event: impl Into<String>, payload: Value) -> Self {
        Self {
            event: event.into(),
            payload,
        }
    }
}

/// Opaque application data attached to producers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

impl AppData {
    pub fn tagged(tag: MediaTypeTag) -> Self {
        Self {
            media_type: Some(tag.as_str().to_string()),
        }
    }

    /// The media type tag, if one was attached
    pub fn tag(&self) -> Option<MediaTypeTag> {
        self.media_type.as_deref().map(MediaTypeTag::from_label)
    }
}

/// A remote producer the SFU wants us to know about
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProducerAnnouncement {
    pub producer_id: String,
    /// Owning peer
    pub socket_id: String,
    #[serde(default)]
    pub app_data: AppData,
}

impl ProducerAnnouncement {
    pub fn new(producer_id: impl Into<String>, socket_id: impl Into<String>) -> Self {
        Self {
            producer_id: producer_id.into(),
            socket_id: socket_id.into(),
            app_data: AppData::default(),
        }
    }

    pub fn with_tag(mut self, tag: MediaTypeTag) -> Self {
        self.app_data = AppData::tagged(tag);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouterCapabilities {
    pub rtp_capabilities: RtpCapabilities,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerJoined {
    pub socket_id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerLeft {
    pub socket_id: String,
}

/// Mute state of a remote peer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerStatus {
    pub socket_id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub is_audio_muted: bool,
    #[serde(default)]
    pub is_video_muted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptionResult {
    pub socket_id: String,
    #[serde(default)]
    pub username: String,
    pub transcript: String,
    pub is_final: bool,
    pub timestamp: String,
    #[serde(default)]
    pub source_language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationComplete {
    pub socket_id: String,
    pub timestamp: String,
    pub translated_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionFailure {
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeakingStatus {
    pub is_speaking: bool,
}

/// Decoded inbound event
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    RouterCapabilities(RouterCapabilities),
    ExistingProducers(Vec<ProducerAnnouncement>),
    NewProducer(ProducerAnnouncement),
    PeerJoined(PeerJoined),
    PeerLeft(PeerLeft),
    PeerMediaStatus(PeerStatus),
    ExistingPeerStatuses(Vec<PeerStatus>),
    TranscriptionResult(TranscriptionResult),
    TranslationComplete(TranslationComplete),
    TranscriptionError(TranscriptionFailure),
    SpeakingStatus(SpeakingStatus),
}

impl InboundEvent {
    /// Decode a raw message
    ///
    /// Returns `Ok(None)` for events this crate does not handle (chat,
    /// documents and so on share the same channel).
    pub fn decode(message: SignalMessage) -> Result<Option<Self>, SignalingError> {
        let SignalMessage { event, payload } = message;

        fn parse<T: serde::de::DeserializeOwned>(
            event: &str,
            payload: Value,
        ) -> Result<T, SignalingError> {
            serde_json::from_value(payload).map_err(|e| SignalingError::invalid(event, e))
        }

        let decoded = match event.as_str() {
            events::ROUTER_RTP_CAPABILITIES => {
                InboundEvent::RouterCapabilities(parse(&event, payload)?)
            }
            events::EXISTING_PRODUCERS => InboundEvent::ExistingProducers(parse(&event, payload)?),
            events::NEW_PRODUCER => InboundEvent::NewProducer(parse(&event, payload)?),
            events::PEER_JOINED => InboundEvent::PeerJoined(parse(&event, payload)?),
            events::PEER_LEFT => InboundEvent::PeerLeft(parse(&event, payload)?),
            events::PEER_MEDIA_STATUS => InboundEvent::PeerMediaStatus(parse(&event, payload)?),
            events::EXISTING_PEER_STATUSES => {
                InboundEvent::ExistingPeerStatuses(parse(&event, payload)?)
            }
            events::TRANSCRIPTION_RESULT => {
                InboundEvent::TranscriptionResult(parse(&event, payload)?)
            }
            events::TRANSLATION_COMPLETE => {
                InboundEvent::TranslationComplete(parse(&event, payload)?)
            }
            events::TRANSCRIPTION_ERROR => {
                InboundEvent::TranscriptionError(parse(&event, payload)?)
            }
            events::SPEAKING_STATUS => InboundEvent::SpeakingStatus(parse(&event, payload)?),
            _ => return Ok(None),
        };

        Ok(Some(decoded))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateTransportRequest {
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectTransportRequest {
    pub transport_id: String,
    pub dtls_parameters: DtlsParameters,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProduceRequest {
    pub transport_id: String,
    pub kind: MediaKind,
    pub rtp_parameters: RtpParameters,
    pub app_data: AppData,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProduceResponse {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumeRequest {
    pub producer_id: String,
    pub rtp_capabilities: RtpCapabilities,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumeResponse {
    pub id: String,
    pub producer_id: String,
    pub kind: MediaKind,
    pub rtp_parameters: RtpParameters,
    #[serde(default)]
    pub app_data: AppData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeConsumerRequest {
    pub consumer_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoom {
    pub room_id: String,
    pub username: String,
    pub display_name: String,
    pub language: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaStatusUpdate {
    pub is_audio_muted: bool,
    pub is_video_muted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartTranscription {
    pub room_id: String,
    pub language_code: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_decode_new_producer() {
        let msg = SignalMessage::new(
            events::NEW_PRODUCER,
            json!({"producerId": "p1", "socketId": "s1", "appData": {"mediaType": "screen"}}),
        );

        let event = InboundEvent::decode(msg).unwrap().unwrap();
        let InboundEvent::NewProducer(ann) = event else {
            panic!("wrong event");
        };
        assert_eq!(ann.producer_id, "p1");
        assert_eq!(ann.app_data.tag(), Some(MediaTypeTag::Screen));
    }

    #[test]
    fn test_decode_existing_producers_without_app_data() {
        let msg = SignalMessage::new(
            events::EXISTING_PRODUCERS,
            json!([{"producerId": "p1", "socketId": "s1"}, {"producerId": "p2", "socketId": "s2"}]),
        );

        let Some(InboundEvent::ExistingProducers(list)) = InboundEvent::decode(msg).unwrap() else {
            panic!("wrong event");
        };
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].app_data.tag(), None);
    }

    #[test]
    fn test_decode_unknown_event() {
        let msg = SignalMessage::new("chat-message", json!({"text": "hi"}));
        assert_eq!(InboundEvent::decode(msg).unwrap(), None);
    }

    #[test]
    fn test_decode_malformed_payload() {
        let msg = SignalMessage::new(events::PEER_LEFT, json!({"id": 3}));
        let err = InboundEvent::decode(msg).unwrap_err();
        assert!(matches!(err, SignalingError::InvalidPayload { .. }));
    }

    #[test]
    fn test_join_room_wire_format() {
        let join = JoinRoom {
            room_id: "r1".into(),
            username: "ana".into(),
            display_name: "Ana".into(),
            language: "es".into(),
        };

        assert_eq!(
            serde_json::to_value(join).unwrap(),
            json!({"roomId": "r1", "username": "ana", "displayName": "Ana", "language": "es"})
        );
    }
}
