//! RTP capability and parameter types
//!
//! These mirror the JSON the SFU router speaks. Capabilities describe what an
//! endpoint can do; parameters describe one concrete stream.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::media::MediaKind;

/// RTCP feedback mechanism supported by a codec
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RtcpFeedback {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub parameter: String,
}

impl RtcpFeedback {
    pub fn new(kind: &str, parameter: &str) -> Self {
        Self {
            kind: kind.to_string(),
            parameter: parameter.to_string(),
        }
    }
}

/// A codec an endpoint can send or receive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RtpCodecCapability {
    pub kind: MediaKind,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_payload_type: Option<u8>,
    pub clock_rate: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<u8>,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default)]
    pub rtcp_feedback: Vec<RtcpFeedback>,
}

impl RtpCodecCapability {
    /// Retransmission codecs only carry feedback for another payload type
    pub fn is_rtx(&self) -> bool {
        self.mime_type.to_ascii_lowercase().ends_with("/rtx")
    }

    /// Whether two codec descriptions refer to the same codec
    ///
    /// Compares mime type (case-insensitive), clock rate and channel count;
    /// H264 additionally requires the same packetization mode.
    pub fn matches(&self, other: &RtpCodecCapability) -> bool {
        if self.kind != other.kind
            || !self.mime_type.eq_ignore_ascii_case(&other.mime_type)
            || self.clock_rate != other.clock_rate
        {
            return false;
        }

        if self.kind == MediaKind::Audio && self.channels.unwrap_or(1) != other.channels.unwrap_or(1)
        {
            return false;
        }

        if self.mime_type.eq_ignore_ascii_case("video/h264") {
            let mode = |c: &RtpCodecCapability| {
                c.parameters
                    .get("packetization-mode")
                    .and_then(Value::as_u64)
                    .unwrap_or(0)
            };
            if mode(self) != mode(other) {
                return false;
            }
        }

        true
    }
}

/// RTP header extension an endpoint understands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RtpHeaderExtension {
    pub kind: MediaKind,
    pub uri: String,
    pub preferred_id: u16,
    #[serde(default)]
    pub preferred_encrypt: bool,
}

/// Full capability set of an endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RtpCapabilities {
    #[serde(default)]
    pub codecs: Vec<RtpCodecCapability>,
    #[serde(default)]
    pub header_extensions: Vec<RtpHeaderExtension>,
}

impl RtpCapabilities {
    /// Codecs a typical browser endpoint can encode and decode
    pub fn browser_default() -> Self {
        let opus = RtpCodecCapability {
            kind: MediaKind::Audio,
            mime_type: "audio/opus".into(),
            preferred_payload_type: Some(111),
            clock_rate: 48_000,
            channels: Some(2),
            parameters: Map::new(),
            rtcp_feedback: vec![RtcpFeedback::new("transport-cc", "")],
        };

        let video_feedback = vec![
            RtcpFeedback::new("nack", ""),
            RtcpFeedback::new("nack", "pli"),
            RtcpFeedback::new("ccm", "fir"),
            RtcpFeedback::new("goog-remb", ""),
            RtcpFeedback::new("transport-cc", ""),
        ];

        let vp8 = RtpCodecCapability {
            kind: MediaKind::Video,
            mime_type: "video/VP8".into(),
            preferred_payload_type: Some(96),
            clock_rate: 90_000,
            channels: None,
            parameters: Map::new(),
            rtcp_feedback: video_feedback.clone(),
        };

        let mut h264_params = Map::new();
        h264_params.insert("packetization-mode".into(), Value::from(1));
        h264_params.insert("level-asymmetry-allowed".into(), Value::from(1));
        h264_params.insert("profile-level-id".into(), Value::from("42e01f"));
        let h264 = RtpCodecCapability {
            kind: MediaKind::Video,
            mime_type: "video/H264".into(),
            preferred_payload_type: Some(102),
            clock_rate: 90_000,
            channels: None,
            parameters: h264_params,
            rtcp_feedback: video_feedback,
        };

        let ext = |kind, uri: &str, id| RtpHeaderExtension {
            kind,
            uri: uri.to_string(),
            preferred_id: id,
            preferred_encrypt: false,
        };

        Self {
            codecs: vec![opus, vp8, h264],
            header_extensions: vec![
                ext(MediaKind::Audio, "urn:ietf:params:rtp-hdrext:sdes:mid", 1),
                ext(MediaKind::Video, "urn:ietf:params:rtp-hdrext:sdes:mid", 1),
                ext(
                    MediaKind::Audio,
                    "http://www.webrtc.org/experiments/rtp-hdrext/abs-send-time",
                    4,
                ),
                ext(
                    MediaKind::Video,
                    "http://www.webrtc.org/experiments/rtp-hdrext/abs-send-time",
                    4,
                ),
                ext(MediaKind::Audio, "urn:ietf:params:rtp-hdrext:ssrc-audio-level", 10),
                ext(MediaKind::Video, "urn:3gpp:video-orientation", 11),
            ],
        }
    }

    /// Whether any codec of this kind is present
    pub fn supports(&self, kind: MediaKind) -> bool {
        self.codecs.iter().any(|c| c.kind == kind && !c.is_rtx())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RtpCodecParameters {
    pub mime_type: String,
    pub payload_type: u8,
    pub clock_rate: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<u8>,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default)]
    pub rtcp_feedback: Vec<RtcpFeedback>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RtpHeaderExtensionParameters {
    pub uri: String,
    pub id: u16,
    #[serde(default)]
    pub encrypt: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RtpEncodingParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssrc: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_bitrate: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RtcpParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cname: Option<String>,
    #[serde(default)]
    pub reduced_size: bool,
}

/// Parameters of one concrete RTP stream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RtpParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mid: Option<String>,
    #[serde(default)]
    pub codecs: Vec<RtpCodecParameters>,
    #[serde(default)]
    pub header_extensions: Vec<RtpHeaderExtensionParameters>,
    #[serde(default)]
    pub encodings: Vec<RtpEncodingParameters>,
    #[serde(default)]
    pub rtcp: RtcpParameters,
}
