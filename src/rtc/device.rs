//! Local capability negotiator
//!
//! A [`Device`] starts with the local endpoint's codec capabilities. Loading
//! the router's capabilities computes the intersection, which is what the
//! session advertises when consuming and what it encodes when producing.

use rand::Rng;

use super::capabilities::{
    RtcpFeedback, RtcpParameters, RtpCapabilities, RtpCodecCapability, RtpCodecParameters,
    RtpEncodingParameters, RtpHeaderExtensionParameters, RtpParameters,
};
use super::transport::DtlsParameters;
use crate::error::NegotiationError;
use crate::media::MediaKind;

/// First dynamic RTP payload type, used when the router gives no preference
const DYNAMIC_PAYLOAD_TYPE_START: u8 = 96;

/// Capability negotiator
#[derive(Debug, Clone)]
pub struct Device {
    /// What this endpoint supports
    local: RtpCapabilities,

    /// Intersection with the router (set by `load`)
    negotiated: Option<RtpCapabilities>,

    /// DTLS parameters handed to every transport on connect
    dtls: DtlsParameters,

    /// RTCP CNAME shared by all producers
    cname: String,
}

impl Device {
    /// Create an unloaded device
    pub fn new(local: RtpCapabilities, dtls: DtlsParameters) -> Self {
        Self {
            local,
            negotiated: None,
            dtls,
            cname: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Negotiate against the router's capabilities
    ///
    /// Keeps every non-RTX router codec the local side also supports (with the
    /// router's payload type and the common RTCP feedback) and every header
    /// extension both sides know.
    pub fn load(&mut self, router: &RtpCapabilities) -> Result<(), NegotiationError> {
        if self.negotiated.is_some() {
            return Err(NegotiationError::AlreadyLoaded);
        }
        if router.codecs.is_empty() {
            return Err(NegotiationError::NoRouterCodecs);
        }

        let codecs: Vec<RtpCodecCapability> = router
            .codecs
            .iter()
            .filter(|c| !c.is_rtx())
            .filter_map(|router_codec| {
                let local_codec = self.local.codecs.iter().find(|l| l.matches(router_codec))?;
                let mut codec = router_codec.clone();
                codec.rtcp_feedback = router_codec
                    .rtcp_feedback
                    .iter()
                    .filter(|fb| local_codec.rtcp_feedback.contains(fb))
                    .cloned()
                    .collect();
                Some(codec)
            })
            .collect();

        if codecs.is_empty() {
            return Err(NegotiationError::NoCommonCodecs);
        }

        let header_extensions = router
            .header_extensions
            .iter()
            .filter(|ext| {
                self.local
                    .header_extensions
                    .iter()
                    .any(|l| l.kind == ext.kind && l.uri == ext.uri)
            })
            .cloned()
            .collect();

        tracing::info!(
            codecs = codecs.len(),
            audio = codecs.iter().any(|c| c.kind == MediaKind::Audio),
            video = codecs.iter().any(|c| c.kind == MediaKind::Video),
            "Device loaded"
        );

        self.negotiated = Some(RtpCapabilities {
            codecs,
            header_extensions,
        });
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.negotiated.is_some()
    }

    /// Negotiated capabilities, sent with every consume request
    pub fn rtp_capabilities(&self) -> Result<&RtpCapabilities, NegotiationError> {
        self.negotiated.as_ref().ok_or(NegotiationError::NotLoaded)
    }

    pub fn can_produce(&self, kind: MediaKind) -> bool {
        self.negotiated
            .as_ref()
            .map(|caps| caps.supports(kind))
            .unwrap_or(false)
    }

    pub fn dtls_parameters(&self) -> &DtlsParameters {
        &self.dtls
    }

    /// RTP parameters for a new outgoing track of `kind`
    pub fn send_parameters(
        &self,
        kind: MediaKind,
        mid: String,
    ) -> Result<RtpParameters, NegotiationError> {
        let caps = self.rtp_capabilities()?;

        let (index, codec) = caps
            .codecs
            .iter()
            .enumerate()
            .find(|(_, c)| c.kind == kind && !c.is_rtx())
            .ok_or(NegotiationError::CannotProduce(kind))?;

        let payload_type = codec
            .preferred_payload_type
            .unwrap_or(DYNAMIC_PAYLOAD_TYPE_START.saturating_add(index as u8));

        let header_extensions = caps
            .header_extensions
            .iter()
            .filter(|ext| ext.kind == kind)
            .map(|ext| RtpHeaderExtensionParameters {
                uri: ext.uri.clone(),
                id: ext.preferred_id,
                encrypt: ext.preferred_encrypt,
            })
            .collect();

        Ok(RtpParameters {
            mid: Some(mid),
            codecs: vec![RtpCodecParameters {
                mime_type: codec.mime_type.clone(),
                payload_type,
                clock_rate: codec.clock_rate,
                channels: codec.channels,
                parameters: codec.parameters.clone(),
                rtcp_feedback: codec.rtcp_feedback.iter().map(RtcpFeedback::clone).collect(),
            }],
            header_extensions,
            encodings: vec![RtpEncodingParameters {
                ssrc: Some(rand::thread_rng().gen()),
                max_bitrate: None,
            }],
            rtcp: RtcpParameters {
                cname: Some(self.cname.clone()),
                reduced_size: true,
            },
        })
    }
}
