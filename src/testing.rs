//! Scripted collaborators for unit tests

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::error::{DeviceError, SignalingError};
use crate::media::{
    CaptureConstraints, DisplayConstraints, MediaKind, MediaSource, MediaStream, MediaTrack,
};
use crate::rtc::{MediaTypeTag, RtpCapabilities};
use crate::signaling::{events, SignalingChannel};

#[derive(Default)]
struct SfuState {
    requests: Vec<(String, Value)>,
    notifications: Vec<(String, Value)>,
    binaries: Vec<(String, Bytes)>,
    rejections: HashMap<String, String>,
    producer_tags: HashMap<String, MediaTypeTag>,
    next_producer: u32,
}

/// In-process SFU answering every request immediately
#[derive(Default)]
pub(crate) struct FakeSfu {
    state: Mutex<SfuState>,
}

impl FakeSfu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Router capabilities with opus and VP8
    pub fn router_capabilities() -> RtpCapabilities {
        serde_json::from_value(Self::router_capabilities_json()).unwrap()
    }

    pub fn router_capabilities_json() -> Value {
        json!({
            "codecs": [
                {"kind": "audio", "mimeType": "audio/opus", "clockRate": 48000, "channels": 2,
                 "preferredPayloadType": 100, "rtcpFeedback": [{"type": "transport-cc"}]},
                {"kind": "video", "mimeType": "video/VP8", "clockRate": 90000,
                 "preferredPayloadType": 101, "rtcpFeedback": [{"type": "nack"}]}
            ],
            "headerExtensions": []
        })
    }

    /// Answer every future `event` request with `{"error": message}`
    pub fn reject(&self, event: &str, message: &str) {
        self.state
            .lock()
            .rejections
            .insert(event.to_string(), message.to_string());
    }

    /// Tag the SFU reports for a producer in consume responses
    pub fn tag_producer(&self, producer_id: &str, tag: MediaTypeTag) {
        self.state
            .lock()
            .producer_tags
            .insert(producer_id.to_string(), tag);
    }

    pub fn requests(&self, event: &str) -> Vec<Value> {
        self.state
            .lock()
            .requests
            .iter()
            .filter(|(e, _)| e == event)
            .map(|(_, p)| p.clone())
            .collect()
    }

    pub fn request_count(&self, event: &str) -> usize {
        self.requests(event).len()
    }

    /// Event names of all requests, in order
    pub fn request_log(&self) -> Vec<String> {
        self.state.lock().requests.iter().map(|(e, _)| e.clone()).collect()
    }

    pub fn notifications(&self, event: &str) -> Vec<Value> {
        self.state
            .lock()
            .notifications
            .iter()
            .filter(|(e, _)| e == event)
            .map(|(_, p)| p.clone())
            .collect()
    }

    pub fn binaries(&self, event: &str) -> Vec<Bytes> {
        self.state
            .lock()
            .binaries
            .iter()
            .filter(|(e, _)| e == event)
            .map(|(_, d)| d.clone())
            .collect()
    }

    /// Producer ids consumed so far, in request order
    pub fn consumed_producers(&self) -> Vec<String> {
        self.requests(events::CONSUME)
            .iter()
            .filter_map(|p| p["producerId"].as_str().map(str::to_string))
            .collect()
    }

    fn respond(&self, event: &str, payload: &Value) -> Value {
        let mut state = self.state.lock();
        if let Some(message) = state.rejections.get(event) {
            return json!({ "error": message });
        }

        match event {
            events::CREATE_TRANSPORT => {
                let direction = payload["direction"].as_str().unwrap_or("send");
                json!({
                    "id": format!("{}-transport", direction),
                    "iceParameters": {"usernameFragment": "frag", "password": "pwd", "iceLite": true},
                    "iceCandidates": [{"ip": "10.0.0.1", "port": 40000, "protocol": "udp"}],
                    "dtlsParameters": {"role": "auto", "fingerprints": [
                        {"algorithm": "sha-256", "value": "AA:BB"}
                    ]}
                })
            }
            events::PRODUCE => {
                state.next_producer += 1;
                json!({ "id": format!("local-producer-{}", state.next_producer) })
            }
            events::CONSUME => {
                let producer_id = payload["producerId"].as_str().unwrap_or_default().to_string();
                let kind = if producer_id.contains("audio") || producer_id.contains("mic") {
                    "audio"
                } else {
                    "video"
                };
                let mut response = json!({
                    "id": format!("consumer-{}", producer_id),
                    "producerId": producer_id,
                    "kind": kind,
                    "rtpParameters": {}
                });
                if let Some(tag) = state.producer_tags.get(&producer_id) {
                    response["appData"] = json!({ "mediaType": tag.as_str() });
                }
                response
            }
            _ => json!({}),
        }
    }
}

#[async_trait]
impl SignalingChannel for FakeSfu {
    async fn request(&self, event: &str, payload: Value) -> Result<Value, SignalingError> {
        let response = self.respond(event, &payload);
        self.state.lock().requests.push((event.to_string(), payload));
        Ok(response)
    }

    fn notify(&self, event: &str, payload: Value) -> Result<(), SignalingError> {
        self.state
            .lock()
            .notifications
            .push((event.to_string(), payload));
        Ok(())
    }

    fn send_binary(&self, event: &str, data: Bytes) -> Result<(), SignalingError> {
        self.state.lock().binaries.push((event.to_string(), data));
        Ok(())
    }
}

/// Capture source returning fresh tracks, or a scripted failure
#[derive(Default)]
pub(crate) struct FakeSource {
    user_error: Mutex<Option<DeviceError>>,
    display_error: Mutex<Option<DeviceError>>,
    mic_rate: Option<u32>,
    opened: Mutex<Vec<MediaStream>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Microphone tracks report this capture rate
    pub fn with_mic_rate(mut self, rate: u32) -> Self {
        self.mic_rate = Some(rate);
        self
    }

    pub fn fail_user_media(&self, error: DeviceError) {
        *self.user_error.lock() = Some(error);
    }

    pub fn fail_display_media(&self, error: DeviceError) {
        *self.display_error.lock() = Some(error);
    }

    /// Every stream handed out so far
    pub fn opened(&self) -> Vec<MediaStream> {
        self.opened.lock().clone()
    }

    fn mic(&self, label: &str) -> MediaTrack {
        let track = MediaTrack::new(MediaKind::Audio, label);
        match self.mic_rate {
            Some(rate) => track.sample_rate(rate),
            None => track,
        }
    }
}

#[async_trait]
impl MediaSource for FakeSource {
    async fn user_media(
        &self,
        constraints: &CaptureConstraints,
    ) -> Result<MediaStream, DeviceError> {
        if let Some(e) = self.user_error.lock().clone() {
            return Err(e);
        }

        let stream = MediaStream::new();
        if constraints.video {
            stream.add_track(MediaTrack::new(MediaKind::Video, "camera"));
        }
        if constraints.audio.is_some() {
            stream.add_track(self.mic("microphone"));
        }
        self.opened.lock().push(stream.clone());
        Ok(stream)
    }

    async fn display_media(
        &self,
        constraints: &DisplayConstraints,
    ) -> Result<MediaStream, DeviceError> {
        if let Some(e) = self.display_error.lock().clone() {
            return Err(e);
        }

        let stream = MediaStream::new();
        stream.add_track(MediaTrack::new(MediaKind::Video, "screen"));
        if constraints.audio {
            stream.add_track(MediaTrack::new(MediaKind::Audio, "screen-audio"));
        }
        self.opened.lock().push(stream.clone());
        Ok(stream)
    }
}

/// Route `tracing` output through the test harness (`RUST_LOG` filters it)
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
