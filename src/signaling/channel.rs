//! Signaling channel abstraction
//!
//! The SFU is reached through a persistent, bidirectional event channel with
//! request/callback semantics. The connection itself (socket.io, websocket,
//! reconnection) is somebody else's job; this module only defines what the
//! session needs from it.

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::error::SignalingError;

/// Outbound side of the signaling connection
#[async_trait]
pub trait SignalingChannel: Send + Sync {
    /// Emit an event and wait for the peer's acknowledgement payload
    ///
    /// No timeout is applied; a peer that never acknowledges leaves the
    /// caller parked.
    async fn request(&self, event: &str, payload: Value) -> Result<Value, SignalingError>;

    /// Emit an event without waiting for an acknowledgement
    fn notify(&self, event: &str, payload: Value) -> Result<(), SignalingError>;

    /// Emit a binary payload
    fn send_binary(&self, event: &str, data: Bytes) -> Result<(), SignalingError>;
}

/// Typed request helper
///
/// Serializes `body`, performs the round trip, turns an `{"error": ..}`
/// acknowledgement into [`SignalingError::Rejected`], and decodes the rest.
pub async fn call<C, Req, Resp>(channel: &C, event: &str, body: &Req) -> Result<Resp, SignalingError>
where
    C: SignalingChannel + ?Sized,
    Req: Serialize + Sync,
    Resp: DeserializeOwned,
{
    let payload = serde_json::to_value(body).map_err(|e| SignalingError::invalid(event, e))?;
    let response = channel.request(event, payload).await?;
    let response = check_ack(event, response)?;
    serde_json::from_value(response).map_err(|e| SignalingError::invalid(event, e))
}

/// Typed notification helper
pub fn notify<C, Req>(channel: &C, event: &str, body: &Req) -> Result<(), SignalingError>
where
    C: SignalingChannel + ?Sized,
    Req: Serialize,
{
    let payload = serde_json::to_value(body).map_err(|e| SignalingError::invalid(event, e))?;
    channel.notify(event, payload)
}

/// Reject acknowledgements that carry an `error` field
pub fn check_ack(event: &str, response: Value) -> Result<Value, SignalingError> {
    match response.get("error") {
        None | Some(Value::Null) => Ok(response),
        Some(Value::String(message)) => Err(SignalingError::Rejected {
            event: event.to_string(),
            message: message.clone(),
        }),
        Some(other) => Err(SignalingError::Rejected {
            event: event.to_string(),
            message: other.to_string(),
        }),
    }
}

/// Message handed to the task that owns the real connection
#[derive(Debug)]
pub enum OutboundMessage {
    /// Emit and deliver the acknowledgement on `reply`
    Request {
        event: String,
        payload: Value,
        reply: oneshot::Sender<Value>,
    },
    /// Fire-and-forget emit
    Notify { event: String, payload: Value },
    /// Binary emit
    Binary { event: String, data: Bytes },
}

/// [`SignalingChannel`] backed by a tokio channel
///
/// Every emit becomes an [`OutboundMessage`] on an unbounded queue; the
/// connection task pops them in order and answers requests through the
/// enclosed oneshot. Dropping the reply sender fails the request with
/// [`SignalingError::Closed`].
#[derive(Debug, Clone)]
pub struct ChannelSignaling {
    tx: mpsc::UnboundedSender<OutboundMessage>,
}

impl ChannelSignaling {
    /// Create the channel and the receiver the connection task drains
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutboundMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn push(&self, msg: OutboundMessage) -> Result<(), SignalingError> {
        self.tx.send(msg).map_err(|_| SignalingError::Closed)
    }
}

#[async_trait]
impl SignalingChannel for ChannelSignaling {
    async fn request(&self, event: &str, payload: Value) -> Result<Value, SignalingError> {
        let (reply, rx) = oneshot::channel();
        self.push(OutboundMessage::Request {
            event: event.to_string(),
            payload,
            reply,
        })?;

        tracing::debug!(event = event, "Signaling request sent");

        rx.await.map_err(|_| SignalingError::Closed)
    }

    fn notify(&self, event: &str, payload: Value) -> Result<(), SignalingError> {
        self.push(OutboundMessage::Notify {
            event: event.to_string(),
            payload,
        })
    }

    fn send_binary(&self, event: &str, data: Bytes) -> Result<(), SignalingError> {
        self.push(OutboundMessage::Binary {
            event: event.to_string(),
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Ack {
        id: String,
    }

    #[tokio::test]
    async fn test_request_round_trip() {
        let (signaling, mut rx) = ChannelSignaling::new();

        tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                if let OutboundMessage::Request { event, reply, .. } = msg {
                    assert_eq!(event, "produce");
                    let _ = reply.send(json!({"id": "prod-1"}));
                }
            }
        });

        let ack: Ack = call(&signaling, "produce", &json!({"kind": "audio"}))
            .await
            .unwrap();
        assert_eq!(ack.id, "prod-1");
    }

    #[tokio::test]
    async fn test_error_ack_is_rejection() {
        let (signaling, mut rx) = ChannelSignaling::new();

        tokio::spawn(async move {
            if let Some(OutboundMessage::Request { reply, .. }) = rx.recv().await {
                let _ = reply.send(json!({"error": "transport not found"}));
            }
        });

        let result: Result<Ack, _> = call(&signaling, "connect-transport", &json!({})).await;
        assert_eq!(
            result.unwrap_err(),
            SignalingError::Rejected {
                event: "connect-transport".into(),
                message: "transport not found".into(),
            }
        );
    }

    #[tokio::test]
    async fn test_dropped_reply_is_closed() {
        let (signaling, mut rx) = ChannelSignaling::new();

        tokio::spawn(async move {
            // Drop the request without answering
            let _ = rx.recv().await;
        });

        let result = signaling.request("consume", json!({})).await;
        assert_eq!(result.unwrap_err(), SignalingError::Closed);
    }

    #[test]
    fn test_notify_after_receiver_dropped() {
        let (signaling, rx) = ChannelSignaling::new();
        drop(rx);

        let result = signaling.notify("join-room", json!({}));
        assert_eq!(result.unwrap_err(), SignalingError::Closed);
    }

    #[test]
    fn test_binary_preserves_order() {
        let (signaling, mut rx) = ChannelSignaling::new();

        signaling.send_binary("audio-data", Bytes::from_static(&[1])).unwrap();
        signaling.send_binary("audio-data", Bytes::from_static(&[2])).unwrap();

        for expected in [1u8, 2] {
            match rx.try_recv().unwrap() {
                OutboundMessage::Binary { data, .. } => assert_eq!(data[0], expected),
                other => panic!("unexpected {:?}", other),
            }
        }
    }
}
