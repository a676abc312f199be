use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::{ChatMessage, KickError};

pub const EVENT_CONNECTION_ESTABLISHED: &str = "pusher:connection_established";
pub const EVENT_SUBSCRIPTION_SUCCEEDED: &str = "pusher:subscription_succeeded";
pub const EVENT_INTERNAL_SUBSCRIPTION_SUCCEEDED: &str = "pusher_internal:subscription_succeeded";
pub const EVENT_PING: &str = "pusher:ping";
pub const EVENT_ERROR: &str = "pusher:error";
pub const EVENT_CHAT_MESSAGE: &str = "App\\Events\\ChatMessageEvent";

/// Raw `{"event", "data", "channel"}` envelope.
#[derive(Debug, Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
    #[serde(default)]
    channel: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConnectionData {
    #[serde(default)]
    socket_id: Option<String>,
    #[serde(default)]
    activity_timeout: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ErrorData {
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    message: Option<String>,
}

/// A decoded Pusher frame.
#[derive(Debug)]
pub enum PusherFrame {
    ConnectionEstablished {
        socket_id: Option<String>,
        activity_timeout: Option<u64>,
    },
    SubscriptionSucceeded {
        channel: Option<String>,
    },
    Ping,
    ChatMessage(Box<ChatMessage>),
    Error {
        code: Option<u16>,
        message: Option<String>,
    },
    /// Any other event. Ignored by the listener.
    Other(String),
}

/// Decode one text frame.
pub fn decode_frame(text: &str) -> Result<PusherFrame, KickError> {
    let envelope: Envelope = serde_json::from_str(text)?;
    let frame = match envelope.event.as_str() {
        EVENT_CONNECTION_ESTABLISHED => {
            let data: ConnectionData = nested(envelope.data)?;
            PusherFrame::ConnectionEstablished {
                socket_id: data.socket_id,
                activity_timeout: data.activity_timeout,
            }
        }
        EVENT_SUBSCRIPTION_SUCCEEDED | EVENT_INTERNAL_SUBSCRIPTION_SUCCEEDED => PusherFrame::SubscriptionSucceeded {
            channel: envelope.channel,
        },
        EVENT_PING => PusherFrame::Ping,
        EVENT_CHAT_MESSAGE => {
            if envelope.data.is_null() {
                return Err(KickError::Protocol("chat message without data".into()));
            }
            PusherFrame::ChatMessage(Box::new(nested(envelope.data)?))
        }
        EVENT_ERROR => {
            let data: ErrorData = nested(envelope.data).unwrap_or(ErrorData {
                code: None,
                message: None,
            });
            PusherFrame::Error {
                code: data.code,
                message: data.message,
            }
        }
        _ => PusherFrame::Other(envelope.event),
    };
    Ok(frame)
}

/// `data` is either a JSON string holding an encoded payload or an object.
fn nested<T: DeserializeOwned>(data: serde_json::Value) -> Result<T, KickError> {
    match data {
        serde_json::Value::String(encoded) => Ok(serde_json::from_str(&encoded)?),
        serde_json::Value::Null => Ok(serde_json::from_str("{}")?),
        other => Ok(serde_json::from_value(other)?),
    }
}

/// `pusher:subscribe` request for a chatroom topic.
pub fn subscribe_frame(chatroom_id: u64) -> String {
    serde_json::json!({
        "event": "pusher:subscribe",
        "data": {
            "auth": "",
            "channel": chatroom_topic(chatroom_id),
        }
    })
    .to_string()
}

/// Reply to a server `pusher:ping`.
pub fn pong_frame() -> String {
    serde_json::json!({"event": "pusher:pong", "data": {}}).to_string()
}

pub fn chatroom_topic(chatroom_id: u64) -> String {
    format!("chatrooms.{chatroom_id}.v2")
}
