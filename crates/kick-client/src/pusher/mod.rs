//! Pusher WebSocket chat listener.
//!
//! Connects to Kick's Pusher endpoint, subscribes to one chatroom topic,
//! answers `pusher:ping`, and turns chat frames into [`ListenerEvent`]s.
//! Every run ends with exactly one terminal event.

mod connection;
mod frame;

use std::time::Duration;

use tokio::sync::mpsc;

use crate::ChatMessage;

pub use frame::{PusherFrame, chatroom_topic, decode_frame, pong_frame, subscribe_frame};

pub const DEFAULT_PUSHER_URL: &str = "wss://ws-us2.pusher.com/app/32cbd69e4b950bf97679?protocol=7&client=js&version=8.4.0-rc2&flash=false";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_IDLE_READS: u32 = 2;

/// Normalized event emitted by the listener.
#[derive(Debug, Clone)]
pub enum ListenerEvent {
    System(String),
    Chat(Box<ChatMessage>),
    Error(String),
}

/// Consumer of listener events. Emission never blocks.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: ListenerEvent);
}

impl EventSink for mpsc::UnboundedSender<ListenerEvent> {
    fn emit(&self, event: ListenerEvent) {
        let _ = self.send(event);
    }
}

/// Connection lifecycle, tracked for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Connecting,
    Subscribing,
    Active,
    Closed,
}

/// Why a listener run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Cancelled,
    ConnectTimeout,
    ConnectFailed,
    Closed,
    IdleTimeout,
    Error,
}

/// Listener configuration.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    pub url: String,
    pub connect_timeout: Duration,
    /// Per-read timeout. Only used to detect a silently dead connection.
    pub read_timeout: Duration,
    /// Consecutive read timeouts after which the connection is considered dead.
    pub max_idle_reads: u32,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_PUSHER_URL.into(),
            connect_timeout: CONNECT_TIMEOUT,
            read_timeout: READ_TIMEOUT,
            max_idle_reads: MAX_IDLE_READS,
        }
    }
}

/// Pusher chat listener. One [`PusherListener::listen`] call per subscription.
#[derive(Debug, Clone, Default)]
pub struct PusherListener {
    config: ListenerConfig,
}

impl PusherListener {
    pub fn new(config: ListenerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ListenerConfig {
        &self.config
    }
}
