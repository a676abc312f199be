//! Delivery queue between the scheduler and the UI thread.
//!
//! Every event is tagged with the channel slug it belongs to. The queue is
//! unbounded; producers never block and the UI drains it on its own tick.

use kick_client::pusher::{EventSink, ListenerEvent};
use kick_client::{ChannelInfo, ChatMessage};
use tokio::sync::mpsc;

/// Event delivered to the UI thread.
#[derive(Debug, Clone)]
pub enum UiEvent {
    /// Fresh metadata snapshot for the channel header.
    ChannelInfo { slug: String, info: ChannelInfo },
    /// Metadata fetch failed; no listener was started.
    ChannelError { slug: String, message: String },
    /// Connect requested for a slug that already has a session.
    AlreadyConnected { slug: String },
    System { slug: String, message: String },
    Error { slug: String, message: String },
    Chat { slug: String, message: Box<ChatMessage> },
    /// Reply to a disconnect request. Nothing for the torn-down session
    /// follows it.
    Disconnected { slug: String },
}

impl UiEvent {
    pub fn slug(&self) -> &str {
        match self {
            UiEvent::ChannelInfo { slug, .. }
            | UiEvent::ChannelError { slug, .. }
            | UiEvent::AlreadyConnected { slug }
            | UiEvent::System { slug, .. }
            | UiEvent::Error { slug, .. }
            | UiEvent::Chat { slug, .. }
            | UiEvent::Disconnected { slug } => slug,
        }
    }
}

pub type EventReceiver = mpsc::UnboundedReceiver<UiEvent>;

/// Producer half of the delivery queue.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<UiEvent>,
}

impl EventSender {
    pub fn channel() -> (Self, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn send(&self, event: UiEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("Delivery queue closed, event dropped");
        }
    }

    pub fn system(&self, slug: &str, message: impl Into<String>) {
        self.send(UiEvent::System {
            slug: slug.to_string(),
            message: message.into(),
        });
    }

    pub fn error(&self, slug: &str, message: impl Into<String>) {
        self.send(UiEvent::Error {
            slug: slug.to_string(),
            message: message.into(),
        });
    }

    /// Sink that tags listener events with `slug`.
    pub fn channel_sink(&self, slug: &str) -> ChannelSink {
        ChannelSink {
            slug: slug.to_string(),
            events: self.clone(),
        }
    }
}

/// Listener sink for one channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    slug: String,
    events: EventSender,
}

impl EventSink for ChannelSink {
    fn emit(&self, event: ListenerEvent) {
        let slug = self.slug.clone();
        self.events.send(match event {
            ListenerEvent::System(message) => UiEvent::System { slug, message },
            ListenerEvent::Error(message) => UiEvent::Error { slug, message },
            ListenerEvent::Chat(message) => UiEvent::Chat { slug, message },
        });
    }
}
