//! Kick integration client library.
//!
//! Provides the channel metadata REST client, the Pusher WebSocket chat
//! listener, 7TV emote lookup, and the badge vector table.

pub mod api;
pub mod badges;
pub mod emotes;
pub mod models;
pub mod pusher;

pub use api::{ChannelInfo, KickApiClient};
pub use models::{Badge, ChatMessage, EmoteMeta, Identity, Sender};

/// Browser user agent sent with every REST request.
///
/// The Kick API front door rejects requests that look like bots.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Coarse error classes used by callers to decide how to surface a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// DNS, refused, timeout. Retryable by user action.
    Connectivity,
    /// Non-2xx or unexpected body from a REST endpoint.
    Upstream,
    /// Malformed frame or payload.
    Protocol,
    /// An optional resource could not be loaded.
    ResourceUnavailable,
}

/// Unified error type for the kick-client crate.
#[derive(Debug, thiserror::Error)]
pub enum KickError {
    #[error("Connection error: {0}")]
    Connectivity(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Channel '{slug}' not found (404).")]
    ChannelNotFound { slug: String },

    #[error("{message} (status {status}). Preview: {preview}")]
    Upstream {
        status: u16,
        message: String,
        preview: String,
    },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Connection timeout")]
    Timeout,

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("{0} unavailable")]
    Unavailable(String),
}

impl KickError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            KickError::Connectivity(_) | KickError::Timeout | KickError::WebSocket(_) => {
                ErrorKind::Connectivity
            }
            KickError::Http(e) if e.is_connect() || e.is_timeout() || e.is_request() => {
                ErrorKind::Connectivity
            }
            KickError::Http(_) | KickError::ChannelNotFound { .. } | KickError::Upstream { .. } => {
                ErrorKind::Upstream
            }
            KickError::Json(_) | KickError::Protocol(_) | KickError::UrlParse(_) => {
                ErrorKind::Protocol
            }
            KickError::Unavailable(_) => ErrorKind::ResourceUnavailable,
        }
    }

    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            KickError::ChannelNotFound { .. } => Some(404),
            KickError::Upstream { status, .. } => Some(*status),
            KickError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
