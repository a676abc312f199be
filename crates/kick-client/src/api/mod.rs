//! Kick channel metadata REST client.
//!
//! Resolves a channel slug to live status, title, viewer count, category,
//! and the chatroom id used to subscribe to the chat topic. Requests carry
//! browser-like headers; no retries happen at this layer.

mod channels;
mod request;
#[cfg(test)]
mod tests;

pub mod models;

pub use models::ChannelInfo;
pub(crate) use request::body_preview;

pub const DEFAULT_API_BASE: &str = "https://kick.com/api/v2";

/// Maximum number of body characters kept for diagnostics.
pub const PREVIEW_CHARS: usize = 200;

/// Kick REST API client.
#[derive(Clone)]
pub struct KickApiClient {
    pub(super) http: reqwest::Client,
    pub(super) base_url: String,
}
