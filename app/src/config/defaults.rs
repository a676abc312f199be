//! All setting definitions with their default values.

use std::collections::HashMap;
use std::sync::LazyLock;

use kick_client::api::DEFAULT_API_BASE;
use kick_client::emotes::{DEFAULT_GLOBAL_SET_ID, DEFAULT_SEVENTV_BASE};
use kick_client::pusher::DEFAULT_PUSHER_URL;

type DefTuple = (&'static str, &'static str, &'static str);

const DEFS: &[DefTuple] = &[
    ("KICK_API_BASE", DEFAULT_API_BASE, "Kick REST API base URL"),
    ("KICK_PUSHER_URL", DEFAULT_PUSHER_URL, "Pusher WebSocket endpoint"),
    ("SEVENTV_API_BASE", DEFAULT_SEVENTV_BASE, "7TV REST API base URL"),
    ("SEVENTV_GLOBAL_SET_ID", DEFAULT_GLOBAL_SET_ID, "7TV global emote-set id"),
    ("KICK_CHANNELS", "", "Comma-separated channel slugs joined at startup"),
    ("CONNECT_TIMEOUT_SECS", "10", "WebSocket open timeout in seconds"),
    ("READ_TIMEOUT_SECS", "60", "Per-read timeout in seconds"),
    ("MAX_IDLE_READS", "2", "Consecutive read timeouts before giving up"),
    ("UI_TICK_MS", "100", "Delivery queue drain interval in milliseconds"),
    ("EMOTE_SIZE", "28", "Emote bitmap edge in pixels"),
    ("BADGE_SIZE", "18", "Badge bitmap edge in pixels"),
    ("LOG_LEVEL", "info", "Default tracing filter when RUST_LOG is unset"),
];

/// A single setting definition.
#[derive(Debug, Clone)]
pub struct SettingDef {
    pub key: &'static str,
    pub default: &'static str,
    pub description: &'static str,
}

/// Global setting definitions indexed by key.
pub static DEFAULT_SETTINGS: LazyLock<HashMap<&'static str, SettingDef>> = LazyLock::new(|| {
    DEFS.iter()
        .map(|&(key, default, description)| {
            (
                key,
                SettingDef {
                    key,
                    default,
                    description,
                },
            )
        })
        .collect()
});

/// Get the default value for a setting key, or `None` if not defined.
pub fn get_default(key: &str) -> Option<&'static str> {
    DEFAULT_SETTINGS.get(key).map(|d| d.default)
}

/// Setting keys in declaration order.
pub fn keys() -> impl Iterator<Item = &'static str> {
    DEFS.iter().map(|&(key, _, _)| key)
}
