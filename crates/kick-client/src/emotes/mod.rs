//! 7TV emote namespace.
//!
//! Fetches the global emote set and per-channel emote sets from the 7TV
//! API and resolves words to emotes, with channel scope shadowing global.

mod api;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub use api::{DEFAULT_GLOBAL_SET_ID, DEFAULT_SEVENTV_BASE, EmoteFile, SevenTvClient, select_file};

/// Where an emote record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmoteScope {
    Global,
    Channel,
}

/// A single 7TV emote resolved to a static image URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmoteRecord {
    pub id: String,
    pub name: String,
    pub url: String,
    pub animated: bool,
    pub scope: EmoteScope,
}

/// Read-mostly registry of global and per-channel emotes, keyed by name.
#[derive(Debug, Default)]
pub struct EmoteRegistry {
    pub(super) global: HashMap<String, EmoteRecord>,
    pub(super) channels: HashMap<String, HashMap<String, EmoteRecord>>,
}

impl EmoteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the global set has been populated.
    pub fn has_global(&self) -> bool {
        !self.global.is_empty()
    }

    /// Replace the global set.
    pub fn set_global(&mut self, emotes: Vec<EmoteRecord>) {
        self.global = index_by_name(emotes);
        tracing::info!(count = self.global.len(), "7TV global emotes loaded");
    }

    /// Replace one channel's set. An empty list still marks the channel as loaded.
    pub fn set_channel(&mut self, slug: &str, emotes: Vec<EmoteRecord>) {
        let map = index_by_name(emotes);
        tracing::info!(slug, count = map.len(), "7TV channel emotes loaded");
        self.channels.insert(slug.to_string(), map);
    }

    /// Drop a channel's set when its session closes.
    pub fn remove_channel(&mut self, slug: &str) {
        self.channels.remove(slug);
    }

    pub fn has_channel(&self, slug: &str) -> bool {
        self.channels.contains_key(slug)
    }

    /// Resolve a word. Channel scope wins over global when a channel is given.
    pub fn lookup(&self, name: &str, channel: Option<&str>) -> Option<&EmoteRecord> {
        channel
            .and_then(|slug| self.channels.get(slug))
            .and_then(|map| map.get(name))
            .or_else(|| self.global.get(name))
    }
}

fn index_by_name(emotes: Vec<EmoteRecord>) -> HashMap<String, EmoteRecord> {
    emotes.into_iter().map(|e| (e.name.clone(), e)).collect()
}
