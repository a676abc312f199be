//! Runtime application configuration loaded from the environment.

use std::time::Duration;

use kick_client::pusher::ListenerConfig;

use super::defaults::get_default;
use super::validation::validate_setting;

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub kick_api_base: String,
    pub pusher_url: String,
    pub seventv_api_base: String,
    pub seventv_global_set_id: String,
    pub channels: Vec<String>,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub max_idle_reads: u32,
    pub ui_tick: Duration,
    pub emote_size: u32,
    pub badge_size: u32,
    pub log_level: String,
    /// Settings that failed validation and fell back to their default.
    pub rejected: Vec<RejectedSetting>,
}

/// An environment value that failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedSetting {
    pub key: String,
    pub value: String,
    pub reason: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::load_with(|_| None)
    }
}

impl AppConfig {
    /// Load configuration from process environment variables.
    pub fn load() -> Result<Self, anyhow::Error> {
        Ok(Self::load_with(|key| std::env::var(key).ok()))
    }

    /// Load configuration through `lookup`. Missing or invalid values
    /// fall back to their defaults; invalid ones are recorded in `rejected`.
    pub fn load_with(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut rejected = Vec::new();
        let mut g = |key: &str| -> String {
            let default = get_default(key).unwrap_or_default();
            match lookup(key) {
                Some(v) if v.trim().is_empty() => default.to_string(),
                Some(v) => {
                    let v = v.trim().to_string();
                    match validate_setting(key, &v) {
                        Ok(()) => v,
                        Err(reason) => {
                            rejected.push(RejectedSetting {
                                key: key.to_string(),
                                value: v,
                                reason,
                            });
                            default.to_string()
                        }
                    }
                }
                None => default.to_string(),
            }
        };

        let mut config = Self {
            kick_api_base: g("KICK_API_BASE"),
            pusher_url: g("KICK_PUSHER_URL"),
            seventv_api_base: g("SEVENTV_API_BASE"),
            seventv_global_set_id: g("SEVENTV_GLOBAL_SET_ID"),
            channels: parse_slug_list(&g("KICK_CHANNELS")),
            connect_timeout: Duration::from_secs(parse_u64(&g("CONNECT_TIMEOUT_SECS"), 10)),
            read_timeout: Duration::from_secs(parse_u64(&g("READ_TIMEOUT_SECS"), 60)),
            max_idle_reads: parse_u64(&g("MAX_IDLE_READS"), 2) as u32,
            ui_tick: Duration::from_millis(parse_u64(&g("UI_TICK_MS"), 100)),
            emote_size: parse_u64(&g("EMOTE_SIZE"), 28) as u32,
            badge_size: parse_u64(&g("BADGE_SIZE"), 18) as u32,
            log_level: g("LOG_LEVEL"),
            rejected: Vec::new(),
        };
        config.rejected = rejected;
        config
    }

    /// Log every rejected setting. Call once tracing is installed.
    pub fn report_rejected(&self) {
        for setting in &self.rejected {
            let default = get_default(&setting.key).unwrap_or_default();
            tracing::warn!(
                key = %setting.key,
                value = %setting.value,
                reason = %setting.reason,
                default,
                "Invalid setting, using default"
            );
        }
    }

    /// Pusher listener settings derived from this config.
    pub fn listener_config(&self) -> ListenerConfig {
        ListenerConfig {
            url: self.pusher_url.clone(),
            connect_timeout: self.connect_timeout,
            read_timeout: self.read_timeout,
            max_idle_reads: self.max_idle_reads,
        }
    }
}

/// Split a comma-separated slug list. Entries are trimmed and lower-cased;
/// empty entries and repeats are dropped.
pub fn parse_slug_list(input: &str) -> Vec<String> {
    let mut slugs: Vec<String> = Vec::new();
    for slug in input.split(',').map(|s| s.trim().to_lowercase()) {
        if !slug.is_empty() && !slugs.contains(&slug) {
            slugs.push(slug);
        }
    }
    slugs
}

fn parse_u64(s: &str, default: u64) -> u64 {
    if s.is_empty() {
        return default;
    }
    s.parse().unwrap_or(default)
}
