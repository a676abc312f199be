//! Setting value validation.

use regex::Regex;
use std::sync::LazyLock;

static RE_HTTP_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://[^\s/]+(/\S*)?$").expect("static regex"));
static RE_WS_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^wss?://[^\s/]+(/\S*)?$").expect("static regex"));
static RE_SET_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-Za-z]{1,64}$").expect("static regex"));
static RE_SLUG_LIST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-Za-z_\-,\s]*$").expect("static regex"));

/// Validate a setting value. Returns `Ok(())` if valid, or an error message.
pub fn validate_setting(key: &str, value: &str) -> Result<(), String> {
    match key {
        "KICK_API_BASE" | "SEVENTV_API_BASE" => {
            if !RE_HTTP_URL.is_match(value) {
                return Err("must be an http(s) URL".into());
            }
        }
        "KICK_PUSHER_URL" => {
            if !RE_WS_URL.is_match(value) {
                return Err("must be a ws(s) URL".into());
            }
        }
        "SEVENTV_GLOBAL_SET_ID" => {
            if !RE_SET_ID.is_match(value) {
                return Err("must be an alphanumeric id".into());
            }
        }
        "KICK_CHANNELS" => {
            if !RE_SLUG_LIST.is_match(value) {
                return Err("must be a comma-separated list of channel slugs".into());
            }
        }
        "CONNECT_TIMEOUT_SECS" => validate_int_range(value, 1, 300)?,
        "READ_TIMEOUT_SECS" => validate_int_range(value, 1, 3600)?,
        "MAX_IDLE_READS" => validate_int_range(value, 1, 100)?,
        "UI_TICK_MS" => validate_int_range(value, 10, 5000)?,
        "EMOTE_SIZE" | "BADGE_SIZE" => validate_int_range(value, 1, 256)?,
        "LOG_LEVEL" => {
            if !["trace", "debug", "info", "warn", "error"].contains(&value) {
                return Err("must be trace, debug, info, warn, or error".into());
            }
        }
        _ => {}
    }
    Ok(())
}

fn validate_int_range(value: &str, min: u64, max: u64) -> Result<(), String> {
    let v: u64 = value.parse().map_err(|_| "must be a positive integer")?;
    if v < min || v > max {
        return Err(format!("must be between {min} and {max}"));
    }
    Ok(())
}
