//! Chat message payloads delivered over the Pusher channel.

use serde::{Deserialize, Deserializer, Serialize};

/// Username color used when the sender has none.
pub const DEFAULT_USERNAME_COLOR: &str = "#6495ED";

/// A chat message from `App\Events\ChatMessageEvent`.
///
/// `content` carries inline `[emote:<id>:<name>]` placeholders.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub sender: Sender,
    #[serde(default)]
    pub emotes: Vec<EmoteMeta>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl ChatMessage {
    /// Sender username, `"Anon"` when blank.
    pub fn sender_name(&self) -> &str {
        if self.sender.username.is_empty() {
            "Anon"
        } else {
            &self.sender.username
        }
    }

    /// Sender color, falling back to [`DEFAULT_USERNAME_COLOR`].
    pub fn sender_color(&self) -> &str {
        self.sender
            .identity
            .color
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_USERNAME_COLOR)
    }

    /// Badges that should be rendered (inactive ones are skipped).
    pub fn active_badges(&self) -> impl Iterator<Item = &Badge> {
        self.sender
            .identity
            .badges
            .iter()
            .filter(|b| b.active != Some(false))
    }

    /// Message timestamp, when the payload carried a parseable one.
    pub fn timestamp(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        let raw = self.created_at.as_deref()?;
        chrono::DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&chrono::Utc))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sender {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub identity: Identity,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Identity {
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub badges: Vec<Badge>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Badge {
    #[serde(default, rename = "type")]
    pub badge_type: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub count: Option<u32>,
    #[serde(default)]
    pub active: Option<bool>,
}

impl Badge {
    /// Text rendered when no image is available: `[text]`, else `[type]`.
    pub fn fallback_text(&self) -> String {
        let label = self
            .text
            .as_deref()
            .filter(|t| !t.is_empty())
            .or(Some(self.badge_type.as_str()).filter(|t| !t.is_empty()))
            .unwrap_or("badge");
        format!("[{label}]")
    }
}

/// Placeholder-token metadata delivered alongside a message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmoteMeta {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Kick sends ids as numbers in some payloads and strings in others.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}
