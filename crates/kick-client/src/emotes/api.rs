use serde::Deserialize;

use super::*;
use crate::KickError;

pub const DEFAULT_SEVENTV_BASE: &str = "https://7tv.io/v3";
pub const DEFAULT_GLOBAL_SET_ID: &str = "62c5c40b1f72c3377d8a1074";

/// Preferred (format, size prefix) pairs, best first.
const FILE_PREFERENCE: &[(&str, &str)] = &[
    ("WEBP", "1x"),
    ("PNG", "1x"),
    ("WEBP", "2x"),
    ("PNG", "2x"),
    ("AVIF", "1x"),
    ("GIF", "1x"),
    ("AVIF", "2x"),
    ("GIF", "2x"),
];

#[derive(Debug, Deserialize)]
pub(super) struct EmoteSetResponse {
    #[serde(default)]
    pub(super) emotes: Vec<SetEmote>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SetEmote {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    data: Option<EmoteData>,
}

#[derive(Debug, Default, Deserialize)]
struct EmoteData {
    #[serde(default)]
    animated: bool,
    #[serde(default)]
    host: Option<EmoteHost>,
}

#[derive(Debug, Default, Deserialize)]
struct EmoteHost {
    #[serde(default)]
    url: String,
    #[serde(default)]
    files: Vec<EmoteFile>,
}

/// One hosted rendition of an emote.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmoteFile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub format: String,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    #[serde(default)]
    emote_set: Option<EmoteSetRef>,
}

#[derive(Debug, Deserialize)]
struct EmoteSetRef {
    #[serde(default)]
    id: Option<String>,
}

/// Pick the preferred file: static 1x, then static 2x, then animated, then anything.
pub fn select_file(files: &[EmoteFile]) -> Option<&EmoteFile> {
    FILE_PREFERENCE
        .iter()
        .find_map(|(format, size)| {
            files
                .iter()
                .find(|f| f.format == *format && f.name.starts_with(size))
        })
        .or_else(|| files.first())
}

impl SetEmote {
    /// Resolve to a record, skipping emotes without a usable image.
    pub(super) fn into_record(self, scope: EmoteScope) -> Option<EmoteRecord> {
        let data = self.data?;
        let host = data.host?;
        if self.name.is_empty() || host.url.is_empty() {
            return None;
        }
        let file = select_file(&host.files).filter(|f| !f.name.is_empty())?;
        let base = if host.url.starts_with("//") {
            format!("https:{}", host.url)
        } else {
            host.url.clone()
        };
        Some(EmoteRecord {
            url: format!("{base}/{}", file.name),
            id: self.id,
            name: self.name,
            animated: data.animated,
            scope,
        })
    }
}

/// 7TV REST client.
#[derive(Clone)]
pub struct SevenTvClient {
    http: reqwest::Client,
    base_url: String,
}

impl SevenTvClient {
    pub fn with_base_url(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Fetch an emote set by id.
    pub async fn get_emote_set(
        &self,
        set_id: &str,
        scope: EmoteScope,
    ) -> Result<Vec<EmoteRecord>, KickError> {
        let url = format!("{}/emote-sets/{set_id}", self.base_url);
        let body = self.fetch(&url).await?;
        let resp: EmoteSetResponse = serde_json::from_str(&body)?;
        let records: Vec<EmoteRecord> = resp
            .emotes
            .into_iter()
            .filter_map(|e| e.into_record(scope))
            .collect();
        tracing::debug!(set_id, count = records.len(), "Fetched 7TV emote set");
        Ok(records)
    }

    /// Fetch the global emote set.
    pub async fn get_global_emotes(&self, set_id: &str) -> Result<Vec<EmoteRecord>, KickError> {
        self.get_emote_set(set_id, EmoteScope::Global).await
    }

    /// Resolve the active emote-set id of the 7TV user linked to a Kick user id.
    ///
    /// `Ok(None)` when the user is unknown to 7TV or has no active set.
    pub async fn resolve_channel_set_id(
        &self,
        kick_user_id: u64,
    ) -> Result<Option<String>, KickError> {
        let url = format!("{}/users/kick/{kick_user_id}", self.base_url);
        let body = match self.fetch(&url).await {
            Ok(body) => body,
            Err(KickError::Upstream { status: 404, .. }) => {
                tracing::debug!(kick_user_id, "Kick user not linked on 7TV");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        let user: UserResponse = serde_json::from_str(&body)?;
        Ok(user
            .emote_set
            .and_then(|set| set.id)
            .filter(|id| !id.is_empty()))
    }

    /// Channel emotes for a Kick user. Fails closed to an empty set.
    pub async fn get_channel_emotes(&self, kick_user_id: u64, slug: &str) -> Vec<EmoteRecord> {
        let set_id = match self.resolve_channel_set_id(kick_user_id).await {
            Ok(Some(id)) => id,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!(slug, kick_user_id, error = %e, "7TV user lookup failed");
                return Vec::new();
            }
        };
        match self.get_emote_set(&set_id, EmoteScope::Channel).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(slug, set_id, error = %e, "Failed to fetch 7TV channel emotes");
                Vec::new()
            }
        }
    }

    async fn fetch(&self, url: &str) -> Result<String, KickError> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| KickError::Connectivity(e.to_string()))?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(KickError::Upstream {
                status: status.as_u16(),
                message: "7TV API error".into(),
                preview: crate::api::body_preview(&body),
            });
        }
        Ok(body)
    }
}
