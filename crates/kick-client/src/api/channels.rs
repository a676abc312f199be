use super::models::ChannelResponse;
use super::request::{RawResponse, body_preview};
use super::*;
use crate::KickError;

impl KickApiClient {
    /// Fetch channel metadata for a slug.
    pub async fn get_channel_info(&self, slug: &str) -> Result<ChannelInfo, KickError> {
        let url = format!("{}/channels/{slug}", self.base_url);
        tracing::debug!(slug, url = %url, "Fetching channel info");
        let raw = self.browser_get(&url, slug).await?;
        interpret_channel_response(slug, raw)
    }
}

/// Map a raw channel response to `ChannelInfo` or a classified error.
pub(super) fn interpret_channel_response(
    slug: &str,
    raw: RawResponse,
) -> Result<ChannelInfo, KickError> {
    if !raw.content_type.contains("application/json") {
        tracing::info!(
            slug,
            status = raw.status,
            content_type = %raw.content_type,
            "Channel API returned a non-JSON content type, parsing anyway"
        );
    }

    if raw.status == 404 {
        tracing::warn!(slug, "Channel not found");
        return Err(KickError::ChannelNotFound {
            slug: slug.to_string(),
        });
    }

    if !(200..300).contains(&raw.status) {
        tracing::warn!(slug, status = raw.status, "Channel API HTTP error");
        return Err(KickError::Upstream {
            status: raw.status,
            message: "API HTTP Error".into(),
            preview: body_preview(&raw.body),
        });
    }

    match serde_json::from_str::<ChannelResponse>(&raw.body) {
        Ok(resp) => Ok(resp.into_info(slug)),
        Err(e) => {
            tracing::warn!(
                slug,
                status = raw.status,
                error = %e,
                preview = %body_preview(&raw.body),
                "Channel API body is not JSON"
            );
            Err(KickError::Upstream {
                status: raw.status,
                message: "JSON parsing failed, server might have sent HTML or malformed JSON"
                    .into(),
                preview: body_preview(&raw.body),
            })
        }
    }
}
