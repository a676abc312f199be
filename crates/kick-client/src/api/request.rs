use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, ORIGIN, REFERER, USER_AGENT};

use super::*;
use crate::{BROWSER_USER_AGENT, KickError};

/// Raw HTTP outcome before interpretation.
pub(super) struct RawResponse {
    pub status: u16,
    pub content_type: String,
    pub body: String,
}

impl KickApiClient {
    /// Build a client against a non-default API base (tests, mirrors).
    pub fn with_base_url(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Headers that make the request look like it came from the Kick web app.
    fn browser_headers(slug: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/plain, */*"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert(ORIGIN, HeaderValue::from_static("https://kick.com"));
        if let Ok(referer) = HeaderValue::from_str(&format!("https://kick.com/{slug}")) {
            headers.insert(REFERER, referer);
        }
        headers
    }

    /// Execute a browser-like GET. Transport failures map to `Connectivity`.
    pub(super) async fn browser_get(&self, url: &str, slug: &str) -> Result<RawResponse, KickError> {
        let resp = self
            .http
            .get(url)
            .headers(Self::browser_headers(slug))
            .send()
            .await
            .map_err(connectivity_error)?;

        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_lowercase();
        let body = resp.text().await.map_err(connectivity_error)?;

        Ok(RawResponse {
            status,
            content_type,
            body,
        })
    }
}

fn connectivity_error(e: reqwest::Error) -> KickError {
    if e.is_timeout() {
        return KickError::Timeout;
    }
    KickError::Connectivity(e.to_string())
}

/// First [`PREVIEW_CHARS`] characters of a body on a single line.
pub(crate) fn body_preview(body: &str) -> String {
    body.chars()
        .take(PREVIEW_CHARS)
        .collect::<String>()
        .replace(['\r', '\n'], " ")
}
