//! Turns a chat message into a display row.
//!
//! Runs on the UI thread. Image lookups never block: a miss schedules a
//! background fetch and the row shows `[name]` text in its place.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use image_engine::Bitmap;
use kick_client::ChatMessage;
use kick_client::badges::badge_svg_url;
use kick_client::emotes::EmoteRegistry;

use crate::services::image_cache::{HttpImageSource, ImageCache, ImageCaches, ImageLookup, ImageSource};
use crate::services::message_parser::{Segment, parse_content};

/// Emote registry shared between scheduler tasks (writers) and the renderer.
pub type SharedEmotes = Arc<RwLock<EmoteRegistry>>;

/// A piece of a rendered row.
#[derive(Debug, Clone)]
pub enum Piece {
    Image { label: String, bitmap: Arc<Bitmap> },
    Text(String),
}

impl Piece {
    pub fn is_image(&self) -> bool {
        matches!(self, Piece::Image { .. })
    }
}

/// One chat line ready for display.
#[derive(Debug, Clone)]
pub struct ChatRow {
    pub time: Option<DateTime<Utc>>,
    pub badges: Vec<Piece>,
    pub sender: String,
    /// `#RRGGBB` sender color.
    pub color: String,
    pub body: Vec<Piece>,
}

pub struct RowRenderer<S = HttpImageSource> {
    caches: ImageCaches<S>,
    emotes: SharedEmotes,
}

impl<S: ImageSource> RowRenderer<S> {
    pub fn new(caches: ImageCaches<S>, emotes: SharedEmotes) -> Self {
        Self { caches, emotes }
    }

    pub fn render(&self, slug: &str, message: &ChatMessage) -> ChatRow {
        let badges = message
            .active_badges()
            .map(|badge| {
                let fallback = format!("{} ", badge.fallback_text());
                match badge_svg_url(&badge.badge_type) {
                    Some(url) => image_or(&self.caches.badges, &url, &badge.badge_type, fallback),
                    None => Piece::Text(fallback),
                }
            })
            .collect();

        let segments = {
            let registry = self.emotes.read().unwrap_or_else(PoisonError::into_inner);
            parse_content(&message.content, &message.emotes, &*registry, Some(slug))
        };

        let body = segments
            .into_iter()
            .map(|segment| match segment {
                Segment::Text(text) => Piece::Text(text),
                Segment::KickEmote(meta) => match meta.url.as_deref().filter(|u| !u.is_empty()) {
                    Some(url) => {
                        let fallback = format!("[{}]", meta.name);
                        image_or(&self.caches.kick_emotes, url, &meta.name, fallback)
                    }
                    None => Piece::Text(format!("[{}]", meta.name)),
                },
                Segment::SevenTvEmote(record) => {
                    let fallback = format!("[{}]", record.name);
                    if record.url.is_empty() {
                        Piece::Text(fallback)
                    } else {
                        image_or(&self.caches.seventv_emotes, &record.url, &record.name, fallback)
                    }
                }
            })
            .collect();

        ChatRow {
            time: message.timestamp(),
            badges,
            sender: message.sender_name().to_string(),
            color: message.sender_color().to_string(),
            body,
        }
    }
}

fn image_or<S: ImageSource>(cache: &ImageCache<S>, url: &str, label: &str, fallback: String) -> Piece {
    match cache.request(url) {
        ImageLookup::Ready(bitmap) => Piece::Image {
            label: label.to_string(),
            bitmap,
        },
        ImageLookup::Unavailable | ImageLookup::Pending => Piece::Text(fallback),
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::io::Cursor;
    use std::time::Duration;

    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use kick_client::KickError;
    use kick_client::emotes::{EmoteRecord, EmoteScope};
    use tokio::runtime::Handle;

    use super::*;

    /// Serves a PNG for URLs containing "ok" and fails everything else.
    struct FakeCdn;

    impl ImageSource for FakeCdn {
        fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, KickError>> + Send {
            let ok = url.contains("ok");
            async move {
                if !ok {
                    return Err(KickError::Unavailable("fake cdn".into()));
                }
                let mut out = Cursor::new(Vec::new());
                DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([1, 2, 3, 255])))
                    .write_to(&mut out, ImageFormat::Png)
                    .map_err(|e| KickError::Protocol(e.to_string()))?;
                Ok(out.into_inner())
            }
        }
    }

    fn renderer() -> RowRenderer<FakeCdn> {
        let caches = ImageCaches::with_sources(|| FakeCdn, Handle::current(), 28, 18);
        let mut registry = EmoteRegistry::new();
        registry.set_global(vec![EmoteRecord {
            id: "g1".into(),
            name: "Clap".into(),
            url: "https://7tv/ok/clap".into(),
            animated: false,
            scope: EmoteScope::Global,
        }]);
        RowRenderer::new(caches, Arc::new(RwLock::new(registry)))
    }

    fn message(json: serde_json::Value) -> ChatMessage {
        serde_json::from_value(json).unwrap()
    }

    fn texts(pieces: &[Piece]) -> Vec<String> {
        pieces
            .iter()
            .map(|p| match p {
                Piece::Text(t) => t.clone(),
                Piece::Image { label, .. } => format!("<{label}>"),
            })
            .collect()
    }

    async fn settle<S: ImageSource>(cache: &ImageCache<S>, url: &str) {
        for _ in 0..200 {
            if cache.get(url).is_some() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn misses_show_fallback_then_images() {
        let renderer = renderer();
        let msg = message(serde_json::json!({
            "content": "hi [emote:5:Kappa] Clap [emote:6:Gone]",
            "emotes": [
                {"id": 5, "name": "Kappa", "url": "https://kick/ok/5"},
                {"id": 6, "name": "Gone", "url": "https://kick/missing/6"}
            ],
            "sender": {"username": "viewer", "identity": {"color": "", "badges": []}}
        }));

        let first = renderer.render("xqc", &msg);
        assert_eq!(first.sender, "viewer");
        assert_eq!(first.color, "#6495ED");
        assert_eq!(texts(&first.body), vec!["hi ", "[Kappa]", " ", "[Clap]", " ", "[Gone]"]);

        settle(&renderer.caches.kick_emotes, "https://kick/ok/5").await;
        settle(&renderer.caches.kick_emotes, "https://kick/missing/6").await;
        settle(&renderer.caches.seventv_emotes, "https://7tv/ok/clap").await;

        let second = renderer.render("xqc", &msg);
        assert_eq!(texts(&second.body), vec!["hi ", "<Kappa>", " ", "<Clap>", " ", "[Gone]"]);
    }

    #[tokio::test]
    async fn emote_without_url_renders_name() {
        let renderer = renderer();
        let msg = message(serde_json::json!({
            "content": "[emote:7:NoUrl]",
            "emotes": [{"id": 7, "name": "NoUrl"}]
        }));
        let row = renderer.render("xqc", &msg);
        assert_eq!(texts(&row.body), vec!["[NoUrl]"]);
        assert!(renderer.caches.kick_emotes.is_empty());
    }

    #[tokio::test]
    async fn badges_skip_inactive_and_fall_back_to_text() {
        let renderer = renderer();
        let msg = message(serde_json::json!({
            "content": "x",
            "sender": {"username": "mod", "identity": {"badges": [
                {"type": "moderator", "text": "Moderator"},
                {"type": "subscriber", "text": "Subscriber", "active": false},
                {"type": "sub_gifter_9000", "text": "Gifter"}
            ]}}
        }));
        let row = renderer.render("xqc", &msg);
        assert_eq!(texts(&row.badges), vec!["[Moderator] ", "[Gifter] "]);
        assert!(row.badges.iter().all(|p| !p.is_image()));
    }
}
