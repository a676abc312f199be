//! Fetch-once image cache shared by the renderer and the scheduler.
//!
//! Keys are source URLs. A missing key means the URL was never attempted;
//! [`CachedImage::Unavailable`] means it was attempted and failed. Entries
//! are never replaced or evicted. Concurrent misses for one URL collapse into
//! a single fetch through a lazily created per-URL async lock.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use image_engine::{Bitmap, ImageError};
use kick_client::KickError;
use tokio::runtime::Handle;

use super::http::SharedHttp;

/// Settled cache entry.
#[derive(Debug, Clone)]
pub enum CachedImage {
    Ready(Arc<Bitmap>),
    Unavailable,
}

/// Result of a synchronous [`ImageCache::request`].
#[derive(Debug, Clone)]
pub enum ImageLookup {
    Ready(Arc<Bitmap>),
    Unavailable,
    /// Not cached yet; a background fetch has been scheduled.
    Pending,
}

impl From<CachedImage> for ImageLookup {
    fn from(entry: CachedImage) -> Self {
        match entry {
            CachedImage::Ready(bitmap) => ImageLookup::Ready(bitmap),
            CachedImage::Unavailable => ImageLookup::Unavailable,
        }
    }
}

/// How fetched bytes become a bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pipeline {
    Raster { size: u32 },
    Vector { size: u32 },
}

impl Pipeline {
    fn available(self) -> bool {
        match self {
            Pipeline::Raster { .. } => true,
            Pipeline::Vector { .. } => image_engine::svg::svg_available(),
        }
    }

    fn render(self, bytes: &[u8]) -> Result<Bitmap, ImageError> {
        match self {
            Pipeline::Raster { size } => image_engine::raster_to_bitmap(bytes, size),
            Pipeline::Vector { size } => image_engine::vector_to_bitmap(bytes, size),
        }
    }
}

/// Where image bytes come from.
pub trait ImageSource: Send + Sync + 'static {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, KickError>> + Send;
}

/// Plain HTTP GET through the shared client. Anything but 200 is a failure.
#[derive(Debug, Clone)]
pub struct HttpImageSource {
    http: SharedHttp,
}

impl HttpImageSource {
    pub fn new(http: SharedHttp) -> Self {
        Self { http }
    }
}

impl ImageSource for HttpImageSource {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, KickError>> + Send {
        let http = self.http.clone();
        let url = url.to_string();
        async move {
            let client = http.client()?;
            let resp = client
                .get(&url)
                .send()
                .await
                .map_err(|e| KickError::Connectivity(e.to_string()))?;
            let status = resp.status();
            if status != reqwest::StatusCode::OK {
                return Err(KickError::Upstream {
                    status: status.as_u16(),
                    message: "Image HTTP error".into(),
                    preview: String::new(),
                });
            }
            Ok(resp.bytes().await?.to_vec())
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum LoadError {
    #[error(transparent)]
    Fetch(#[from] KickError),
    #[error(transparent)]
    Render(#[from] ImageError),
    #[error("render task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

type FetchLock = Arc<tokio::sync::Mutex<()>>;

struct CacheInner<S> {
    label: &'static str,
    source: S,
    pipeline: Pipeline,
    entries: Mutex<HashMap<String, CachedImage>>,
    locks: Mutex<HashMap<String, FetchLock>>,
    runtime: Handle,
}

/// One cache instance. Cheap to clone; clones share state.
pub struct ImageCache<S = HttpImageSource> {
    inner: Arc<CacheInner<S>>,
}

impl<S> Clone for ImageCache<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: ImageSource> ImageCache<S> {
    /// `runtime` is where misses from [`ImageCache::request`] are fetched.
    pub fn new(label: &'static str, source: S, pipeline: Pipeline, runtime: Handle) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                label,
                source,
                pipeline,
                entries: Mutex::new(HashMap::new()),
                locks: Mutex::new(HashMap::new()),
                runtime,
            }),
        }
    }

    /// Peek without scheduling anything.
    pub fn get(&self, url: &str) -> Option<CachedImage> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .cloned()
    }

    /// Synchronous lookup for render paths. A miss schedules a background
    /// fetch and returns [`ImageLookup::Pending`].
    pub fn request(&self, url: &str) -> ImageLookup {
        if let Some(entry) = self.get(url) {
            return entry.into();
        }
        if !self.inner.pipeline.available() {
            tracing::debug!(cache = self.inner.label, url, "Renderer unavailable, caching sentinel");
            return self.store(url, CachedImage::Unavailable).into();
        }

        let cache = self.clone();
        let url = url.to_string();
        self.inner.runtime.spawn(async move {
            cache.load(&url).await;
        });
        ImageLookup::Pending
    }

    /// Resolve `url`, fetching it at most once for the life of the cache.
    pub async fn load(&self, url: &str) -> CachedImage {
        if let Some(entry) = self.get(url) {
            return entry;
        }

        let lock = self.lock_for(url);
        let _guard = lock.lock().await;
        // another caller may have finished while we waited
        if let Some(entry) = self.get(url) {
            return entry;
        }

        let entry = if !self.inner.pipeline.available() {
            CachedImage::Unavailable
        } else {
            match self.fetch_and_render(url).await {
                Ok(bitmap) => {
                    tracing::debug!(cache = self.inner.label, url, "Image cached");
                    CachedImage::Ready(Arc::new(bitmap))
                }
                Err(e) => {
                    tracing::warn!(cache = self.inner.label, url, error = %e, "Image unavailable");
                    CachedImage::Unavailable
                }
            }
        };
        self.store(url, entry)
    }

    pub fn len(&self) -> usize {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn fetch_and_render(&self, url: &str) -> Result<Bitmap, LoadError> {
        let bytes = self.inner.source.fetch(url).await?;
        let pipeline = self.inner.pipeline;
        let bitmap = tokio::task::spawn_blocking(move || pipeline.render(&bytes)).await??;
        Ok(bitmap)
    }

    fn lock_for(&self, url: &str) -> FetchLock {
        let mut locks = self.inner.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(url.to_string()).or_default())
    }

    /// First write wins; an existing entry is never replaced.
    fn store(&self, url: &str, entry: CachedImage) -> CachedImage {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(url.to_string())
            .or_insert(entry)
            .clone()
    }
}

/// The three independent cache instances used when rendering rows.
pub struct ImageCaches<S = HttpImageSource> {
    pub kick_emotes: ImageCache<S>,
    pub seventv_emotes: ImageCache<S>,
    pub badges: ImageCache<S>,
}

impl<S> Clone for ImageCaches<S> {
    fn clone(&self) -> Self {
        Self {
            kick_emotes: self.kick_emotes.clone(),
            seventv_emotes: self.seventv_emotes.clone(),
            badges: self.badges.clone(),
        }
    }
}

impl ImageCaches {
    pub fn new(http: &SharedHttp, runtime: Handle, emote_size: u32, badge_size: u32) -> Self {
        Self::with_sources(
            || HttpImageSource::new(http.clone()),
            runtime,
            emote_size,
            badge_size,
        )
    }
}

impl<S: ImageSource> ImageCaches<S> {
    /// Build the caches with one source per instance from `source`.
    pub fn with_sources(
        source: impl Fn() -> S,
        runtime: Handle,
        emote_size: u32,
        badge_size: u32,
    ) -> Self {
        let emote = Pipeline::Raster { size: emote_size };
        Self {
            kick_emotes: ImageCache::new("kick_emotes", source(), emote, runtime.clone()),
            seventv_emotes: ImageCache::new("7tv_emotes", source(), emote, runtime.clone()),
            badges: ImageCache::new(
                "badges",
                source(),
                Pipeline::Vector { size: badge_size },
                runtime,
            ),
        }
    }
}
