//! Image pipelines for chat emotes and badges.
//!
//! Raster payloads (PNG, WebP, GIF, ...) are decoded to their first frame and
//! resized to a fixed square. Badge payloads are SVG and go through the vector
//! pipeline, which is only compiled in with the `svg` feature.

pub mod decode;
pub mod error;
pub mod resize;
pub mod svg;

pub use error::ImageError;

/// Decoded RGBA bitmap ready for display.
pub type Bitmap = image::RgbaImage;

/// Default edge length for rendered emotes.
pub const EMOTE_SIZE: u32 = 28;
/// Default edge length for rendered badges.
pub const BADGE_SIZE: u32 = 18;

/// Decode a raster payload and scale it to `size` x `size`.
pub fn raster_to_bitmap(bytes: &[u8], size: u32) -> Result<Bitmap, ImageError> {
    let frame = decode::first_frame(bytes)?;
    Ok(resize::resize_square(&frame, size))
}

/// Rasterize an SVG payload at `size` x `size`.
pub fn vector_to_bitmap(bytes: &[u8], size: u32) -> Result<Bitmap, ImageError> {
    svg::rasterize(bytes, size)
}
