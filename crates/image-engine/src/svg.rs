//! SVG rasterization for badges.

use crate::{Bitmap, ImageError};

/// Whether this build can render SVG payloads.
pub const fn svg_available() -> bool {
    cfg!(feature = "svg")
}

/// Render an SVG document into a `size` x `size` RGBA bitmap.
///
/// The drawing is stretched to fill the square. Output alpha is straight,
/// not premultiplied.
#[cfg(feature = "svg")]
pub fn rasterize(bytes: &[u8], size: u32) -> Result<Bitmap, ImageError> {
    use resvg::{tiny_skia, usvg};

    let size = size.max(1);
    let options = usvg::Options::default();
    let tree = usvg::Tree::from_data(bytes, &options)
        .map_err(|e| ImageError::Svg(format!("parse failed: {e}")))?;

    let source = tree.size();
    if source.width() <= 0.0 || source.height() <= 0.0 {
        return Err(ImageError::Svg("empty canvas".into()));
    }

    let mut pixmap = tiny_skia::Pixmap::new(size, size)
        .ok_or_else(|| ImageError::Svg(format!("cannot allocate {size}x{size} canvas")))?;
    let transform = tiny_skia::Transform::from_scale(
        size as f32 / source.width(),
        size as f32 / source.height(),
    );
    resvg::render(&tree, transform, &mut pixmap.as_mut());
    tracing::debug!(size, src_w = source.width(), src_h = source.height(), "Rendered SVG");

    let mut out = Bitmap::new(size, size);
    for (dst, src) in out.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        *dst = image::Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }
    Ok(out)
}

#[cfg(not(feature = "svg"))]
pub fn rasterize(_bytes: &[u8], _size: u32) -> Result<Bitmap, ImageError> {
    Err(ImageError::SvgUnavailable)
}
