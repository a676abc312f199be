//! Fixed-size scaling for inline chat images.

use image::RgbaImage;
use image::imageops::{self, FilterType};
use tracing::debug;

/// Scale an image to exactly `size` x `size` using Lanczos3 filtering.
///
/// The aspect ratio is not preserved; emotes and badges are drawn into a
/// square slot. Returns a copy unchanged when it already fits.
pub fn resize_square(img: &RgbaImage, size: u32) -> RgbaImage {
    let size = size.max(1);
    let (orig_w, orig_h) = img.dimensions();

    if orig_w == size && orig_h == size {
        debug!(size, "Image already at target size, skipping resize");
        return img.clone();
    }

    debug!(orig_w, orig_h, size, "Resizing image to square slot");
    imageops::resize(img, size, size, FilterType::Lanczos3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    /// Create a test image with given dimensions.
    fn create_test_image(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba([128, 64, 32, 255]))
    }

    #[test]
    fn test_resize_square_downscale() {
        let result = resize_square(&create_test_image(112, 112), 28);
        assert_eq!(result.dimensions(), (28, 28));
    }

    #[test]
    fn test_resize_square_upscale() {
        let result = resize_square(&create_test_image(9, 9), 18);
        assert_eq!(result.dimensions(), (18, 18));
    }

    #[test]
    fn test_resize_square_ignores_aspect_ratio() {
        let result = resize_square(&create_test_image(300, 100), 28);
        assert_eq!(result.dimensions(), (28, 28));
    }

    #[test]
    fn test_resize_square_same_size() {
        let img = create_test_image(28, 28);
        let result = resize_square(&img, 28);
        assert_eq!(result, img);
    }

    #[test]
    fn test_resize_square_zero_clamped() {
        let result = resize_square(&create_test_image(1000, 1), 0);
        assert_eq!(result.dimensions(), (1, 1));
    }

    #[test]
    fn test_resize_keeps_flat_color() {
        let result = resize_square(&create_test_image(56, 56), 28);
        let px = result.get_pixel(14, 14);
        for (got, want) in px.0.iter().zip([128u8, 64, 32, 255]) {
            assert!(got.abs_diff(want) <= 1, "got {px:?}");
        }
    }
}
