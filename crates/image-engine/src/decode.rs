//! Byte payload to RGBA, keeping only the first frame of animations.

use std::io::Cursor;

use image::codecs::gif::GifDecoder;
use image::codecs::webp::WebPDecoder;
use image::{AnimationDecoder, DynamicImage, ImageFormat, ImageReader, RgbaImage};
use tracing::debug;

use crate::ImageError;

/// Decode `bytes` into an RGBA image.
///
/// Animated GIF and WebP payloads yield their first frame. Every other
/// format supported by `image` is decoded directly.
pub fn first_frame(bytes: &[u8]) -> Result<RgbaImage, ImageError> {
    let format = image::guess_format(bytes).ok();
    debug!(?format, len = bytes.len(), "Decoding image payload");

    match format {
        Some(ImageFormat::Gif) => {
            let decoder = GifDecoder::new(Cursor::new(bytes))?;
            next_frame(decoder)
        }
        Some(ImageFormat::WebP) => {
            let decoder = WebPDecoder::new(Cursor::new(bytes))?;
            if decoder.has_animation() {
                next_frame(decoder)
            } else {
                Ok(DynamicImage::from_decoder(decoder)?.to_rgba8())
            }
        }
        _ => {
            let img = ImageReader::new(Cursor::new(bytes))
                .with_guessed_format()
                .map_err(image::ImageError::IoError)?
                .decode()?;
            Ok(img.to_rgba8())
        }
    }
}

fn next_frame<'a, D: AnimationDecoder<'a>>(decoder: D) -> Result<RgbaImage, ImageError> {
    match decoder.into_frames().next() {
        Some(frame) => Ok(frame?.into_buffer()),
        None => Err(ImageError::EmptyFrame),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::gif::GifEncoder;
    use image::{Delay, Frame, Rgba};

    fn png_bytes(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba(color));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_decode_png() {
        let bytes = png_bytes(4, 3, [10, 20, 30, 255]);
        let img = first_frame(&bytes).unwrap();
        assert_eq!(img.dimensions(), (4, 3));
        assert_eq!(img.get_pixel(0, 0), &Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn test_decode_gif_takes_first_frame() {
        let mut bytes = Vec::new();
        {
            let mut encoder = GifEncoder::new(&mut bytes);
            let red = RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 255]));
            let blue = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 255, 255]));
            encoder
                .encode_frames(vec![
                    Frame::from_parts(red, 0, 0, Delay::from_numer_denom_ms(100, 1)),
                    Frame::from_parts(blue, 0, 0, Delay::from_numer_denom_ms(100, 1)),
                ])
                .unwrap();
        }

        let img = first_frame(&bytes).unwrap();
        assert_eq!(img.dimensions(), (2, 2));
        let px = img.get_pixel(1, 1);
        assert!(px[0] > 200 && px[2] < 50, "expected red first frame, got {px:?}");
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(first_frame(b"definitely not an image").is_err());
        assert!(first_frame(&[]).is_err());
    }
}
