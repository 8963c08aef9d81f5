//! Square-output normalization for generated images.

use crate::config::GenerationConfig;
use crate::error::{Result, TryOnError};
use crate::models::ImageData;
use image::{imageops, DynamicImage, GenericImageView, Rgba, RgbaImage};
use tracing::debug;

/// Pad an image onto a centred square canvas.
///
/// Images already within [`GenerationConfig::ASPECT_TOLERANCE`] of 1:1 are
/// returned unchanged, bytes and MIME type included. Anything else becomes a
/// PNG whose side is the longer edge, filled with the neutral backdrop colour.
pub fn enforce_square(image: ImageData) -> Result<ImageData> {
    let decoded = image.decode()?;
    let (width, height) = decoded.dimensions();
    if width == 0 || height == 0 {
        return Err(TryOnError::NoImageReturned {
            message: "The returned image is empty.".to_string(),
        });
    }

    let ratio = f64::from(width) / f64::from(height);
    if (ratio - 1.0).abs() < GenerationConfig::ASPECT_TOLERANCE {
        return Ok(image);
    }

    let side = width.max(height);
    let [r, g, b] = GenerationConfig::SQUARE_FILL_RGB;
    let mut canvas = RgbaImage::from_pixel(side, side, Rgba([r, g, b, 255]));
    let dx = i64::from((side - width) / 2);
    let dy = i64::from((side - height) / 2);
    imageops::overlay(&mut canvas, &decoded.to_rgba8(), dx, dy);

    debug!("Padded {}x{} image to {}x{}", width, height, side, side);
    ImageData::encode_png(&DynamicImage::ImageRgba8(canvas))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(width: u32, height: u32, pixel: [u8; 4]) -> ImageData {
        let img = RgbaImage::from_pixel(width, height, Rgba(pixel));
        ImageData::encode_png(&DynamicImage::ImageRgba8(img)).unwrap()
    }

    #[test]
    fn test_square_image_is_untouched() {
        let image = png(10, 10, [1, 2, 3, 255]);
        let out = enforce_square(image.clone()).unwrap();
        assert_eq!(out, image);
    }

    #[test]
    fn test_wide_image_is_padded_vertically() {
        let out = enforce_square(png(8, 4, [200, 0, 0, 255])).unwrap();
        assert_eq!(out.mime_type, "image/png");

        let decoded = out.decode().unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (8, 8));
        // Top band is backdrop, middle rows carry the original pixels
        assert_eq!(decoded.get_pixel(0, 0), &Rgba([0xf0, 0xf0, 0xf0, 255]));
        assert_eq!(decoded.get_pixel(4, 4), &Rgba([200, 0, 0, 255]));
        assert_eq!(decoded.get_pixel(7, 7), &Rgba([0xf0, 0xf0, 0xf0, 255]));
    }

    #[test]
    fn test_tall_image_is_padded_horizontally() {
        let out = enforce_square(png(3, 9, [0, 0, 200, 255])).unwrap();
        let decoded = out.decode().unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (9, 9));
        assert_eq!(decoded.get_pixel(0, 4), &Rgba([0xf0, 0xf0, 0xf0, 255]));
        assert_eq!(decoded.get_pixel(4, 4), &Rgba([0, 0, 200, 255]));
    }

    #[test]
    fn test_garbage_bytes_fail() {
        let err = enforce_square(ImageData::new("image/png", vec![1, 2, 3])).unwrap_err();
        assert!(matches!(err, TryOnError::Image { .. }));
    }
}
