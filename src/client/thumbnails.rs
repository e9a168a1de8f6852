use anyhow::{Context, Result};
use fast_image_resize as fir;

/// Longest side of a gallery thumbnail.
pub const THUMBNAIL_SIZE: u32 = 160;

#[derive(Clone, Debug)]
pub struct Thumbnail {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

fn fit_within(width: u32, height: u32, max_side: u32) -> (u32, u32) {
    if width <= max_side && height <= max_side {
        return (width.max(1), height.max(1));
    }
    let scale = max_side as f32 / width.max(height) as f32;
    (
        ((width as f32 * scale).round() as u32).max(1),
        ((height as f32 * scale).round() as u32).max(1),
    )
}

/// Decode an encoded image and shrink it to fit `max_side`.
pub fn make_thumbnail(encoded: &[u8], max_side: u32) -> Result<Thumbnail> {
    let decoded = image::load_from_memory(encoded)
        .context("failed to decode gallery image")?
        .to_rgba8();
    let (src_w, src_h) = decoded.dimensions();
    let (width, height) = fit_within(src_w, src_h, max_side);

    if (width, height) == (src_w, src_h) {
        return Ok(Thumbnail {
            rgba: decoded.into_raw(),
            width,
            height,
        });
    }

    let src = fir::images::Image::from_vec_u8(src_w, src_h, decoded.into_raw(), fir::PixelType::U8x4)
        .context("invalid decoded image")?;
    let mut dst = fir::images::Image::new(width, height, fir::PixelType::U8x4);
    let options =
        fir::ResizeOptions::new().resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::Bilinear));
    fir::Resizer::new()
        .resize(&src, &mut dst, Some(&options))
        .context("thumbnail resize failed")?;

    Ok(Thumbnail {
        rgba: dst.into_vec(),
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use image::{ImageFormat, RgbaImage};

    use super::*;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, image::Rgba([10, 200, 30, 255]));
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn large_images_keep_aspect_ratio() {
        let thumb = make_thumbnail(&png(640, 480), THUMBNAIL_SIZE).unwrap();
        assert_eq!((thumb.width, thumb.height), (160, 120));
        assert_eq!(thumb.rgba.len(), 160 * 120 * 4);
        assert_eq!(thumb.rgba[3], 255);
        assert!((thumb.rgba[1] as i32 - 200).abs() <= 1);
    }

    #[test]
    fn small_images_are_not_upscaled() {
        let thumb = make_thumbnail(&png(20, 10), THUMBNAIL_SIZE).unwrap();
        assert_eq!((thumb.width, thumb.height), (20, 10));
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(make_thumbnail(b"not an image", THUMBNAIL_SIZE).is_err());
    }
}
