use super::{Arc, ImageBuffer, ImageFrame, RenderImage, Rgba};
use crate::{client::Thumbnail, pipeline::Canvas};

pub(super) fn canvas_to_image(canvas: &Canvas) -> Option<Arc<RenderImage>> {
    if canvas.is_empty() {
        return None;
    }
    rgba_to_image(canvas.rgba.clone(), canvas.width, canvas.height)
}

pub(super) fn thumbnail_to_image(thumb: &Thumbnail) -> Option<Arc<RenderImage>> {
    rgba_to_image(thumb.rgba.clone(), thumb.width, thumb.height)
}

fn rgba_to_image(mut pixels: Vec<u8>, width: u32, height: u32) -> Option<Arc<RenderImage>> {
    // GPUI textures are BGRA.
    for px in pixels.chunks_exact_mut(4) {
        px.swap(0, 2);
    }
    let buffer = ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(width, height, pixels)?;
    Some(Arc::new(RenderImage::new(vec![ImageFrame::new(buffer)])))
}
