use anyhow::{Context, Result, anyhow};
use fast_image_resize as fir;

use crate::{
    landmarks::{FaceLandmarks, NUM_FACE_LANDMARKS, Point},
    types::Frame,
};

/// Face box detector input (width, height).
pub const FACE_INPUT_SIZE: (u32, u32) = (320, 240);
/// Square crop fed to the landmark regressor.
pub const LANDMARK_INPUT_SIZE: u32 = 112;
pub const FACE_SCORE_THRESHOLD: f32 = 0.7;
/// The regressor was trained on crops slightly larger than the face box.
const CROP_MARGIN: f32 = 0.15;

/// Pixel-space rectangle `[x, y, width, height]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CropRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaceBox {
    /// Normalised `[x1, y1, x2, y2]` in `0.0..=1.0`.
    pub corners: [f32; 4],
    pub score: f32,
}

/// Best candidate of a face detector that emits `[background, face]` scores
/// and normalised corner boxes per anchor.
pub fn pick_best_face(scores: &[f32], boxes: &[f32], threshold: f32) -> Result<Option<FaceBox>> {
    if scores.len() % 2 != 0 || boxes.len() % 4 != 0 || scores.len() / 2 != boxes.len() / 4 {
        return Err(anyhow!(
            "face detector output mismatch: {} scores vs {} box values",
            scores.len(),
            boxes.len()
        ));
    }

    let best = scores
        .chunks_exact(2)
        .map(|pair| pair[1])
        .enumerate()
        .filter(|(_, score)| *score >= threshold)
        .max_by(|a, b| a.1.total_cmp(&b.1));

    Ok(best.map(|(idx, score)| {
        let b = &boxes[idx * 4..idx * 4 + 4];
        FaceBox {
            corners: [
                b[0].clamp(0.0, 1.0),
                b[1].clamp(0.0, 1.0),
                b[2].clamp(0.0, 1.0),
                b[3].clamp(0.0, 1.0),
            ],
            score,
        }
    }))
}

/// Square crop around `face`, grown by a margin and clamped to the frame.
pub fn square_crop(face: &FaceBox, frame_w: u32, frame_h: u32) -> Option<CropRect> {
    let (fw, fh) = (frame_w as f32, frame_h as f32);
    let [x1, y1, x2, y2] = face.corners;
    let (bx1, by1, bx2, by2) = (x1 * fw, y1 * fh, x2 * fw, y2 * fh);
    if bx2 <= bx1 || by2 <= by1 {
        return None;
    }

    let side = ((bx2 - bx1).max(by2 - by1) * (1.0 + CROP_MARGIN)).min(fw.min(fh));
    if side < 1.0 {
        return None;
    }
    let cx = (bx1 + bx2) / 2.0;
    let cy = (by1 + by2) / 2.0;
    let x = (cx - side / 2.0).clamp(0.0, fw - side);
    let y = (cy - side / 2.0).clamp(0.0, fh - side);
    Some(CropRect {
        x,
        y,
        width: side,
        height: side,
    })
}

/// Map crop-normalised `[x0, y0, x1, y1, ...]` back to frame pixels.
pub fn project_landmarks(flat: &[f32], crop: &CropRect) -> Result<FaceLandmarks> {
    if flat.len() < NUM_FACE_LANDMARKS * 2 {
        return Err(anyhow!(
            "unexpected landmarks length: got {}, need {}",
            flat.len(),
            NUM_FACE_LANDMARKS * 2
        ));
    }
    let points: Vec<Point> = flat
        .chunks_exact(2)
        .take(NUM_FACE_LANDMARKS)
        .map(|p| (crop.x + p[0] * crop.width, crop.y + p[1] * crop.height))
        .collect();
    Ok(FaceLandmarks::new(points)?)
}

/// Resize (optionally cropping first) an RGBA frame to `out_w` x `out_h`.
pub fn resize_rgba(frame: &Frame, crop: Option<&CropRect>, out_w: u32, out_h: u32) -> Result<Vec<u8>> {
    let expected_len = (frame.width as usize)
        .saturating_mul(frame.height as usize)
        .saturating_mul(4);
    if frame.rgba.len() != expected_len {
        return Err(anyhow!(
            "frame buffer size mismatch: got {}, expected {}",
            frame.rgba.len(),
            expected_len
        ));
    }

    let src = fir::images::ImageRef::new(frame.width, frame.height, &frame.rgba, fir::PixelType::U8x4)
        .context("invalid source frame")?;
    let mut dst = fir::images::Image::new(out_w, out_h, fir::PixelType::U8x4);
    let mut options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Interpolation(fir::FilterType::Bilinear));
    if let Some(c) = crop {
        options = options.crop(c.x as f64, c.y as f64, c.width as f64, c.height as f64);
    }
    fir::Resizer::new()
        .resize(&src, &mut dst, Some(&options))
        .context("fast resize failed")?;
    Ok(dst.into_vec())
}
