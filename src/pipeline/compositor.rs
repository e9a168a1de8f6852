use rayon::prelude::*;

use super::raster::{self, Paint};
use crate::{
    landmarks::{FaceLandmarks, Point},
    makeup::{Category, MakeupConfig, Rgb},
    types::{Detection, Frame},
};

const MARKER_RECT: [f32; 4] = [20.0, 20.0, 160.0, 80.0];
const MARKER_ALPHA: f32 = 0.6;
const DEBUG_DOT_RADIUS: f32 = 30.0;
const CHEEK_RADIUS_X: f32 = 0.05;
const CHEEK_RADIUS_Y: f32 = 0.03;

#[derive(Clone, Copy, Debug, Default)]
pub struct CompositorOptions {
    /// Paint a solid green dot on the first mouth landmark.
    pub debug_markers: bool,
}

/// The RGBA surface the compositor paints into, sized to the latest frame.
#[derive(Clone, Debug, Default)]
pub struct Canvas {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    fn resize(&mut self, width: u32, height: u32) {
        let len = width as usize * height as usize * 4;
        if self.width != width || self.height != height || self.rgba.len() != len {
            self.width = width;
            self.height = height;
            self.rgba = vec![0; len];
        }
    }
}

/// Landmarks of `detection`, rescaled to `frame` if the detector saw a
/// different resolution.
pub fn landmarks_for_frame(detection: &Detection, frame: &Frame) -> Option<FaceLandmarks> {
    let landmarks = detection.landmarks.as_ref()?;
    if detection.frame_width == frame.width && detection.frame_height == frame.height {
        return Some(landmarks.clone());
    }
    if detection.frame_width == 0 || detection.frame_height == 0 {
        return None;
    }
    let sx = frame.width as f32 / detection.frame_width as f32;
    let sy = frame.height as f32 / detection.frame_height as f32;
    Some(landmarks.scaled(sx, sy))
}

/// Render one tick: mirrored frame, placeholder marker, then every enabled
/// makeup region for `face`.
pub fn composite_frame(
    canvas: &mut Canvas,
    frame: &Frame,
    face: Option<&FaceLandmarks>,
    config: &MakeupConfig,
    options: CompositorOptions,
) {
    canvas.resize(frame.width, frame.height);
    if canvas.is_empty() {
        return;
    }

    mirror_into(&mut canvas.rgba, &frame.rgba, frame.width);

    let (width, height) = (canvas.width, canvas.height);
    raster::fill_rect(
        &mut canvas.rgba,
        width,
        height,
        MARKER_RECT,
        Paint::new(Rgb(255, 0, 0), MARKER_ALPHA),
    );

    if let Some(face) = face {
        paint_makeup(canvas, face, config, options);
    }
}

fn mirror_into(dst: &mut [u8], src: &[u8], width: u32) {
    let stride = width as usize * 4;
    if stride == 0 || src.len() < dst.len() {
        dst.fill(0);
        return;
    }
    dst.par_chunks_exact_mut(stride)
        .zip(src.par_chunks_exact(stride))
        .for_each(|(dst_row, src_row)| {
            for (dst_px, src_px) in dst_row
                .chunks_exact_mut(4)
                .zip(src_row.chunks_exact(4).rev())
            {
                dst_px.copy_from_slice(src_px);
            }
        });
}

fn paint_makeup(canvas: &mut Canvas, face: &FaceLandmarks, config: &MakeupConfig, options: CompositorOptions) {
    let (width, height) = (canvas.width, canvas.height);
    let mirror = |points: &[Point]| -> Vec<Point> {
        points.iter().map(|&(x, y)| (width as f32 - x, y)).collect()
    };

    let mouth = mirror(face.mouth());
    if options.debug_markers {
        if let Some(&first) = mouth.first() {
            raster::fill_circle(
                &mut canvas.rgba,
                width,
                height,
                first,
                DEBUG_DOT_RADIUS,
                Paint::opaque(Rgb(0, 255, 0)),
            );
        }
    }

    for category in Category::ALL {
        let Some(paint) = category_paint(config, category) else {
            continue;
        };
        match category {
            Category::Lipstick => {
                raster::fill_polygon(&mut canvas.rgba, width, height, &mouth, paint);
            }
            Category::Blush => {
                let rx = width as f32 * CHEEK_RADIUS_X;
                let ry = height as f32 * CHEEK_RADIUS_Y;
                for anchor in [face.left_cheek(), face.right_cheek()] {
                    let center = mirror(&[anchor])[0];
                    raster::fill_ellipse(&mut canvas.rgba, width, height, center, rx, ry, paint);
                }
            }
            Category::Eyeshadow => {
                for eye in [face.left_eye(), face.right_eye()] {
                    raster::fill_polygon(&mut canvas.rgba, width, height, &mirror(eye), paint);
                }
            }
            Category::Eyebrow => {
                for brow in [face.left_eyebrow(), face.right_eyebrow()] {
                    raster::fill_polygon(&mut canvas.rgba, width, height, &mirror(brow), paint);
                }
            }
        }
    }
}

/// `None` when the category is switched off.
fn category_paint(config: &MakeupConfig, category: Category) -> Option<Paint> {
    let intensity = config.intensity(category);
    if intensity.is_off() {
        return None;
    }
    Some(Paint::new(
        config.shade(category).color,
        intensity.alpha_for(category),
    ))
}
