//! Minimal software rasteriser for the RGBA canvas.
//!
//! All shapes are filled by sampling pixel centres and blended source-over
//! onto an opaque buffer; anything outside the buffer is clipped.

use rayon::prelude::*;

use crate::makeup::Rgb;

/// A fill colour plus its coverage in `0.0..=1.0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Paint {
    pub color: Rgb,
    pub alpha: f32,
}

impl Paint {
    pub fn new(color: Rgb, alpha: f32) -> Self {
        Self {
            color,
            alpha: alpha.clamp(0.0, 1.0),
        }
    }

    pub fn opaque(color: Rgb) -> Self {
        Self::new(color, 1.0)
    }

    fn is_visible(&self) -> bool {
        self.alpha > 0.0
    }
}

#[inline]
fn blend_channel(dst: u8, src: u8, alpha: f32) -> u8 {
    (src as f32 * alpha + dst as f32 * (1.0 - alpha))
        .round()
        .clamp(0.0, 255.0) as u8
}

#[inline]
fn blend_pixel(px: &mut [u8], paint: Paint) {
    px[0] = blend_channel(px[0], paint.color.0, paint.alpha);
    px[1] = blend_channel(px[1], paint.color.1, paint.alpha);
    px[2] = blend_channel(px[2], paint.color.2, paint.alpha);
    px[3] = 255;
}

fn blend_span(row: &mut [u8], width: u32, x_start: i64, x_end: i64, paint: Paint) {
    let x0 = x_start.max(0);
    let x1 = x_end.min(width as i64 - 1);
    if x0 > x1 {
        return;
    }
    for x in x0..=x1 {
        let idx = x as usize * 4;
        if idx + 3 < row.len() {
            blend_pixel(&mut row[idx..idx + 4], paint);
        }
    }
}

pub fn fill_rect(buffer: &mut [u8], width: u32, height: u32, rect: [f32; 4], paint: Paint) {
    if !paint.is_visible() || width == 0 || height == 0 {
        return;
    }
    let [x, y, w, h] = rect;
    let x_start = x.round() as i64;
    let x_end = (x + w).round() as i64 - 1;
    let y_start = (y.round() as i64).max(0);
    let y_end = ((y + h).round() as i64 - 1).min(height as i64 - 1);
    if y_start > y_end {
        return;
    }

    let stride = width as usize * 4;
    buffer
        .par_chunks_exact_mut(stride)
        .enumerate()
        .skip(y_start as usize)
        .take((y_end - y_start + 1) as usize)
        .for_each(|(_, row)| blend_span(row, width, x_start, x_end, paint));
}

/// Nonzero-winding scanline fill of the closed polygon through `points`.
pub fn fill_polygon(buffer: &mut [u8], width: u32, height: u32, points: &[(f32, f32)], paint: Paint) {
    if points.len() < 3 || !paint.is_visible() || width == 0 || height == 0 {
        return;
    }

    let min_y = points.iter().map(|p| p.1).fold(f32::INFINITY, f32::min);
    let max_y = points.iter().map(|p| p.1).fold(f32::NEG_INFINITY, f32::max);
    let row_start = (min_y - 0.5).ceil().max(0.0) as usize;
    let row_end = (max_y - 0.5).floor().min(height as f32 - 1.0);
    if row_end < 0.0 || row_start as f32 > row_end {
        return;
    }
    let row_end = row_end as usize;

    let stride = width as usize * 4;
    buffer
        .par_chunks_exact_mut(stride)
        .enumerate()
        .skip(row_start)
        .take(row_end - row_start + 1)
        .for_each(|(y, row)| {
            let mut crossings = scanline_crossings(points, y as f32 + 0.5);
            crossings.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut winding = 0;
            let mut span_start = 0.0;
            for (x, direction) in crossings {
                let was_inside = winding != 0;
                winding += direction;
                if !was_inside && winding != 0 {
                    span_start = x;
                } else if was_inside && winding == 0 {
                    // Pixel x is covered when its centre x + 0.5 lies in [start, x).
                    let x_start = (span_start - 0.5).ceil() as i64;
                    let x_end = (x - 0.5).ceil() as i64 - 1;
                    blend_span(row, width, x_start, x_end, paint);
                }
            }
        });
}

/// Edge crossings of the scanline at `y`, each with `+1` for a downward
/// edge and `-1` for an upward one.
fn scanline_crossings(points: &[(f32, f32)], y: f32) -> Vec<(f32, i32)> {
    let mut crossings = Vec::new();
    let n = points.len();
    for i in 0..n {
        let (x0, y0) = points[i];
        let (x1, y1) = points[(i + 1) % n];
        // Half-open edge rule so shared vertices are counted once.
        let direction = if y0 <= y && y < y1 {
            1
        } else if y1 <= y && y < y0 {
            -1
        } else {
            continue;
        };
        let t = (y - y0) / (y1 - y0);
        crossings.push((x0 + t * (x1 - x0), direction));
    }
    crossings
}

/// Axis-aligned ellipse centred at `center` with radii `rx`, `ry`.
pub fn fill_ellipse(
    buffer: &mut [u8],
    width: u32,
    height: u32,
    center: (f32, f32),
    rx: f32,
    ry: f32,
    paint: Paint,
) {
    if rx <= 0.0 || ry <= 0.0 || !paint.is_visible() || width == 0 || height == 0 {
        return;
    }
    let (cx, cy) = center;
    let row_start = (cy - ry - 0.5).ceil().max(0.0) as usize;
    let row_end = (cy + ry - 0.5).floor().min(height as f32 - 1.0);
    if row_end < 0.0 || row_start as f32 > row_end {
        return;
    }
    let row_end = row_end as usize;

    let stride = width as usize * 4;
    buffer
        .par_chunks_exact_mut(stride)
        .enumerate()
        .skip(row_start)
        .take(row_end - row_start + 1)
        .for_each(|(y, row)| {
            let dy = (y as f32 + 0.5 - cy) / ry;
            let span = 1.0 - dy * dy;
            if span < 0.0 {
                return;
            }
            let half = rx * span.sqrt();
            let x_start = (cx - half - 0.5).ceil() as i64;
            let x_end = (cx + half - 0.5).floor() as i64;
            blend_span(row, width, x_start, x_end, paint);
        });
}

pub fn fill_circle(buffer: &mut [u8], width: u32, height: u32, center: (f32, f32), radius: f32, paint: Paint) {
    fill_ellipse(buffer, width, height, center, radius, radius, paint);
}
