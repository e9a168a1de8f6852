//! The 68-point facial landmark layout the detector is required to produce.
//!
//! Points follow the iBUG-300W ordering (the one dlib's shape predictor uses):
//!
//! | region        | indices  |
//! |---------------|----------|
//! | jaw           | 0..17    |
//! | left eyebrow  | 17..22   |
//! | right eyebrow | 22..27   |
//! | nose          | 27..36   |
//! | left eye      | 36..42   |
//! | right eye     | 42..48   |
//! | mouth         | 48..68   |
//!
//! "Left" and "right" are image-space (the subject's right side appears on
//! the image's left). Any detector backend must emit exactly this layout;
//! [`FaceLandmarks::new`] refuses anything else.

use std::ops::Range;

use crate::error::LandmarkError;

pub type Point = (f32, f32);

pub const NUM_FACE_LANDMARKS: usize = 68;

const JAW: Range<usize> = 0..17;
const LEFT_EYEBROW: Range<usize> = 17..22;
const RIGHT_EYEBROW: Range<usize> = 22..27;
const NOSE: Range<usize> = 27..36;
const LEFT_EYE: Range<usize> = 36..42;
const RIGHT_EYE: Range<usize> = 42..48;
const MOUTH: Range<usize> = 48..68;

const LEFT_CHEEK_ANCHOR: usize = 3;
const RIGHT_CHEEK_ANCHOR: usize = 13;

#[derive(Clone, Debug, PartialEq)]
pub struct FaceLandmarks {
    points: Vec<Point>,
}

impl FaceLandmarks {
    pub fn new(points: Vec<Point>) -> Result<Self, LandmarkError> {
        if points.len() != NUM_FACE_LANDMARKS {
            return Err(LandmarkError::TopologyMismatch {
                expected: NUM_FACE_LANDMARKS,
                actual: points.len(),
            });
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn jaw(&self) -> &[Point] {
        &self.points[JAW]
    }

    pub fn left_eyebrow(&self) -> &[Point] {
        &self.points[LEFT_EYEBROW]
    }

    pub fn right_eyebrow(&self) -> &[Point] {
        &self.points[RIGHT_EYEBROW]
    }

    pub fn nose(&self) -> &[Point] {
        &self.points[NOSE]
    }

    pub fn left_eye(&self) -> &[Point] {
        &self.points[LEFT_EYE]
    }

    pub fn right_eye(&self) -> &[Point] {
        &self.points[RIGHT_EYE]
    }

    /// Outer and inner lip contour, 20 points.
    pub fn mouth(&self) -> &[Point] {
        &self.points[MOUTH]
    }

    pub fn left_cheek(&self) -> Point {
        self.points[LEFT_CHEEK_ANCHOR]
    }

    pub fn right_cheek(&self) -> Point {
        self.points[RIGHT_CHEEK_ANCHOR]
    }

    /// Scale every point, used when the detector ran on a resized frame.
    pub fn scaled(&self, sx: f32, sy: f32) -> Self {
        Self {
            points: self.points.iter().map(|&(x, y)| (x * sx, y * sy)).collect(),
        }
    }
}

#[cfg(test)]
pub(crate) fn synthetic_face(width: f32, height: f32) -> FaceLandmarks {
    // A rough frontal face centred in the frame. Only the region layout
    // matters to callers; the geometry just has to be plausible.
    let cx = width / 2.0;
    let cy = height / 2.0;
    let s = width.min(height) / 4.0;
    let mut points = Vec::with_capacity(NUM_FACE_LANDMARKS);

    for i in 0..17 {
        let t = std::f32::consts::PI * (i as f32 / 16.0);
        points.push((cx - s * t.cos(), cy + s * 0.2 + s * 0.8 * t.sin()));
    }
    for start in [cx - s * 0.8, cx + s * 0.2] {
        for i in 0..5 {
            let arch = 2.0 - (i as f32 - 2.0).abs();
            points.push((start + i as f32 * s * 0.15, cy - s * 0.55 - arch * s * 0.03));
        }
    }
    for i in 0..9 {
        let x = cx - s * 0.1 + (i % 5) as f32 * s * 0.05;
        points.push((x, cy - s * 0.3 + i as f32 * s * 0.05));
    }
    for base in [cx - s * 0.45, cx + s * 0.45] {
        points.push((base - s * 0.15, cy - s * 0.3));
        points.push((base - s * 0.05, cy - s * 0.38));
        points.push((base + s * 0.05, cy - s * 0.38));
        points.push((base + s * 0.15, cy - s * 0.3));
        points.push((base + s * 0.05, cy - s * 0.22));
        points.push((base - s * 0.05, cy - s * 0.22));
    }
    for i in 0..12 {
        let t = 2.0 * std::f32::consts::PI * (i as f32 / 12.0);
        points.push((cx + s * 0.35 * t.cos(), cy + s * 0.45 + s * 0.12 * t.sin()));
    }
    for i in 0..8 {
        let t = 2.0 * std::f32::consts::PI * (i as f32 / 8.0);
        points.push((cx + s * 0.2 * t.cos(), cy + s * 0.45 + s * 0.05 * t.sin()));
    }

    FaceLandmarks::new(points).expect("synthetic face has 68 points")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_other_topologies() {
        let err = FaceLandmarks::new(vec![(0.0, 0.0); 5]).unwrap_err();
        assert!(matches!(
            err,
            LandmarkError::TopologyMismatch {
                expected: 68,
                actual: 5
            }
        ));
        assert!(FaceLandmarks::new(vec![(0.0, 0.0); 98]).is_err());
    }

    #[test]
    fn regions_follow_the_68_point_layout() {
        let points: Vec<Point> = (0..68).map(|i| (i as f32, 0.0)).collect();
        let face = FaceLandmarks::new(points).unwrap();

        assert_eq!(face.jaw().len(), 17);
        assert_eq!(face.left_eyebrow().first(), Some(&(17.0, 0.0)));
        assert_eq!(face.left_eyebrow().len(), 5);
        assert_eq!(face.right_eyebrow().first(), Some(&(22.0, 0.0)));
        assert_eq!(face.right_eyebrow().len(), 5);
        assert_eq!(face.nose().len(), 9);
        assert_eq!(face.left_eye().first(), Some(&(36.0, 0.0)));
        assert_eq!(face.right_eye().last(), Some(&(47.0, 0.0)));
        assert_eq!(face.mouth().len(), 20);
        assert_eq!(face.mouth().first(), Some(&(48.0, 0.0)));
        assert_eq!(face.left_cheek(), (3.0, 0.0));
        assert_eq!(face.right_cheek(), (13.0, 0.0));
    }

    #[test]
    fn scaling_keeps_topology() {
        let face = synthetic_face(200.0, 100.0).scaled(2.0, 0.5);
        assert_eq!(face.points().len(), NUM_FACE_LANDMARKS);
    }
}
