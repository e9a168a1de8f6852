use std::time::Instant;

/// One RGBA camera frame, as delivered by the capture thread.
#[derive(Clone, Debug)]
pub struct Frame {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp: Instant,
}

impl Frame {
    pub fn new(rgba: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            rgba,
            width,
            height,
            timestamp: Instant::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.rgba.is_empty()
    }
}

/// Outcome of one detector call on one frame.
#[derive(Clone, Debug)]
pub struct Detection {
    /// `None` when the detector ran but found no face.
    pub landmarks: Option<crate::landmarks::FaceLandmarks>,
    pub score: f32,
    pub frame_width: u32,
    pub frame_height: u32,
    /// Capture time of the frame the detector ran on.
    pub timestamp: Instant,
    /// When the worker published this result; staleness is measured from here.
    pub published_at: Instant,
}

impl Detection {
    pub fn has_face(&self) -> bool {
        self.landmarks.is_some()
    }
}
