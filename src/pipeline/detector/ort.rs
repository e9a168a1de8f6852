use std::path::Path;

use anyhow::{Context, Result, anyhow};
use ndarray::Array4;
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;

use super::{
    FaceObservation, LandmarkEngine,
    common::{
        self, FACE_INPUT_SIZE, FACE_SCORE_THRESHOLD, LANDMARK_INPUT_SIZE,
    },
};
use crate::{
    error::DetectorError,
    model_download::{ModelKind, ensure_model_ready},
    types::Frame,
};

/// Face box detector followed by a 68-point regressor on the face crop.
pub(super) struct OrtEngine {
    face_detector: Session,
    landmarks: Session,
}

impl OrtEngine {
    pub(super) fn prepare(
        face_model: &Path,
        face_model_url: Option<&str>,
        landmark_model: &Path,
        landmark_model_url: Option<&str>,
    ) -> Result<Self, DetectorError> {
        let load = |kind: ModelKind, path: &Path, url: Option<&str>| {
            ensure_model_ready(kind, path, url, |_evt| {}).map_err(|err| DetectorError::ModelLoad {
                path: path.display().to_string(),
                reason: format!("{err:#}"),
            })?;
            build_session(path).map_err(|err| DetectorError::ModelLoad {
                path: path.display().to_string(),
                reason: format!("{err:#}"),
            })
        };

        let face_detector = load(ModelKind::FaceDetector, face_model, face_model_url)?;
        let landmarks = load(ModelKind::LandmarkRegressor, landmark_model, landmark_model_url)?;
        log::info!(
            "face detector {} and landmark model {} loaded",
            face_model.display(),
            landmark_model.display()
        );

        Ok(Self {
            face_detector,
            landmarks,
        })
    }
}

fn build_session(path: &Path) -> Result<Session> {
    let session = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_intra_threads(2)?
        .commit_from_file(path)
        .with_context(|| format!("failed to load ORT session from {}", path.display()))?;
    Ok(session)
}

/// NCHW float tensor; `(value - mean) / scale` per channel.
fn to_nchw(rgba: &[u8], width: u32, height: u32, mean: f32, scale: f32) -> Array4<f32> {
    let (w, h) = (width as usize, height as usize);
    let mut input = Array4::<f32>::zeros((1, 3, h, w));
    for (i, px) in rgba.chunks_exact(4).enumerate() {
        let (y, x) = (i / w, i % w);
        for c in 0..3 {
            input[[0, c, y, x]] = (px[c] as f32 - mean) / scale;
        }
    }
    input
}

impl LandmarkEngine for OrtEngine {
    fn detect(&mut self, frame: &Frame) -> Result<Option<FaceObservation>> {
        let (in_w, in_h) = FACE_INPUT_SIZE;
        let resized = common::resize_rgba(frame, None, in_w, in_h)?;
        let tensor = Tensor::from_array(to_nchw(&resized, in_w, in_h, 127.0, 128.0))?;
        let outputs = self
            .face_detector
            .run(ort::inputs![tensor])
            .context("failed to run face detector")?;
        if outputs.len() < 2 {
            return Err(anyhow!(
                "face detector returned {} outputs, expected 2",
                outputs.len()
            ));
        }

        let scores: Vec<f32> = outputs[0].try_extract_array::<f32>()?.iter().copied().collect();
        let boxes: Vec<f32> = outputs[1].try_extract_array::<f32>()?.iter().copied().collect();
        let Some(face) = common::pick_best_face(&scores, &boxes, FACE_SCORE_THRESHOLD)? else {
            return Ok(None);
        };
        let Some(crop) = common::square_crop(&face, frame.width, frame.height) else {
            return Ok(None);
        };

        let patch = common::resize_rgba(frame, Some(&crop), LANDMARK_INPUT_SIZE, LANDMARK_INPUT_SIZE)?;
        let tensor = Tensor::from_array(to_nchw(
            &patch,
            LANDMARK_INPUT_SIZE,
            LANDMARK_INPUT_SIZE,
            0.0,
            255.0,
        ))?;
        let outputs = self
            .landmarks
            .run(ort::inputs![tensor])
            .context("failed to run landmark model")?;
        if outputs.len() < 1 {
            return Err(anyhow!("landmark model returned no outputs"));
        }

        let flat: Vec<f32> = outputs[0].try_extract_array::<f32>()?.iter().copied().collect();
        let landmarks = common::project_landmarks(&flat, &crop)?;

        Ok(Some(FaceObservation {
            landmarks,
            score: face.score,
        }))
    }
}
