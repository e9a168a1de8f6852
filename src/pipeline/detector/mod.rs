//! Face landmark detection worker.
//!
//! The model itself is external; this module only owns the thread that runs
//! it and the hand-off with the render loop. At most one frame is ever in
//! flight: [`DetectorHandle::try_submit`] claims a single slot and the worker
//! releases it after publishing the result.

pub mod common;
#[cfg(feature = "detector-ort")]
mod ort;

#[cfg(feature = "detector-ort")]
use std::path::PathBuf;
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, Sender, TryRecvError, bounded, unbounded};

#[cfg(feature = "detector-ort")]
use crate::model_download::{ModelKind, model_path};
use crate::{
    config::ClientConfig,
    error::DetectorError,
    landmarks::FaceLandmarks,
    types::{Detection, Frame},
};

/// Landmarks older than this are no longer painted.
pub const STALE_DETECTION: Duration = Duration::from_millis(500);

pub struct FaceObservation {
    pub landmarks: FaceLandmarks,
    pub score: f32,
}

pub(crate) trait LandmarkEngine: Send + 'static {
    fn detect(&mut self, frame: &Frame) -> anyhow::Result<Option<FaceObservation>>;
}

#[derive(Clone, Debug, PartialEq)]
pub enum DetectorStatus {
    Loading,
    Ready,
    Disabled(String),
}

pub(crate) enum DetectorEvent {
    Ready,
    Disabled(String),
    Result(Detection),
}

#[derive(Clone, Debug)]
pub enum DetectorBackend {
    /// No model: every frame renders without makeup.
    Disabled,
    #[cfg(feature = "detector-ort")]
    Ort {
        face_model: PathBuf,
        landmark_model: PathBuf,
        face_model_url: Option<String>,
        landmark_model_url: Option<String>,
    },
}

impl DetectorBackend {
    pub fn from_config(config: &ClientConfig) -> Self {
        #[cfg(feature = "detector-ort")]
        {
            DetectorBackend::Ort {
                face_model: model_path(&config.model_dir, ModelKind::FaceDetector),
                landmark_model: model_path(&config.model_dir, ModelKind::LandmarkRegressor),
                face_model_url: config.face_model_url.clone(),
                landmark_model_url: config.landmark_model_url.clone(),
            }
        }

        #[cfg(not(feature = "detector-ort"))]
        {
            let _ = config;
            DetectorBackend::Disabled
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DetectorBackend::Disabled => "disabled",
            #[cfg(feature = "detector-ort")]
            DetectorBackend::Ort { .. } => "ort",
        }
    }
}

pub struct DetectorHandle {
    frame_tx: Sender<Frame>,
    event_rx: Receiver<DetectorEvent>,
    in_flight: Arc<AtomicBool>,
    status: DetectorStatus,
    latest: Option<Detection>,
    _worker: Option<thread::JoinHandle<()>>,
}

impl DetectorHandle {
    /// Queue `frame` for detection unless a previous frame is still being
    /// processed. Returns whether the frame was accepted.
    pub fn try_submit(&self, frame: &Frame) -> bool {
        if self.status != DetectorStatus::Ready {
            return false;
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        if self.frame_tx.try_send(frame.clone()).is_err() {
            self.in_flight.store(false, Ordering::Release);
            return false;
        }
        true
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Drain worker events; call once per tick.
    pub fn poll(&mut self) {
        loop {
            match self.event_rx.try_recv() {
                Ok(DetectorEvent::Ready) => self.status = DetectorStatus::Ready,
                Ok(DetectorEvent::Disabled(reason)) => {
                    self.status = DetectorStatus::Disabled(reason);
                    self.latest = None;
                }
                Ok(DetectorEvent::Result(detection)) => self.latest = Some(detection),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if self.status == DetectorStatus::Loading || self.status == DetectorStatus::Ready {
                        self.status = DetectorStatus::Disabled("detector worker exited".to_string());
                    }
                    break;
                }
            }
        }
    }

    pub fn status(&self) -> &DetectorStatus {
        &self.status
    }

    /// Most recent detection with a face, unless it was published more than
    /// [`STALE_DETECTION`] ago.
    pub fn current(&self, now: Instant) -> Option<&Detection> {
        self.latest.as_ref().filter(|d| {
            d.has_face() && now.saturating_duration_since(d.published_at) <= STALE_DETECTION
        })
    }
}

pub fn start_detector(backend: DetectorBackend) -> DetectorHandle {
    log::info!("starting face landmark backend: {}", backend.label());
    match backend {
        DetectorBackend::Disabled => disabled_handle("no landmark detector compiled in"),
        #[cfg(feature = "detector-ort")]
        DetectorBackend::Ort {
            face_model,
            landmark_model,
            face_model_url,
            landmark_model_url,
        } => spawn_worker(move || {
            ort::OrtEngine::prepare(
                &face_model,
                face_model_url.as_deref(),
                &landmark_model,
                landmark_model_url.as_deref(),
            )
        }),
    }
}

fn disabled_handle(reason: &str) -> DetectorHandle {
    let (frame_tx, _frame_rx) = bounded(1);
    let (_event_tx, event_rx) = unbounded();
    DetectorHandle {
        frame_tx,
        event_rx,
        in_flight: Arc::new(AtomicBool::new(false)),
        status: DetectorStatus::Disabled(reason.to_string()),
        latest: None,
        _worker: None,
    }
}

pub(crate) fn spawn_worker<E, F>(load: F) -> DetectorHandle
where
    E: LandmarkEngine,
    F: FnOnce() -> Result<E, DetectorError> + Send + 'static,
{
    let (frame_tx, frame_rx) = bounded::<Frame>(1);
    let (event_tx, event_rx) = unbounded();
    let in_flight = Arc::new(AtomicBool::new(false));
    let worker_flag = in_flight.clone();

    let worker = thread::spawn(move || {
        let engine = match load() {
            Ok(engine) => {
                log::info!("face landmark detector ready");
                let _ = event_tx.send(DetectorEvent::Ready);
                engine
            }
            Err(err) => {
                log::error!("face landmark detector disabled: {err}");
                let _ = event_tx.send(DetectorEvent::Disabled(err.to_string()));
                return;
            }
        };
        run_worker_loop(engine, frame_rx, event_tx, worker_flag);
    });

    DetectorHandle {
        frame_tx,
        event_rx,
        in_flight,
        status: DetectorStatus::Loading,
        latest: None,
        _worker: Some(worker),
    }
}

fn run_worker_loop<E: LandmarkEngine>(
    mut engine: E,
    frame_rx: Receiver<Frame>,
    event_tx: Sender<DetectorEvent>,
    in_flight: Arc<AtomicBool>,
) {
    while let Ok(frame) = frame_rx.recv() {
        let observation = match engine.detect(&frame) {
            Ok(observation) => observation,
            Err(err) => {
                log::warn!("face landmark detection failed: {err:?}");
                None
            }
        };
        if observation.is_none() {
            log::debug!("no face in {}x{} frame", frame.width, frame.height);
        }

        let detection = Detection {
            score: observation.as_ref().map(|o| o.score).unwrap_or(0.0),
            landmarks: observation.map(|o| o.landmarks),
            frame_width: frame.width,
            frame_height: frame.height,
            timestamp: frame.timestamp,
            published_at: Instant::now(),
        };
        let sent = event_tx.send(DetectorEvent::Result(detection));
        in_flight.store(false, Ordering::Release);
        if sent.is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use anyhow::anyhow;

    use super::*;
    use crate::landmarks::synthetic_face;

    struct ScriptedEngine {
        fail_every_other: bool,
        delay: Duration,
        calls: usize,
    }

    impl LandmarkEngine for ScriptedEngine {
        fn detect(&mut self, frame: &Frame) -> anyhow::Result<Option<FaceObservation>> {
            self.calls += 1;
            if self.fail_every_other && self.calls % 2 == 0 {
                return Err(anyhow!("synthetic failure"));
            }
            thread::sleep(self.delay);
            Ok(Some(FaceObservation {
                landmarks: synthetic_face(frame.width as f32, frame.height as f32),
                score: 0.9,
            }))
        }
    }

    fn frame() -> Frame {
        Frame::new(vec![128; 64 * 48 * 4], 64, 48)
    }

    fn wait_until(handle: &mut DetectorHandle, mut done: impl FnMut(&DetectorHandle) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            handle.poll();
            if done(handle) {
                return;
            }
            thread::sleep(Duration::from_millis(5));
        }
        panic!("detector did not reach the expected state");
    }

    #[test]
    fn only_one_frame_in_flight() {
        let mut handle = spawn_worker(|| {
            Ok(ScriptedEngine {
                fail_every_other: false,
                delay: Duration::from_millis(20),
                calls: 0,
            })
        });
        wait_until(&mut handle, |h| *h.status() == DetectorStatus::Ready);

        assert!(handle.try_submit(&frame()));
        assert!(!handle.try_submit(&frame()), "second submit must be refused");

        wait_until(&mut handle, |h| !h.is_busy() && h.current(Instant::now()).is_some());
        assert!(handle.try_submit(&frame()));
    }

    #[test]
    fn failed_detection_is_swallowed_and_slot_released() {
        let mut handle = spawn_worker(|| {
            Ok(ScriptedEngine {
                fail_every_other: true,
                delay: Duration::from_millis(20),
                calls: 0,
            })
        });
        wait_until(&mut handle, |h| *h.status() == DetectorStatus::Ready);

        assert!(handle.try_submit(&frame()));
        wait_until(&mut handle, |h| !h.is_busy() && h.current(Instant::now()).is_some());

        // Second call fails; the slot is still released and a faceless result published.
        assert!(handle.try_submit(&frame()));
        wait_until(&mut handle, |h| !h.is_busy());
        handle.poll();
        assert!(handle.current(Instant::now()).is_none());
        assert!(handle.try_submit(&frame()));
    }

    #[test]
    fn load_failure_disables_detection() {
        let mut handle = spawn_worker(|| -> Result<ScriptedEngine, DetectorError> {
            Err(DetectorError::ModelLoad {
                path: "models/missing.onnx".to_string(),
                reason: "not found".to_string(),
            })
        });
        wait_until(&mut handle, |h| matches!(h.status(), DetectorStatus::Disabled(_)));
        assert!(!handle.try_submit(&frame()));
    }

    #[test]
    fn stale_detections_are_ignored() {
        let mut handle = spawn_worker(|| {
            Ok(ScriptedEngine {
                fail_every_other: false,
                delay: Duration::from_millis(20),
                calls: 0,
            })
        });
        wait_until(&mut handle, |h| *h.status() == DetectorStatus::Ready);
        assert!(handle.try_submit(&frame()));
        wait_until(&mut handle, |h| h.current(Instant::now()).is_some());

        let later = Instant::now() + STALE_DETECTION + Duration::from_millis(1);
        assert!(handle.current(later).is_none());
    }

    #[test]
    fn slow_detector_results_are_fresh_on_arrival() {
        let mut handle = spawn_worker(|| {
            Ok(ScriptedEngine {
                fail_every_other: false,
                delay: STALE_DETECTION + Duration::from_millis(100),
                calls: 0,
            })
        });
        wait_until(&mut handle, |h| *h.status() == DetectorStatus::Ready);

        let submitted = frame();
        assert!(handle.try_submit(&submitted));
        wait_until(&mut handle, |h| !h.is_busy());
        handle.poll();

        let now = Instant::now();
        assert!(now.saturating_duration_since(submitted.timestamp) > STALE_DETECTION);
        let detection = handle.current(now).expect("fresh result must be painted");
        assert_eq!(detection.timestamp, submitted.timestamp);
    }

    #[test]
    fn disabled_backend_never_accepts_frames() {
        let handle = start_detector(DetectorBackend::Disabled);
        assert!(matches!(handle.status(), DetectorStatus::Disabled(_)));
        assert!(!handle.try_submit(&frame()));
    }
}
