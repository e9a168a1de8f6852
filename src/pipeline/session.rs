//! Camera lifecycle: `Idle -> Requesting -> Active -> Detecting`, with
//! `Stopped` after any teardown.

use crossbeam_channel::{Receiver, Sender, bounded};

use super::{
    camera::CameraStream,
    detector::{DetectorHandle, DetectorStatus},
};
use crate::{error::CameraError, types::Frame};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CameraPhase {
    /// Nothing opened yet, or the last request failed with `error`.
    Idle { error: Option<String> },
    Requesting,
    /// Frames are flowing but the detector is not ready.
    Active,
    /// Frames are flowing and every tick may submit one for detection.
    Detecting,
    Stopped,
}

/// Owns the capture stream and the frame channel it feeds.
pub struct CameraSession {
    phase: CameraPhase,
    stream: Option<CameraStream>,
    frame_tx: Sender<Frame>,
    frame_rx: Receiver<Frame>,
}

impl Default for CameraSession {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraSession {
    pub fn new() -> Self {
        let (frame_tx, frame_rx) = bounded(1);
        Self {
            phase: CameraPhase::Idle { error: None },
            stream: None,
            frame_tx,
            frame_rx,
        }
    }

    pub fn phase(&self) -> &CameraPhase {
        &self.phase
    }

    pub fn error(&self) -> Option<&str> {
        match &self.phase {
            CameraPhase::Idle { error } => error.as_deref(),
            _ => None,
        }
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self.phase, CameraPhase::Active | CameraPhase::Detecting)
    }

    /// Open a device through `open`, which receives the frame sender.
    /// Any running stream is stopped first.
    pub fn start<F>(&mut self, open: F) -> Result<(), CameraError>
    where
        F: FnOnce(Sender<Frame>) -> Result<CameraStream, CameraError>,
    {
        self.release();
        self.phase = CameraPhase::Requesting;
        while self.frame_rx.try_recv().is_ok() {}

        match open(self.frame_tx.clone()) {
            Ok(stream) => {
                log::info!("camera session active");
                self.stream = Some(stream);
                self.phase = CameraPhase::Active;
                Ok(())
            }
            Err(err) => {
                log::error!("camera request failed: {err}");
                self.phase = CameraPhase::Idle {
                    error: Some(err.to_string()),
                };
                Err(err)
            }
        }
    }

    /// One render tick: take the newest frame, advance `Active` to
    /// `Detecting` once the detector is ready, and submit the frame when
    /// detecting. Returns the frame to draw, if a new one arrived.
    pub fn tick(&mut self, detector: &mut DetectorHandle) -> Option<Frame> {
        detector.poll();
        if !self.is_streaming() {
            return None;
        }

        if let Some(err) = self.stream.as_mut().and_then(CameraStream::take_failure) {
            log::error!("camera stream failed: {err}");
            self.release();
            while self.frame_rx.try_recv().is_ok() {}
            self.phase = CameraPhase::Idle {
                error: Some(err.to_string()),
            };
            return None;
        }

        if self.phase == CameraPhase::Active && *detector.status() == DetectorStatus::Ready {
            log::info!("landmark detection started");
            self.phase = CameraPhase::Detecting;
        }

        let frame = self.frame_rx.try_iter().last()?;
        if self.phase == CameraPhase::Detecting {
            detector.try_submit(&frame);
        }
        Some(frame)
    }

    /// Stop capture and release the device.
    pub fn stop(&mut self) {
        self.release();
        self.phase = CameraPhase::Stopped;
    }

    fn release(&mut self) {
        if let Some(stream) = self.stream.take() {
            stream.stop();
        }
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        if self.stream.is_some() {
            log::info!("releasing camera");
        }
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicBool, Ordering},
        },
        thread,
        time::{Duration, Instant},
    };

    use super::*;
    use crate::{
        landmarks::synthetic_face,
        pipeline::detector::{FaceObservation, LandmarkEngine, spawn_worker},
    };

    struct CountingEngine(Arc<AtomicBool>);

    impl LandmarkEngine for CountingEngine {
        fn detect(&mut self, frame: &Frame) -> anyhow::Result<Option<FaceObservation>> {
            self.0.store(true, Ordering::SeqCst);
            Ok(Some(FaceObservation {
                landmarks: synthetic_face(frame.width as f32, frame.height as f32),
                score: 1.0,
            }))
        }
    }

    fn ready_detector(called: Arc<AtomicBool>) -> DetectorHandle {
        let mut handle = spawn_worker(move || Ok(CountingEngine(called)));
        let deadline = Instant::now() + Duration::from_secs(5);
        while *handle.status() != DetectorStatus::Ready {
            assert!(Instant::now() < deadline, "detector never became ready");
            handle.poll();
            thread::sleep(Duration::from_millis(5));
        }
        handle
    }

    /// A stream whose thread pushes frames until stopped.
    fn fake_stream(frame_tx: Sender<Frame>) -> Result<CameraStream, CameraError> {
        Ok(CameraStream::spawn(move |stop| {
            while !stop.load(Ordering::Relaxed) {
                let _ = frame_tx.try_send(Frame::new(vec![90; 32 * 24 * 4], 32, 24));
                thread::sleep(Duration::from_millis(2));
            }
            Ok(())
        }))
    }

    #[test]
    fn permission_denied_is_terminal_idle_without_detection() {
        let called = Arc::new(AtomicBool::new(false));
        let mut detector = ready_detector(called.clone());
        let mut session = CameraSession::new();

        let result = session.start(|_| Err(CameraError::PermissionDenied("user refused".into())));
        assert!(matches!(result, Err(CameraError::PermissionDenied(_))));
        assert!(matches!(session.phase(), CameraPhase::Idle { error: Some(_) }));
        assert!(session.error().unwrap().contains("user refused"));

        for _ in 0..10 {
            assert!(session.tick(&mut detector).is_none());
        }
        assert!(!detector.is_busy());
        assert!(!called.load(Ordering::SeqCst));
    }

    #[test]
    fn active_session_moves_to_detecting_and_submits() {
        let called = Arc::new(AtomicBool::new(false));
        let mut detector = ready_detector(called.clone());
        let mut session = CameraSession::new();
        session.start(fake_stream).unwrap();
        assert_eq!(*session.phase(), CameraPhase::Active);

        let deadline = Instant::now() + Duration::from_secs(5);
        while !called.load(Ordering::SeqCst) {
            assert!(Instant::now() < deadline, "no frame reached the detector");
            session.tick(&mut detector);
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(*session.phase(), CameraPhase::Detecting);

        session.stop();
        assert_eq!(*session.phase(), CameraPhase::Stopped);
        assert!(session.tick(&mut detector).is_none());
    }

    #[test]
    fn session_stays_active_while_detector_loads() {
        let (release_tx, release_rx) = bounded::<()>(0);
        let mut detector = spawn_worker(move || -> Result<CountingEngine, crate::error::DetectorError> {
            let _ = release_rx.recv();
            Err(crate::error::DetectorError::ModelLoad {
                path: "models/face_detector_320x240.onnx".into(),
                reason: "test".into(),
            })
        });
        let mut session = CameraSession::new();
        session.start(fake_stream).unwrap();
        thread::sleep(Duration::from_millis(20));
        session.tick(&mut detector);
        assert_eq!(*session.phase(), CameraPhase::Active);
        drop(release_tx);
    }

    #[test]
    fn capture_thread_failure_returns_to_idle_with_error() {
        let called = Arc::new(AtomicBool::new(false));
        let mut detector = ready_detector(called.clone());
        let mut session = CameraSession::new();
        session
            .start(|_| {
                Ok(CameraStream::spawn(|_| {
                    Err(CameraError::Open("device busy".to_string()))
                }))
            })
            .unwrap();
        assert_eq!(*session.phase(), CameraPhase::Active);

        let deadline = Instant::now() + Duration::from_secs(5);
        while session.is_streaming() {
            assert!(Instant::now() < deadline, "failure never reached the session");
            assert!(session.tick(&mut detector).is_none());
            thread::sleep(Duration::from_millis(2));
        }
        assert!(session.error().unwrap().contains("device busy"));
        assert!(session.tick(&mut detector).is_none());
        assert!(!called.load(Ordering::SeqCst));
    }
}
