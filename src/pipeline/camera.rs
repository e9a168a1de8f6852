use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
};

use crossbeam_channel::Sender;

use crate::{error::CameraError, types::Frame};

/// Backend-neutral handle for a capture device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CameraId {
    Index(u32),
    Path(String),
}

impl fmt::Display for CameraId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraId::Index(idx) => write!(f, "#{idx}"),
            CameraId::Path(path) => f.write_str(path),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CameraDevice {
    pub id: CameraId,
    pub label: String,
}

/// A running capture thread. Dropping it stops the device.
#[derive(Debug)]
pub struct CameraStream {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<Result<(), CameraError>>>,
}

impl CameraStream {
    /// Run `capture` on its own thread; it must return once the flag is set.
    /// An early return, with or without an error, is reported by
    /// [`CameraStream::take_failure`].
    pub(crate) fn spawn<F>(capture: F) -> Self
    where
        F: FnOnce(Arc<AtomicBool>) -> Result<(), CameraError> + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();
        Self {
            stop,
            handle: Some(thread::spawn(move || capture(flag))),
        }
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// The reason the capture thread ended on its own, once it has.
    pub fn take_failure(&mut self) -> Option<CameraError> {
        if !self.handle.as_ref().is_some_and(|h| h.is_finished()) {
            return None;
        }
        let handle = self.handle.take()?;
        match handle.join() {
            Ok(Ok(())) if self.stop.load(Ordering::SeqCst) => None,
            Ok(Ok(())) => Some(CameraError::Lost("capture ended unexpectedly".to_string())),
            Ok(Err(err)) => Some(err),
            Err(_) => Some(CameraError::Lost("capture thread panicked".to_string())),
        }
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CameraStream {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Sort an open failure into "the user said no" versus everything else.
pub fn classify_open_error(message: &str) -> CameraError {
    let lower = message.to_ascii_lowercase();
    let denied = ["permission", "denied", "not authorized", "unauthorized", "authoriz"]
        .iter()
        .any(|needle| lower.contains(needle));
    if denied {
        CameraError::PermissionDenied(message.to_string())
    } else {
        CameraError::Open(message.to_string())
    }
}

#[cfg(feature = "camera-nokhwa")]
pub use backend::{available_cameras, start_camera_stream};

#[cfg(not(feature = "camera-nokhwa"))]
pub fn available_cameras() -> Result<Vec<CameraDevice>, CameraError> {
    Err(CameraError::Unsupported)
}

#[cfg(not(feature = "camera-nokhwa"))]
pub fn start_camera_stream(_id: &CameraId, _frame_tx: Sender<Frame>) -> Result<CameraStream, CameraError> {
    Err(CameraError::Unsupported)
}

#[cfg(feature = "camera-nokhwa")]
mod backend {
    use std::{sync::atomic::Ordering, time::Instant};

    use nokhwa::{
        Buffer, Camera, NokhwaError,
        pixel_format::RgbFormat,
        query,
        utils::{ApiBackend, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType},
    };

    use super::*;
    use crate::pipeline::rgba_converter::{PixelLayout, convert_to_frame};

    // Built-in macOS cameras often reject YUYV even when it is reported.
    const PREFERRED_PIXEL_FORMATS: &[FrameFormat] = &[
        FrameFormat::RAWRGB,
        FrameFormat::RAWBGR,
        FrameFormat::GRAY,
        FrameFormat::YUYV,
        FrameFormat::NV12,
        FrameFormat::MJPEG,
    ];

    fn requested_formats() -> [RequestedFormat<'static>; 3] {
        [
            RequestedFormat::with_formats(
                RequestedFormatType::AbsoluteHighestFrameRate,
                PREFERRED_PIXEL_FORMATS,
            ),
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate),
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::None),
        ]
    }

    fn to_index(id: &CameraId) -> CameraIndex {
        match id {
            CameraId::Index(idx) => CameraIndex::Index(*idx),
            CameraId::Path(path) => CameraIndex::String(path.clone()),
        }
    }

    fn to_id(index: &CameraIndex) -> CameraId {
        match index {
            CameraIndex::Index(idx) => CameraId::Index(*idx),
            CameraIndex::String(path) => CameraId::Path(path.clone()),
        }
    }

    fn layout_of(format: FrameFormat) -> PixelLayout {
        match format {
            FrameFormat::NV12 => PixelLayout::Nv12,
            FrameFormat::YUYV => PixelLayout::Yuyv,
            FrameFormat::MJPEG => PixelLayout::Mjpeg,
            FrameFormat::RAWRGB => PixelLayout::Rgb,
            FrameFormat::RAWBGR => PixelLayout::Bgr,
            FrameFormat::GRAY => PixelLayout::Gray,
        }
    }

    fn map_error(err: NokhwaError) -> CameraError {
        classify_open_error(&err.to_string())
    }

    pub fn available_cameras() -> Result<Vec<CameraDevice>, CameraError> {
        let cameras = query(ApiBackend::Auto).map_err(map_error)?;
        Ok(cameras
            .into_iter()
            .map(|info| CameraDevice {
                id: to_id(info.index()),
                label: info.human_name(),
            })
            .collect())
    }

    fn open_camera(id: &CameraId) -> Result<Camera, CameraError> {
        let mut last_err = None;
        for requested in requested_formats() {
            match Camera::new(to_index(id), requested) {
                Ok(mut camera) => match camera.open_stream() {
                    Ok(()) => return Ok(camera),
                    Err(err) => last_err = Some(map_error(err)),
                },
                Err(err) => last_err = Some(map_error(err)),
            }
        }
        Err(last_err.unwrap_or_else(|| CameraError::Open(format!("no usable format for camera {id}"))))
    }

    fn decode(buffer: &Buffer) -> anyhow::Result<Frame> {
        let resolution = buffer.resolution();
        convert_to_frame(
            layout_of(buffer.source_frame_format()),
            buffer.buffer(),
            resolution.width_x,
            resolution.height_y,
        )
    }

    /// Open `id` and forward decoded frames to `frame_tx`, dropping frames
    /// while the consumer is behind.
    pub fn start_camera_stream(id: &CameraId, frame_tx: Sender<Frame>) -> Result<CameraStream, CameraError> {
        // Surface permission and open failures before spawning.
        drop(open_camera(id)?);

        let id = id.clone();
        Ok(CameraStream::spawn(move |stop| {
            let mut camera = open_camera(&id).inspect_err(|err| {
                log::error!("failed to reopen camera {id}: {err}");
            })?;
            log::info!("camera {id} streaming");

            while !stop.load(Ordering::Relaxed) {
                let started = Instant::now();
                let buffer = match camera.frame() {
                    Ok(buffer) => buffer,
                    Err(err) => {
                        log::warn!("camera frame read failed after {:?}: {err}", started.elapsed());
                        continue;
                    }
                };
                match decode(&buffer) {
                    Ok(frame) => {
                        let _ = frame_tx.try_send(frame);
                    }
                    Err(err) => log::warn!("failed to decode camera frame: {err:?}"),
                }
            }

            if let Err(err) = camera.stop_stream() {
                log::warn!("failed to stop camera {id}: {err}");
            }
            log::info!("camera {id} stopped");
            Ok(())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_errors_are_recognised() {
        assert!(matches!(
            classify_open_error("Could not open device: Permission denied (os error 13)"),
            CameraError::PermissionDenied(_)
        ));
        assert!(matches!(
            classify_open_error("AVFoundation: camera access not authorized"),
            CameraError::PermissionDenied(_)
        ));
        assert!(matches!(
            classify_open_error("device busy"),
            CameraError::Open(_)
        ));
    }

    #[test]
    fn camera_ids_display_readably() {
        assert_eq!(CameraId::Index(2).to_string(), "#2");
        assert_eq!(CameraId::Path("/dev/video0".into()).to_string(), "/dev/video0");
    }

    #[test]
    fn stream_drop_joins_worker() {
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        let stream = CameraStream::spawn(move |stop| {
            while !stop.load(Ordering::Relaxed) {
                thread::yield_now();
            }
            let _ = done_tx.send(());
            Ok(())
        });
        assert!(stream.is_running());
        drop(stream);
        assert!(done_rx.try_recv().is_ok(), "capture thread not joined on drop");
    }

    fn wait_finished(stream: &CameraStream) {
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while stream.is_running() {
            assert!(std::time::Instant::now() < deadline, "capture thread never ended");
            thread::yield_now();
        }
    }

    #[test]
    fn capture_errors_are_reported_once() {
        let mut stream =
            CameraStream::spawn(|_| Err(CameraError::Open("device vanished".to_string())));
        wait_finished(&stream);
        assert!(matches!(stream.take_failure(), Some(CameraError::Open(msg)) if msg == "device vanished"));
        assert!(stream.take_failure().is_none());
    }

    #[test]
    fn capture_ending_without_stop_is_a_failure() {
        let mut stream = CameraStream::spawn(|_| Ok(()));
        wait_finished(&stream);
        assert!(matches!(stream.take_failure(), Some(CameraError::Lost(_))));
    }

    #[test]
    fn running_capture_has_no_failure() {
        let mut stream = CameraStream::spawn(|stop| {
            while !stop.load(Ordering::Relaxed) {
                thread::yield_now();
            }
            Ok(())
        });
        assert!(stream.take_failure().is_none());
        stream.stop();
    }
}
